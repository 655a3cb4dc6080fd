use std::collections::HashSet;
use std::sync::Arc;

use linkmesh_types::LinkSpec;

/// The authenticated identity of whoever is on the other end of a
/// `control-controller` link, carrying the permission strings granted to
/// their role (spec.md §5 "permission checking").
///
/// Links that never carry a permission-checked message (every link except
/// the controller's connections to `control` clients) simply never populate
/// this — [`CallContext::caller`] stays `None` and `has_permission` always
/// returns `false`, which is correct: nothing on those links ever asks.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user: String,
    pub permissions: Arc<HashSet<String>>,
}

impl CallerIdentity {
    pub fn new(user: impl Into<String>, permissions: HashSet<String>) -> Self {
        Self {
            user: user.into(),
            permissions: Arc::new(permissions),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Passed to every handler invocation in place of the teacher's `this`
/// rebinding: the link the call arrived on and, where applicable, who is
/// calling (spec.md "Design Notes" #2).
#[derive(Debug, Clone)]
pub struct CallContext {
    pub link: LinkSpec,
    pub caller: Option<CallerIdentity>,
}

impl CallContext {
    pub fn new(link: LinkSpec, caller: Option<CallerIdentity>) -> Self {
        Self { link, caller }
    }

    /// Whether the caller (if any) holds `permission`. A context with no
    /// caller identity — internal node-to-node links — never has one.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.caller.as_ref().is_some_and(|c| c.has_permission(permission))
    }
}
