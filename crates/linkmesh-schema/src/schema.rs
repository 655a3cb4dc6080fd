//! Eager compilation and structural validation of the declarative schemas
//! attached to catalog entries (spec.md §4.1).
//!
//! Schemas are restricted by convention to a subset of JSON Schema draft-07
//! (`type`, `enum`, `const`, `properties`, `required`, `additionalProperties`,
//! `items`, `anyOf`, `additionalItems`), but compilation itself is delegated
//! to the real `jsonschema` crate rather than a hand-rolled checker — the
//! teacher's server crate already depends on it for exactly this job.

use serde_json::Value;

/// A single structural validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON pointer into the instance, e.g. `/instance_id`.
    pub path: String,
    /// Human-readable reason the value at `path` was rejected.
    pub reason: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// A schema document that failed to compile.
#[derive(Debug, thiserror::Error)]
#[error("invalid schema document: {0}")]
pub struct SchemaError(pub String);

/// An eagerly-compiled schema, ready to validate any number of instances.
pub struct CompiledSchema {
    raw: Value,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").field("raw", &self.raw).finish()
    }
}

impl CompiledSchema {
    /// Compile a schema document. Compilation happens once, at catalog
    /// build time; every subsequent `validate` call reuses the compiled
    /// form.
    pub fn compile(raw: Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::validator_for(&raw).map_err(|e| SchemaError(e.to_string()))?;
        Ok(Self { raw, validator })
    }

    /// The original schema document, e.g. for diagnostics or re-export.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Validate `instance` against this schema, returning every structural
    /// issue found (not just the first).
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<ValidationIssue>> {
        let issues: Vec<ValidationIssue> = self
            .validator
            .iter_errors(instance)
            .map(|err| ValidationIssue {
                path: {
                    let p = err.instance_path.to_string();
                    if p.is_empty() {
                        "/".to_string()
                    } else {
                        p
                    }
                },
                reason: err.to_string(),
            })
            .collect();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}
