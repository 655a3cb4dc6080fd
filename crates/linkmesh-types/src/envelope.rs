use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A Connector-assigned outbound sequence number.
///
/// Sequence numbers are monotonic per Connector per direction and are only
/// meaningful in combination with the direction that assigned them; they are
/// not globally unique across the two ends of a link.
pub type Seq = u64;

/// Which of the three on-wire shapes an envelope's `type` suffix names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    Request,
    Response,
    Event,
}

impl EnvelopeKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            EnvelopeKind::Request => "_request",
            EnvelopeKind::Response => "_response",
            EnvelopeKind::Event => "_event",
        }
    }
}

/// The on-wire record carrying a message's `type`, the Connector-assigned
/// `seq`, and the opaque `data` payload.
///
/// `seq` here is the *envelope* sequence (assigned by whichever side sent
/// this particular envelope). For a response envelope, the request's seq is
/// echoed inside `data.seq`, not in this field — see spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<Seq>,
    pub data: Value,
}

impl Envelope {
    pub fn new(type_: impl Into<String>, seq: Option<Seq>, data: Value) -> Self {
        Self {
            type_: type_.into(),
            seq,
            data,
        }
    }

    /// The base message name with the `_request`/`_response`/`_event` suffix
    /// stripped, e.g. `"ping_request"` -> `"ping"`.
    pub fn base_name(&self) -> Option<&str> {
        for kind in [EnvelopeKind::Request, EnvelopeKind::Response, EnvelopeKind::Event] {
            if let Some(stripped) = self.type_.strip_suffix(kind.suffix()) {
                return Some(stripped);
            }
        }
        None
    }

    pub fn kind(&self) -> Option<EnvelopeKind> {
        if self.type_.ends_with(EnvelopeKind::Request.suffix()) {
            Some(EnvelopeKind::Request)
        } else if self.type_.ends_with(EnvelopeKind::Response.suffix()) {
            Some(EnvelopeKind::Response)
        } else if self.type_.ends_with(EnvelopeKind::Event.suffix()) {
            Some(EnvelopeKind::Event)
        } else {
            None
        }
    }

    /// The echoed request seq carried in `data.seq`, if `data` is an object
    /// with an integer `seq` field (the correlation key for responses).
    pub fn data_seq(&self) -> Option<Seq> {
        self.data.get("seq").and_then(Value::as_u64)
    }

    /// The `error` string carried in `data.error`, if this is an error
    /// response envelope.
    pub fn data_error(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_name_strips_suffix() {
        let env = Envelope::new("ping_request", Some(1), json!({}));
        assert_eq!(env.base_name(), Some("ping"));
        assert_eq!(env.kind(), Some(EnvelopeKind::Request));
    }

    #[test]
    fn unknown_suffix_has_no_kind() {
        let env = Envelope::new("ping", None, json!({}));
        assert_eq!(env.kind(), None);
        assert_eq!(env.base_name(), None);
    }

    #[test]
    fn data_seq_and_error_extraction() {
        let ok = Envelope::new("ping_response", Some(7), json!({"seq": 3}));
        assert_eq!(ok.data_seq(), Some(3));
        assert_eq!(ok.data_error(), None);

        let err = Envelope::new("ping_response", Some(7), json!({"seq": 3, "error": "nope"}));
        assert_eq!(err.data_error(), Some("nope"));
    }

    #[test]
    fn serializes_without_seq_when_absent() {
        let env = Envelope::new("ping_event", None, json!({}));
        let value = serde_json::to_value(&env).unwrap();
        assert!(value.get("seq").is_none());
        assert_eq!(value["type"], "ping_event");
    }
}
