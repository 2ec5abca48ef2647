//! Uniform response envelope.
//!
//! Every endpoint answers with the same `{success, count?, data?, message?,
//! error?}` shape; absent members are omitted from the JSON entirely rather
//! than serialized as null.

use serde::Serialize;

/// The response envelope returned by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Success with a data payload.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            count: None,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// Success with a data payload and a human-readable message.
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }

    /// Success for a listing: payload plus element count.
    pub fn listed(data: T, count: usize) -> Self {
        Self {
            count: Some(count),
            ..Self::success(data)
        }
    }
}

impl Envelope<()> {
    /// Failure with a human-readable message and no payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            count: None,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    /// RFC 3339 timestamp of the probe.
    pub timestamp: String,
    /// Seconds since process start.
    pub uptime: f64,
    /// Deployment mode name.
    pub environment: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_omits_absent_members() {
        let envelope = Envelope::success(vec![1, 2, 3]);
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert!(json.get("count").is_none());
        assert!(json.get("message").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_listed_envelope_carries_count() {
        let envelope = Envelope::listed(vec!["a", "b"], 2);
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["count"], 2);
        assert_eq!(json["data"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_failure_envelope() {
        let envelope = Envelope::failure("Feedback not found");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Feedback not found");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_success_with_message() {
        let envelope = Envelope::success_with_message("payload", "Feedback created successfully");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["message"], "Feedback created successfully");
        assert_eq!(json["data"], "payload");
    }
}
