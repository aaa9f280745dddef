//! Common wire types shared by every Resource Manager provider.
//!
//! Every ARM resource carries the same identity envelope (`id`, `name`,
//! `type`), tracked resources add `location` and `tags`, and every error
//! response uses the same `{"error": {"code", "message"}}` envelope. The
//! shapes here are transcriptions of that contract; individual providers
//! flatten them into their own DTOs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The common identity envelope present on every ARM resource.
///
/// All fields are populated by the service; clients send them back verbatim
/// (or omit them) on writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resource {
    /// Fully qualified resource id, e.g.
    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Resource name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Resource type, e.g. `Microsoft.Security/automations`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// An ARM resource tracked to a region, with optional tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackedResource {
    #[serde(flatten)]
    pub resource: Resource,

    /// The region the resource lives in, e.g. `westeurope`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Resource tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

/// The ARM error envelope: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// The body of an ARM error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,

    /// Nested errors, if the service provides them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

impl ErrorResponse {
    /// Build an error envelope from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_round_trips_type_field() {
        let json = serde_json::json!({
            "id": "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Security/automations/auto1",
            "name": "auto1",
            "type": "Microsoft.Security/automations"
        });

        let resource: Resource = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(resource.name.as_deref(), Some("auto1"));
        assert_eq!(
            resource.resource_type.as_deref(),
            Some("Microsoft.Security/automations")
        );

        let back = serde_json::to_value(&resource).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn tracked_resource_flattens_envelope() {
        let json = serde_json::json!({
            "id": "/subscriptions/sub1/x",
            "name": "x",
            "type": "t",
            "location": "westeurope",
            "tags": {"env": "test"}
        });

        let tracked: TrackedResource = serde_json::from_value(json).unwrap();
        assert_eq!(tracked.resource.name.as_deref(), Some("x"));
        assert_eq!(tracked.location.as_deref(), Some("westeurope"));
        assert_eq!(tracked.tags.unwrap()["env"], "test");
    }

    #[test]
    fn error_envelope_deserializes_without_details() {
        let json = serde_json::json!({
            "error": {"code": "ResourceNotFound", "message": "not found"}
        });

        let err: ErrorResponse = serde_json::from_value(json).unwrap();
        assert_eq!(err.error.code, "ResourceNotFound");
        assert!(err.error.details.is_empty());
    }
}
