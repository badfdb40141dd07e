use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of invoking one service for one subject.
///
/// A success may still carry no data ("the source has nothing on this app").
/// A failure always carries a URL a human can open to verify the claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceEntry {
    // Failure first: untagged deserialization tries variants in order, and a
    // failure object would otherwise match Success with its optional `data`
    // missing and `error`/`url` silently ignored.
    Failure {
        success: bool,
        error: String,
        url: String,
    },
    Success {
        success: bool,
        data: Option<Value>,
    },
}

impl ServiceEntry {
    pub fn success(data: Option<Value>) -> Self {
        Self::Success {
            success: true,
            data,
        }
    }

    pub fn failure(error: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
            url: url.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Per-field results of one aggregation, keyed by field name
/// ("steam", "game_length", ...).
pub type ServiceMap = BTreeMap<String, ServiceEntry>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailsResponse {
    pub services: ServiceMap,
    pub from_cache: bool,
}
