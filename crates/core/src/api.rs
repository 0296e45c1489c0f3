//! Upload wire types.

use serde::{Deserialize, Serialize};

use crate::ImageHash;

/// Multipart field carrying the photo.
pub const UPLOAD_FIELD: &str = "file";

/// Raw body of `POST /v2/recipefinder`.
///
/// The backend answers with either an `image_hash` (accepted) or a `message`
/// (business rejection, e.g. the photo shows no food).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Present when the photo was accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<ImageHash>,
    /// Present when the photo was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of one upload call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Accepted; the recipe is addressable by this hash.
    Success {
        /// Hash returned by the backend.
        image_hash: ImageHash,
    },
    /// Refused by a backend rule. The message is shown verbatim.
    Rejected {
        /// Backend message.
        message: String,
    },
    /// No response, non-2xx, or an unreadable body.
    TransportError {
        /// Diagnostic detail for logs.
        detail: String,
    },
}

impl UploadResponse {
    /// Classify a 2xx body.
    ///
    /// A non-empty `message` wins over `image_hash`, matching the backend
    /// contract where the message signals a rejection.
    pub fn into_outcome(self) -> UploadOutcome {
        if let Some(message) = self.message.filter(|m| !m.is_empty()) {
            return UploadOutcome::Rejected { message };
        }
        match self.image_hash.filter(|h| !h.as_str().is_empty()) {
            Some(image_hash) => UploadOutcome::Success { image_hash },
            None => UploadOutcome::TransportError {
                detail: "response carried neither image_hash nor message".into(),
            },
        }
    }
}
