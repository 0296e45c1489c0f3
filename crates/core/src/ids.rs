//! Identifier newtypes.

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing identifier string.
            pub fn from_str(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(
    /// Backend-assigned hash of an uploaded image. Recipes are keyed by it.
    ImageHash
);

id_newtype!(
    /// Client-side id of one capture/upload cycle, used to correlate log lines.
    CaptureId
);

impl CaptureId {
    /// Fresh, time-ordered capture id.
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}
