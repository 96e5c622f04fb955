pub mod volume;

pub use volume::*;

use serde::{Deserialize, Serialize};

/// Implements a string backed uuid identifier type.
macro_rules! impl_string_uuid {
    ($Name:ident, $Doc:literal) => {
        #[doc = $Doc]
        #[derive(Debug, Clone, Eq, PartialEq, Hash)]
        pub struct $Name(uuid::Uuid, String);

        impl serde::Serialize for $Name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let uuid = uuid::Uuid::deserialize(deserializer)?;
                Ok($Name(uuid, uuid.to_string()))
            }
        }

        impl Default for $Name {
            /// Generates new blank identifier.
            fn default() -> Self {
                let uuid = uuid::Uuid::default();
                $Name(uuid, uuid.to_string())
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl $Name {
            /// Generates new random identifier.
            pub fn new() -> Self {
                let uuid = uuid::Uuid::new_v4();
                $Name(uuid, uuid.to_string())
            }
            /// Get the string form of the identifier.
            pub fn as_str(&self) -> &str {
                self.1.as_str()
            }
            /// Get a reference to the inner `uuid::Uuid`.
            pub fn uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl From<&$Name> for $Name {
            fn from(id: &$Name) -> $Name {
                id.clone()
            }
        }
        impl From<&uuid::Uuid> for $Name {
            fn from(uuid: &uuid::Uuid) -> $Name {
                $Name(*uuid, uuid.to_string())
            }
        }
        impl From<uuid::Uuid> for $Name {
            fn from(uuid: uuid::Uuid) -> $Name {
                $Name::from(&uuid)
            }
        }
        impl From<$Name> for String {
            fn from(id: $Name) -> String {
                id.to_string()
            }
        }
        impl TryFrom<&str> for $Name {
            type Error = uuid::Error;
            fn try_from(value: &str) -> Result<Self, Self::Error> {
                let uuid = value.parse::<uuid::Uuid>()?;
                Ok($Name::from(uuid))
            }
        }
    };
}

impl_string_uuid!(VolumeId, "UUID of a volume");

/// Terminal status of an operation, delivered to the caller exactly once.
/// A non-negative `status` means the operation succeeded; negative values
/// are one of the `status` module constants.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct CompletionResult {
    status: i32,
    message: Option<String>,
}

impl CompletionResult {
    /// A successful terminal result.
    pub fn ok() -> Self {
        Self {
            status: 0,
            message: None,
        }
    }
    /// A failed terminal result with the given negative status code.
    pub fn error(status: i32, message: impl Into<String>) -> Self {
        debug_assert!(status < 0, "error results must carry a negative status");
        Self {
            status,
            message: Some(message.into()),
        }
    }
    /// The signed status code.
    pub fn status(&self) -> i32 {
        self.status
    }
    /// The diagnostic message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.status >= 0
    }
}

/// Negative status codes carried by a failed `CompletionResult`.
/// The values follow the errno convention used by the storage backends.
pub mod status {
    /// A parameter failed validation before the operation was started.
    pub const INVALID_ARGUMENT: i32 = -22;
    /// The volume is not known to the control plane.
    pub const NOT_FOUND: i32 = -2;
    /// The ownership lock for the volume could not be acquired.
    pub const NOT_OWNER: i32 = -16;
    /// The metadata store rejected or failed the write.
    pub const MUTATION_FAILED: i32 = -5;
    /// The watcher notification errored; the metadata write itself
    /// had already committed.
    pub const NOTIFICATION_FAILED: i32 = -32;
    /// A remote call exceeded its bounded wait.
    pub const TIMED_OUT: i32 = -110;
}

/// Lifecycle of a chained operation. `Finished` is terminal and is reached
/// exactly once; no stage may execute past it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OperationState {
    /// Constructed, `start` not yet called.
    Created,
    /// The metadata mutation has been issued.
    AwaitingMutation,
    /// The watcher notification has been issued.
    AwaitingNotification,
    /// The terminal result has been delivered.
    Finished,
}
