//! Contracts consumed from the external collaborators: the replicated
//! metadata store and the watcher notifier. How a write is committed and
//! replicated, and how a notification travels, belong to the backends.

use crate::types::v0::transport::VolumeId;

use async_trait::async_trait;
use dyn_clonable::clonable;
use std::collections::HashMap;

/// All errors that can be returned from the metadata store.
#[derive(Debug, snafu::Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
pub enum StoreError {
    /// Failed to 'put' metadata entries on a volume.
    #[snafu(display(
        "Failed to 'put' metadata {:?} for volume {}. Error {}",
        values,
        volume,
        error
    ))]
    Put {
        volume: String,
        values: HashMap<String, String>,
        error: String,
    },
    /// Failed to 'get' a metadata entry from a volume.
    #[snafu(display(
        "Failed to 'get' metadata entry with key {} for volume {}. Error {}",
        key,
        volume,
        error
    ))]
    Get {
        volume: String,
        key: String,
        error: String,
    },
    /// Failed to find an entry with the given key.
    #[snafu(display("Metadata entry with key {} not found.", key))]
    MissingEntry { key: String },
    /// The store operation did not complete within its bounded wait.
    #[snafu(display("Store operation '{}' timed out after {:?}.", operation, timeout))]
    Timeout {
        operation: String,
        timeout: std::time::Duration,
    },
    /// The store is not reachable.
    #[snafu(display("The metadata store is not online."))]
    NotOnline {},
}

/// Keyed access to the replicated metadata attached to a volume.
/// A single `put_metadata` call commits all its entries atomically.
#[async_trait]
#[clonable]
pub trait Store: Clone + Send + Sync {
    /// Atomically set all `values` entries on the volume's metadata object.
    async fn put_metadata(
        &self,
        volume: &VolumeId,
        values: HashMap<String, String>,
    ) -> Result<(), StoreError>;
    /// Get a single metadata entry from the volume's metadata object.
    async fn get_metadata(&self, volume: &VolumeId, key: &str) -> Result<String, StoreError>;
}

/// All errors that can be returned from the watcher notifier.
/// Keeps the default selector suffix so its `Timeout` does not collide
/// with the store's.
#[derive(Debug, snafu::Snafu)]
#[snafu(visibility(pub))]
pub enum NotifyError {
    /// The notification could not be delivered.
    #[snafu(display("Failed to notify the watchers of volume {}. Error {}", volume, error))]
    NotifyFailed { volume: String, error: String },
    /// The notification round did not complete within its bounded wait.
    #[snafu(display(
        "Notification for volume {} timed out after {:?}.",
        volume,
        timeout
    ))]
    Timeout {
        volume: String,
        timeout: std::time::Duration,
    },
}

/// Broadcasts an "object changed" signal to all parties watching a volume.
/// Completion of the broadcast is itself asynchronous; a failure here says
/// nothing about whether the preceding metadata write committed.
#[async_trait]
#[clonable]
pub trait WatcherNotifier: Clone + Send + Sync {
    /// Notify all watchers of the volume that its metadata has changed.
    async fn notify_changed(&self, volume: &VolumeId) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn store_and_notify_timeouts_coexist() {
        // both collaborators report bounded-wait expiry with their own error
        let store = StoreError::Timeout {
            operation: "Put".to_string(),
            timeout: Duration::from_secs(30),
        };
        let notify = NotifyError::Timeout {
            volume: VolumeId::new().to_string(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(
            store.to_string(),
            "Store operation 'Put' timed out after 30s."
        );
        assert!(notify.to_string().contains("timed out after 10s"));
    }
}
