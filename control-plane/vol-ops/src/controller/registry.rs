//! Registry containing all volume specs known to this control plane
//! instance, along with the external collaborators every operation talks
//! to: the replicated metadata store and the watcher notifier.
//!
//! Remote calls issued through the registry are bounded: the store and the
//! notifier each have a configured timeout, after which the in-flight
//! operation fails with a timeout error rather than waiting forever.

use super::resources::{resource_map::ResourceMap, OperationGuardArc, ResourceMutex};
use crate::errors::SvcError;

use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc, time::Duration};
use vol_port::types::v0::{
    store::{
        definitions::{NotifyError, Store, StoreError, WatcherNotifier},
        volume::VolumeSpec,
        OperationMode,
    },
    transport::VolumeId,
};

use crate::controller::resources::{OperationGuard, ResourceUid};

impl ResourceUid for VolumeSpec {
    type Uid = VolumeId;
    fn uid(&self) -> &Self::Uid {
        &self.uuid
    }
}

/// Default bounded wait on a store mutation.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default bounded wait on a watcher notification round.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry of volume specs and remote collaborators.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

/// Generic Registry Inner holding the collaborator trait objects.
struct RegistryInner {
    /// spec (aka desired state) of the volumes.
    specs: RwLock<ResourceMap<VolumeId, VolumeSpec>>,
    /// the replicated metadata store.
    store: Box<dyn Store>,
    /// the watcher notification transport.
    notifier: Box<dyn WatcherNotifier>,
    /// store operation timeout.
    store_timeout: Duration,
    /// watcher notification timeout.
    notify_timeout: Duration,
}

impl Registry {
    /// Create a new registry over the given collaborators with the default
    /// operation timeouts.
    pub fn new(store: impl Store + 'static, notifier: impl WatcherNotifier + 'static) -> Self {
        Self::with_timeouts(store, notifier, STORE_TIMEOUT, NOTIFY_TIMEOUT)
    }

    /// Create a new registry with explicit bounded waits for the store and
    /// the notifier.
    pub fn with_timeouts(
        store: impl Store + 'static,
        notifier: impl WatcherNotifier + 'static,
        store_timeout: Duration,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                specs: RwLock::new(ResourceMap::default()),
                store: Box::new(store),
                notifier: Box::new(notifier),
                store_timeout,
                notify_timeout,
            }),
        }
    }

    /// Register a volume spec, making it eligible for operations.
    pub fn add_volume(&self, spec: VolumeSpec) -> ResourceMutex<VolumeSpec> {
        self.inner.specs.write().insert(spec)
    }

    /// Deregister a volume spec.
    pub fn remove_volume(&self, volume: &VolumeId) {
        self.inner.specs.write().remove(volume);
    }

    /// A clone of the current spec of the given volume.
    pub fn volume_spec(&self, volume: &VolumeId) -> Result<VolumeSpec, SvcError> {
        match self.inner.specs.read().get(volume) {
            Some(resource) => Ok(resource.lock().clone()),
            None => Err(SvcError::VolumeNotFound {
                vol_id: volume.to_string(),
            }),
        }
    }

    /// Take the exclusive operation guard for the given volume.
    /// This never waits: if another operation holds the sequence the caller
    /// gets `NotOwner` and must fail fast.
    pub fn volume_opguard(&self, volume: &VolumeId) -> Result<OperationGuardArc<VolumeSpec>, SvcError> {
        let resource = match self.inner.specs.read().get(volume) {
            Some(resource) => resource.clone(),
            None => {
                return Err(SvcError::VolumeNotFound {
                    vol_id: volume.to_string(),
                })
            }
        };
        OperationGuard::try_sequence(
            &resource,
            |resource| resource.lock().clone(),
            OperationMode::Exclusive,
        )
        .map_err(|reason| SvcError::NotOwner {
            vol_id: volume.to_string(),
            reason,
        })
    }

    /// Serialized write of metadata entries to the persistent store, with a
    /// bounded wait.
    pub(crate) async fn store_volume_metadata(
        &self,
        volume: &VolumeId,
        values: HashMap<String, String>,
    ) -> Result<(), SvcError> {
        match tokio::time::timeout(
            self.inner.store_timeout,
            self.inner.store.put_metadata(volume, values),
        )
        .await
        {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(StoreError::Timeout {
                operation: "Put".to_string(),
                timeout: self.inner.store_timeout,
            }
            .into()),
        }
    }

    /// Read a single metadata entry back from the persistent store, with a
    /// bounded wait.
    pub async fn volume_metadata(&self, volume: &VolumeId, key: &str) -> Result<String, SvcError> {
        match tokio::time::timeout(
            self.inner.store_timeout,
            self.inner.store.get_metadata(volume, key),
        )
        .await
        {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(StoreError::Timeout {
                operation: "Get".to_string(),
                timeout: self.inner.store_timeout,
            }
            .into()),
        }
    }

    /// Broadcast a changed notification to all watchers of the volume, with
    /// a bounded wait.
    pub(crate) async fn notify_volume_updated(&self, volume: &VolumeId) -> Result<(), SvcError> {
        match tokio::time::timeout(
            self.inner.notify_timeout,
            self.inner.notifier.notify_changed(volume),
        )
        .await
        {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(NotifyError::Timeout {
                volume: volume.to_string(),
                timeout: self.inner.notify_timeout,
            }
            .into()),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("volumes", &self.inner.specs.read().len())
            .field("store_timeout", &self.inner.store_timeout)
            .field("notify_timeout", &self.inner.notify_timeout)
            .finish()
    }
}
