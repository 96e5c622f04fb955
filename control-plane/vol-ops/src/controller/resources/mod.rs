use parking_lot::Mutex;
use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};
use vol_port::types::v0::store::{
    AsOperationSequencer, OperationMode, OperationSequenceState, OperationSequencer,
};

/// The internal operations interface for all resources.
pub mod operations;
/// Generic resources map.
pub mod resource_map;

/// Trait which allows a resource to be keyed by its identifier.
pub trait ResourceUid {
    type Uid;
    fn uid(&self) -> &Self::Uid;
}

impl<T: AsOperationSequencer + std::fmt::Debug + Clone> OperationSequencer for ResourceMutex<T> {
    fn valid(&self, next: OperationSequenceState) -> bool {
        self.lock().as_mut().valid(next)
    }
    fn transition(&self, next: OperationSequenceState) -> Option<OperationSequenceState> {
        self.lock().as_mut().transition(next)
    }
    fn sequence(&self, mode: OperationMode) -> Option<OperationSequenceState> {
        self.lock().as_mut().sequence(mode)
    }
    fn complete(&self, revert: OperationSequenceState) {
        self.lock().as_mut().complete(revert);
    }
}

/// Operation Guard for a ResourceMutex<T> type.
pub type OperationGuardArc<T> = OperationGuard<ResourceMutex<T>, T>;

/// Ref-counted resource wrapped with a mutex.
/// The mutex is the fine-grained metadata lock: it is only ever held for
/// synchronous sections and must be released before awaiting a remote call.
#[derive(Debug, Clone)]
pub struct ResourceMutex<T> {
    inner: Arc<ResourceMutexInner<T>>,
}
/// Inner Resource which holds the mutex and an immutable value for peeking
/// into immutable fields such as identification fields.
#[derive(Debug)]
pub struct ResourceMutexInner<T> {
    resource: Mutex<T>,
    immutable_peek: Arc<T>,
}
impl<T: Clone> From<T> for ResourceMutex<T> {
    fn from(resource: T) -> Self {
        let immutable_peek = Arc::new(resource.clone());
        let resource = Mutex::new(resource);
        Self {
            inner: Arc::new(ResourceMutexInner {
                resource,
                immutable_peek,
            }),
        }
    }
}
impl<T> Deref for ResourceMutex<T> {
    type Target = Mutex<T>;
    fn deref(&self) -> &Self::Target {
        &self.inner.resource
    }
}
impl<T: Clone> ResourceMutex<T> {
    /// Peek the initial resource value without locking.
    /// # Note:
    /// This is only useful for immutable fields, such as the resource identifier.
    pub fn immutable_ref(&self) -> &Arc<T> {
        &self.inner.immutable_peek
    }
}

impl<T: OperationSequencer, R> Deref for OperationGuard<T, R> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T: OperationSequencer, R> DerefMut for OperationGuard<T, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<T: OperationSequencer + Sized, R> AsRef<R> for OperationGuard<T, R> {
    fn as_ref(&self) -> &R {
        self.peek()
    }
}

/// Guard over the ownership lock of a resource: holding it is the proof
/// that the caller may initiate a mutating operation.
/// It unlocks the sequence lock on drop.
#[derive(Debug)]
pub struct OperationGuard<T: OperationSequencer, R> {
    inner: T,
    inner_value: R,
    locked: Option<OperationSequenceState>,
}
impl<T: OperationSequencer + Sized, R> OperationGuard<T, R> {
    fn unlock(&mut self) {
        if let Some(revert) = self.locked.take() {
            self.inner.complete(revert);
        }
    }
    /// Peek at the resource without locking.
    /// Note, this value may be outdated *During* an operation, and so must not be used to
    /// inspect fields which are being mutated.
    /// To inspect fields being mutated, please use the locked resource itself.
    pub fn peek(&self) -> &R {
        &self.inner_value
    }
    /// Create operation Guard for the resource with the operation mode.
    /// Acquisition never waits: contention is reported to the caller, which
    /// must fail fast rather than block.
    pub fn try_sequence(resource: &T, value: fn(&T) -> R, mode: OperationMode) -> Result<Self, String> {
        // use result variable to make sure the mutex's temporary guard is dropped
        match resource.sequence(mode) {
            Some(revert) => Ok(Self {
                inner: resource.clone(),
                inner_value: value(resource),
                locked: Some(revert),
            }),
            None => Err(format!(
                "Cannot transition from '{:?}' to '{:?}'",
                resource,
                mode.apply()
            )),
        }
    }
}

impl<T: OperationSequencer + Sized, R> Drop for OperationGuard<T, R> {
    fn drop(&mut self) {
        self.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vol_port::types::v0::store::volume::VolumeSpec;
    use vol_port::types::v0::transport::VolumeId;

    fn guarded(
        resource: &ResourceMutex<VolumeSpec>,
    ) -> Result<OperationGuardArc<VolumeSpec>, String> {
        OperationGuard::try_sequence(
            resource,
            |resource| resource.lock().clone(),
            OperationMode::Exclusive,
        )
    }

    #[test]
    fn guard_is_exclusive_until_dropped() {
        let spec = VolumeSpec::new(VolumeId::new());
        let resource = ResourceMutex::from(spec);

        let guard = guarded(&resource).expect("first guard can be taken");
        assert!(guarded(&resource).is_err());
        drop(guard);
        // released on drop, a new operation may now be initiated
        assert!(guarded(&resource).is_ok());
    }

    #[test]
    fn guard_peek_identifies_resource() {
        let spec = VolumeSpec::new(VolumeId::new());
        let uuid = spec.uuid.clone();
        let resource = ResourceMutex::from(spec);
        let guard = guarded(&resource).unwrap();
        assert_eq!(guard.peek().uuid, uuid);
        // the lock-free peek identifies the resource even while guarded
        assert_eq!(guard.immutable_ref().uuid, uuid);
    }
}
