use crate::{
    controller::{
        dispatcher::{Completer, FinalCallback},
        registry::Registry,
        resources::operations::ResourceQos,
    },
    errors::{completion_result, SvcError},
};
use vol_port::types::v0::transport::SetVolumeQos;

/// A single set-qos operation on a volume.
///
/// The request is constructed with the operation parameters and the final
/// callback, then driven by `start`: take the volume's ownership guard,
/// persist the limit on the volume's metadata object, broadcast a changed
/// notification to its watchers, and deliver the terminal result to the
/// callback exactly once. The operation is never reused across mutations.
pub struct SetQosRequest {
    request: SetVolumeQos,
    completer: Completer,
}

impl SetQosRequest {
    /// Return a new `Self` from the validated parameters and the caller's
    /// final callback.
    pub fn new(request: SetVolumeQos, on_finish: FinalCallback) -> Self {
        Self {
            request,
            completer: Completer::new(on_finish),
        }
    }

    /// Start the operation.
    ///
    /// Parameter validation and lock acquisition failures are returned
    /// synchronously and the final callback is not invoked: no store or
    /// notifier call has been issued. On `Ok`, the first remote mutation
    /// has been issued asynchronously; `start` does not wait for it to
    /// reach the store. The final callback will fire exactly once with the
    /// terminal result.
    ///
    /// There is no cancellation: once started the operation runs to its
    /// terminal result, with the bounded waits configured on the registry.
    pub fn start(self, registry: &Registry) -> Result<(), SvcError> {
        let request = self
            .request
            .clone()
            .validated()
            .map_err(|message| SvcError::InvalidArguments { message })?;
        // ownership before metadata: the guard is the proof that this
        // caller may initiate a mutation, and contention fails fast
        let mut guard = registry.volume_opguard(&request.uuid)?;

        let registry = registry.clone();
        let completer = self.completer;
        tokio::spawn(async move {
            let result = guard.set_qos(&registry, &request).await;
            completer.complete(completion_result(&result));
            // the guard drops here: ownership is released only after the
            // terminal result has been delivered
        });
        Ok(())
    }
}

impl std::fmt::Debug for SetQosRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetQosRequest")
            .field("request", &self.request)
            .field("completer", &self.completer)
            .finish()
    }
}
