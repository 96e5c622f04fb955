use crate::{
    controller::{
        dispatcher::CompletionDispatcher,
        registry::Registry,
        resources::{operations::ResourceQos, OperationGuardArc},
    },
    errors::SvcError,
};
use vol_port::types::v0::{
    store::{volume::VolumeSpec, SpecTransaction},
    transport::{OperationState, SetVolumeQos},
};

/// What to do after the metadata mutation stage completes.
enum MutationOutcome {
    /// The write committed: proceed to the notification stage.
    Notify,
    /// The write failed: short-circuit, the notification stage is skipped.
    Fail(SvcError),
}

fn on_mutation_complete(
    state: &mut OperationState,
    result: Result<(), SvcError>,
) -> MutationOutcome {
    debug_assert_eq!(*state, OperationState::AwaitingMutation);
    match result {
        Ok(()) => {
            *state = OperationState::AwaitingNotification;
            MutationOutcome::Notify
        }
        Err(error) => {
            tracing::error!(%error, "failed to persist the qos mutation");
            *state = OperationState::Finished;
            MutationOutcome::Fail(error)
        }
    }
}

fn on_notification_complete(
    state: &mut OperationState,
    result: Result<(), SvcError>,
) -> Result<(), SvcError> {
    debug_assert_eq!(*state, OperationState::AwaitingNotification);
    *state = OperationState::Finished;
    if let Err(error) = &result {
        // the metadata write already committed: this is a visibility
        // failure, not a correctness failure
        tracing::error!(%error, "failed to notify the volume watchers");
    }
    result
}

#[async_trait::async_trait]
impl ResourceQos for OperationGuardArc<VolumeSpec> {
    type SetQos = SetVolumeQos;

    /// Drive the two-stage chain: persist the limit on the volume's
    /// metadata object, then broadcast a changed notification. The caller
    /// holds the ownership guard for the whole chain.
    async fn set_qos(&mut self, registry: &Registry, request: &SetVolumeQos) -> Result<(), SvcError> {
        let dispatcher = CompletionDispatcher::default();
        let mut state = OperationState::Created;

        {
            let mut spec = self.lock();
            if spec.status.deleting() || spec.status.deleted() {
                return Err(SvcError::PendingDeletion {
                    vol_id: spec.uuid.to_string(),
                });
            }
            spec.start_op(request.into());
        } // the metadata lock is released before any suspension point

        tracing::debug!(
            volume = %self.immutable_ref().uuid,
            key = %request.metadata_key(),
            limit = request.limit,
            "setting qos limit"
        );

        debug_assert_eq!(state, OperationState::Created);
        state = OperationState::AwaitingMutation;
        let mutation = registry.store_volume_metadata(&request.uuid, request.store_mapping());
        let outcome = dispatcher
            .dispatch(mutation, |result| on_mutation_complete(&mut state, result))
            .await;

        let result = match outcome {
            MutationOutcome::Fail(error) => {
                // nothing reached the store: the pending operation must not
                // be replayed by the journal
                self.lock().clear_op();
                Err(error)
            }
            MutationOutcome::Notify => {
                self.lock().set_op_result(true);
                let notification = registry.notify_volume_updated(&request.uuid);
                let result = dispatcher
                    .dispatch(notification, |result| {
                        on_notification_complete(&mut state, result)
                    })
                    .await;
                // the mutation is committed whether or not the watchers
                // heard about it
                self.lock().commit_op();
                result
            }
        };
        debug_assert_eq!(state, OperationState::Finished);
        result
    }
}
