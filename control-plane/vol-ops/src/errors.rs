use snafu::Snafu;
use vol_port::types::v0::{
    store::definitions::{NotifyError, StoreError},
    transport::{status, CompletionResult},
};

/// Common error type for the volume operations service.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
#[allow(missing_docs)]
pub enum SvcError {
    #[snafu(display("Invalid arguments: {}", message))]
    InvalidArguments { message: String },
    #[snafu(display("Volume '{}' not found", vol_id))]
    VolumeNotFound { vol_id: String },
    #[snafu(display("Volume '{}' is being deleted..", vol_id))]
    PendingDeletion { vol_id: String },
    #[snafu(display(
        "Cannot take the ownership lock for volume '{}': {}",
        vol_id,
        reason
    ))]
    NotOwner { vol_id: String, reason: String },
    #[snafu(display("Failed to persist the metadata mutation. Error {}", source))]
    Store { source: StoreError },
    #[snafu(display("Failed to notify the volume watchers. Error {}", source))]
    WatchNotify { source: NotifyError },
}

impl From<StoreError> for SvcError {
    fn from(source: StoreError) -> Self {
        Self::Store { source }
    }
}
impl From<NotifyError> for SvcError {
    fn from(source: NotifyError) -> Self {
        Self::WatchNotify { source }
    }
}

impl SvcError {
    /// The negative status code a front end derives its exit status from.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::InvalidArguments { .. } => status::INVALID_ARGUMENT,
            Self::VolumeNotFound { .. } => status::NOT_FOUND,
            Self::PendingDeletion { .. } => status::NOT_FOUND,
            Self::NotOwner { .. } => status::NOT_OWNER,
            Self::Store {
                source: StoreError::Timeout { .. },
            } => status::TIMED_OUT,
            Self::Store { .. } => status::MUTATION_FAILED,
            Self::WatchNotify {
                source: NotifyError::Timeout { .. },
            } => status::TIMED_OUT,
            Self::WatchNotify { .. } => status::NOTIFICATION_FAILED,
        }
    }

    /// The terminal result carrying this error.
    pub fn completion(&self) -> CompletionResult {
        CompletionResult::error(self.status_code(), self.to_string())
    }
}

/// Fold an operation outcome into the terminal result delivered to the
/// final callback.
pub fn completion_result(result: &Result<(), SvcError>) -> CompletionResult {
    match result {
        Ok(()) => CompletionResult::ok(),
        Err(error) => error.completion(),
    }
}
