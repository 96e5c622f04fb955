pub mod definitions;
pub mod volume;

use serde::{Deserialize, Serialize};

/// Enum defining the various states that a resource spec can be in.
#[derive(Serialize, Deserialize, Debug, Clone, strum_macros::Display, PartialEq)]
pub enum SpecStatus<T> {
    Creating,
    Created(T),
    Deleting,
    Deleted,
}

impl<T> Default for SpecStatus<T> {
    fn default() -> Self {
        Self::Creating
    }
}

impl<T: std::cmp::PartialEq> SpecStatus<T> {
    pub fn creating(&self) -> bool {
        self == &Self::Creating
    }
    pub fn created(&self) -> bool {
        matches!(self, &Self::Created(_))
    }
    pub fn deleting(&self) -> bool {
        self == &Self::Deleting
    }
    pub fn deleted(&self) -> bool {
        self == &Self::Deleted
    }
}

/// Transaction Operations for a Spec.
/// The pending operation is a pure description of intent: an external
/// journal subsystem may serialize it to redo the mutation, but nothing in
/// this layer performs I/O with it.
pub trait SpecTransaction<Operation> {
    /// Check for a pending operation.
    fn pending_op(&self) -> bool;
    /// Commit the operation to the spec and clear it.
    fn commit_op(&mut self);
    /// Clear the operation.
    fn clear_op(&mut self);
    /// Add a new pending operation.
    fn start_op(&mut self, operation: Operation);
    /// Sets the result of the operation.
    fn set_op_result(&mut self, result: bool);
}

/// Sequence operations for a resource without locking it.
/// This is the coarse ownership lock: at most one exclusive operation may
/// be initiated on a resource at a time, and acquisition never blocks.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct OperationSequence {
    uuid: String,
    state: OperationSequenceState,
}
impl OperationSequence {
    /// Create new `Self` with a uuid for observability.
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            state: Default::default(),
        }
    }
}

/// Sequence states.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
pub enum OperationSequenceState {
    /// No operation in progress.
    Idle,
    /// A single exclusive operation is in flight.
    Exclusive,
}
impl Default for OperationSequenceState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Modes in which an operation may be sequenced.
#[derive(Debug, Copy, Clone)]
pub enum OperationMode {
    /// Start an exclusive operation.
    Exclusive,
}

impl OperationMode {
    /// Transform this operation into a sequence state to transition to.
    pub fn apply(&self) -> OperationSequenceState {
        match self {
            OperationMode::Exclusive => OperationSequenceState::Exclusive,
        }
    }
}

impl OperationSequence {
    /// Check if the transition is valid.
    pub fn valid(&self, next: OperationSequenceState) -> bool {
        match self.state {
            OperationSequenceState::Idle => {
                matches!(next, OperationSequenceState::Exclusive)
            }
            OperationSequenceState::Exclusive => {
                matches!(next, OperationSequenceState::Idle)
            }
        }
    }
    /// Try to transition from current to next state.
    pub fn transition(&mut self, next: OperationSequenceState) -> Option<OperationSequenceState> {
        if self.valid(next) {
            let previous = self.state;
            self.state = next;
            Some(previous)
        } else {
            None
        }
    }
    /// Sequence an operation using the provided `OperationMode`.
    /// It returns the state which must be used to revert this operation,
    /// or `None` if the sequence is already taken.
    pub fn sequence(&mut self, mode: OperationMode) -> Option<OperationSequenceState> {
        self.transition(mode.apply())
    }
    /// Complete the operation sequenced using the provided `OperationMode`.
    pub fn complete(&mut self, revert: OperationSequenceState) {
        if self.transition(revert).is_none() {
            debug_assert!(false, "Invalid revert from '{self:?}' to '{revert:?}'");
            self.state = OperationSequenceState::Idle;
        }
    }
}

/// Implemented by resources which embed an `OperationSequence`.
pub trait AsOperationSequencer {
    fn as_ref(&self) -> &OperationSequence;
    fn as_mut(&mut self) -> &mut OperationSequence;
}

/// The ownership lock contract: try-acquire and revert, never wait.
pub trait OperationSequencer: std::fmt::Debug + Clone {
    /// Check if the transition is valid.
    fn valid(&self, next: OperationSequenceState) -> bool;
    /// Try to transition from current to next state.
    fn transition(&self, next: OperationSequenceState) -> Option<OperationSequenceState>;
    /// Sequence an operation using the provided `OperationMode`.
    /// It returns the state which must be used to revert this operation.
    fn sequence(&self, mode: OperationMode) -> Option<OperationSequenceState>;
    /// Complete the operation sequenced using the provided `OperationMode`.
    fn complete(&self, revert: OperationSequenceState);
}
