//! Definition of volume types that can be saved to the persistent store.

use crate::types::v0::{
    store::{
        AsOperationSequencer, OperationSequence, SpecStatus, SpecTransaction,
    },
    transport::{self, qos_metadata_key, QosLimitKey, QosLimitKind, SetVolumeQos, VolumeId},
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Volume spec status.
pub type VolumeSpecStatus = SpecStatus<transport::VolumeStatus>;

/// User specification of a volume, as held by the registry and mirrored in
/// the persistent store.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct VolumeSpec {
    /// Volume Id.
    pub uuid: VolumeId,
    /// Status of the volume spec.
    pub status: VolumeSpecStatus,
    /// Committed QoS limits, keyed by metadata entry key.
    pub qos: HashMap<String, u64>,
    /// The operation sequence resource is in.
    #[serde(skip)]
    pub sequencer: OperationSequence,
    /// Record of the operation in progress.
    pub operation: Option<VolumeOperationState>,
}

impl VolumeSpec {
    /// Return a new `Self` for the given volume, with no limits set.
    pub fn new(uuid: VolumeId) -> Self {
        Self {
            sequencer: OperationSequence::new(uuid.to_string()),
            status: VolumeSpecStatus::Created(transport::VolumeStatus::Online),
            uuid,
            ..Default::default()
        }
    }

    /// The committed limit for the given kind/key pair, if any.
    pub fn qos_limit(&self, kind: QosLimitKind, key: QosLimitKey) -> Option<u64> {
        self.qos.get(&qos_metadata_key(kind, key)).copied()
    }

    /// Pure journal projection of the pending operation: what an external
    /// journal subsystem serializes to redo this mutation.
    pub fn journal_event(&self, op_tid: u64) -> Option<JournalEvent> {
        self.operation.as_ref().map(|state| JournalEvent {
            op_tid,
            operation: state.operation.clone(),
        })
    }
}

impl AsOperationSequencer for VolumeSpec {
    fn as_ref(&self) -> &OperationSequence {
        &self.sequencer
    }
    fn as_mut(&mut self) -> &mut OperationSequence {
        &mut self.sequencer
    }
}

/// Operation State for a VolumeSpec resource.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VolumeOperationState {
    /// Record of the operation.
    pub operation: VolumeOperation,
    /// Result of the operation.
    pub result: Option<bool>,
}

/// Available volume operations.
/// A closed set of kinds: each variant carries its own parameters and
/// knows how to apply itself to the spec on commit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum VolumeOperation {
    SetQos {
        kind: QosLimitKind,
        key: QosLimitKey,
        limit: u64,
    },
}

impl From<&SetVolumeQos> for VolumeOperation {
    fn from(request: &SetVolumeQos) -> Self {
        Self::SetQos {
            kind: request.kind,
            key: request.key,
            limit: request.limit,
        }
    }
}

impl SpecTransaction<VolumeOperation> for VolumeSpec {
    fn pending_op(&self) -> bool {
        self.operation.is_some()
    }

    fn commit_op(&mut self) {
        if let Some(op) = self.operation.clone() {
            match op.operation {
                VolumeOperation::SetQos { kind, key, limit } => {
                    self.qos.insert(qos_metadata_key(kind, key), limit);
                }
            }
        }
        self.clear_op();
    }

    fn clear_op(&mut self) {
        self.operation = None;
    }

    fn start_op(&mut self, operation: VolumeOperation) {
        self.operation = Some(VolumeOperationState {
            operation,
            result: None,
        })
    }

    fn set_op_result(&mut self, result: bool) {
        if let Some(op) = &mut self.operation {
            op.result = Some(result);
        }
    }
}

/// Data-only description of a pending operation, serialized by an external
/// journal/replication layer to represent "redo this mutation". It performs
/// no I/O and is never consumed by the operation framework itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JournalEvent {
    /// Transaction id assigned by the journal.
    pub op_tid: u64,
    /// The operation to redo, kind and parameters included.
    pub operation: VolumeOperation,
}
