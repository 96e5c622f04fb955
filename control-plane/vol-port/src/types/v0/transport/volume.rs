use super::VolumeId;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};

/// Which I/O statistic a QoS limit applies to.
/// The set is closed: unrecognised kinds must be rejected by the front end
/// when parsing, before an operation is ever constructed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, EnumString, Display, Eq, PartialEq, Hash)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum QosLimitKind {
    /// Read operations per second.
    IopsRead,
    /// Write operations per second.
    IopsWrite,
    /// Read bytes per second.
    BpsRead,
    /// Write bytes per second.
    BpsWrite,
}

impl QosLimitKind {
    fn key_part(&self) -> &'static str {
        match self {
            Self::IopsRead => "iops_read",
            Self::IopsWrite => "iops_write",
            Self::BpsRead => "bps_read",
            Self::BpsWrite => "bps_write",
        }
    }
}

/// Which aspect of the statistic the limit constrains.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, EnumString, Display, Eq, PartialEq, Hash)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum QosLimitKey {
    /// Sustained average rate.
    Average,
    /// Short burst rate.
    Burst,
}

impl QosLimitKey {
    fn key_part(&self) -> &'static str {
        match self {
            Self::Average => "avg",
            Self::Burst => "burst",
        }
    }
}

/// The metadata entry key a QoS limit is stored under, eg `iops_read_avg`.
pub fn qos_metadata_key(kind: QosLimitKind, key: QosLimitKey) -> String {
    format!("{}_{}", kind.key_part(), key.key_part())
}

/// The state a volume spec can be in once created.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Display, Eq, PartialEq, Default)]
pub enum VolumeStatus {
    /// The volume is available.
    #[default]
    Online,
    /// The volume is not available.
    Unknown,
}

/// Set a QoS limit on a volume.
/// The parameters of one operation: immutable once constructed.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct SetVolumeQos {
    /// The uuid of the volume.
    pub uuid: VolumeId,
    /// The statistic being limited.
    pub kind: QosLimitKind,
    /// The aspect of the statistic being limited.
    pub key: QosLimitKey,
    /// The limit value, in ops/s or bytes/s depending on `kind`.
    pub limit: u64,
}

impl SetVolumeQos {
    /// Return a new `Self` from the given parameters.
    pub fn new(uuid: impl Into<VolumeId>, kind: QosLimitKind, key: QosLimitKey, limit: u64) -> Self {
        Self {
            uuid: uuid.into(),
            kind,
            key,
            limit,
        }
    }

    /// The metadata entry key this limit is stored under, eg `iops_read_avg`.
    pub fn metadata_key(&self) -> String {
        qos_metadata_key(self.kind, self.key)
    }

    /// The key/value entries a store mutation must apply atomically.
    pub fn store_mapping(&self) -> HashMap<String, String> {
        HashMap::from([(self.metadata_key(), self.limit.to_string())])
    }

    /// Validate the value range. Kinds and keys are already closed sets by
    /// construction; a limit of zero is not a valid rate.
    pub fn validated(self) -> Result<Self, String> {
        if self.limit == 0 {
            return Err(format!(
                "QoS limit '{}' for volume '{}' must be greater than zero",
                self.metadata_key(),
                self.uuid
            ));
        }
        Ok(self)
    }
}
