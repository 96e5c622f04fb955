use crate::{controller::registry::Registry, errors::SvcError};

/// Resource QoS Operations.
#[async_trait::async_trait]
pub trait ResourceQos {
    type SetQos: Sync + Send;

    /// Set a QoS limit on the resource: persist the metadata mutation and
    /// make it visible to all watchers.
    async fn set_qos(
        &mut self,
        registry: &Registry,
        request: &Self::SetQos,
    ) -> Result<(), SvcError>;
}
