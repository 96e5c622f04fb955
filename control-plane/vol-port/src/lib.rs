/// Common types for the resources used by the volume control-plane components.
pub mod types;
