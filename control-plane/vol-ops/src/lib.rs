/// Controller for the volume resources: registry, operation guards and
/// completion dispatch.
pub mod controller;
/// Common service errors.
pub mod errors;
/// Volume operations.
pub mod volume;
