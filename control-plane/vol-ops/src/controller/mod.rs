/// Completion dispatch for chained remote calls.
pub mod dispatcher;
/// Registry of volume specs and the remote collaborators.
pub mod registry;
/// Resource wrappers and operation guards.
pub mod resources;
