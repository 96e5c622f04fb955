/// Persistent store types: specs, operation transactions and the store
/// collaborator traits.
pub mod store;
/// Transport types exchanged with the front-end layer.
pub mod transport;
