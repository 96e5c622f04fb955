mod operations;
mod qos;

pub use qos::SetQosRequest;
