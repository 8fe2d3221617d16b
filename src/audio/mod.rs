pub mod adapter;
pub mod controller;
pub mod engine;
#[cfg(feature = "native-audio")]
pub mod native;
pub mod queue;
pub mod transport;
