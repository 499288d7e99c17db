//! Queue access and the drain loop that turns queue contents into a batch.

pub mod drain;
pub mod provider;
pub mod servicebus;
