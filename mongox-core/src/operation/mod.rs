//! Operation stages and the context callbacks receive.

mod context;
mod types;

pub use context::{MongoOptions, OpContext, OpResult, Payload};
pub(crate) use context::CallState;
pub use types::OperationType;
