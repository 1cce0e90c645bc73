//! Downstream emitter boundary: publishing registry messages to the router bus.

use crate::control_plane::messages::MessagesToEmit;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Bus subject registrations are published on.
pub const ROUTER_REGISTER_SUBJECT: &str = "router.register";
/// Bus subject unregistrations are published on.
pub const ROUTER_UNREGISTER_SUBJECT: &str = "router.unregister";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EmitError {
    /// The bus rejected or dropped the publish. The batch is lost; the next
    /// emit tick re-emits full state.
    PublishFailed(String),
}

impl Display for EmitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::PublishFailed(message) => write!(f, "publish failed: {message}"),
        }
    }
}

impl Error for EmitError {}

/// Serializes register/unregister batches onto the message bus. Publishing
/// is idempotent at the router tier, so callers may re-emit full state
/// freely.
#[async_trait]
pub trait RegistryEmitter: Send + Sync {
    async fn emit(&self, messages: MessagesToEmit) -> Result<(), EmitError>;
}
