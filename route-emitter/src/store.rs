//! Upstream state-store boundary.
//!
//! The emitter consumes three calls: an event subscription and the two bulk
//! snapshot fetches used during sync. Concrete clients (RPC-backed, or the
//! file-backed store in `utils/statestore-static-file`) implement these
//! traits; the core never talks to the store any other way.

use crate::models::{ActualLrpGroup, DesiredSchedulingInfo, Event};
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StateStoreError {
    /// The store could not be reached or answered with a transport-level
    /// failure. Transient; the next sync tick retries.
    Unavailable(String),
    /// The store answered with a record this client cannot interpret.
    InvalidRecord(String),
    /// The event subscription was closed by the server side.
    SubscriptionClosed,
}

impl Display for StateStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StateStoreError::Unavailable(message) => {
                write!(f, "state store unavailable: {message}")
            }
            StateStoreError::InvalidRecord(message) => {
                write!(f, "state store returned an invalid record: {message}")
            }
            StateStoreError::SubscriptionClosed => {
                write!(f, "event subscription closed by the state store")
            }
        }
    }
}

impl Error for StateStoreError {}

/// A live event subscription. `next_event` suspends until an event arrives
/// or the stream fails; after an error the source is dead and the caller
/// re-subscribes.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Result<Event, StateStoreError>;
}

/// Client for the authoritative state store.
#[async_trait]
pub trait StateStoreClient: Send + Sync {
    async fn subscribe_events(&self) -> Result<Box<dyn EventSource>, StateStoreError>;

    async fn fetch_desired_scheduling_infos(
        &self,
    ) -> Result<Vec<DesiredSchedulingInfo>, StateStoreError>;

    async fn fetch_actual_lrp_groups(&self) -> Result<Vec<ActualLrpGroup>, StateStoreError>;
}
