//! State-store data model: desired/actual records, events, and modification tags.
//!
//! These shapes mirror what the upstream state store serves over its API. The
//! emitter never retains references into event payloads; events carry full
//! record snapshots.

pub mod actual;
pub mod desired;
pub mod event;
pub mod modification_tag;

pub use actual::{ActualLrp, ActualLrpGroup, ActualLrpRoutingInfo, ActualLrpState, PortMapping};
pub use desired::{DesiredSchedulingInfo, RoutingInfo};
pub use event::Event;
pub use modification_tag::ModificationTag;
