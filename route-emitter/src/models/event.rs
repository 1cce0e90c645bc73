//! Typed create/change/remove events from the state-store subscription.

use crate::models::actual::ActualLrpGroup;
use crate::models::desired::DesiredSchedulingInfo;

/// One incremental update from the event subscription. Events carry full
/// record snapshots, never references into store-internal state.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    DesiredCreated(DesiredSchedulingInfo),
    DesiredChanged {
        before: DesiredSchedulingInfo,
        after: DesiredSchedulingInfo,
    },
    DesiredRemoved(DesiredSchedulingInfo),
    ActualCreated(ActualLrpGroup),
    ActualChanged {
        before: ActualLrpGroup,
        after: ActualLrpGroup,
    },
    ActualRemoved(ActualLrpGroup),
    /// An event type this emitter does not understand; logged and dropped.
    Unrecognized { event_type: String },
}

impl Event {
    pub fn event_type(&self) -> &str {
        match self {
            Event::DesiredCreated(_) => "desired.created",
            Event::DesiredChanged { .. } => "desired.changed",
            Event::DesiredRemoved(_) => "desired.removed",
            Event::ActualCreated(_) => "actual.created",
            Event::ActualChanged { .. } => "actual.changed",
            Event::ActualRemoved(_) => "actual.removed",
            Event::Unrecognized { event_type } => event_type,
        }
    }
}
