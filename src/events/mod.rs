//! # Events Module
//!
//! Progress reporting from the pipeline to its host over a channel.
//!
//! Events are advisory: the pipeline's contract is its return value, and a
//! host that never subscribes loses nothing. All events are serializable so
//! GUI layers can forward them as-is.

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::{
    BatchPhase, BatchSummary, DedupEvent, Event, GeocodeEvent, PhotoEvent, PipelineEvent,
};
