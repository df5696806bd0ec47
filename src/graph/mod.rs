//! Graph accumulation
//!
//! This module owns the evolving crawl graph:
//! - Primary items and the metadata stored on their nodes
//! - Idempotent node and edge upserts with implicit endpoint creation
//! - Immutable point-in-time snapshots for checkpointing

mod accumulator;
mod snapshot;
mod types;

pub use accumulator::GraphAccumulator;
pub use snapshot::Snapshot;
pub use types::{Directedness, Item, Node, NodeMetadata, NodeOrigin, UNKNOWN_TITLE};
