//! In-process RMA fabric used by tests, demos and single-process runs.

mod accumulate;
mod loopback;

pub use loopback::{FabricEvent, LoopbackFabric, LoopbackRegion};
