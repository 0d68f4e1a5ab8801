pub mod collector;
pub mod counters;
pub mod probes;
pub mod snapshot;
pub mod store;

pub use collector::Collector;
pub use snapshot::{InterfaceTraffic, ResourceSnapshot};
pub use store::SnapshotStore;
