pub mod engine;
pub mod fetch_coordinator;
pub mod gap_planner;

pub use engine::{SyncEngine, SyncSummary};
pub use fetch_coordinator::{FetchCoordinator, FetchFailure, FetchReport, FetchRequest};
