//! Test harness utilities for the dispatch and bootstrap suites.

mod harness;
mod journal;
mod reporter;
#[path = "world.rs"]
mod test_world;

pub use harness::DispatchHarness;
pub use journal::{InjectedFailure, Journal, RecordingBootstrapper};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use test_world::{TestWorld, bound_value, world};
