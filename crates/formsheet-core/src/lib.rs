//! Core plumbing shared by the formsheet crates: tracing setup and the clock.

pub mod clock;
pub mod tracing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
