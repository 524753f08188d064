//! Routes radio frames from sensor nodes to local virtual sensors.
//!
//! Each receive interrupt runs one bounded drain cycle: ready channels are
//! read round-robin, every frame is reclaimed and decoded, and every field
//! becomes a synchronous sensor read. Bad input from the air never stops the
//! router; it is logged and counted at the smallest unit it affects (field,
//! frame, or cycle).

pub mod config;
pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod router;
pub mod scheduler;
pub mod stats;

pub use config::{NodeRole, RouterConfig};
pub use dispatch::Dispatcher;
pub use error::{DispatchError, FieldError, Result, RouterError};
pub use outcome::{DispatchOutcome, FieldOutcome};
pub use router::{start_router, Router, RouterBuilder};
pub use scheduler::{DrainReport, DrainScheduler, DrainState, FrameReport, MAX_DRAIN_STEPS};
pub use stats::{RouterStats, StatsSnapshot};
