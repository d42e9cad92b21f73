//! Template-application worker pool. Two interchangeable backends
//! behind one interface:
//!
//! - [`Local`] — a fixed fleet of in-process tasks, each owning its own
//!   lazily-built template engine, fed over per-worker request lanes
//!   and answering on one shared result channel
//! - [`Remote`] — a thin client over an external task queue, tracking
//!   in-flight handles and polling them for readiness

mod backend;
mod local;
mod remote;
mod task;

pub use backend::*;
pub use local::*;
pub use remote::*;
pub use task::*;
