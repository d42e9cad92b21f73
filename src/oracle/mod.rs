//! Interfaces to the external collaborators the search engine consults:
//! the template-relevance model, the buyables pricer, the chemical
//! historian, the molecular toolkit, and the template library metadata.
//! The template-application primitive itself lives with the worker pool
//! that executes it.

mod formula;
mod historian;
mod library;
mod pricer;
mod relevance;

pub use formula::*;
pub use historian::*;
pub use library::*;
pub use pricer::*;
pub use relevance::*;

use std::sync::Arc;

/// everything the coordinator consults while growing the graph
#[derive(Clone)]
pub struct Oracles {
    pub relevance: Arc<dyn Relevance>,
    pub pricer: Arc<dyn Pricer>,
    pub historian: Arc<dyn Historian>,
    pub formula: Arc<dyn Formula>,
    pub library: Arc<dyn Library>,
}
