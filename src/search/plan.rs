use crate::routes::ChemNode;
use std::time::Duration;

/// summary of one finished search: graph size, when the first buyable
/// pathway appeared (if ever), and the routes themselves in the
/// configured order
#[derive(Debug, Clone)]
pub struct Plan {
    pub chemicals: usize,
    pub reactions: usize,
    pub first_path: Option<Duration>,
    pub routes: Vec<ChemNode>,
}
