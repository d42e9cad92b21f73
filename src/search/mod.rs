mod config;
mod coordinator;
mod criteria;
mod harvest;
mod pathway;
mod plan;

pub use config::*;
pub use coordinator::*;
pub use criteria::*;
pub use pathway::*;
pub use plan::*;
