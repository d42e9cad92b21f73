pub mod graph;
pub mod oracle;
pub mod routes;
pub mod search;
pub mod workers;

/// dimensional analysis types
pub type Price = f32;
pub type Probability = f32;
pub type Plausibility = f32;

// mcts parameters

/// transient visit-count perturbation that repels concurrent rollouts
/// from the same subtree; reversed at update, leaving one real visit
pub const VIRTUAL_LOSS: usize = 1_000_000;
/// exploration constant for leaf selection from the root
pub const SELECT_EXPLORATION: f32 = 1.0;
/// exploration constant for scoring reactions under one template
pub const REACTION_EXPLORATION: f32 = 0.2;

// neutral value assigned to a freshly discovered precursor,
// stand-in for a learned value function
pub(crate) const NEUTRAL_VALUE: Price = 1.0;

// coordinator loop cadence
pub(crate) const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(10);
pub(crate) const STATUS_INTERVAL: u64 = 5;

// remote canary: a known-good (product, template) pair answered by any
// live worker fleet
pub(crate) const CANARY_SMILES: &str =
    "CCOC(=O)[C@H]1C[C@@H](C(=O)N2[C@@H](c3ccccc3)CC[C@@H]2c2ccccc2)[C@@H](c2ccccc2)N1";
pub(crate) const CANARY_TEMPLATE: usize = 109659;
pub(crate) const CANARY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// initialize terminal logging
pub fn init() {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("initialize logger");
}
