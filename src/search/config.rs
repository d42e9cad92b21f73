use crate::workers::Settings;
use crate::Plausibility;
use crate::Price;
use crate::Probability;
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::time::Duration;

/// combination operator for one axis of the stop criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    None,
    Or,
    And,
}

/// per-element atom-count caps; elements absent from the table are
/// uncapped
#[derive(Debug, Clone, Default)]
pub struct AtomCaps {
    pub caps: BTreeMap<String, usize>,
    pub logic: Logic,
}

/// corpus-usage thresholds from the chemical historian
#[derive(Debug, Clone)]
pub struct HistoryCuts {
    pub as_reactant: usize,
    pub as_product: usize,
    pub logic: Logic,
}

impl Default for HistoryCuts {
    fn default() -> Self {
        Self {
            as_reactant: usize::MAX,
            as_product: usize::MAX,
            logic: Logic::None,
        }
    }
}

/// final ordering of emitted routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sort {
    #[default]
    Plausibility,
    StartingMaterials,
    Reactions,
}

/// One search's worth of knobs. Defaults mirror a production expansion:
/// ten reactions deep, twenty-five branches wide, thirty seconds.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_depth: usize,
    pub max_branching: usize,
    pub expansion_time: Duration,
    pub workers: usize,
    /// parallel rollout slots; zero means one per worker
    pub active_pathways: usize,
    pub max_trees: usize,
    pub max_ppg: Price,
    pub template_count: usize,
    pub max_cum_template_prob: Probability,
    pub apply_fast_filter: bool,
    pub filter_threshold: Plausibility,
    pub max_natoms: AtomCaps,
    pub min_history: HistoryCuts,
    /// reaction SMILES (`sorted_reactants>>product`) never to admit
    pub known_bad_reactions: HashSet<String>,
    pub forbidden_molecules: HashSet<String>,
    pub return_first: bool,
    pub soft_reset: bool,
    pub soft_stop: bool,
    pub sort_routes: Sort,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_branching: 25,
            expansion_time: Duration::from_secs(30),
            workers: num_cpus::get(),
            active_pathways: 0,
            max_trees: 5000,
            max_ppg: 1e10,
            template_count: 100,
            max_cum_template_prob: 0.995,
            apply_fast_filter: true,
            filter_threshold: 0.75,
            max_natoms: AtomCaps::default(),
            min_history: HistoryCuts::default(),
            known_bad_reactions: HashSet::new(),
            forbidden_molecules: HashSet::new(),
            return_first: false,
            soft_reset: false,
            soft_stop: false,
            sort_routes: Sort::default(),
        }
    }
}

impl Config {
    pub fn slots(&self) -> usize {
        match self.active_pathways {
            0 => self.workers.max(1),
            n => n,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            template_count: self.template_count,
            max_cum_prob: self.max_cum_template_prob,
            apply_fast_filter: self.apply_fast_filter,
            filter_threshold: self.filter_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_default_to_worker_count() {
        let mut config = Config::default();
        config.workers = 6;
        assert!(config.slots() == 6);
        config.active_pathways = 2;
        assert!(config.slots() == 2);
    }
}
