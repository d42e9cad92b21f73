use super::config::AtomCaps;
use super::config::Config;
use super::config::HistoryCuts;
use super::config::Logic;
use crate::oracle::History;
use crate::Price;
use std::collections::BTreeMap;

/// Stop criterion for the expansion: which chemicals count as viable
/// starting materials. Three orthogonal tests (buyable, popular in the
/// corpus, structurally small) combined per the configured logic.
#[derive(Debug, Clone)]
pub struct Criteria {
    max_ppg: Price,
    natoms: AtomCaps,
    history: HistoryCuts,
}

impl From<&Config> for Criteria {
    fn from(config: &Config) -> Self {
        Self {
            max_ppg: config.max_ppg,
            natoms: config.max_natoms.clone(),
            history: config.min_history.clone(),
        }
    }
}

impl Criteria {
    pub fn terminal(
        &self,
        ppg: Option<Price>,
        history: &History,
        atoms: Option<&BTreeMap<String, usize>>,
    ) -> bool {
        let buyable = self.buyable(ppg);
        match (self.history.logic, self.natoms.logic) {
            (Logic::None, Logic::None) => buyable,
            (Logic::None, Logic::Or) => buyable || self.small(atoms),
            (Logic::None, Logic::And) => buyable && self.small(atoms),
            (_, Logic::None) => buyable || self.popular(history),
            (_, Logic::Or) => buyable || self.popular(history) || self.small(atoms),
            (_, Logic::And) => self.popular(history) || (buyable && self.small(atoms)),
        }
    }

    fn buyable(&self, ppg: Option<Price>) -> bool {
        ppg.is_some_and(|ppg| ppg <= self.max_ppg)
    }

    fn small(&self, atoms: Option<&BTreeMap<String, usize>>) -> bool {
        atoms.is_some_and(|counts| {
            counts
                .iter()
                .all(|(element, count)| self.natoms.caps.get(element).is_none_or(|cap| count <= cap))
        })
    }

    fn popular(&self, history: &History) -> bool {
        history.as_reactant >= self.history.as_reactant
            || history.as_product >= self.history.as_product
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(history: Logic, natoms: Logic) -> Criteria {
        let mut config = Config::default();
        config.max_ppg = 100.0;
        config.min_history = HistoryCuts {
            as_reactant: 5,
            as_product: 5,
            logic: history,
        };
        config.max_natoms = AtomCaps {
            caps: [("C".to_string(), 2)].into(),
            logic: natoms,
        };
        Criteria::from(&config)
    }

    fn atoms(carbons: usize) -> BTreeMap<String, usize> {
        [("C".to_string(), carbons), ("H".to_string(), 6)].into()
    }

    #[test]
    fn buyable_alone() {
        let criteria = criteria(Logic::None, Logic::None);
        assert!(criteria.terminal(Some(10.0), &History::default(), None));
        assert!(!criteria.terminal(Some(500.0), &History::default(), None));
        assert!(!criteria.terminal(None, &History::default(), None));
        // popularity and size are ignored on this row
        let popular = History { as_reactant: 9, as_product: 0 };
        assert!(!criteria.terminal(None, &popular, Some(&atoms(1))));
    }

    #[test]
    fn buyable_or_small() {
        let criteria = criteria(Logic::None, Logic::Or);
        assert!(criteria.terminal(None, &History::default(), Some(&atoms(2))));
        assert!(!criteria.terminal(None, &History::default(), Some(&atoms(3))));
        assert!(criteria.terminal(Some(10.0), &History::default(), Some(&atoms(3))));
    }

    #[test]
    fn buyable_and_small() {
        let criteria = criteria(Logic::None, Logic::And);
        assert!(!criteria.terminal(Some(10.0), &History::default(), Some(&atoms(3))));
        assert!(!criteria.terminal(None, &History::default(), Some(&atoms(2))));
        assert!(criteria.terminal(Some(10.0), &History::default(), Some(&atoms(2))));
    }

    #[test]
    fn buyable_or_popular() {
        let criteria = criteria(Logic::Or, Logic::None);
        let popular = History { as_reactant: 0, as_product: 7 };
        assert!(criteria.terminal(None, &popular, None));
        assert!(criteria.terminal(Some(10.0), &History::default(), None));
        assert!(!criteria.terminal(None, &History::default(), None));
    }

    #[test]
    fn buyable_or_popular_or_small() {
        let criteria = criteria(Logic::Or, Logic::Or);
        assert!(criteria.terminal(None, &History::default(), Some(&atoms(1))));
        let popular = History { as_reactant: 5, as_product: 0 };
        assert!(criteria.terminal(None, &popular, None));
        assert!(!criteria.terminal(None, &History::default(), Some(&atoms(9))));
    }

    #[test]
    fn popular_or_buyable_and_small() {
        let criteria = criteria(Logic::Or, Logic::And);
        let popular = History { as_reactant: 5, as_product: 0 };
        assert!(criteria.terminal(None, &popular, Some(&atoms(9))));
        assert!(criteria.terminal(Some(10.0), &History::default(), Some(&atoms(2))));
        assert!(!criteria.terminal(Some(10.0), &History::default(), Some(&atoms(3))));
    }

    #[test]
    fn unknown_formulas_are_never_small() {
        let criteria = criteria(Logic::None, Logic::Or);
        assert!(!criteria.terminal(None, &History::default(), None));
    }

    #[test]
    fn uncapped_elements_pass() {
        let criteria = criteria(Logic::None, Logic::Or);
        // hydrogen has no cap configured
        assert!(criteria.terminal(None, &History::default(), Some(&atoms(0))));
    }
}
