use super::chemical::Chemical;
use super::reaction::Reaction;
use crate::Plausibility;
use crate::Price;
use crate::Probability;
use std::collections::HashMap;

/// The AND/OR graph. Chemicals are keyed by canonical SMILES; reactions
/// live in an arena indexed by `(product, sorted reactants)` so that
/// identical proposals from different templates collapse onto one node
/// regardless of arrival order. All mutation happens on the coordinator
/// task; lookups of keys the coordinator itself produced are infallible
/// and treated as such.
#[derive(Debug, Default)]
pub struct Graph {
    chemicals: HashMap<String, Chemical>,
    reactions: Vec<Reaction>,
    index: HashMap<(String, String), usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, smiles: &str) -> bool {
        self.chemicals.contains_key(smiles)
    }
    pub fn insert(&mut self, chemical: Chemical) {
        let smiles = chemical.smiles().to_string();
        assert!(
            self.chemicals.insert(smiles, chemical).is_none(),
            "duplicate chemical node"
        );
    }

    pub fn chemical(&self, smiles: &str) -> &Chemical {
        self.chemicals.get(smiles).expect("chemical in graph")
    }
    pub fn chemical_mut(&mut self, smiles: &str) -> &mut Chemical {
        self.chemicals.get_mut(smiles).expect("chemical in graph")
    }
    pub fn reaction(&self, id: usize) -> &Reaction {
        self.reactions.get(id).expect("reaction in arena")
    }
    pub fn reaction_mut(&mut self, id: usize) -> &mut Reaction {
        self.reactions.get_mut(id).expect("reaction in arena")
    }

    pub fn chemicals(&self) -> usize {
        self.chemicals.len()
    }
    pub fn reactions(&self) -> usize {
        self.reactions.len()
    }

    /// insert a proposed reaction, or merge it with the existing node
    /// carrying the same product and sorted reactant set. Returns the
    /// arena id either way.
    pub fn upsert(
        &mut self,
        product: &str,
        template: usize,
        prob: Probability,
        plausibility: Plausibility,
        reactants: Vec<String>,
        estimate_price: Price,
    ) -> usize {
        let key = Reaction::key_of(&reactants);
        let twin = self.index.get(&(product.to_string(), key.clone())).copied();
        match twin {
            Some(id) => {
                self.reactions
                    .get_mut(id)
                    .expect("indexed reaction in arena")
                    .merge(template, prob);
                id
            }
            None => {
                let id = self.reactions.len();
                self.reactions.push(Reaction::new(
                    product,
                    template,
                    prob,
                    plausibility,
                    reactants,
                    estimate_price,
                ));
                self.index.insert((product.to_string(), key), id);
                id
            }
        }
    }

    /// refresh a chemical's optimistic estimate: the cheapest of its
    /// known reactions, or the seeded value while none exist
    pub fn settle_estimate(&mut self, smiles: &str) {
        let cheapest = self
            .chemical(smiles)
            .reaction_ids()
            .map(|id| self.reaction(id).estimate_price())
            .fold(None, |best: Option<Price>, estimate| {
                Some(best.map_or(estimate, |best| best.min(estimate)))
            });
        if let Some(estimate) = cheapest {
            self.chemical_mut(smiles).settle_estimate(estimate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_reactant_sets_merge_into_one_node() {
        let mut graph = Graph::new();
        let a = graph.upsert("P", 1, 0.3, 0.9, vec!["X".into(), "Y".into()], 2.0);
        let b = graph.upsert("P", 2, 0.1, 0.5, vec!["Y".into(), "X".into()], 9.0);
        assert!(a == b);
        assert!(graph.reactions() == 1);
        let reaction = graph.reaction(a);
        assert!(reaction.templates() == &[1, 2]);
        assert!(reaction.template_score() == 0.3);
        // the merged node keeps its original plausibility and estimate
        assert!(reaction.plausibility() == 0.9);
        assert!(reaction.estimate_price() == 2.0);
    }

    #[test]
    fn merge_is_commutative() {
        let mut forward = Graph::new();
        forward.upsert("P", 1, 0.3, 0.9, vec!["X".into(), "Y".into()], 2.0);
        forward.upsert("P", 2, 0.1, 0.5, vec!["X".into(), "Y".into()], 2.0);
        let mut reverse = Graph::new();
        reverse.upsert("P", 2, 0.1, 0.5, vec!["X".into(), "Y".into()], 2.0);
        reverse.upsert("P", 1, 0.3, 0.9, vec!["X".into(), "Y".into()], 2.0);
        let f = forward.reaction(0);
        let r = reverse.reaction(0);
        let mut ft = f.templates().to_vec();
        let mut rt = r.templates().to_vec();
        ft.sort_unstable();
        rt.sort_unstable();
        assert!(ft == rt);
        assert!(f.template_score() == r.template_score());
        assert!(forward.reactions() == reverse.reactions());
    }

    #[test]
    fn distinct_reactant_sets_stay_distinct() {
        let mut graph = Graph::new();
        let a = graph.upsert("P", 1, 0.3, 0.9, vec!["X".into()], 1.0);
        let b = graph.upsert("P", 1, 0.3, 0.9, vec!["Z".into()], 1.0);
        assert!(a != b);
        assert!(graph.reactions() == 2);
    }

    #[test]
    #[should_panic(expected = "duplicate chemical")]
    fn duplicate_chemicals_are_a_bug() {
        let mut graph = Graph::new();
        graph.insert(Chemical::new("CCO"));
        graph.insert(Chemical::new("CCO"));
    }

    #[test]
    fn estimates_settle_to_the_cheapest_reaction() {
        let mut graph = Graph::new();
        let mut chemical = Chemical::new("P");
        chemical.relevance(vec![0.5, 0.4], vec![1, 2], 1.0);
        chemical.open(1);
        chemical.open(2);
        graph.insert(chemical);
        let a = graph.upsert("P", 1, 0.5, 0.9, vec!["X".into()], 4.0);
        let b = graph.upsert("P", 2, 0.4, 0.9, vec!["Y".into()], 3.0);
        graph
            .chemical_mut("P")
            .application_mut(1)
            .unwrap()
            .link("X".into(), a);
        graph
            .chemical_mut("P")
            .application_mut(2)
            .unwrap()
            .link("Y".into(), b);
        graph.settle_estimate("P");
        assert!(graph.chemical("P").estimate_price() == 3.0);
    }
}
