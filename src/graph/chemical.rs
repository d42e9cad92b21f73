use super::application::Application;
use crate::oracle::History;
use crate::Price;
use crate::Probability;
use std::collections::BTreeMap;

/// OR-node of the retrosynthetic graph: one chemical species keyed by
/// its canonical SMILES. Attributes are refined monotonically over the
/// search; the node is never destroyed.
#[derive(Debug, Clone)]
pub struct Chemical {
    smiles: String,
    purchase_price: Option<Price>,
    as_reactant: usize,
    as_product: usize,
    prob: BTreeMap<usize, Probability>,
    top_indices: Vec<usize>,
    applications: BTreeMap<usize, Application>,
    visit_count: usize,
    price: Option<Price>,
    estimate_price: Price,
    terminal: bool,
    done: bool,
    pathway_count: usize,
    best_template: Option<usize>,
}

impl Chemical {
    pub fn new(smiles: &str) -> Self {
        Self {
            smiles: smiles.to_string(),
            purchase_price: None,
            as_reactant: 0,
            as_product: 0,
            prob: BTreeMap::new(),
            top_indices: Vec::new(),
            applications: BTreeMap::new(),
            visit_count: 0,
            price: None,
            estimate_price: crate::NEUTRAL_VALUE,
            terminal: false,
            done: false,
            pathway_count: 0,
            best_template: None,
        }
    }

    /// install the template-relevance prior: parallel (probability,
    /// template index) arrays in descending probability, plus the
    /// value estimate assigned at discovery
    pub fn relevance(&mut self, probs: Vec<Probability>, indices: Vec<usize>, value: Price) {
        self.prob = indices.iter().copied().zip(probs.iter().copied()).collect();
        self.top_indices = indices;
        self.estimate_price = value;
    }

    pub fn procure(&mut self, ppg: Option<Price>) {
        self.purchase_price = ppg;
    }

    pub fn chronicle(&mut self, history: &History) {
        self.as_reactant = history.as_reactant;
        self.as_product = history.as_product;
    }

    /// accept this chemical as a starting material: unit cost, closed
    pub fn terminate(&mut self) {
        self.terminal = true;
        self.done = true;
        self.price = Some(crate::NEUTRAL_VALUE);
        self.estimate_price = crate::NEUTRAL_VALUE;
    }

    /// start tracking a fresh template application, in the waiting state
    pub fn open(&mut self, template: usize) {
        assert!(
            self.applications
                .insert(template, Application::new(template))
                .is_none(),
            "template application opened twice"
        );
    }

    pub fn smiles(&self) -> &str {
        &self.smiles
    }
    pub fn purchase_price(&self) -> Option<Price> {
        self.purchase_price
    }
    pub fn as_reactant(&self) -> usize {
        self.as_reactant
    }
    pub fn as_product(&self) -> usize {
        self.as_product
    }
    pub fn prob(&self, template: usize) -> Option<Probability> {
        self.prob.get(&template).copied()
    }
    pub fn top_indices(&self) -> &[usize] {
        &self.top_indices
    }
    pub fn applications(&self) -> &BTreeMap<usize, Application> {
        &self.applications
    }
    pub fn application(&self, template: usize) -> Option<&Application> {
        self.applications.get(&template)
    }
    pub fn application_mut(&mut self, template: usize) -> Option<&mut Application> {
        self.applications.get_mut(&template)
    }
    pub fn visit_count(&self) -> usize {
        self.visit_count
    }
    pub fn price(&self) -> Option<Price> {
        self.price
    }
    pub fn estimate_price(&self) -> Price {
        self.estimate_price
    }
    pub fn terminal(&self) -> bool {
        self.terminal
    }
    pub fn done(&self) -> bool {
        self.done
    }
    pub fn pathway_count(&self) -> usize {
        self.pathway_count
    }
    pub fn best_template(&self) -> Option<usize> {
        self.best_template
    }

    /// every reaction id reachable below this chemical. a reaction
    /// merged into several applications appears once per application.
    pub fn reaction_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.applications
            .values()
            .flat_map(|application| application.reactions().values().copied())
    }
    pub fn reaction_total(&self) -> usize {
        self.applications
            .values()
            .map(|application| application.reactions().len())
            .sum()
    }

    /// virtual loss: repel concurrent rollouts from this subtree
    pub fn penalize(&mut self) {
        self.visit_count += crate::VIRTUAL_LOSS;
    }
    /// reverse the virtual loss, keeping one real visit
    pub fn restore(&mut self) {
        self.visit_count -= crate::VIRTUAL_LOSS - 1;
    }

    /// keep the cheapest realized price seen so far
    pub fn settle_price(&mut self, candidate: Price) {
        if self.price.is_none_or(|price| candidate < price) {
            self.price = Some(candidate);
        }
    }
    pub fn settle_estimate(&mut self, estimate: Price) {
        self.estimate_price = estimate;
    }
    pub fn settle_done(&mut self, done: bool) {
        self.done = done;
    }
    pub fn set_pathway_count(&mut self, count: usize) {
        self.pathway_count = count;
    }
    pub fn set_best_template(&mut self, template: usize) {
        self.best_template = Some(template);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_loss_reverses_to_single_visit() {
        let mut chemical = Chemical::new("CCO");
        chemical.penalize();
        chemical.restore();
        assert!(chemical.visit_count() == 1);
    }

    #[test]
    fn terminal_chemicals_cost_one() {
        let mut chemical = Chemical::new("O");
        chemical.terminate();
        assert!(chemical.terminal());
        assert!(chemical.done());
        assert!(chemical.price() == Some(1.0));
    }

    #[test]
    fn prices_settle_downward() {
        let mut chemical = Chemical::new("CCO");
        chemical.settle_price(5.0);
        chemical.settle_price(7.0);
        assert!(chemical.price() == Some(5.0));
        chemical.settle_price(2.0);
        assert!(chemical.price() == Some(2.0));
    }

    #[test]
    #[should_panic(expected = "opened twice")]
    fn reopening_an_application_is_a_bug() {
        let mut chemical = Chemical::new("CCO");
        chemical.open(3);
        chemical.open(3);
    }
}
