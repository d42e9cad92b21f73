use crate::Plausibility;
use crate::Price;
use crate::Probability;

/// AND-node: one concrete retrosynthetic step, identified by its
/// product and its sorted reactant set. Several templates may propose
/// the same step; they are merged onto one node.
#[derive(Debug, Clone)]
pub struct Reaction {
    product: String,
    reactants: Vec<String>,
    templates: Vec<usize>,
    template_score: Probability,
    plausibility: Plausibility,
    estimate_price: Price,
    price: Option<Price>,
    visit_count: usize,
    done: bool,
    pathway_count: usize,
}

impl Reaction {
    pub fn new(
        product: &str,
        template: usize,
        template_score: Probability,
        plausibility: Plausibility,
        reactants: Vec<String>,
        estimate_price: Price,
    ) -> Self {
        Self {
            product: product.to_string(),
            reactants,
            templates: vec![template],
            template_score,
            plausibility,
            estimate_price,
            price: None,
            visit_count: 0,
            done: false,
            pathway_count: 0,
        }
    }

    /// canonical key for a reactant set, insensitive to proposal order
    pub fn key_of(reactants: &[String]) -> String {
        let mut sorted: Vec<&str> = reactants.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.join(".")
    }

    pub fn key(&self) -> String {
        Self::key_of(&self.reactants)
    }
    /// reaction SMILES, `reactants>>product` with sorted reactants
    pub fn smiles(&self) -> String {
        format!("{}>>{}", self.key(), self.product)
    }

    /// another template proposed this exact reactant set
    pub fn merge(&mut self, template: usize, prob: Probability) {
        if !self.templates.contains(&template) {
            self.templates.push(template);
        }
        self.template_score = self.template_score.max(prob);
    }

    pub fn product(&self) -> &str {
        &self.product
    }
    pub fn reactants(&self) -> &[String] {
        &self.reactants
    }
    pub fn templates(&self) -> &[usize] {
        &self.templates
    }
    pub fn template_score(&self) -> Probability {
        self.template_score
    }
    pub fn plausibility(&self) -> Plausibility {
        self.plausibility
    }
    pub fn estimate_price(&self) -> Price {
        self.estimate_price
    }
    pub fn price(&self) -> Option<Price> {
        self.price
    }
    pub fn visit_count(&self) -> usize {
        self.visit_count
    }
    pub fn done(&self) -> bool {
        self.done
    }
    pub fn pathway_count(&self) -> usize {
        self.pathway_count
    }

    pub fn penalize(&mut self) {
        self.visit_count += crate::VIRTUAL_LOSS;
    }
    pub fn restore(&mut self) {
        self.visit_count -= crate::VIRTUAL_LOSS - 1;
    }

    pub fn settle_estimate(&mut self, estimate: Price) {
        self.estimate_price = estimate;
    }
    pub fn set_price(&mut self, price: Price) {
        self.price = Some(price);
    }
    pub fn settle_done(&mut self, done: bool) {
        self.done = done;
    }
    pub fn set_pathway_count(&mut self, count: usize) {
        self.pathway_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_order_insensitive() {
        let forward = Reaction::key_of(&["CCO".to_string(), "CC(=O)O".to_string()]);
        let reverse = Reaction::key_of(&["CC(=O)O".to_string(), "CCO".to_string()]);
        assert!(forward == reverse);
        assert!(forward == "CC(=O)O.CCO");
    }

    #[test]
    fn merging_takes_the_best_template_score() {
        let mut reaction = Reaction::new("CCOC(C)=O", 7, 0.3, 0.9, vec!["CCO".into()], 1.0);
        reaction.merge(11, 0.1);
        reaction.merge(11, 0.1);
        assert!(reaction.templates() == &[7, 11]);
        assert!(reaction.template_score() == 0.3);
    }
}
