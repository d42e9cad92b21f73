use super::rxn::RxnNode;
use crate::Price;

/// chemical node of an emitted synthesis route. A leaf (no children)
/// is a starting material; otherwise `children` holds exactly one
/// producing reaction.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChemNode {
    pub id: usize,
    pub smiles: String,
    pub ppg: Option<Price>,
    pub as_reactant: usize,
    pub as_product: usize,
    pub children: Vec<RxnNode>,
}

impl ChemNode {
    /// product of fast-filter scores along the route
    pub fn plausibility(&self) -> f32 {
        match self.children.first() {
            None => 1.0,
            Some(reaction) => {
                reaction.plausibility
                    * reaction
                        .children
                        .iter()
                        .map(ChemNode::plausibility)
                        .product::<f32>()
            }
        }
    }

    /// leaves of the route
    pub fn starting_materials(&self) -> f32 {
        match self.children.first() {
            None => 1.0,
            Some(reaction) => reaction.children.iter().map(ChemNode::starting_materials).sum(),
        }
    }

    /// longest reaction chain in the route
    pub fn reactions(&self) -> f32 {
        match self.children.first() {
            None => 0.0,
            Some(reaction) => {
                1.0 + reaction
                    .children
                    .iter()
                    .map(ChemNode::reactions)
                    .fold(0.0, f32::max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(smiles: &str) -> ChemNode {
        ChemNode {
            id: 0,
            smiles: smiles.to_string(),
            ppg: Some(1.0),
            as_reactant: 0,
            as_product: 0,
            children: Vec::new(),
        }
    }

    fn step(product: &str, plausibility: f32, reactants: Vec<ChemNode>) -> ChemNode {
        ChemNode {
            id: 0,
            smiles: product.to_string(),
            ppg: None,
            as_reactant: 0,
            as_product: 0,
            children: vec![RxnNode {
                id: 0,
                smiles: format!(">>{}", product),
                tforms: Vec::new(),
                num_examples: 0,
                necessary_reagent: String::new(),
                plausibility,
                template_score: 0.5,
                children: reactants,
            }],
        }
    }

    #[test]
    fn metrics_on_a_two_step_route() {
        let route = step("P", 0.9, vec![step("M", 0.8, vec![leaf("A"), leaf("B")]), leaf("C")]);
        assert!((route.plausibility() - 0.72).abs() < 1e-6);
        assert!(route.starting_materials() == 3.0);
        assert!(route.reactions() == 2.0);
    }

    #[test]
    fn a_bare_starting_material_is_a_unit_route() {
        let route = leaf("A");
        assert!(route.plausibility() == 1.0);
        assert!(route.starting_materials() == 1.0);
        assert!(route.reactions() == 0.0);
    }
}
