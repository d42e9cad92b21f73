use super::chem::ChemNode;
use crate::Plausibility;
use crate::Probability;

/// reaction node of an emitted synthesis route: one retrosynthetic
/// step with the template metadata that proposed it
#[derive(Debug, Clone, serde::Serialize)]
pub struct RxnNode {
    pub id: usize,
    pub smiles: String,
    pub tforms: Vec<String>,
    pub num_examples: usize,
    pub necessary_reagent: String,
    pub plausibility: Plausibility,
    pub template_score: Probability,
    pub children: Vec<ChemNode>,
}
