/// usage counts of a chemical across the reaction corpus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct History {
    pub as_reactant: usize,
    pub as_product: usize,
}

/// The chemical historian: how often a molecule has appeared as a
/// reactant or product in the literature corpus.
#[async_trait::async_trait]
pub trait Historian: Send + Sync {
    async fn lookup(&self, smiles: &str) -> History;
}
