use crate::Probability;

/// The learned template-relevance model: given a molecule, the top-K
/// templates worth applying to it, as parallel `(probabilities,
/// template indices)` arrays in descending probability.
#[async_trait::async_trait]
pub trait Relevance: Send + Sync {
    async fn topk(&self, smiles: &str, k: usize) -> anyhow::Result<(Vec<Probability>, Vec<usize>)>;
}
