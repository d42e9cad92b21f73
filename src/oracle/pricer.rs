use crate::Price;

/// Buyables catalog lookup. `None` means the chemical has no known
/// purchase price.
#[async_trait::async_trait]
pub trait Pricer: Send + Sync {
    async fn price(&self, smiles: &str) -> Option<Price>;
}
