use std::collections::BTreeMap;

/// Molecular-toolkit view of a molecule as per-element atom counts.
/// Hydrogen is reported as the total of implicit and explicit
/// hydrogens. `None` means the toolkit has no mapping for the
/// identifier; such chemicals are admitted but never classified small.
pub trait Formula: Send + Sync {
    fn atoms(&self, smiles: &str) -> Option<BTreeMap<String, usize>>;
}
