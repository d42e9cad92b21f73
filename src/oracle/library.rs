/// descriptive metadata for one retrosynthetic template
#[derive(Debug, Clone, Default)]
pub struct Card {
    pub id: String,
    pub examples: usize,
    pub reagent: String,
}

/// Template-library metadata, consulted only when emitting routes.
pub trait Library: Send + Sync {
    fn card(&self, template: usize) -> Option<Card>;
}
