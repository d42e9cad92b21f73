use std::collections::BTreeMap;

/// AND-group: the application of one template to one product. Exists
/// from the moment the pair is dispatched to a worker; `waiting` drops
/// once the result lands, `valid` drops if the worker proposed nothing
/// usable. Reactions are keyed by their sorted-reactants string and
/// reference the graph arena.
#[derive(Debug, Clone)]
pub struct Application {
    template: usize,
    waiting: bool,
    valid: bool,
    reactions: BTreeMap<String, usize>,
}

impl Application {
    pub fn new(template: usize) -> Self {
        Self {
            template,
            waiting: true,
            valid: true,
            reactions: BTreeMap::new(),
        }
    }

    pub fn template(&self) -> usize {
        self.template
    }
    pub fn waiting(&self) -> bool {
        self.waiting
    }
    pub fn valid(&self) -> bool {
        self.valid
    }
    pub fn reactions(&self) -> &BTreeMap<String, usize> {
        &self.reactions
    }
    pub fn reaction(&self, key: &str) -> Option<usize> {
        self.reactions.get(key).copied()
    }

    /// the worker result landed
    pub fn resolve(&mut self) {
        self.waiting = false;
    }
    /// no usable reactant sets came back
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
    pub fn link(&mut self, key: String, reaction: usize) {
        self.reactions.insert(key, reaction);
    }
}
