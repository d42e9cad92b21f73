use super::config::Sort;
use super::coordinator::Planner;
use crate::graph::Reaction;
use crate::routes::ChemNode;
use crate::routes::RxnNode;
use crate::workers::Backend;
use crate::Price;
use std::collections::HashMap;
use std::collections::HashSet;

/// stable 1-based ids for emitted chemicals and reactions
#[derive(Default)]
struct Indexer {
    seen: HashMap<String, usize>,
}

impl Indexer {
    fn assign(&mut self, smiles: &str) -> usize {
        let next = self.seen.len() + 1;
        *self.seen.entry(smiles.to_string()).or_insert(next)
    }
}

impl<B: Backend> Planner<B> {
    /// Full post-expansion traversal: definitive prices, best templates
    /// and pathway counts for every node reachable from the target.
    pub(super) fn finalize(&mut self) {
        log::info!("final update of pathway counts and prices");
        let target = self.target.clone();
        let mut path = Vec::new();
        self.survey(&target, 0, &mut path);
    }

    fn survey(&mut self, smiles: &str, depth: usize, path: &mut Vec<String>) {
        self.graph.chemical_mut(smiles).set_pathway_count(0);
        if self.graph.chemical(smiles).terminal() {
            self.graph.chemical_mut(smiles).set_pathway_count(1);
            return;
        }
        if depth > self.config.max_depth {
            return;
        }
        let entries: Vec<(usize, usize)> = self
            .graph
            .chemical(smiles)
            .applications()
            .iter()
            .flat_map(|(&template, application)| {
                application
                    .reactions()
                    .values()
                    .map(move |&id| (template, id))
            })
            .collect();
        for &(template, id) in &entries {
            self.graph.reaction_mut(id).set_pathway_count(0);
            let reactants = self.graph.reaction(id).reactants().to_vec();
            if reactants.iter().any(|reactant| path.contains(reactant)) {
                continue;
            }
            path.push(smiles.to_string());
            for reactant in &reactants {
                self.survey(reactant, depth + 1, path);
            }
            path.pop();
            let total: Option<Price> = reactants
                .iter()
                .map(|reactant| self.graph.chemical(reactant).price())
                .sum();
            if let Some(total) = total {
                self.graph.reaction_mut(id).set_price(total);
                if self
                    .graph
                    .chemical(smiles)
                    .price()
                    .is_none_or(|price| total < price)
                {
                    let chemical = self.graph.chemical_mut(smiles);
                    chemical.settle_price(total);
                    chemical.set_best_template(template);
                }
                let count = reactants
                    .iter()
                    .map(|reactant| self.graph.chemical(reactant).pathway_count())
                    .product();
                self.graph.reaction_mut(id).set_pathway_count(count);
            }
        }
        // merged reactions count once per application, deliberately
        let count = entries
            .iter()
            .map(|&(_, id)| self.graph.reaction(id).pathway_count())
            .sum();
        self.graph.chemical_mut(smiles).set_pathway_count(count);
    }

    /// Iterative-deepening DFS over the finalized graph, emitting up to
    /// `max_trees` routes in the configured order.
    pub(super) fn harvest(&self) -> Vec<ChemNode> {
        log::info!("retrieving routes");
        let mut indexer = Indexer::default();
        let limit = self.config.max_trees;
        let mut routes = Vec::new();
        for children in self.descend(&self.target, 0, limit, &mut indexer) {
            routes.push(self.chem_node(&self.target, children, &mut indexer));
            if routes.len() >= limit {
                break;
            }
        }
        log::info!("sorting {} routes", routes.len());
        match self.config.sort_routes {
            Sort::Plausibility => {
                routes.sort_by(|a, b| b.plausibility().total_cmp(&a.plausibility()))
            }
            Sort::StartingMaterials => {
                routes.sort_by(|a, b| a.starting_materials().total_cmp(&b.starting_materials()))
            }
            Sort::Reactions => routes.sort_by(|a, b| a.reactions().total_cmp(&b.reactions())),
        }
        routes
    }

    /// every way to finish one chemical: a bare leaf when it is a
    /// starting material, plus one subtree per distinct priced reaction
    fn descend(
        &self,
        smiles: &str,
        depth: usize,
        limit: usize,
        indexer: &mut Indexer,
    ) -> Vec<Vec<RxnNode>> {
        let mut out = Vec::new();
        let chemical = self.graph.chemical(smiles);
        if chemical.terminal() {
            out.push(Vec::new());
        }
        if depth > self.config.max_depth {
            return out;
        }
        let mut seen: HashSet<String> = HashSet::new();
        for application in chemical.applications().values() {
            if application.waiting() {
                continue;
            }
            for &id in application.reactions().values() {
                let reaction = self.graph.reaction(id);
                if reaction.price().is_none() {
                    continue;
                }
                let rsmi = reaction.smiles();
                if seen.contains(&rsmi) {
                    continue;
                }
                let room = limit.saturating_sub(out.len());
                for combo in self.cross(reaction.reactants(), depth, room, indexer) {
                    out.push(vec![self.rxn_node(reaction, &rsmi, combo, indexer)]);
                    if out.len() >= limit {
                        return out;
                    }
                }
                seen.insert(rsmi);
            }
        }
        out
    }

    /// cartesian product of the per-reactant subtrees, depth first,
    /// capped at `limit` combinations
    fn cross(
        &self,
        reactants: &[String],
        depth: usize,
        limit: usize,
        indexer: &mut Indexer,
    ) -> Vec<Vec<ChemNode>> {
        if limit == 0 {
            return Vec::new();
        }
        let Some((head, rest)) = reactants.split_first() else {
            return vec![Vec::new()];
        };
        let mut combos = Vec::new();
        'heads: for children in self.descend(head, depth + 1, limit, indexer) {
            let node = self.chem_node(head, children, indexer);
            for tail in self.cross(rest, depth, limit, indexer) {
                let mut combo = Vec::with_capacity(1 + tail.len());
                combo.push(node.clone());
                combo.extend(tail);
                combos.push(combo);
                if combos.len() >= limit {
                    break 'heads;
                }
            }
        }
        combos
    }

    fn chem_node(&self, smiles: &str, children: Vec<RxnNode>, indexer: &mut Indexer) -> ChemNode {
        let chemical = self.graph.chemical(smiles);
        ChemNode {
            id: indexer.assign(smiles),
            smiles: smiles.to_string(),
            ppg: chemical.purchase_price(),
            as_reactant: chemical.as_reactant(),
            as_product: chemical.as_product(),
            children,
        }
    }

    fn rxn_node(
        &self,
        reaction: &Reaction,
        rsmi: &str,
        children: Vec<ChemNode>,
        indexer: &mut Indexer,
    ) -> RxnNode {
        let cards: Vec<_> = reaction
            .templates()
            .iter()
            .map(|&template| (template, self.oracles.library.card(template)))
            .collect();
        RxnNode {
            id: indexer.assign(rsmi),
            smiles: rsmi.to_string(),
            tforms: cards
                .iter()
                .map(|(template, card)| {
                    card.as_ref()
                        .map_or(template.to_string(), |card| card.id.clone())
                })
                .collect(),
            num_examples: cards
                .iter()
                .filter_map(|(_, card)| card.as_ref().map(|card| card.examples))
                .sum(),
            necessary_reagent: cards
                .first()
                .and_then(|(_, card)| card.as_ref().map(|card| card.reagent.clone()))
                .unwrap_or_default(),
            plausibility: reaction.plausibility(),
            template_score: reaction.template_score(),
            children,
        }
    }
}
