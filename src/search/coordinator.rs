use super::config::Config;
use super::criteria::Criteria;
use super::pathway::Choice;
use super::pathway::Pathway;
use super::plan::Plan;
use crate::graph::Chemical;
use crate::graph::Graph;
use crate::graph::Reaction;
use crate::oracle::Oracles;
use crate::workers::Backend;
use crate::workers::Batch;
use crate::workers::Outcome;
use crate::workers::Request;
use crate::Price;
use crate::Probability;
use crate::SELECT_EXPLORATION;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;
use std::time::Instant;

/// ledger state of one dispatched (product, template) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Waiting,
    Landed,
}

/// The search coordinator. A single task owning the graph, driving N
/// parallel rollout slots against a worker backend: select a leaf under
/// UCB with virtual loss, dispatch the template application, ingest
/// whatever results are ready, backpropagate, repeat until the clock
/// runs out or nothing is left to expand.
pub struct Planner<B: Backend> {
    pub(super) backend: B,
    pub(super) oracles: Oracles,
    pub(super) config: Config,
    pub(super) criteria: Criteria,
    pub(super) graph: Graph,
    pub(super) target: String,
    pathways: Vec<Pathway>,
    pending: Vec<usize>,
    ledger: HashMap<(String, usize), Dispatch>,
    first_path: Option<Duration>,
}

impl<B: Backend> Planner<B> {
    pub fn new(backend: B, oracles: Oracles) -> Self {
        let config = Config::default();
        Self {
            backend,
            oracles,
            criteria: Criteria::from(&config),
            config,
            graph: Graph::new(),
            target: String::new(),
            pathways: Vec::new(),
            pending: Vec::new(),
            ledger: HashMap::new(),
            first_path: None,
        }
    }

    /// Run one full search: expand the graph for the configured budget,
    /// then finalize prices and pathway counts and emit the routes.
    pub async fn plan(&mut self, smiles: &str, config: Config) -> anyhow::Result<Plan> {
        self.criteria = Criteria::from(&config);
        self.config = config;
        self.reset().await;
        log::info!("preparing workers");
        self.backend.prepare().await?;
        log::info!("starting search for {}", smiles);
        self.seed(smiles).await?;
        // the first selection is shared by every slot; each extra slot
        // re-stamps the virtual loss so that every slot's update
        // balances its own reversal
        let (leaves, pathway) = self.select();
        for slot in 0..self.slots() {
            if slot > 0 {
                self.stamp(&pathway);
            }
            self.pathways[slot] = pathway.clone();
            self.assign(slot, &leaves).await?;
        }
        self.coordinate().await?;
        self.finalize();
        let routes = self.harvest();
        let chemical = self.graph.chemical(&self.target);
        log::info!(
            "finished: {} pathways, min price {}, first after {:?}",
            chemical.pathway_count(),
            chemical.price().map_or(-1.0, |price| price),
            self.first_path,
        );
        Ok(Plan {
            chemicals: self.graph.chemicals(),
            reactions: self.ledger.len(),
            first_path: self.first_path,
            routes,
        })
    }

    fn slots(&self) -> usize {
        self.config.slots()
    }

    /// clear per-search state; a hard reset also tears the fleet down
    /// so `prepare` spawns it fresh
    async fn reset(&mut self) {
        if !self.config.soft_reset {
            self.backend.stop(false).await;
        }
        self.graph = Graph::new();
        self.pathways = vec![Pathway::new(); self.slots()];
        self.pending = vec![0; self.slots()];
        self.ledger = HashMap::new();
        self.first_path = None;
    }

    /// admit the target chemical: relevance prior truncated by
    /// cumulative probability, price, history, and the stop criterion
    async fn seed(&mut self, smiles: &str) -> anyhow::Result<()> {
        self.target = smiles.to_string();
        let (probs, indices) = self
            .oracles
            .relevance
            .topk(smiles, self.config.template_count)
            .await?;
        let keep = truncate(&probs, self.config.max_cum_template_prob);
        let mut chemical = Chemical::new(smiles);
        chemical.relevance(
            probs[..keep].to_vec(),
            indices[..keep].to_vec(),
            crate::NEUTRAL_VALUE,
        );
        let ppg = self.oracles.pricer.price(smiles).await;
        chemical.procure(ppg);
        let history = self.oracles.historian.lookup(smiles).await;
        chemical.chronicle(&history);
        let atoms = self.oracles.formula.atoms(smiles);
        if self.criteria.terminal(ppg, &history, atoms.as_ref()) {
            chemical.terminate();
        }
        self.graph.insert(chemical);
        Ok(())
    }

    /// the outer loop: drain, ingest, roll out, until the budget or the
    /// graph is exhausted
    async fn coordinate(&mut self) -> anyhow::Result<()> {
        let start = Instant::now();
        let mut beat = 0;
        while start.elapsed() < self.config.expansion_time {
            for batch in self.backend.drain().await {
                self.ingest(batch).await?;
            }
            for slot in 0..self.slots() {
                if self.pending[slot] > 0 {
                    continue;
                }
                let pathway = std::mem::take(&mut self.pathways[slot]);
                self.update(&pathway);
                let (leaves, pathway) = self.select();
                self.pathways[slot] = pathway;
                self.assign(slot, &leaves).await?;
            }
            if self.first_path.is_none() && self.graph.chemical(&self.target).price().is_some() {
                self.first_path = Some(start.elapsed());
                log::info!(
                    "found the first pathway after {:.2}s",
                    start.elapsed().as_secs_f64()
                );
                if self.config.return_first {
                    log::info!("stopping expansion to return the first pathway");
                    break;
                }
            }
            if self.pathways.iter().all(Pathway::is_empty)
                && self.pending.iter().sum::<usize>() == 0
            {
                log::info!("nothing left to expand");
                break;
            }
            if start.elapsed().as_secs() / crate::STATUS_INTERVAL > beat {
                beat = start.elapsed().as_secs() / crate::STATUS_INTERVAL;
                log::info!(
                    "worked {}s of {}s: price {} chemicals {} dispatches {}",
                    start.elapsed().as_secs(),
                    self.config.expansion_time.as_secs(),
                    self.graph.chemical(&self.target).price().map_or(-1.0, |p| p),
                    self.graph.chemicals(),
                    self.ledger.len(),
                );
            }
            tokio::time::sleep(crate::POLL_INTERVAL).await;
        }
        self.backend.stop(self.config.soft_stop).await;
        for slot in 0..self.slots() {
            let pathway = std::mem::take(&mut self.pathways[slot]);
            self.update(&pathway);
        }
        Ok(())
    }

    /// dispatch every fresh leaf of a rollout, skipping pairs some
    /// other slot already has in flight
    async fn assign(&mut self, slot: usize, leaves: &[(String, usize)]) -> anyhow::Result<()> {
        for (smiles, template) in leaves {
            let key = (smiles.clone(), *template);
            if self.ledger.contains_key(&key) {
                continue;
            }
            self.ledger.insert(key, Dispatch::Waiting);
            self.backend
                .dispatch(Request {
                    slot,
                    product: smiles.clone(),
                    template: *template,
                    settings: self.config.settings(),
                })
                .await?;
            self.pending[slot] += 1;
        }
        Ok(())
    }

    /// fold one result batch into the graph and release its slot
    async fn ingest(&mut self, batch: Batch) -> anyhow::Result<()> {
        let Some(first) = batch.first() else {
            return Ok(());
        };
        let slot = first.slot;
        for outcome in batch {
            self.ledger
                .insert((outcome.product.clone(), outcome.template), Dispatch::Landed);
            self.absorb(outcome).await;
        }
        self.pending[slot] -= 1;
        Ok(())
    }

    /// one proposed reactant set: filter, merge with a twin, or admit
    /// every precursor and mint the reaction
    async fn absorb(&mut self, outcome: Outcome) {
        let Outcome {
            product,
            template,
            precursors,
            plausibility,
            ..
        } = outcome;
        self.graph
            .chemical_mut(&product)
            .application_mut(template)
            .expect("application exists for landed result")
            .resolve();
        if precursors.is_empty() {
            self.graph
                .chemical_mut(&product)
                .application_mut(template)
                .expect("application exists for landed result")
                .invalidate();
            return;
        }
        let reactants: Vec<String> = precursors.iter().map(|p| p.smiles.clone()).collect();
        let key = Reaction::key_of(&reactants);
        let banned = self
            .config
            .known_bad_reactions
            .contains(&format!("{}>>{}", key, product))
            || reactants
                .iter()
                .any(|smiles| self.config.forbidden_molecules.contains(smiles));
        if banned {
            self.graph
                .chemical_mut(&product)
                .application_mut(template)
                .expect("application exists for landed result")
                .invalidate();
            return;
        }
        for precursor in &precursors {
            if self.graph.contains(&precursor.smiles) {
                continue;
            }
            let mut chemical = Chemical::new(&precursor.smiles);
            chemical.relevance(
                precursor.probs.clone(),
                precursor.indices.clone(),
                precursor.value,
            );
            let ppg = self.oracles.pricer.price(&precursor.smiles).await;
            chemical.procure(ppg);
            let history = self.oracles.historian.lookup(&precursor.smiles).await;
            chemical.chronicle(&history);
            let atoms = self.oracles.formula.atoms(&precursor.smiles);
            if self.criteria.terminal(ppg, &history, atoms.as_ref()) {
                chemical.terminate();
            }
            self.graph.insert(chemical);
        }
        let prob = self
            .graph
            .chemical(&product)
            .prob(template)
            .expect("dispatched template has relevance");
        let estimate: Price = reactants
            .iter()
            .map(|smiles| self.graph.chemical(smiles).estimate_price())
            .sum();
        let id = self
            .graph
            .upsert(&product, template, prob, plausibility, reactants, estimate);
        self.graph
            .chemical_mut(&product)
            .application_mut(template)
            .expect("application exists for landed result")
            .link(key, id);
    }

    /// one rollout: walk down from the target, applying UCB at each
    /// chemical, stamping the pathway and leaving virtual loss behind.
    /// Returns the fresh (chemical, template) leaves to dispatch.
    pub(super) fn select(&mut self) -> (Vec<(String, usize)>, Pathway) {
        let mut pathway = Pathway::new();
        let mut leaves = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back((self.target.clone(), 0, vec![self.target.clone()]));
        while let Some((smiles, depth, path)) = queue.pop_front() {
            if depth >= self.config.max_depth || pathway.contains_key(&smiles) {
                continue;
            }
            if self.graph.chemical(&smiles).done() {
                continue;
            }
            let Some((template, reactants)) = self.ucb(&smiles, SELECT_EXPLORATION, &path) else {
                continue;
            };
            self.graph.chemical_mut(&smiles).penalize();
            if self.graph.chemical(&smiles).application(template).is_none() {
                pathway.insert(smiles.clone(), Choice::Template(template));
                self.graph.chemical_mut(&smiles).open(template);
                leaves.push((smiles, template));
            } else if let Some(key) = reactants {
                pathway.insert(smiles.clone(), Choice::Reaction(template, key.clone()));
                let id = self
                    .graph
                    .chemical(&smiles)
                    .application(template)
                    .expect("selected application exists")
                    .reaction(&key)
                    .expect("selected reaction exists");
                self.graph.reaction_mut(id).penalize();
                for reactant in self.graph.reaction(id).reactants().to_vec() {
                    if !self.graph.chemical(&reactant).done() {
                        let mut next = path.clone();
                        next.push(reactant.clone());
                        queue.push_back((reactant, depth + 1, next));
                    }
                }
            } else {
                pathway.insert(smiles.clone(), Choice::Template(template));
            }
        }
        (leaves, pathway)
    }

    /// score every candidate below one chemical: each known, live,
    /// acyclic reaction, plus at most one unexpanded template (offered
    /// while branching is unsaturated, always at the root) in
    /// descending relevance order
    pub(super) fn ucb(
        &self,
        smiles: &str,
        exploration: f32,
        path: &[String],
    ) -> Option<(usize, Option<String>)> {
        let chemical = self.graph.chemical(smiles);
        let visits = (chemical.visit_count() as f32).sqrt();
        let mut best: Option<(f32, usize, Option<String>)> = None;
        let mut max_estimate: Price = 0.0;
        let mut branches = 0;
        for (&template, application) in chemical.applications() {
            if application.waiting() || !application.valid() {
                continue;
            }
            let prob = chemical.prob(template).expect("applied template has relevance");
            for (key, &id) in application.reactions() {
                let reaction = self.graph.reaction(id);
                if reaction.done() {
                    continue;
                }
                if reaction.reactants().iter().any(|r| path.contains(r)) {
                    continue;
                }
                max_estimate = max_estimate.max(reaction.estimate_price());
                let explore = exploration * prob * visits / (1.0 + reaction.visit_count() as f32);
                let score = explore - reaction.estimate_price();
                if best.as_ref().is_none_or(|(top, _, _)| score > *top) {
                    best = Some((score, template, Some(key.clone())));
                }
                branches += 1;
            }
        }
        if branches < self.config.max_branching || smiles == self.target {
            if let Some(&template) = chemical
                .top_indices()
                .iter()
                .find(|template| chemical.application(**template).is_none())
            {
                let prob = chemical.prob(template).expect("ranked template has relevance");
                let score = exploration * prob * visits - (max_estimate + 0.1);
                if best.as_ref().is_none_or(|(top, _, _)| score > *top) {
                    best = Some((score, template, None));
                }
            }
        }
        best.map(|(_, template, key)| (template, key))
    }

    /// apply virtual loss along an already-selected pathway, for slots
    /// that adopt a rollout they did not select themselves
    fn stamp(&mut self, pathway: &Pathway) {
        for (smiles, choice) in pathway {
            self.graph.chemical_mut(smiles).penalize();
            if let Choice::Reaction(template, key) = choice {
                let id = self
                    .graph
                    .chemical(smiles)
                    .application(*template)
                    .expect("stamped application exists")
                    .reaction(key)
                    .expect("stamped reaction exists");
                self.graph.reaction_mut(id).penalize();
            }
        }
    }

    /// backpropagation: reverse the rollout's virtual loss (one real
    /// visit survives), then walk the stamped pathway refreshing done
    /// flags, estimates and realized prices
    pub(super) fn update(&mut self, pathway: &Pathway) {
        for (smiles, choice) in pathway {
            self.graph.chemical_mut(smiles).restore();
            if let Choice::Reaction(template, key) = choice {
                let id = self
                    .graph
                    .chemical(smiles)
                    .application(*template)
                    .expect("stamped application exists")
                    .reaction(key)
                    .expect("stamped reaction exists");
                self.graph.reaction_mut(id).restore();
            }
        }
        let target = self.target.clone();
        self.refresh(&target, pathway, 0);
    }

    fn refresh(&mut self, smiles: &str, pathway: &Pathway, depth: usize) {
        if depth >= self.config.max_depth {
            return;
        }
        let Some(choice) = pathway.get(smiles) else {
            return;
        };
        let template = choice.template();
        if self
            .graph
            .chemical(smiles)
            .application(template)
            .expect("stamped application exists")
            .waiting()
        {
            return;
        }
        if let Choice::Reaction(_, key) = choice {
            let id = self
                .graph
                .chemical(smiles)
                .application(template)
                .expect("stamped application exists")
                .reaction(key)
                .expect("stamped reaction exists");
            if !self.graph.reaction(id).done() {
                let reactants = self.graph.reaction(id).reactants().to_vec();
                let done = reactants
                    .iter()
                    .all(|reactant| self.graph.chemical(reactant).done());
                self.graph.reaction_mut(id).settle_done(done);
                for reactant in &reactants {
                    self.refresh(reactant, pathway, depth + 1);
                }
                let estimate: Price = reactants
                    .iter()
                    .map(|reactant| self.graph.chemical(reactant).estimate_price())
                    .sum();
                self.graph.reaction_mut(id).settle_estimate(estimate);
                self.graph.settle_estimate(smiles);
                let total: Option<Price> = reactants
                    .iter()
                    .map(|reactant| self.graph.chemical(reactant).price())
                    .sum();
                if let Some(total) = total {
                    self.graph.reaction_mut(id).set_price(total);
                    self.graph.chemical_mut(smiles).settle_price(total);
                }
            }
        }
        let saturated = {
            let chemical = self.graph.chemical(smiles);
            match chemical.reaction_total() >= self.config.max_branching {
                true => Some(
                    chemical
                        .reaction_ids()
                        .all(|id| self.graph.reaction(id).done()),
                ),
                false => None,
            }
        };
        if let Some(done) = saturated {
            self.graph.chemical_mut(smiles).settle_done(done);
        }
    }
}

/// keep the prefix whose cumulative probability first reaches the cap,
/// or everything when it never does
fn truncate(probs: &[Probability], cap: Probability) -> usize {
    let mut cum = 0.0;
    for (i, prob) in probs.iter().enumerate() {
        cum += prob;
        if cum >= cap {
            return i + 1;
        }
    }
    probs.len()
}
