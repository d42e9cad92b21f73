//! Demo run of the route planner over a small built-in template
//! library: aspirin from phenol in two steps.

use clap::Parser;
use retrograph::oracle::Card;
use retrograph::oracle::Formula;
use retrograph::oracle::Historian;
use retrograph::oracle::History;
use retrograph::oracle::Library;
use retrograph::oracle::Oracles;
use retrograph::oracle::Pricer;
use retrograph::oracle::Relevance;
use retrograph::search::Config;
use retrograph::search::Planner;
use retrograph::workers::Batch;
use retrograph::workers::Local;
use retrograph::workers::Outcome;
use retrograph::workers::Precursor;
use retrograph::workers::Request;
use retrograph::workers::Templates;
use retrograph::Plausibility;
use retrograph::Price;
use retrograph::Probability;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const ASPIRIN: &str = "CC(=O)Oc1ccccc1C(=O)O";
const SALICYLIC_ACID: &str = "O=C(O)c1ccccc1O";
const ACETIC_ANHYDRIDE: &str = "CC(=O)OC(C)=O";
const PHENOL: &str = "Oc1ccccc1";
const CARBON_DIOXIDE: &str = "O=C=O";

#[derive(Parser)]
#[command(about = "plan retrosynthetic routes for a target molecule")]
struct Args {
    /// target molecule SMILES
    #[arg(short, long, default_value = ASPIRIN)]
    target: String,
    /// expansion budget in seconds
    #[arg(short, long, default_value_t = 5)]
    seconds: u64,
    /// worker count
    #[arg(short, long, default_value_t = 2)]
    workers: usize,
    /// stop at the first buyable pathway
    #[arg(long)]
    first: bool,
}

struct Rule {
    name: &'static str,
    product: &'static str,
    reactants: &'static [&'static str],
    prob: Probability,
    plausibility: Plausibility,
}

/// the built-in template shelf: every oracle the engine needs, backed
/// by a handful of named rules and a short buyables list
struct Shelf {
    rules: Vec<Rule>,
    buyables: BTreeMap<&'static str, Price>,
}

impl Shelf {
    fn new() -> Self {
        Self {
            rules: vec![
                Rule {
                    name: "acetylation",
                    product: ASPIRIN,
                    reactants: &[SALICYLIC_ACID, ACETIC_ANHYDRIDE],
                    prob: 0.55,
                    plausibility: 0.97,
                },
                Rule {
                    name: "kolbe-schmitt",
                    product: SALICYLIC_ACID,
                    reactants: &[PHENOL, CARBON_DIOXIDE],
                    prob: 0.40,
                    plausibility: 0.85,
                },
            ],
            buyables: [
                (ACETIC_ANHYDRIDE, 1.0),
                (PHENOL, 1.0),
                (CARBON_DIOXIDE, 1.0),
                (SALICYLIC_ACID, 4.0),
            ]
            .into(),
        }
    }

    /// rules producing `smiles`, as the engine's relevance arrays
    fn prior(&self, smiles: &str) -> (Vec<Probability>, Vec<usize>) {
        let mut ranked: Vec<(Probability, usize)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.product == smiles)
            .map(|(index, rule)| (rule.prob, index))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.into_iter().unzip()
    }
}

#[async_trait::async_trait]
impl Templates for Shelf {
    async fn apply(&self, request: &Request) -> anyhow::Result<Batch> {
        let rule = self
            .rules
            .get(request.template)
            .filter(|rule| rule.product == request.product);
        Ok(rule
            .map(|rule| {
                vec![Outcome {
                    slot: request.slot,
                    product: request.product.clone(),
                    template: request.template,
                    precursors: rule
                        .reactants
                        .iter()
                        .map(|smiles| {
                            let (probs, indices) = self.prior(smiles);
                            Precursor {
                                smiles: smiles.to_string(),
                                probs,
                                indices,
                                value: 1.0,
                            }
                        })
                        .collect(),
                    plausibility: rule.plausibility,
                }]
            })
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl Relevance for Shelf {
    async fn topk(&self, smiles: &str, _: usize) -> anyhow::Result<(Vec<Probability>, Vec<usize>)> {
        Ok(self.prior(smiles))
    }
}

#[async_trait::async_trait]
impl Pricer for Shelf {
    async fn price(&self, smiles: &str) -> Option<Price> {
        self.buyables.get(smiles).copied()
    }
}

#[async_trait::async_trait]
impl Historian for Shelf {
    async fn lookup(&self, _: &str) -> History {
        History::default()
    }
}

impl Formula for Shelf {
    fn atoms(&self, _: &str) -> Option<BTreeMap<String, usize>> {
        None
    }
}

impl Library for Shelf {
    fn card(&self, template: usize) -> Option<Card> {
        self.rules.get(template).map(|rule| Card {
            id: rule.name.to_string(),
            examples: 100,
            reagent: String::new(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    retrograph::init();
    let args = Args::parse();
    let shelf = Arc::new(Shelf::new());
    let engine = shelf.clone();
    let backend = Local::new(
        args.workers,
        Arc::new(move |_: usize| engine.clone() as Arc<dyn Templates>),
    );
    let mut planner = Planner::new(
        backend,
        Oracles {
            relevance: shelf.clone(),
            pricer: shelf.clone(),
            historian: shelf.clone(),
            formula: shelf.clone(),
            library: shelf,
        },
    );
    let mut config = Config::default();
    config.workers = args.workers;
    config.expansion_time = Duration::from_secs(args.seconds);
    config.return_first = args.first;
    let plan = planner.plan(&args.target, config).await?;
    log::info!(
        "{} chemicals, {} template applications, {} routes",
        plan.chemicals,
        plan.reactions,
        plan.routes.len(),
    );
    println!("{}", serde_json::to_string_pretty(&plan.routes)?);
    Ok(())
}
