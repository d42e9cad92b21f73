use crate::Plausibility;
use crate::Price;
use crate::Probability;

/// knobs forwarded verbatim to the template-application primitive
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub template_count: usize,
    pub max_cum_prob: Probability,
    pub apply_fast_filter: bool,
    pub filter_threshold: Plausibility,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template_count: 100,
            max_cum_prob: 0.995,
            apply_fast_filter: true,
            filter_threshold: 0.75,
        }
    }
}

/// one expansion request: apply `template` to `product` on behalf of
/// active-pathway slot `slot`
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub slot: usize,
    pub product: String,
    pub template: usize,
    pub settings: Settings,
}

impl Request {
    /// fixed probe pair answered by any live worker fleet
    pub(crate) fn canary() -> Self {
        Self {
            slot: 0,
            product: crate::CANARY_SMILES.to_string(),
            template: crate::CANARY_TEMPLATE,
            settings: Settings::default(),
        }
    }
}

/// a proposed precursor, carrying its own top-K relevance data so the
/// coordinator can admit it without a second model call
#[derive(Debug, Clone)]
pub struct Precursor {
    pub smiles: String,
    pub probs: Vec<Probability>,
    pub indices: Vec<usize>,
    pub value: Price,
}

/// one reactant set proposed for a `(product, template)` pair
#[derive(Debug, Clone)]
pub struct Outcome {
    pub slot: usize,
    pub product: String,
    pub template: usize,
    pub precursors: Vec<Precursor>,
    pub plausibility: Plausibility,
}

impl Outcome {
    /// placeholder for a failed or empty application, so the request is
    /// still accounted for and the application marked invalid
    pub(crate) fn invalid(request: &Request) -> Self {
        Self {
            slot: request.slot,
            product: request.product.clone(),
            template: request.template,
            precursors: Vec::new(),
            plausibility: 0.0,
        }
    }
}

/// every outcome of one request. Workers never emit an empty batch.
pub type Batch = Vec<Outcome>;

/// The template-application primitive. One engine instance lives inside
/// each worker; it receives immutable requests and returns outcomes by
/// value.
#[async_trait::async_trait]
pub trait Templates: Send + Sync {
    async fn apply(&self, request: &Request) -> anyhow::Result<Batch>;
}
