use super::backend::Backend;
use super::task::Batch;
use super::task::Outcome;
use super::task::Request;
use super::task::Templates;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// worker-setup hook: builds the template engine a worker owns for its
/// lifetime
pub type Setup = Arc<dyn Fn(usize) -> Arc<dyn Templates> + Send + Sync>;

/// In-process worker fleet. Requests fan out round-robin over
/// per-worker lanes (FIFO within a lane); every worker answers on one
/// shared result channel. A shared done flag plus task abort implements
/// hard stop; soft stop only refuses new dispatch and lets in-flight
/// work drain.
pub struct Local {
    count: usize,
    setup: Setup,
    lanes: Vec<UnboundedSender<Request>>,
    workers: Vec<JoinHandle<()>>,
    funnel: UnboundedSender<Batch>,
    results: UnboundedReceiver<Batch>,
    done: Arc<AtomicBool>,
    running: bool,
    cursor: usize,
}

impl Local {
    pub fn new(count: usize, setup: Setup) -> Self {
        let (funnel, results) = tokio::sync::mpsc::unbounded_channel();
        Self {
            count: count.max(1),
            setup,
            lanes: Vec::new(),
            workers: Vec::new(),
            funnel,
            results,
            done: Arc::new(AtomicBool::new(false)),
            running: false,
            cursor: 0,
        }
    }

    fn alive(&self) -> bool {
        !self.workers.is_empty() && self.workers.iter().all(|worker| !worker.is_finished())
    }
}

#[async_trait::async_trait]
impl Backend for Local {
    async fn prepare(&mut self) -> anyhow::Result<()> {
        // purge results left over from an interrupted search
        while self.results.try_recv().is_ok() {}
        if self.alive() {
            log::info!("found {} alive workers, not spawning new ones", self.count);
            self.running = true;
            return Ok(());
        }
        log::info!("spinning off {} workers", self.count);
        self.done = Arc::new(AtomicBool::new(false));
        self.lanes.clear();
        self.workers.clear();
        let mut readies = Vec::with_capacity(self.count);
        for id in 0..self.count {
            let (lane, requests) = tokio::sync::mpsc::unbounded_channel();
            let (ready, readied) = oneshot::channel();
            self.lanes.push(lane);
            self.workers.push(tokio::spawn(work(
                id,
                self.setup.clone(),
                requests,
                self.funnel.clone(),
                self.done.clone(),
                ready,
            )));
            readies.push(readied);
        }
        for readied in futures::future::join_all(readies).await {
            readied.map_err(|_| anyhow::anyhow!("worker died during setup"))?;
        }
        self.running = true;
        Ok(())
    }

    async fn dispatch(&mut self, request: Request) -> anyhow::Result<()> {
        anyhow::ensure!(self.running, "worker pool stopped");
        let lane = self.cursor % self.lanes.len();
        self.cursor = self.cursor.wrapping_add(1);
        self.lanes[lane]
            .send(request)
            .map_err(|_| anyhow::anyhow!("worker {} hung up", lane))
    }

    async fn drain(&mut self) -> Vec<Batch> {
        let mut ready = Vec::new();
        loop {
            match self.results.try_recv() {
                Ok(batch) => ready.push(batch),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ready
    }

    async fn stop(&mut self, soft: bool) {
        if !self.running {
            return;
        }
        self.running = false;
        if !soft {
            self.done.store(true, Ordering::Relaxed);
            for worker in self.workers.drain(..) {
                worker.abort();
            }
            self.lanes.clear();
        }
    }
}

/// one worker: build the engine, signal readiness, then serve the lane
/// until the pool hangs up or the done flag drops
async fn work(
    id: usize,
    setup: Setup,
    mut requests: UnboundedReceiver<Request>,
    funnel: UnboundedSender<Batch>,
    done: Arc<AtomicBool>,
    ready: oneshot::Sender<()>,
) {
    let engine = setup(id);
    let _ = ready.send(());
    while let Some(request) = requests.recv().await {
        if done.load(Ordering::Relaxed) {
            break;
        }
        let batch = match engine.apply(&request).await {
            Ok(batch) if !batch.is_empty() => batch,
            Ok(_) => vec![Outcome::invalid(&request)],
            Err(e) => {
                log::warn!("worker {}: template application failed: {}", id, e);
                vec![Outcome::invalid(&request)]
            }
        };
        if funnel.send(batch).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::task::Precursor;
    use super::*;

    /// engine that proposes one precursor for even templates and errors
    /// on odd ones
    struct Parity;

    #[async_trait::async_trait]
    impl Templates for Parity {
        async fn apply(&self, request: &Request) -> anyhow::Result<Batch> {
            if request.template % 2 == 1 {
                anyhow::bail!("odd template");
            }
            Ok(vec![Outcome {
                slot: request.slot,
                product: request.product.clone(),
                template: request.template,
                precursors: vec![Precursor {
                    smiles: "CCO".to_string(),
                    probs: vec![],
                    indices: vec![],
                    value: 1.0,
                }],
                plausibility: 0.8,
            }])
        }
    }

    fn pool(count: usize) -> Local {
        Local::new(count, Arc::new(|_| Arc::new(Parity)))
    }

    async fn settle(pool: &mut Local) -> Vec<Batch> {
        let mut batches = Vec::new();
        for _ in 0..100 {
            batches.extend(pool.drain().await);
            if !batches.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        batches
    }

    #[tokio::test]
    async fn requests_round_trip() {
        let mut pool = pool(2);
        pool.prepare().await.unwrap();
        let request = Request {
            slot: 3,
            product: "CCOC(C)=O".to_string(),
            template: 0,
            settings: Default::default(),
        };
        pool.dispatch(request).await.unwrap();
        let batches = settle(&mut pool).await;
        assert!(batches.len() == 1);
        assert!(batches[0][0].slot == 3);
        assert!(batches[0][0].precursors.len() == 1);
        pool.stop(false).await;
    }

    #[tokio::test]
    async fn failures_normalize_to_an_invalid_outcome() {
        let mut pool = pool(1);
        pool.prepare().await.unwrap();
        let request = Request {
            slot: 0,
            product: "CCOC(C)=O".to_string(),
            template: 1,
            settings: Default::default(),
        };
        pool.dispatch(request).await.unwrap();
        let batches = settle(&mut pool).await;
        assert!(batches.len() == 1);
        assert!(batches[0][0].precursors.is_empty());
        assert!(batches[0][0].plausibility == 0.0);
        pool.stop(false).await;
    }

    #[tokio::test]
    async fn stopped_pools_refuse_dispatch() {
        let mut pool = pool(1);
        pool.prepare().await.unwrap();
        pool.stop(true).await;
        let request = Request {
            slot: 0,
            product: "CCO".to_string(),
            template: 0,
            settings: Default::default(),
        };
        assert!(pool.dispatch(request).await.is_err());
    }

    #[tokio::test]
    async fn prepare_is_idempotent_while_workers_live() {
        let mut pool = pool(2);
        pool.prepare().await.unwrap();
        let workers = pool.workers.len();
        pool.prepare().await.unwrap();
        assert!(pool.workers.len() == workers);
        pool.stop(false).await;
    }
}
