use super::backend::Backend;
use super::task::Batch;
use super::task::Request;
use std::time::Duration;
use std::time::Instant;

/// Client side of an external task queue: submission yields an opaque
/// handle, results are polled for readiness, and in-flight work can be
/// revoked.
#[async_trait::async_trait]
pub trait Queue: Send + Sync {
    type Handle: Send;

    async fn submit(&self, request: Request) -> anyhow::Result<Self::Handle>;
    async fn poll(&self, handle: &Self::Handle) -> anyhow::Result<Option<Batch>>;
    async fn revoke(&self, handle: Self::Handle);
}

/// Remote worker fleet reached through a task queue. `prepare` proves
/// the fleet is alive with a canary round trip; `drain` polls the
/// in-flight handles; `stop` revokes whatever is still pending.
pub struct Remote<Q: Queue> {
    queue: Q,
    pending: Vec<Q::Handle>,
    timeout: Duration,
    running: bool,
}

impl<Q: Queue> Remote<Q> {
    pub fn new(queue: Q) -> Self {
        Self {
            queue,
            pending: Vec::new(),
            timeout: crate::CANARY_TIMEOUT,
            running: false,
        }
    }

    /// override how long the canary may take before the fleet is
    /// declared unreachable
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl<Q: Queue> Backend for Remote<Q> {
    async fn prepare(&mut self) -> anyhow::Result<()> {
        let canary = self.queue.submit(Request::canary()).await?;
        let start = Instant::now();
        loop {
            if self.queue.poll(&canary).await?.is_some() {
                break;
            }
            if start.elapsed() >= self.timeout {
                self.queue.revoke(canary).await;
                anyhow::bail!("no workers available");
            }
            tokio::time::sleep(crate::POLL_INTERVAL).await;
        }
        self.running = true;
        Ok(())
    }

    async fn dispatch(&mut self, request: Request) -> anyhow::Result<()> {
        anyhow::ensure!(self.running, "worker pool stopped");
        let handle = self.queue.submit(request).await?;
        self.pending.push(handle);
        Ok(())
    }

    async fn drain(&mut self) -> Vec<Batch> {
        let mut ready = Vec::new();
        let mut open = Vec::new();
        for handle in std::mem::take(&mut self.pending) {
            match self.queue.poll(&handle).await {
                Ok(Some(batch)) => ready.push(batch),
                Ok(None) => open.push(handle),
                Err(e) => {
                    // transient queue trouble: keep the handle and retry
                    log::debug!("poll failed, retrying later: {}", e);
                    open.push(handle);
                }
            }
        }
        self.pending = open;
        ready
    }

    async fn stop(&mut self, _soft: bool) {
        self.running = false;
        for handle in self.pending.drain(..) {
            self.queue.revoke(handle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::task::Outcome;
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// queue whose workers answer every request after `lag` polls, or
    /// never when `dead`
    struct Fixture {
        dead: bool,
        lag: usize,
        polls: Mutex<HashMap<u64, usize>>,
        next: Mutex<u64>,
        jobs: Mutex<HashMap<u64, Request>>,
        revoked: Mutex<Vec<u64>>,
    }

    impl Fixture {
        fn new(dead: bool, lag: usize) -> Self {
            Self {
                dead,
                lag,
                polls: Mutex::new(HashMap::new()),
                next: Mutex::new(0),
                jobs: Mutex::new(HashMap::new()),
                revoked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Queue for Fixture {
        type Handle = u64;

        async fn submit(&self, request: Request) -> anyhow::Result<u64> {
            let mut next = self.next.lock().unwrap();
            *next += 1;
            self.jobs.lock().unwrap().insert(*next, request);
            Ok(*next)
        }
        async fn poll(&self, handle: &u64) -> anyhow::Result<Option<Batch>> {
            if self.dead {
                return Ok(None);
            }
            let jobs = self.jobs.lock().unwrap();
            let request = jobs.get(handle).unwrap();
            if request.template != crate::CANARY_TEMPLATE {
                let mut polls = self.polls.lock().unwrap();
                let seen = polls.entry(*handle).or_insert(0);
                *seen += 1;
                if *seen <= self.lag {
                    return Ok(None);
                }
            }
            Ok(Some(vec![Outcome::invalid(request)]))
        }
        async fn revoke(&self, handle: u64) {
            self.revoked.lock().unwrap().push(handle);
        }
    }

    #[tokio::test]
    async fn canary_timeout_means_no_workers() {
        let mut remote =
            Remote::new(Fixture::new(true, 0)).timeout(Duration::from_millis(30));
        let err = remote.prepare().await.unwrap_err();
        assert!(err.to_string().contains("no workers available"));
        assert!(remote.queue.revoked.lock().unwrap().len() == 1);
    }

    #[tokio::test]
    async fn drain_collects_ready_handles_and_keeps_the_rest() {
        let mut remote = Remote::new(Fixture::new(false, 1));
        remote.prepare().await.unwrap();
        let request = Request {
            slot: 0,
            product: "CCO".to_string(),
            template: 4,
            settings: Default::default(),
        };
        remote.dispatch(request.clone()).await.unwrap();
        remote.dispatch(request).await.unwrap();
        // first pass: both handles lag one poll behind
        assert!(remote.drain().await.is_empty());
        assert!(remote.pending.len() == 2);
        // second pass: both land
        assert!(remote.drain().await.len() == 2);
        assert!(remote.pending.is_empty());
    }

    #[tokio::test]
    async fn stop_revokes_in_flight_work() {
        let mut remote = Remote::new(Fixture::new(false, 100));
        remote.prepare().await.unwrap();
        let request = Request {
            slot: 0,
            product: "CCO".to_string(),
            template: 4,
            settings: Default::default(),
        };
        remote.dispatch(request).await.unwrap();
        remote.stop(true).await;
        // the canary resolved; only the dispatched job is revoked
        assert!(remote.queue.revoked.lock().unwrap().len() == 1);
        assert!(remote.dispatch(Request::canary()).await.is_err());
    }
}
