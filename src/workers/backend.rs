use super::task::Batch;
use super::task::Request;

/// Dispatch surface between the coordinator and a worker fleet.
///
/// `prepare` must verify workers are reachable before any dispatch.
/// `drain` is non-blocking: it returns whatever result batches are
/// ready right now, in no particular order — the coordinator ingests
/// commutatively. `stop(soft)` refuses further dispatch; a hard stop
/// also terminates the fleet.
#[async_trait::async_trait]
pub trait Backend: Send {
    async fn prepare(&mut self) -> anyhow::Result<()>;
    async fn dispatch(&mut self, request: Request) -> anyhow::Result<()>;
    async fn drain(&mut self) -> Vec<Batch>;
    async fn stop(&mut self, soft: bool);
}
