//! Auto-batcher (C8): per-`(requestType, batchKey)` sharded queues that
//! coalesce concurrent requests for throughput. Generalized from a
//! per-group `DashMap<Arc<str>, mpsc::Sender<PoolTask>>` plus one worker per
//! group, replacing "one task per queued item" with "one coalesced flush per
//! window", and reusing the same cooperative idle-eviction shape
//! (`tokio::time::timeout` around the wait, recheck-empty before removal).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use fc_common::{MediatorError, MediatorResult, Request};
use metrics::{counter, histogram};
use rand::Rng;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::pipeline::Chain;

/// Per-`(requestType, batchKey)` batching options. A request type that
/// doesn't register one of these just never enters `register_batched_handler`
/// and pays nothing — per-type profiles are inert when batching is disabled.
#[derive(Debug, Clone)]
pub struct BatchProfile {
    pub max_batch_size: usize,
    pub batch_timeout: Duration,
    pub max_queue_length: usize,
    pub shard_idle_ttl: Duration,
    pub max_shards: usize,
    /// 0 = flush serially; N>0 = at most N requests in flight per flush.
    pub flush_degree: usize,
}

impl Default for BatchProfile {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            batch_timeout: Duration::from_millis(100),
            max_queue_length: 1000,
            shard_idle_ttl: Duration::from_secs(60),
            max_shards: 10_000,
            flush_degree: 0,
        }
    }
}

fn jittered(duration: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.9..=1.1);
    Duration::from_secs_f64((duration.as_secs_f64() * factor).max(0.0))
}

struct QueuedRequest<T: Request> {
    request: T,
    token: CancellationToken,
    responder: oneshot::Sender<MediatorResult<T::Response>>,
}

struct Shard<T: Request> {
    queue: AsyncMutex<VecDeque<QueuedRequest<T>>>,
    /// Guards "at most one flush in flight per shard" — a trigger that fires
    /// while a flush is running simply blocks here until its turn.
    flush_lock: AsyncMutex<()>,
    last_activity: parking_lot::Mutex<Instant>,
}

impl<T: Request> Shard<T> {
    fn new() -> Self {
        Self {
            queue: AsyncMutex::new(VecDeque::new()),
            flush_lock: AsyncMutex::new(()),
            last_activity: parking_lot::Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }
}

/// Per-request-type auto-batcher. One instance is created per batched
/// request type at registration time and shared behind an `Arc`.
pub struct AutoBatcher<T: Request> {
    chain: Chain<T>,
    profile: BatchProfile,
    batch_key: Box<dyn Fn(&T) -> String + Send + Sync>,
    type_name: &'static str,
    shards: DashMap<String, Arc<Shard<T>>>,
    overflow_count: std::sync::atomic::AtomicU64,
    housekeeping_started: AtomicBool,
}

impl<T: Request + Clone> AutoBatcher<T> {
    pub fn new(
        chain: Chain<T>,
        profile: BatchProfile,
        batch_key: impl Fn(&T) -> String + Send + Sync + 'static,
        type_name: &'static str,
    ) -> Self {
        Self {
            chain,
            profile,
            batch_key: Box::new(batch_key),
            type_name,
            shards: DashMap::new(),
            overflow_count: std::sync::atomic::AtomicU64::new(0),
            housekeeping_started: AtomicBool::new(false),
        }
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow_count.load(Ordering::SeqCst)
    }

    fn get_or_create_shard(&self, key: &str) -> Arc<Shard<T>> {
        if let Some(shard) = self.shards.get(key) {
            return shard.clone();
        }

        if self.shards.len() >= self.profile.max_shards {
            self.evict_one_idle_shard();
        }

        self.shards
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Shard::new()))
            .clone()
    }

    /// LRU-evicts one idle, empty shard to make room under `maxShards`. Best
    /// effort: if every shard is either active or non-empty, the new shard
    /// is admitted anyway rather than rejecting the request outright.
    fn evict_one_idle_shard(&self) {
        let mut oldest: Option<(String, Duration)> = None;
        for entry in self.shards.iter() {
            if let Ok(queue) = entry.value().queue.try_lock() {
                if queue.is_empty() {
                    let idle = entry.value().idle_for();
                    if oldest.as_ref().map(|(_, d)| idle > *d).unwrap_or(true) {
                        oldest = Some((entry.key().clone(), idle));
                    }
                }
            }
        }
        if let Some((key, _)) = oldest {
            self.shards.remove(&key);
        }
    }

    /// Enqueues `req`, returning its eventual result once the shard it lands
    /// in flushes. Spawns the shard's housekeeping sweep on first use. `token`
    /// rides along with the request and is observed by the chain at flush
    /// time, not at enqueue time — cancelling after enqueue but before flush
    /// still lets the behavior chain see the cancellation.
    pub async fn enqueue(self: &Arc<Self>, req: T, token: CancellationToken) -> MediatorResult<T::Response> {
        if !self.housekeeping_started.swap(true, Ordering::SeqCst) {
            let this = self.clone();
            tokio::spawn(async move { this.sweep_idle_shards().await });
        }

        let key = (self.batch_key)(&req);
        let shard = self.get_or_create_shard(&key);
        let (tx, rx) = oneshot::channel();

        let should_flush_now = {
            let mut queue = shard.queue.lock().await;
            if queue.len() >= self.profile.max_queue_length {
                if let Some(oldest) = queue.pop_front() {
                    self.overflow_count.fetch_add(1, Ordering::SeqCst);
                    counter!("mediator.batch.overflow", "type" => self.type_name).increment(1);
                    let _ = oldest.responder.send(
                        MediatorResult::failure(MediatorError::InternalError {
                            message: "batch queue overflow, oldest request dropped".to_string(),
                        })
                        .with_metadata_entry("overflow", "true"),
                    );
                }
            }
            queue.push_back(QueuedRequest { request: req, token, responder: tx });
            shard.touch();
            queue.len() >= self.profile.max_batch_size
        };

        if should_flush_now {
            let this = self.clone();
            let shard = shard.clone();
            tokio::spawn(async move { this.flush_shard(&shard).await });
        } else {
            let this = self.clone();
            let shard = shard.clone();
            let delay = jittered(self.profile.batch_timeout);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                this.flush_shard(&shard).await;
            });
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => MediatorResult::failure(MediatorError::Cancelled),
        }
    }

    /// Drains up to `maxBatchSize` queued requests and runs each through the
    /// chain. Requests whose awaiter already dropped (cancelled before
    /// start) are skipped without invoking the handler.
    async fn flush_shard(self: &Arc<Self>, shard: &Arc<Shard<T>>) {
        let _flush_guard = shard.flush_lock.lock().await;

        let batch: Vec<QueuedRequest<T>> = {
            let mut queue = shard.queue.lock().await;
            let drain_count = queue.len().min(self.profile.max_batch_size.max(1));
            queue.drain(..drain_count).collect()
        };

        if batch.is_empty() {
            return;
        }

        let started = Instant::now();
        histogram!("mediator.batch.size", "type" => self.type_name).record(batch.len() as f64);

        let live: Vec<QueuedRequest<T>> = batch
            .into_iter()
            .filter(|item| !item.responder.is_closed())
            .collect();

        if self.profile.flush_degree == 0 {
            for item in live {
                let result = (self.chain)(item.request, item.token).await;
                let _ = item.responder.send(result);
            }
        } else {
            let chunk_size = self.profile.flush_degree.max(1);
            let mut remaining = live;
            while !remaining.is_empty() {
                let tail = remaining.split_off(chunk_size.min(remaining.len()));
                let chunk = std::mem::replace(&mut remaining, tail);
                let runs = chunk.into_iter().map(|item| {
                    let chain = self.chain.clone();
                    async move {
                        let result = chain(item.request, item.token).await;
                        let _ = item.responder.send(result);
                    }
                });
                futures::future::join_all(runs).await;
            }
        }

        histogram!("mediator.batch.flush.duration", "type" => self.type_name)
            .record(started.elapsed().as_secs_f64());

        let remaining = shard.queue.lock().await.len();
        histogram!("mediator.batch.queue_length", "type" => self.type_name).record(remaining as f64);

        if remaining > 0 {
            let this = self.clone();
            let shard = shard.clone();
            tokio::spawn(async move { this.flush_shard(&shard).await });
        }
    }

    /// Cooperative idle-eviction sweep, grounded in `ProcessPool::run_group_worker`'s
    /// `tokio::time::timeout` + recheck-empty pattern, generalized to a
    /// periodic sweep over every shard rather than one task per shard.
    async fn sweep_idle_shards(self: Arc<Self>) {
        let interval = (self.profile.shard_idle_ttl / 2).max(Duration::from_millis(50));
        loop {
            tokio::time::sleep(interval).await;
            let idle_ttl = self.profile.shard_idle_ttl;
            let candidates: Vec<String> = self
                .shards
                .iter()
                .filter(|entry| entry.value().idle_for() >= idle_ttl)
                .map(|entry| entry.key().clone())
                .collect();

            for key in candidates {
                if let Some(shard) = self.shards.get(&key) {
                    let shard = shard.clone();
                    let still_idle = {
                        let queue = shard.queue.lock().await;
                        queue.is_empty() && shard.idle_for() >= idle_ttl
                    };
                    if still_idle {
                        debug!(shard = %key, type_name = self.type_name, "evicting idle batch shard");
                        self.shards.remove(&key);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use fc_common::MessageId;

    use super::*;
    use crate::behavior::BoxFuture;

    #[derive(Clone)]
    struct GetOrders {
        tenant_id: String,
    }

    impl Request for GetOrders {
        type Response = usize;

        fn message_id(&self) -> MessageId {
            MessageId(1)
        }
    }

    fn counting_chain(calls: Arc<AtomicU32>) -> Chain<GetOrders> {
        Arc::new(move |_req: GetOrders, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<usize>> {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                MediatorResult::success(n as usize)
            })
        })
    }

    fn tenant_key(req: &GetOrders) -> String {
        req.tenant_id.clone()
    }

    #[tokio::test]
    async fn s4_flush_by_size_coalesces_one_batch() {
        let calls = Arc::new(AtomicU32::new(0));
        let profile = BatchProfile {
            max_batch_size: 10,
            batch_timeout: Duration::from_millis(200),
            max_queue_length: 100,
            shard_idle_ttl: Duration::from_secs(60),
            max_shards: 100,
            flush_degree: 0,
        };
        let batcher = Arc::new(AutoBatcher::new(counting_chain(calls.clone()), profile, tenant_key, "GetOrders"));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let batcher = batcher.clone();
            handles.push(tokio::spawn(async move {
                batcher.enqueue(GetOrders { tenant_id: "T1".to_string() }, CancellationToken::new()).await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 10, "every request gets its own handler invocation");
    }

    #[tokio::test]
    async fn s5_flush_by_timer_when_below_batch_size() {
        let calls = Arc::new(AtomicU32::new(0));
        let profile = BatchProfile {
            max_batch_size: 10,
            batch_timeout: Duration::from_millis(50),
            max_queue_length: 100,
            shard_idle_ttl: Duration::from_secs(60),
            max_shards: 100,
            flush_degree: 0,
        };
        let batcher = Arc::new(AutoBatcher::new(counting_chain(calls.clone()), profile, tenant_key, "GetOrders"));

        let started = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let batcher = batcher.clone();
            handles.push(tokio::spawn(async move {
                batcher.enqueue(GetOrders { tenant_id: "T1".to_string() }, CancellationToken::new()).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // jitter is +/-10% of 50ms; allow generous slack for scheduling noise.
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn s6_overflow_fails_oldest_queued_request() {
        let profile = BatchProfile {
            max_batch_size: 1,
            batch_timeout: Duration::from_secs(60),
            max_queue_length: 4,
            shard_idle_ttl: Duration::from_secs(60),
            max_shards: 100,
            flush_degree: 0,
        };
        // A chain that never completes until explicitly released, so the
        // shard's queue stays full while we push past maxQueueLength.
        let release = Arc::new(tokio::sync::Notify::new());
        let release_handle = release.clone();
        let chain: Chain<GetOrders> =
            Arc::new(move |_req: GetOrders, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<usize>> {
                let release = release_handle.clone();
                Box::pin(async move {
                    release.notified().await;
                    MediatorResult::success(0)
                })
            });
        let batcher = Arc::new(AutoBatcher::new(chain, profile, tenant_key, "GetOrders"));

        // First request starts its own flush immediately (maxBatchSize=1) and
        // blocks on `release`, holding the flush lock so later flushes queue
        // behind it; the remaining five pile up in the shard's queue.
        let batcher_first = batcher.clone();
        let first = tokio::spawn(async move {
            batcher_first.enqueue(GetOrders { tenant_id: "T1".to_string() }, CancellationToken::new()).await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut queued = Vec::new();
        for _ in 0..6 {
            let batcher = batcher.clone();
            queued.push(tokio::spawn(async move {
                batcher.enqueue(GetOrders { tenant_id: "T1".to_string() }, CancellationToken::new()).await
            }));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(batcher.overflow_count(), 2, "queue length 4 with 6 arrivals overflows exactly twice");

        // Only the already-in-flight first flush is waiting on `release`; the
        // remaining queued requests are still blocked acquiring the shard's
        // flush lock and would hang forever on a single `notify_waiters`, so
        // this test only needs to confirm `first` unblocks before tearing
        // down the still-pending tasks.
        release.notify_waiters();
        let _ = first.await.unwrap();
        for handle in queued {
            handle.abort();
        }
    }
}
