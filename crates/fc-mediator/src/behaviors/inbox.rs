//! Standard priority-600 behavior: idempotent receive. A message seen before
//! short-circuits with its cached response instead of re-running the
//! handler (Invariant 6 / Scenario S2 — exactly one handler invocation for
//! concurrent sends of the same `messageId`).
//!
//! Per the Open Question decision in DESIGN.md, the cache holds the actual
//! `R`, not a marker. `fc-store`'s `InboxStore` only offers `contains`/
//! `record`, which is not atomic test-and-set on its own, so this behavior
//! layers a per-message-id `tokio::sync::Mutex` in a `DashMap`-keyed lock
//! table, rather than a single global lock, to serialize concurrent
//! first-seen races.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use fc_common::{MediatorResult, Request, SerializerRegistry};
use fc_store::InboxStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::behavior::{priority, Behavior, Next};

pub struct InboxBehavior<T: Request> {
    store: Arc<dyn InboxStore>,
    serializer: SerializerRegistry,
    ttl: Duration,
    in_flight: DashMap<i64, Arc<AsyncMutex<()>>>,
    _marker: PhantomData<fn(T)>,
}

impl<T: Request> InboxBehavior<T> {
    pub fn new(store: Arc<dyn InboxStore>, ttl: Duration) -> Self {
        Self {
            store,
            serializer: SerializerRegistry::json(),
            ttl,
            in_flight: DashMap::new(),
            _marker: PhantomData,
        }
    }

    fn lock_for(&self, key: i64) -> Arc<AsyncMutex<()>> {
        self.in_flight.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

#[async_trait]
impl<T> Behavior<T> for InboxBehavior<T>
where
    T: Request,
    T::Response: Serialize + DeserializeOwned,
{
    fn priority(&self) -> i32 {
        priority::IDEMPOTENCY
    }

    async fn invoke(&self, req: T, token: CancellationToken, next: Next<T>) -> MediatorResult<T::Response> {
        let key = req.message_id().value();
        let lock = self.lock_for(key);
        let guard = lock.lock().await;

        if let Ok(true) = self.store.contains(req.message_id(), token.clone()).await {
            if let Ok(Some(bytes)) = self.store.get_cached_response(req.message_id(), token.clone()).await {
                if let Ok(value) = self.serializer.deserialize::<T::Response>(&bytes) {
                    drop(guard);
                    self.cleanup(key, &lock);
                    return MediatorResult::success(value).with_metadata_entry("inbox", "replayed");
                }
            }
        }

        let result = next.run(req, token.clone()).await;
        if let MediatorResult::Ok { value, .. } = &result {
            if let Ok(bytes) = self.serializer.serialize(value) {
                let _ = self.store.record(
                    fc_common::MessageId(key),
                    bytes,
                    self.ttl,
                    token,
                ).await;
            }
        }

        drop(guard);
        self.cleanup(key, &lock);
        result
    }
}

impl<T: Request> InboxBehavior<T> {
    /// Drops the per-message lock entry once nobody else holds a reference
    /// to it, so the map doesn't grow without bound across distinct ids.
    fn cleanup(&self, key: i64, lock: &Arc<AsyncMutex<()>>) {
        // 2 == the map's own reference plus this local clone; anything higher
        // means another concurrent call is still waiting on the same id.
        if Arc::strong_count(lock) == 2 {
            self.in_flight.remove_if(&key, |_, v| Arc::ptr_eq(v, lock));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use fc_common::MessageId;
    use fc_store::InMemoryInboxStore;

    use super::*;
    use crate::behavior::BoxFuture;

    #[derive(Clone)]
    struct CreateOrder {
        message_id: MessageId,
    }

    impl Request for CreateOrder {
        type Response = String;

        fn message_id(&self) -> MessageId {
            self.message_id
        }
    }

    #[tokio::test]
    async fn s2_concurrent_sends_of_same_message_id_invoke_handler_once() {
        let behavior = Arc::new(InboxBehavior::<CreateOrder>::new(
            Arc::new(InMemoryInboxStore::new()),
            Duration::from_secs(86_400),
        ));
        let invocations = Arc::new(AtomicU32::new(0));
        let req = CreateOrder { message_id: MessageId(42) };

        let mut handles = Vec::new();
        for _ in 0..3 {
            let behavior = behavior.clone();
            let invocations = invocations.clone();
            let req = req.clone();
            handles.push(tokio::spawn(async move {
                let invocations = invocations.clone();
                let next = Next::new(move |_req: CreateOrder, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<String>> {
                    let invocations = invocations.clone();
                    Box::pin(async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        // give concurrent callers a chance to race past the lock
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        MediatorResult::success("created:A".to_string())
                    })
                });
                behavior.invoke(req, CancellationToken::new(), next).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1, "handler must run at most once per messageId");
        for result in &results {
            assert_eq!(result.value(), Some(&"created:A".to_string()));
        }
    }

    #[tokio::test]
    async fn second_invoke_after_completion_replays_cached_response() {
        let behavior = InboxBehavior::<CreateOrder>::new(Arc::new(InMemoryInboxStore::new()), Duration::from_secs(60));
        let req = CreateOrder { message_id: MessageId(7) };

        let calls = Arc::new(AtomicU32::new(0));
        let calls_handle = calls.clone();
        let next = Next::new(move |_req: CreateOrder, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<String>> {
            let calls = calls_handle.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                MediatorResult::success("first".to_string())
            })
        });
        let first = behavior.invoke(req.clone(), CancellationToken::new(), next).await;
        assert_eq!(first.value(), Some(&"first".to_string()));

        let calls_handle = calls.clone();
        let next = Next::new(move |_req: CreateOrder, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<String>> {
            let calls = calls_handle.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                MediatorResult::success("second".to_string())
            })
        });
        let second = behavior.invoke(req, CancellationToken::new(), next).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1, "next() must not run again on replay");
        assert_eq!(second.value(), Some(&"first".to_string()));
        assert_eq!(second.metadata().get("inbox").map(String::as_str), Some("replayed"));
    }
}
