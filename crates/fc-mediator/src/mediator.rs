//! The mediator itself (C7): resolves exactly one handler per request type
//! and fans a published event out to every handler registered for its type.
//! Dispatch never touches reflection — every lookup keys off `TypeId`, set
//! once at build time by `MediatorBuilder`.

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use fc_common::{Event, MediatorError, MediatorResult, Request};
use futures::future::join_all;
use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;

use crate::batcher::{AutoBatcher, BatchProfile};
use crate::behavior::Behavior;
use crate::handler::{EventHandler, Handler};
use crate::pipeline::{self, Chain};

type AnyBox = Box<dyn Any + Send + Sync>;

enum Dispatch<T: Request> {
    Direct(Chain<T>),
    Batched(Arc<AutoBatcher<T>>),
}

/// Central dispatch point. Built once via `MediatorBuilder::build`, then
/// shared behind an `Arc` for the life of the process.
pub struct Mediator {
    requests: DashMap<TypeId, AnyBox>,
    events: DashMap<TypeId, AnyBox>,
}

impl Mediator {
    /// Dispatches `req` to its registered handler through the composed
    /// behavior chain (or the auto-batcher standing in front of it).
    /// `HandlerFailed{handler_not_registered}` when nothing is registered
    /// for `T` — this is a runtime error,
    /// never a registration-time panic. `token` propagates to every
    /// behavior, the handler, and any transport/store call reachable from
    /// them; a token cancelled before dispatch even starts short-circuits
    /// with `MediatorError::Cancelled`.
    pub async fn send<T>(&self, req: T, token: CancellationToken) -> MediatorResult<T::Response>
    where
        T: Request + Clone,
    {
        if token.is_cancelled() {
            return MediatorResult::failure(MediatorError::Cancelled);
        }

        let type_id = TypeId::of::<T>();
        let Some(entry) = self.requests.get(&type_id) else {
            counter!("mediator.errors.count", "error_type" => "HandlerFailed").increment(1);
            return MediatorResult::failure(MediatorError::handler_not_registered(std::any::type_name::<T>()));
        };
        let dispatch = entry
            .downcast_ref::<Dispatch<T>>()
            .expect("request registry corrupted: entry stored under the wrong TypeId");

        let started = Instant::now();
        counter!("mediator.commands.count").increment(1);
        let result = match dispatch {
            Dispatch::Direct(chain) => chain(req, token).await,
            Dispatch::Batched(batcher) => batcher.enqueue(req, token).await,
        };
        histogram!("mediator.commands.duration").record(started.elapsed().as_secs_f64());
        if let Some(code) = result.error_code() {
            counter!("mediator.errors.count", "error_type" => code).increment(1);
        }
        result
    }

    /// Fans `event` out to every handler registered for `E`, concurrently,
    /// with no ordering guarantee across handlers. Zero registered handlers
    /// is legal and returns success. Any handler failure turns the whole
    /// publish into `HandlerFailed`, naming how many of how many failed.
    /// Every handler observes a clone of the same `token`.
    pub async fn publish<E>(&self, event: E, token: CancellationToken) -> MediatorResult<()>
    where
        E: Event,
    {
        if token.is_cancelled() {
            return MediatorResult::failure(MediatorError::Cancelled);
        }

        counter!("mediator.events.count").increment(1);
        let type_id = TypeId::of::<E>();
        let Some(entry) = self.events.get(&type_id) else {
            return MediatorResult::success(());
        };
        let handlers = entry
            .downcast_ref::<Vec<Arc<dyn EventHandler<E>>>>()
            .expect("event registry corrupted: entry stored under the wrong TypeId")
            .clone();
        drop(entry);

        let outcomes = join_all(handlers.into_iter().map(|handler| {
            let event = event.clone();
            let token = token.clone();
            async move { handler.handle(event, token).await }
        }))
        .await;

        let total = outcomes.len();
        let failed = outcomes.iter().filter(|r| r.is_err()).count();
        if failed == 0 {
            MediatorResult::success(())
        } else {
            counter!("mediator.errors.count", "error_type" => "HandlerFailed").increment(1);
            MediatorResult::failure(MediatorError::handler_failed(format!(
                "{failed} of {total} event handlers failed"
            )))
        }
    }

    pub fn has_handler<T: Request>(&self) -> bool {
        self.requests.contains_key(&TypeId::of::<T>())
    }
}

/// Registration-time builder. Consumed by `build()` into an immutable,
/// `Arc`-shared `Mediator` — there is no mutation after startup.
pub struct MediatorBuilder {
    requests: DashMap<TypeId, AnyBox>,
    events: DashMap<TypeId, AnyBox>,
    enable_auto_batching: bool,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
            events: DashMap::new(),
            enable_auto_batching: true,
        }
    }

    /// Global kill switch for batching. When `false`, every
    /// `register_batched_handler` call falls back to direct dispatch —
    /// per-type batch profiles are inert rather than erroring.
    pub fn with_auto_batching(mut self, enabled: bool) -> Self {
        self.enable_auto_batching = enabled;
        self
    }

    /// Registers the handler for `T`, wrapped in `behaviors` composed by
    /// priority (highest outermost). Registering `T` a second time replaces
    /// the first registration.
    pub fn register_handler<T, H>(self, handler: Arc<H>, behaviors: Vec<Arc<dyn Behavior<T>>>) -> Self
    where
        T: Request,
        H: Handler<T> + 'static,
    {
        let chain = pipeline::compose(handler, behaviors);
        self.requests.insert(TypeId::of::<T>(), Box::new(Dispatch::Direct(chain)));
        self
    }

    /// Same as `register_handler`, but routes `T` through a per-`batch_key`
    /// auto-batcher (C8) instead of dispatching immediately.
    pub fn register_batched_handler<T, H>(
        self,
        handler: Arc<H>,
        behaviors: Vec<Arc<dyn Behavior<T>>>,
        batch_key: impl Fn(&T) -> String + Send + Sync + 'static,
        profile: BatchProfile,
    ) -> Self
    where
        T: Request + Clone,
        H: Handler<T> + 'static,
    {
        let chain = pipeline::compose(handler, behaviors);
        let dispatch = if self.enable_auto_batching {
            Dispatch::Batched(Arc::new(AutoBatcher::new(
                chain,
                profile,
                batch_key,
                std::any::type_name::<T>(),
            )))
        } else {
            Dispatch::Direct(chain)
        };
        self.requests.insert(TypeId::of::<T>(), Box::new(dispatch));
        self
    }

    /// Adds `handler` to the set invoked when `E` is published. Multiple
    /// calls for the same `E` accumulate rather than replace.
    pub fn register_event_handler<E, H>(self, handler: Arc<H>) -> Self
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let type_id = TypeId::of::<E>();
        let boxed: Arc<dyn EventHandler<E>> = handler;
        self.events
            .entry(type_id)
            .and_modify(|entry| {
                entry
                    .downcast_mut::<Vec<Arc<dyn EventHandler<E>>>>()
                    .expect("event registry corrupted: entry stored under the wrong TypeId")
                    .push(boxed.clone());
            })
            .or_insert_with(|| Box::new(vec![boxed]));
        self
    }

    pub fn build(self) -> Arc<Mediator> {
        Arc::new(Mediator {
            requests: self.requests,
            events: self.events,
        })
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
