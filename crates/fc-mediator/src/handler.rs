//! The two shapes of user code the mediator dispatches to: a request handler
//! returning a typed response, and an event handler with no response.

use async_trait::async_trait;
use fc_common::{Event, MediatorResult, Request};
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Handler<T: Request>: Send + Sync {
    async fn handle(&self, req: T, token: CancellationToken) -> MediatorResult<T::Response>;
}

#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    async fn handle(&self, event: E, token: CancellationToken) -> MediatorResult<()>;
}
