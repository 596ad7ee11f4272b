//! Toy request/event types exercising the mediator core end to end.

use async_trait::async_trait;
use fc_common::{Event, MediatorResult, MessageId, Request};
use fc_mediator::{EventHandler, Handler, Validatable};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    pub message_id: MessageId,
    pub order_id: String,
}

impl Request for CreateOrder {
    type Response = String;

    fn message_id(&self) -> MessageId {
        self.message_id
    }
}

impl Validatable for CreateOrder {
    fn validate(&self) -> Result<(), String> {
        if self.order_id.trim().is_empty() {
            Err("order_id must not be empty".into())
        } else {
            Ok(())
        }
    }
}

pub struct CreateOrderHandler;

impl CreateOrderHandler {
    pub fn new(_id_gen: std::sync::Arc<fc_idgen::IdGenerator>) -> Self {
        Self
    }
}

#[async_trait]
impl Handler<CreateOrder> for CreateOrderHandler {
    async fn handle(&self, req: CreateOrder, _token: CancellationToken) -> MediatorResult<String> {
        MediatorResult::success(format!("order accepted: {}", req.order_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetOrderTotal {
    pub message_id: MessageId,
    pub tenant_id: String,
    pub order_id: String,
}

impl Request for GetOrderTotal {
    type Response = u64;

    fn message_id(&self) -> MessageId {
        self.message_id
    }
}

/// Pretends to look up a total; every request in the same batch shares one
/// flush so this stands in for the "N lookups become one round trip"
/// behavior auto-batching exists for.
pub struct GetOrderTotalHandler;

#[async_trait]
impl Handler<GetOrderTotal> for GetOrderTotalHandler {
    async fn handle(&self, req: GetOrderTotal, _token: CancellationToken) -> MediatorResult<u64> {
        MediatorResult::success(req.order_id.len() as u64 * 100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub message_id: MessageId,
    pub order_id: String,
}

impl Event for OrderPlaced {
    fn message_id(&self) -> MessageId {
        self.message_id
    }
}

pub struct OrderPlacedLogger;

#[async_trait]
impl EventHandler<OrderPlaced> for OrderPlacedLogger {
    async fn handle(&self, event: OrderPlaced, _token: CancellationToken) -> MediatorResult<()> {
        info!(order_id = %event.order_id, "order placed");
        MediatorResult::success(())
    }
}
