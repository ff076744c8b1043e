use std::fmt;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tracing::{info, warn};

use crate::broker::{BrokerError, QueueBroker};
use crate::routing::validator::ValidBid;

pub const QUEUE_SUFFIX: &str = "bid";
pub const ROUTED_MESSAGE: &str = "Bid routed successfully.";
pub const ROUTE_FAILED_MESSAGE: &str = "Failed to route bid.";

/// Name of the per-item queue a bid is published to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueName(String);

impl QueueName {
    /// `item_id` followed by `"bid"`, byte for byte.
    pub fn for_item(item_id: &str) -> Self {
        Self(format!("{item_id}{QUEUE_SUFFIX}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Routed { item_id: String, queue_name: QueueName },
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("queue {queue_name} for item {item_id} does not exist")]
    QueueNotFound { item_id: String, queue_name: QueueName },
    #[error("broker unavailable while routing to {queue_name}: {source}")]
    BrokerUnavailable {
        queue_name: QueueName,
        #[source]
        source: BrokerError,
    },
    #[error("failed to serialize bid for item {item_id}: {source}")]
    SerializationFailed {
        item_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ResponseError for RouteError {
    fn status_code(&self) -> StatusCode {
        match self {
            RouteError::QueueNotFound { .. } => StatusCode::NOT_FOUND,
            RouteError::BrokerUnavailable { .. } | RouteError::SerializationFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            RouteError::QueueNotFound { item_id, .. } => {
                format!("Queue for item {item_id} does not exist.")
            }
            _ => ROUTE_FAILED_MESSAGE.to_string(),
        };
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(body)
    }
}

/// Routes validated bids to their per-item queues over a shared broker session.
#[derive(Clone)]
pub struct BidRouter {
    broker: Arc<dyn QueueBroker>,
}

impl BidRouter {
    pub fn new(broker: Arc<dyn QueueBroker>) -> Self {
        Self { broker }
    }

    /// Resolve, check, then publish. Each step short-circuits the rest, and
    /// nothing is retried: one existence check and at most one publish.
    pub async fn route(&self, bid: &ValidBid) -> Result<RouteOutcome, RouteError> {
        let item_id = bid.item_id();
        let queue_name = QueueName::for_item(item_id);

        self.check_exists(item_id, &queue_name).await?;
        self.publish(bid, &queue_name).await?;

        info!(item_id, queue_name = %queue_name, "Routed bid");
        Ok(RouteOutcome::Routed {
            item_id: item_id.to_owned(),
            queue_name,
        })
    }

    async fn check_exists(&self, item_id: &str, queue_name: &QueueName) -> Result<(), RouteError> {
        match self.broker.queue_exists(queue_name.as_str()).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(item_id, queue_name = %queue_name, "Queue does not exist, rejecting bid");
                Err(RouteError::QueueNotFound {
                    item_id: item_id.to_owned(),
                    queue_name: queue_name.clone(),
                })
            }
            Err(source) => {
                warn!(queue_name = %queue_name, error = %source, "Queue existence check failed");
                Err(RouteError::BrokerUnavailable {
                    queue_name: queue_name.clone(),
                    source,
                })
            }
        }
    }

    async fn publish(&self, bid: &ValidBid, queue_name: &QueueName) -> Result<(), RouteError> {
        let payload =
            serde_json::to_vec(bid.bid()).map_err(|source| RouteError::SerializationFailed {
                item_id: bid.item_id().to_owned(),
                source,
            })?;

        self.broker
            .publish(queue_name.as_str(), &payload)
            .await
            .map_err(|source| {
                warn!(queue_name = %queue_name, error = %source, "Publish failed");
                RouteError::BrokerUnavailable {
                    queue_name: queue_name.clone(),
                    source,
                }
            })
    }
}
