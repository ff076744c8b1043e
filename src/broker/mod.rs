//! Broker abstraction
//!
//! The router only needs three things from a message broker: a passive
//! existence check, a fire-and-forget publish, and an orderly close at
//! shutdown. `AmqpBroker` provides them over RabbitMQ; tests use
//! `test_support::broker::InMemoryBroker`.

pub mod amqp;

use async_trait::async_trait;
use thiserror::Error;

pub use amqp::AmqpBroker;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to connect to broker: {0}")]
    Connect(#[source] lapin::Error),
    #[error("failed to open broker channel: {0}")]
    Channel(#[source] lapin::Error),
    #[error("broker connection is closed")]
    Disconnected,
    #[error("broker rejected the operation: {0}")]
    Protocol(#[source] lapin::Error),
    #[error("broker error: {0}")]
    Other(String),
}

/// AMQP encodes queue names as short strings: one length byte, then the bytes.
pub const MAX_QUEUE_NAME_LEN: usize = u8::MAX as usize;

/// Whether `queue` can be put on the wire at all. Longer names would be
/// sent with a truncated length prefix, which the server answers by closing
/// the whole connection.
pub fn is_encodable_queue_name(queue: &str) -> bool {
    queue.len() <= MAX_QUEUE_NAME_LEN
}

/// Operations the bid router performs against a broker session.
///
/// Implementations are shared by every request in the process, so they
/// must be safe to call concurrently.
#[async_trait]
pub trait QueueBroker: Send + Sync {
    /// Passive existence check. Must never create `queue` or touch its messages.
    async fn queue_exists(&self, queue: &str) -> Result<bool, BrokerError>;

    /// Hand `payload` to the broker for `queue` without waiting for delivery.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_names_are_limited_to_one_length_byte() {
        assert!(is_encodable_queue_name(""));
        assert!(is_encodable_queue_name(&"x".repeat(255)));
        assert!(!is_encodable_queue_name(&"x".repeat(256)));
        // The limit counts bytes, not characters.
        assert!(!is_encodable_queue_name(&"é".repeat(128)));
    }
}
