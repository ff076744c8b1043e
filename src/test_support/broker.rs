use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::broker::{is_encodable_queue_name, BrokerError, QueueBroker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    CheckExists(String),
    Publish(String),
}

#[derive(Default)]
struct State {
    queues: BTreeMap<String, Vec<Vec<u8>>>,
    calls: Vec<BrokerCall>,
    fail_checks: bool,
    fail_publishes: bool,
    closed: bool,
}

/// Broker double that keeps queues in memory and records every call made on it.
///
/// Queues are only ever created through `with_queues`/`declare_queue`,
/// never by the broker operations themselves. Queue names longer than AMQP
/// allows are never reported as existing.
#[derive(Default)]
pub struct InMemoryBroker {
    state: Mutex<State>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queues<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let broker = Self::new();
        for name in names {
            broker.declare_queue(name);
        }
        broker
    }

    pub fn declare_queue(&self, name: impl Into<String>) {
        self.state().queues.entry(name.into()).or_default();
    }

    /// Make every subsequent existence check fail as if the broker were unreachable.
    pub fn fail_existence_checks(&self) {
        self.state().fail_checks = true;
    }

    pub fn fail_publishes(&self) {
        self.state().fail_publishes = true;
    }

    pub fn calls(&self) -> Vec<BrokerCall> {
        self.state().calls.clone()
    }

    pub fn publish_attempts(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, BrokerCall::Publish(_)))
            .count()
    }

    /// Messages accepted on `queue`, oldest first.
    pub fn published(&self, queue: &str) -> Vec<Vec<u8>> {
        self.state().queues.get(queue).cloned().unwrap_or_default()
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.state().queues.keys().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl QueueBroker for InMemoryBroker {
    async fn queue_exists(&self, queue: &str) -> Result<bool, BrokerError> {
        let mut state = self.state();
        state.calls.push(BrokerCall::CheckExists(queue.to_string()));
        if state.closed {
            return Err(BrokerError::Disconnected);
        }
        if state.fail_checks {
            return Err(BrokerError::Other("connection refused".to_string()));
        }
        Ok(is_encodable_queue_name(queue) && state.queues.contains_key(queue))
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let mut state = self.state();
        state.calls.push(BrokerCall::Publish(queue.to_string()));
        if state.closed {
            return Err(BrokerError::Disconnected);
        }
        if state.fail_publishes {
            return Err(BrokerError::Other("channel closed mid-publish".to_string()));
        }
        if !is_encodable_queue_name(queue) {
            return Err(BrokerError::Other("queue name too long".to_string()));
        }
        // Publishing to an unknown queue through the default exchange is
        // silently dropped by AMQP brokers; mirror that.
        if let Some(messages) = state.queues.get_mut(queue) {
            messages.push(payload.to_vec());
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.state().closed = true;
        Ok(())
    }
}
