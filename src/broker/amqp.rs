use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{is_encodable_queue_name, BrokerError, QueueBroker, MAX_QUEUE_NAME_LEN};

/// Publishes through the AMQP default exchange, so the routing key is the queue name.
const DEFAULT_EXCHANGE: &str = "";
const REPLY_SUCCESS: u16 = 200;

/// RabbitMQ session shared by every request: one connection and one channel.
///
/// The channel sits behind a mutex so existence checks and publishes from
/// concurrent requests are serialized on it.
pub struct AmqpBroker {
    connection: Connection,
    channel: Mutex<Channel>,
}

impl AmqpBroker {
    pub async fn connect(uri: &str) -> Result<Self, BrokerError> {
        let connection = Connection::connect(uri, ConnectionProperties::default())
            .await
            .map_err(BrokerError::Connect)?;

        let channel = connection
            .create_channel()
            .await
            .map_err(BrokerError::Channel)?;

        info!(channel_id = channel.id(), "Opened broker channel");

        Ok(Self {
            connection,
            channel: Mutex::new(channel),
        })
    }

    /// Replace `channel` with a fresh one on the shared connection if the
    /// server has closed it.
    async fn ensure_open(&self, channel: &mut Channel) -> Result<(), BrokerError> {
        if channel.status().connected() {
            return Ok(());
        }
        self.reopen(channel).await
    }

    async fn reopen(&self, channel: &mut Channel) -> Result<(), BrokerError> {
        if !self.connection.status().connected() {
            return Err(BrokerError::Disconnected);
        }

        *channel = self
            .connection
            .create_channel()
            .await
            .map_err(BrokerError::Channel)?;
        debug!(channel_id = channel.id(), "Reopened broker channel");
        Ok(())
    }
}

fn is_not_found(err: &lapin::Error) -> bool {
    matches!(
        err,
        lapin::Error::ProtocolError(amqp_error)
            if matches!(amqp_error.kind(), AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND))
    )
}

#[async_trait]
impl QueueBroker for AmqpBroker {
    async fn queue_exists(&self, queue: &str) -> Result<bool, BrokerError> {
        if !is_encodable_queue_name(queue) {
            // No such queue can have been declared.
            debug!(len = queue.len(), "Queue name exceeds AMQP limit, treating as missing");
            return Ok(false);
        }

        let mut channel = self.channel.lock().await;
        self.ensure_open(&mut channel).await?;

        let options = QueueDeclareOptions {
            passive: true,
            ..QueueDeclareOptions::default()
        };

        match channel
            .queue_declare(queue, options, FieldTable::default())
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => {
                // The server closes the channel after a failed passive declare.
                if let Err(reopen) = self.reopen(&mut channel).await {
                    warn!(error = %reopen, "Could not reopen channel after passive declare miss");
                }
                Ok(false)
            }
            Err(err) => Err(BrokerError::Protocol(err)),
        }
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        if !is_encodable_queue_name(queue) {
            return Err(BrokerError::Other(format!(
                "queue name is {} bytes, limit is {MAX_QUEUE_NAME_LEN}",
                queue.len()
            )));
        }

        let mut channel = self.channel.lock().await;
        self.ensure_open(&mut channel).await?;

        // The returned confirm is dropped: publisher confirms are not enabled.
        channel
            .basic_publish(
                DEFAULT_EXCHANGE,
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(BrokerError::Protocol)?;

        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        let channel = self.channel.lock().await;
        if channel.status().connected() {
            channel
                .close(REPLY_SUCCESS, "shutdown")
                .await
                .map_err(BrokerError::Protocol)?;
        }
        if self.connection.status().connected() {
            self.connection
                .close(REPLY_SUCCESS, "shutdown")
                .await
                .map_err(BrokerError::Protocol)?;
        }
        info!("Closed broker connection");
        Ok(())
    }
}
