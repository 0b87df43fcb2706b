//! SQS-backed message queue.

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use tracing::{debug, warn};

use crate::error::{QueueError, QueueResult};
use crate::message::{QueueMessage, ReceiptToken};

/// Narrow queue capability the dispatcher polls against.
///
/// Tests substitute an in-memory fake; production uses [`SqsQueue`].
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Long-poll for up to `max_messages` messages, waiting at most
    /// `wait_seconds`. An empty result is not an error.
    async fn receive(&self, max_messages: i32, wait_seconds: i32)
        -> QueueResult<Vec<QueueMessage>>;

    /// Delete a message, consuming its receipt token.
    async fn delete(&self, receipt: ReceiptToken) -> QueueResult<()>;
}

/// SQS queue configuration.
#[derive(Debug, Clone)]
pub struct SqsConfig {
    /// Full queue URL
    pub queue_url: String,
}

impl SqsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Ok(Self {
            queue_url: std::env::var("QUEUE_URL")
                .map_err(|_| QueueError::config("QUEUE_URL not set"))?,
        })
    }
}

/// SQS notification queue client.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Create a new queue client from configuration.
    ///
    /// Region and credentials come from the default provider chain.
    pub async fn new(config: SqsConfig) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&sdk_config);

        Self {
            client,
            queue_url: config.queue_url,
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> QueueResult<Self> {
        let config = SqsConfig::from_env()?;
        Ok(Self::new(config).await)
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_seconds: i32,
    ) -> QueueResult<Vec<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .send()
            .await
            .map_err(|e| QueueError::receive_failed(e.to_string()))?;

        let raw = output.messages.unwrap_or_default();
        let mut messages = Vec::with_capacity(raw.len());

        for message in raw {
            let id = message.message_id.unwrap_or_default();
            let Some(receipt) = message.receipt_handle else {
                // A message without a receipt handle cannot be deleted;
                // skip it and let the visibility window return it.
                warn!("Message {} arrived without a receipt handle", id);
                continue;
            };
            let body = message.body.unwrap_or_default().into_bytes();

            messages.push(QueueMessage {
                id,
                body,
                receipt: ReceiptToken::new(receipt),
            });
        }

        debug!("Received {} messages from queue", messages.len());
        Ok(messages)
    }

    async fn delete(&self, receipt: ReceiptToken) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt.into_inner())
            .send()
            .await
            .map_err(|e| QueueError::delete_failed(e.to_string()))?;

        debug!("Deleted message from queue");
        Ok(())
    }
}
