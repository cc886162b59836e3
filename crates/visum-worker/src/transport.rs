//! AMQP transport layer.
//!
//! Owns the broker connection lifecycle: topology declaration, reconnect
//! with a fixed delay, single-message fetch, and publishing. The broker is
//! a required dependency, so connection attempts retry without bound.

use std::time::Duration;

use async_trait::async_trait;
use lapin::message::BasicGetMessage;
use lapin::options::{
    BasicGetOptions, BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use visum_core::{CompareResult, Result};

/// Queue carrying extraction tasks.
pub const EXTRACTION_QUEUE: &str = "ocr_image_queue";
/// Queue carrying compare tasks.
pub const COMPARE_QUEUE: &str = "compare_images_queue";
/// Queue compare results are published to.
pub const RESPONSE_QUEUE: &str = "response_queue";
/// Queue carrying maintenance tasks.
pub const MAINTENANCE_QUEUE: &str = "maintenance_queue";
/// Exchange failed messages are routed to.
pub const DEAD_LETTER_EXCHANGE: &str = "dlx_exchange";
/// Queue holding dead-lettered messages for offline inspection.
pub const DEAD_LETTER_QUEUE: &str = "dlx_queue";
/// Routing key binding the dead-letter queue to its exchange.
pub const DEAD_LETTER_ROUTING_KEY: &str = "rejected";

/// Delay between broker connection attempts.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Publishes compare results. Implemented by [`Transport`] in production
/// and by recording stubs in handler tests.
#[async_trait]
pub trait ResultPublisher: Send + Sync {
    async fn publish(&self, result: &CompareResult) -> Result<()>;
}

struct TransportState {
    connection: Connection,
    channel: Channel,
}

/// Broker connection wrapper with topology management.
pub struct Transport {
    config: visum_core::BrokerConfig,
    state: RwLock<TransportState>,
}

impl Transport {
    /// Connect to the broker, retrying with a fixed delay until it succeeds.
    pub async fn connect(config: visum_core::BrokerConfig) -> Self {
        let state = Self::establish(&config).await;
        Self {
            config,
            state: RwLock::new(state),
        }
    }

    /// Replace the current connection with a freshly established one.
    pub async fn reconnect(&self) {
        let mut state = self.state.write().await;
        *state = Self::establish(&self.config).await;
    }

    /// Whether the underlying connection still reports itself connected.
    pub async fn is_connected(&self) -> bool {
        let state = self.state.read().await;
        state.connection.status().connected()
    }

    async fn establish(config: &visum_core::BrokerConfig) -> TransportState {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match Self::try_connect(config).await {
                Ok(state) => {
                    info!(
                        host = %config.host,
                        port = config.port,
                        attempt,
                        "connected to message broker"
                    );
                    return state;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        attempt,
                        retry_secs = RETRY_DELAY.as_secs(),
                        "broker connection failed, retrying"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn try_connect(config: &visum_core::BrokerConfig) -> Result<TransportState> {
        let connection =
            Connection::connect(&config.amqp_uri(), ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        Self::declare_topology(&channel).await?;
        channel.basic_qos(1, BasicQosOptions::default()).await?;
        Ok(TransportState {
            connection,
            channel,
        })
    }

    /// Declare the dead-letter exchange, its queue, and the task queues.
    ///
    /// Declaration is idempotent on the broker as long as the arguments
    /// match, so it runs on every (re)connect.
    async fn declare_topology(channel: &Channel) -> Result<()> {
        let durable = QueueDeclareOptions {
            durable: true,
            ..QueueDeclareOptions::default()
        };

        channel
            .exchange_declare(
                DEAD_LETTER_EXCHANGE,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_declare(DEAD_LETTER_QUEUE, durable, FieldTable::default())
            .await?;
        channel
            .queue_bind(
                DEAD_LETTER_QUEUE,
                DEAD_LETTER_EXCHANGE,
                DEAD_LETTER_ROUTING_KEY,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let mut arguments = FieldTable::default();
        arguments.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(DEAD_LETTER_EXCHANGE.into()),
        );
        arguments.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(DEAD_LETTER_ROUTING_KEY.into()),
        );

        for queue in [
            EXTRACTION_QUEUE,
            COMPARE_QUEUE,
            RESPONSE_QUEUE,
            MAINTENANCE_QUEUE,
        ] {
            channel
                .queue_declare(queue, durable, arguments.clone())
                .await?;
            debug!(queue, "queue declared");
        }

        Ok(())
    }

    /// Fetch at most one message, leaving it unacknowledged.
    pub async fn fetch(&self, queue: &str) -> Result<Option<BasicGetMessage>> {
        let state = self.state.read().await;
        let message = state
            .channel
            .basic_get(queue, BasicGetOptions::default())
            .await?;
        Ok(message)
    }

    /// Number of ready messages in a queue, via a passive declare.
    pub async fn message_count(&self, queue: &str) -> Result<u32> {
        let state = self.state.read().await;
        let declared = state
            .channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    passive: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(declared.message_count())
    }

    /// Publish a compare result to the response queue, persistent.
    pub async fn publish_result(&self, result: &CompareResult) -> Result<()> {
        let payload = serde_json::to_vec(result)?;
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_correlation_id(Uuid::new_v4().to_string().into())
            .with_reply_to(RESPONSE_QUEUE.into())
            .with_delivery_mode(2);

        let state = self.state.read().await;
        state
            .channel
            .basic_publish(
                "",
                RESPONSE_QUEUE,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await?
            .await?;
        debug!(
            queue = RESPONSE_QUEUE,
            image_id = %result.image_id,
            match_count = result.similar_images.len(),
            "compare result published"
        );
        Ok(())
    }

    /// Re-publish a failed message body to the dead-letter exchange.
    pub async fn publish_dead_letter(&self, body: &[u8]) -> Result<()> {
        let state = self.state.read().await;
        state
            .channel
            .basic_publish(
                DEAD_LETTER_EXCHANGE,
                DEAD_LETTER_ROUTING_KEY,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResultPublisher for Transport {
    async fn publish(&self, result: &CompareResult) -> Result<()> {
        self.publish_result(result).await
    }
}
