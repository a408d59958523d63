//! NATS JetStream audit sink
//!
//! Publishes each event as JSON to `<prefix>.<resource>.<action>` on a
//! JetStream stream, giving durable, replayable audit trails. The trace id
//! is sent as `Nats-Msg-Id` so the stream drops accidental duplicates.

mod config;

pub use config::{NatsConfig, StorageType};

use crate::error::{AuditError, Result};
use crate::event::AuditEvent;
use crate::sink::AuditSink;
use async_nats::jetstream;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// NATS JetStream audit sink
pub struct NatsSink {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    config: Arc<NatsConfig>,
}

impl NatsSink {
    /// Connect to NATS and make sure the audit stream exists
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        let connect_opts = build_connect_options(&config);

        let client = connect_opts
            .connect(&config.url)
            .await
            .map_err(|e| AuditError::Connection(format!("{}: {}", config.url, e)))?;

        tracing::info!(url = %config.url, "Connected to NATS");

        let jetstream = jetstream::new(client.clone());
        ensure_stream(&jetstream, &config).await?;

        Ok(Self {
            client,
            jetstream,
            config: Arc::new(config),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Get the JetStream context for advanced usage
    pub fn jetstream_context(&self) -> &jetstream::Context {
        &self.jetstream
    }

    /// Publish an event, returning the JetStream sequence number
    pub async fn publish(&self, event: &AuditEvent) -> Result<u64> {
        let subject = self.config.build_subject(
            event.resource.as_ref().map(|r| r.as_str()),
            event.action.as_ref().map(|a| a.as_str()),
        );
        let payload = serde_json::to_vec(event)?;

        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Nats-Msg-Id", event.trace_id.to_string().as_str());

        let ack_fut = self
            .jetstream
            .publish_with_headers(subject.clone(), headers, payload.into())
            .await
            .map_err(|e| AuditError::Delivery {
                sink: "nats".to_string(),
                reason: format!("{}: {}", subject, e),
            })?;

        let ack = if let Some(timeout_secs) = self.config.publish_timeout_secs {
            tokio::time::timeout(Duration::from_secs(timeout_secs), ack_fut)
                .await
                .map_err(|_| {
                    AuditError::Timeout(format!(
                        "Publish ack timed out after {}s for subject '{}'",
                        timeout_secs, subject
                    ))
                })?
        } else {
            ack_fut.await
        }
        .map_err(|e| AuditError::Delivery {
            sink: "nats".to_string(),
            reason: format!("{}: ack failed: {}", subject, e),
        })?;

        tracing::debug!(
            trace_id = %event.trace_id,
            subject = %subject,
            sequence = ack.sequence,
            duplicate = ack.duplicate,
            "Audit event published"
        );

        Ok(ack.sequence)
    }
}

#[async_trait]
impl AuditSink for NatsSink {
    async fn deliver(&self, event: &AuditEvent) -> Result<()> {
        self.publish(event).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "nats"
    }

    async fn health(&self) -> Result<bool> {
        Ok(self.client.connection_state() == async_nats::connection::State::Connected)
    }
}

/// Build NATS connect options from config
fn build_connect_options(config: &NatsConfig) -> async_nats::ConnectOptions {
    let mut opts = async_nats::ConnectOptions::new()
        .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
        .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)));

    if let Some(ref token) = config.token {
        opts = opts.token(token.clone());
    }

    opts
}

/// Ensure the JetStream stream exists with the correct configuration
async fn ensure_stream(
    js: &jetstream::Context,
    config: &NatsConfig,
) -> Result<jetstream::stream::Stream> {
    let storage = match config.storage {
        StorageType::File => jetstream::stream::StorageType::File,
        StorageType::Memory => jetstream::stream::StorageType::Memory,
    };

    let stream_config = jetstream::stream::Config {
        name: config.stream_name.clone(),
        subjects: config.stream_subjects(),
        storage,
        max_messages: config.max_events,
        max_age: Duration::from_secs(config.max_age_secs),
        max_bytes: config.max_bytes,
        retention: jetstream::stream::RetentionPolicy::Limits,
        ..Default::default()
    };

    let stream = js
        .get_or_create_stream(stream_config)
        .await
        .map_err(|e| {
            AuditError::Stream(format!(
                "Failed to create/get stream '{}': {}",
                config.stream_name, e
            ))
        })?;

    tracing::info!(
        stream = %config.stream_name,
        subjects = ?config.stream_subjects(),
        "Audit stream ready"
    );

    Ok(stream)
}
