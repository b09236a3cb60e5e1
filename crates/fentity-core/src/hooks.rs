//! Hooks for integrating an external audit/log sink
//!
//! The replacement workflow reports every completed or failed swap through the
//! `AuditSink` trait. Transport and format of the events are up to the
//! implementation; the core only guarantees which events are emitted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a replacement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementOutcome {
    Replaced,
    Failed,
}

/// Structured event emitted by the replacement workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementEvent {
    pub file_id: Uuid,
    pub old_name: String,
    pub new_name: String,
    pub outcome: ReplacementOutcome,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Receiver for audit events
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_replacement(&self, event: ReplacementEvent);
}

/// No-op implementation for when auditing is disabled
pub struct NoOpAuditSink;

#[async_trait]
impl AuditSink for NoOpAuditSink {
    async fn record_replacement(&self, _event: ReplacementEvent) {}
}

/// Writes audit events to the `fentity::audit` tracing target
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_replacement(&self, event: ReplacementEvent) {
        match event.outcome {
            ReplacementOutcome::Replaced => tracing::info!(
                target: "fentity::audit",
                file_id = %event.file_id,
                old_name = %event.old_name,
                new_name = %event.new_name,
                "File {} was replaced by {}",
                event.old_name,
                event.new_name
            ),
            ReplacementOutcome::Failed => tracing::warn!(
                target: "fentity::audit",
                file_id = %event.file_id,
                old_name = %event.old_name,
                new_name = %event.new_name,
                detail = event.detail.as_deref().unwrap_or(""),
                "File {} failed to be replaced by {}",
                event.old_name,
                event.new_name
            ),
        }
    }
}
