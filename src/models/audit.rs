//! Audit logging data structures for signed request validation.

use crate::models::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Log target used for validation audit events
pub const AUDIT_TARGET: &str = "signed_request_audit";

/// Types of validation events for audit logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationEventType {
    SignatureAccepted,
    IncompletePayload,
    InvalidSignature,
    ExpiredSignature,
    MalformedTimestamp,
}

/// Outcomes of validation events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Success,
    Failure,
}

/// Structured audit log entry for one validation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationAuditEvent {
    pub event_type: ValidationEventType,
    pub outcome: ValidationOutcome,
    pub timestamp: Timestamp,
    pub app_id: String,
    pub network_eid: Option<String>,
    pub user_eid: Option<String>,
    pub issued_at: Option<String>,
    pub details: Option<String>,
}

impl ValidationAuditEvent {
    /// Create an event; the outcome follows from the event type
    pub fn new(event_type: ValidationEventType, app_id: &str, timestamp: Timestamp) -> Self {
        let outcome = match event_type {
            ValidationEventType::SignatureAccepted => ValidationOutcome::Success,
            _ => ValidationOutcome::Failure,
        };
        Self {
            event_type,
            outcome,
            timestamp,
            app_id: app_id.to_string(),
            network_eid: None,
            user_eid: None,
            issued_at: None,
            details: None,
        }
    }

    /// Add the network and user the request claims to come from
    pub fn with_subject(mut self, network_eid: Option<String>, user_eid: Option<String>) -> Self {
        self.network_eid = network_eid;
        self.user_eid = user_eid;
        self
    }

    pub fn with_issued_at(mut self, issued_at: Option<String>) -> Self {
        self.issued_at = issued_at;
        self
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }

    /// Log the audit event using structured logging
    ///
    /// Accepted requests log at `info`, rejected ones at `warn`.
    pub fn log(&self) {
        match self.outcome {
            ValidationOutcome::Success => info!(
                target: AUDIT_TARGET,
                event_type = ?self.event_type,
                outcome = ?self.outcome,
                timestamp = %self.timestamp,
                app_id = %self.app_id,
                network_eid = ?self.network_eid,
                user_eid = ?self.user_eid,
                issued_at = ?self.issued_at,
                "Signed request accepted"
            ),
            ValidationOutcome::Failure => warn!(
                target: AUDIT_TARGET,
                event_type = ?self.event_type,
                outcome = ?self.outcome,
                timestamp = %self.timestamp,
                app_id = %self.app_id,
                network_eid = ?self.network_eid,
                user_eid = ?self.user_eid,
                issued_at = ?self.issued_at,
                details = ?self.details,
                "Signed request rejected"
            ),
        }
    }
}
