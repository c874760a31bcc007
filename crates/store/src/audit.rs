//! Fire-and-forget audit sink.

use std::sync::Arc;

use warden_core::UserId;

use crate::model::NewAuditEntry;
use crate::repository::AuditStore;

/// Records privileged mutations as a side effect of the caller's success
/// path.
///
/// A failed write is logged and swallowed — it never turns a successful
/// domain mutation into an error response, and there is no retry. The only
/// latency the caller pays is the single sequential append.
#[derive(Clone)]
pub struct AuditSink {
    store: Arc<dyn AuditStore>,
}

impl AuditSink {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, actor: UserId, action: &str, details: impl Into<String>) {
        let entry = NewAuditEntry {
            actor,
            action: action.to_string(),
            details: details.into(),
        };
        if let Err(e) = self.store.append(entry).await {
            tracing::warn!(action, error = %e, "failed to record audit entry");
        }
    }
}
