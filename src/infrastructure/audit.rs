use crate::domain::audit::AuditEntry;
use crate::domain::ports::AuditLog;
use crate::error::Result;
use async_trait::async_trait;

/// Emits audit entries as structured events on the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

impl TracingAuditLog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry.payload)?;
        tracing::info!(
            target: "audit",
            at = %entry.at,
            outcome = ?entry.outcome,
            order_reference = entry.order_reference.as_deref().unwrap_or(""),
            status = entry.status.as_deref().unwrap_or(""),
            amount = ?entry.amount,
            fee = ?entry.fee,
            detail = entry.detail.as_deref().unwrap_or(""),
            payload = %payload,
            "webhook verification"
        );
        Ok(())
    }
}
