//! Audit/activity sink
//!
//! Fire-and-forget: the sink never blocks and never fails the caller. The
//! engine records one entry per mutating operation.

use uuid::Uuid;

use shared::OrgId;

/// Activity log collaborator
pub trait AuditSink: Send + Sync {
    fn log(&self, org_id: OrgId, action: &str, entity: &str, entity_id: Uuid, message: &str);
}

/// Default sink emitting structured tracing events
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log(&self, org_id: OrgId, action: &str, entity: &str, entity_id: Uuid, message: &str) {
        tracing::info!(
            target: "audit",
            %org_id,
            action,
            entity,
            %entity_id,
            message,
        );
    }
}
