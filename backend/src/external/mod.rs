//! External service collaborators

pub mod audit;

pub use audit::{AuditSink, TracingAuditSink};
