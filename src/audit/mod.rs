//! Audit trail for backup operations
//!
//! Every backup operation that changes something (or tries to) is recorded
//! in an append-only JSONL log with its actor and outcome.
//!
//! - `AuditEntry`: timestamp, operation, backup id, actor, outcome, detail
//! - `AuditLogger`: appends entries to the log file and reads them back

mod entry;
mod logger;

pub use entry::{AuditEntry, Operation, Outcome};
pub use logger::AuditLogger;
