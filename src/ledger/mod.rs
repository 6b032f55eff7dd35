//! Tamper-evident audit trail.

pub mod audit_ledger;
pub mod backup;
pub mod entry;
pub mod errors;
pub mod hashing;
pub mod mirror;
pub mod signing;
pub mod store;

pub use audit_ledger::{verify_entries, AuditLedger, VerifyReport};
pub use backup::{BackupReceipt, ContentStore, FileContentStore, InMemoryContentStore};
pub use entry::{AuditEntry, AuditEventType};
pub use errors::{LedgerError, LedgerResult};
pub use mirror::{Block, LedgerMirror};
pub use signing::{verify_signature, LedgerSigner};
pub use store::{AuditStore, InMemoryAuditStore, PgAuditStore};
