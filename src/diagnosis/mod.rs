//! Asynchronous diagnosis: status tracking, dispatch and queue workers.

pub mod dispatcher;
pub mod executor;
pub mod relay;
pub mod status_store;
pub mod worker;

pub use dispatcher::{DiagnosisDispatcher, DispatchRoute, DispatcherStats};
pub use executor::execute_diagnosis;
pub use relay::{RelayedStatus, StatusRelay, DEFAULT_RELAY_CHANNEL};
pub use status_store::{status_key, DiagnosisStatusStore};
pub use worker::{DiagnosisWorker, DiagnosisWorkerConfig, DiagnosisWorkerStats};
