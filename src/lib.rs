#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

//! # Assessment Core
//!
//! Orchestration and integrity layer for clinical risk assessment.
//!
//! An assessment request is scored synchronously through the
//! [`gateway::ResilienceGateway`] (cache, circuit breaker, heuristic
//! fallback), recorded in the signed, hash-chained [`ledger::AuditLedger`],
//! and handed to the [`diagnosis::DiagnosisDispatcher`] for an asynchronous
//! reasoning pass. Status changes are pushed to viewers by the
//! [`notifier`].
//!
//! ## Module Organization
//!
//! - [`gateway`] - Risk scoring with caching and fallback
//! - [`resilience`] - Circuit breaker
//! - [`cache`] - Shared and local cache tiers
//! - [`diagnosis`] - Status store, dispatcher and queue worker
//! - [`messaging`] - Work queue providers
//! - [`notifier`] - Viewer subscriptions and WebSocket endpoint
//! - [`ledger`] - Audit chain, verification and encrypted backup
//! - [`coordinator`] - Per-request sequencing
//! - [`config`] - Configuration loading
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use assessment_core::{AssessmentCoordinator, AssessmentRequest, SystemContext};
//! use assessment_core::models::VitalsSnapshot;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = Arc::new(SystemContext::new().await?);
//! let coordinator = AssessmentCoordinator::new(context);
//!
//! let outcome = coordinator
//!     .assess("patient-42", AssessmentRequest {
//!         assessment_id: 42,
//!         vitals: VitalsSnapshot { age: 61, systolic_bp: 150, ..Default::default() },
//!         past_context: String::new(),
//!     })
//!     .await;
//! println!("heart risk {}", outcome.risk.heart_risk);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clients;
pub mod config;
pub mod coordinator;
pub mod diagnosis;
pub mod errors;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod notifier;
pub mod resilience;
pub mod system_context;

pub use config::{AssessmentConfig, ConfigManager};
pub use coordinator::{AssessmentCoordinator, AssessmentOutcome, AssessmentRequest, DoctorFeedback};
pub use errors::{AssessmentError, AssessmentResult};
pub use system_context::SystemContext;
