//! # vigil-api
//!
//! HTTP composition layer for Vigil, the exam-duty check-in and
//! paper-submission tracker.
//!
//! This crate provides the API surface for Vigil, handling:
//!
//! - **Routing**: HTTP endpoint configuration
//! - **Service Wiring**: Composition of the duty ledger over a record store
//! - **Configuration**: Environment-driven server and store settings
//! - **Observability**: Structured request tracing and health checks
//!
//! ## Design Principles
//!
//! This crate is a **thin composition layer** with no domain policy. All
//! duty state-machine logic lives in `vigil-core`.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /                          - Service banner
//! GET  /health                    - Health check
//! GET  /ready                     - Readiness check
//! GET  /openapi.json              - OpenAPI document
//! GET  /duty/check-mobile/{m}     - Derived standing for a mobile number
//! GET  /staff/by-mobile/{m}       - Staff verification lookup
//! GET  /duty/today                - Today's roster
//! GET  /duty/all                  - Full roster, newest date first
//! GET  /duty/query                - Generic filtered read
//! POST /duty/report               - Check in for duty
//! POST /duty/proxy                - Proxy check-in for an absent assignee
//! POST /duty/submit               - Submit papers
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod openapi;
pub mod postgrest;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::Server;
}
