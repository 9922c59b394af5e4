//! Plaza Axum Integration
//!
//! Axum middleware and extractors for gating metered routes with the Plaza
//! entitlement engine.
//!
//! # Overview
//!
//! - **Extractor**: [`CallerId`] pulls the authenticated user id from the
//!   `x-user-id` header set by the upstream gateway.
//! - **Middleware**: [`FeatureGateLayer`] wraps a route in the full
//!   check → handler → track sequence: the entitlement check runs before the
//!   handler, denials short-circuit into typed JSON responses, and usage is
//!   recorded only when the response status is 2xx.
//!
//! # Quick Start
//!
//! ```ignore
//! use axum::{Router, routing::post};
//! use plaza_axum::{CallerId, FeatureGateLayer};
//! use plaza_types::Feature;
//!
//! async fn create_service(caller: CallerId) -> &'static str {
//!     "created"
//! }
//!
//! let app = Router::new()
//!     .route("/services", post(create_service))
//!     .route_layer(FeatureGateLayer::new(guard, recorder, Feature::Services));
//! ```

pub mod error;
pub mod extractors;
pub mod layer;

pub use error::GateError;
pub use extractors::{CallerId, CALLER_ID_HEADER};
pub use layer::{FeatureGateLayer, FeatureGateService};
