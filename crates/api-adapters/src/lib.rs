//! # api-adapters
//!
//! The REST surface of the marketplace. Handlers translate HTTP into service
//! calls and `DomainError`s back into status codes with a JSON body.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod negotiate;
#[cfg(feature = "web-axum")]
pub mod router;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "web-axum")]
pub use error::ApiError;
#[cfg(feature = "web-axum")]
pub use metrics::HttpMetrics;
#[cfg(feature = "web-axum")]
pub use router::{build_router, RouterOptions};
#[cfg(feature = "web-axum")]
pub use state::AppState;
