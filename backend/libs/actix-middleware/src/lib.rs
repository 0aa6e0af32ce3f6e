//! # Actix Middleware Library
//!
//! Request-side authentication plumbing shared by actix services
//!
//! ## Modules
//! - `identity`: the [`Identity`] request context and [`Authenticator`] seam
//! - `jwt_auth`: bearer-token [`AuthenticationMiddleware`] and [`Authenticated`] extractor
//! - `logging`: per-request tracing
//! - `correlation_id`: `X-Correlation-ID` propagation
//!
//! Typical composition (last `wrap` runs first):
//! ```ignore
//! App::new()
//!     .wrap(AuthenticationMiddleware::new(authenticator))
//!     .wrap(Logging)
//!     .wrap(CorrelationIdMiddleware)
//! ```

pub mod correlation_id;
pub mod identity;
pub mod jwt_auth;
pub mod logging;

pub use correlation_id::{get_correlation_id, CorrelationId, CorrelationIdMiddleware};
pub use identity::{Authenticator, Identity, Unauthenticated};
pub use jwt_auth::{Authenticated, AuthenticationMiddleware, UNAUTHORIZED_MESSAGE};
pub use logging::Logging;
