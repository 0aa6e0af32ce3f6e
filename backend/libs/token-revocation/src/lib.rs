//! # Token Revocation
//!
//! Durable registry of issued tokens and their revocation state.
//!
//! Every signed token handed out has exactly one [`TokenRecord`] here. A token
//! is only honoured while its record exists, is not revoked and has not
//! expired; see [`RevocationStore::is_live`].
//!
//! ## Modules
//! - `model`: the persisted token record
//! - `store`: the [`RevocationStore`] contract and its error type
//! - `memory`: single-process store behind one lock
//! - `postgres`: PostgreSQL store (`auth_tokens` table)

pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use memory::InMemoryRevocationStore;
pub use model::TokenRecord;
pub use postgres::PgRevocationStore;
pub use store::{RevocationStore, StoreError, StoreResult};
