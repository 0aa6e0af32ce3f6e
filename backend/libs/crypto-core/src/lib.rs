//! Shared cryptographic primitives
//!
//! - `jwt`: signed bearer token codec (HS256 / RS256)
//! - `hash`: digests and log-safe token fingerprints

pub mod hash;
pub mod jwt;

pub use jwt::{Claims, CodecError, TokenCodec, TokenKind};
