//! Token issuance and validation

pub mod issuer;
pub mod validator;

pub use issuer::{TokenIssuer, TokenLifetimes, TokenPair};
pub use validator::TokenValidator;
