//! Account lookup and credential checks
//!
//! The token kernel only needs to know whether a subject still exists and
//! what authorities it holds; login additionally checks a password.

mod memory;
pub mod password;
mod postgres;

pub use memory::InMemoryDirectory;
pub use postgres::PgIdentityDirectory;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub subject: String,
    pub authorities: Vec<String>,
    pub enabled: bool,
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// `None` when the subject does not exist
    async fn lookup(&self, subject: &str) -> Result<Option<Account>>;

    /// `InvalidCredentials` for an unknown user, a wrong password or a
    /// disabled account
    async fn authenticate(&self, username: &str, password: &str) -> Result<Account>;
}
