//! The external authentication provider and the session it hands out.

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    Error,
    auth::{Email, ValidatedPassword},
    user::UserId,
};

/// The signed in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Scopes every category and transaction the user can see.
    pub user_id: UserId,
    /// The email the user signed in with.
    pub email: Email,
}

/// Creates accounts and signs users in and out.
///
/// A provider remembers at most one session at a time.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Sign in with an existing account.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidCredentials] if no account matches `email` and `password`.
    async fn log_in(&self, email: &Email, password: &str) -> Result<Session, Error>;

    /// Create an account and sign in to it.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmailTaken] if an account already uses `email`.
    async fn sign_up(&self, email: &Email, password: &ValidatedPassword) -> Result<Session, Error>;

    /// End the current session. Does nothing if nobody is signed in.
    async fn log_out(&self) -> Result<(), Error>;

    /// The current session, if any.
    async fn current_session(&self) -> Result<Option<Session>, Error>;
}
