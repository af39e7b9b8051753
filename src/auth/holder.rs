//! Tracks whether a user is signed in and drives the sign in, sign up and log
//! out flows through an [AuthProvider].

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    Error,
    auth::{AuthProvider, Email, Session, ValidatedPassword},
};

/// Where the user is in the authentication flow.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// Nothing has happened yet.
    Idle,
    /// A request to the provider is in flight.
    Loading,
    /// A user is signed in.
    Authenticated(Session),
    /// Nobody is signed in.
    Unauthenticated,
    /// The last request to the provider failed with this message.
    Error(String),
}

/// Check the fields of the sign up form.
///
/// The email is checked first, then the password length, then that the
/// confirmation matches.
///
/// # Errors
///
/// Returns [Error::InvalidEmail], [Error::PasswordTooShort] or [Error::PasswordMismatch].
pub fn validate_sign_up(
    email: &str,
    password: &str,
    confirmation: &str,
) -> Result<(Email, ValidatedPassword), Error> {
    let email = Email::new(email)?;
    let password = ValidatedPassword::new(password)?;

    if password != ValidatedPassword::new_unchecked(confirmation) {
        return Err(Error::PasswordMismatch);
    }

    Ok((email, password))
}

/// Publishes the [AuthState] and forwards requests to the [AuthProvider].
///
/// Invalid form input is returned as an error without touching the provider
/// or the published state.
pub struct AuthHolder {
    provider: Arc<dyn AuthProvider>,
    state: watch::Sender<AuthState>,
}

impl AuthHolder {
    /// Create a holder and restore the provider's current session, if any.
    pub async fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (state, _) = watch::channel(AuthState::Idle);
        let holder = Self { provider, state };

        let restored = match holder.provider.current_session().await {
            Ok(Some(session)) => AuthState::Authenticated(session),
            Ok(None) => AuthState::Unauthenticated,
            Err(error) => {
                tracing::error!("Could not restore session: {error}");
                AuthState::Error(error.to_string())
            }
        };
        holder.state.send_replace(restored);

        holder
    }

    /// The current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Watch for state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The signed in user, if any.
    pub fn session(&self) -> Option<Session> {
        match &*self.state.borrow() {
            AuthState::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Sign in with an existing account.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidEmail] if `email` is malformed, otherwise any error from the provider.
    pub async fn log_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let email = Email::new(email)?;

        self.state.send_replace(AuthState::Loading);
        let result = self.provider.log_in(&email, password).await;
        self.settle(result)
    }

    /// Create an account and sign in to it.
    ///
    /// # Errors
    ///
    /// Returns a validation error from [validate_sign_up], otherwise any error from the provider.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<Session, Error> {
        let (email, password) = validate_sign_up(email, password, confirmation)?;

        self.state.send_replace(AuthState::Loading);
        let result = self.provider.sign_up(&email, &password).await;
        self.settle(result)
    }

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns any error from the provider.
    pub async fn log_out(&self) -> Result<(), Error> {
        match self.provider.log_out().await {
            Ok(()) => {
                self.state.send_replace(AuthState::Unauthenticated);
                Ok(())
            }
            Err(error) => {
                tracing::error!("Could not log out: {error}");
                self.state.send_replace(AuthState::Error(error.to_string()));
                Err(error)
            }
        }
    }

    fn settle(&self, result: Result<Session, Error>) -> Result<Session, Error> {
        match result {
            Ok(session) => {
                self.state
                    .send_replace(AuthState::Authenticated(session.clone()));
                Ok(session)
            }
            Err(error) => {
                tracing::warn!("Authentication failed: {error}");
                self.state.send_replace(AuthState::Error(error.to_string()));
                Err(error)
            }
        }
    }
}


#[cfg(test)]
mod auth_holder_tests {
    use std::sync::Arc;

    use crate::{Error, stores::SQLiteDatabase};

    use super::{AuthHolder, AuthState};

    async fn get_holder() -> AuthHolder {
        let database = SQLiteDatabase::open_in_memory().unwrap();

        AuthHolder::new(Arc::new(database.auth_provider(4))).await
    }

    #[tokio::test]
    async fn starts_unauthenticated_without_session() {
        let holder = get_holder().await;

        assert_eq!(holder.state(), AuthState::Unauthenticated);
        assert_eq!(holder.session(), None);
    }

    #[tokio::test]
    async fn restores_existing_session() {
        let database = SQLiteDatabase::open_in_memory().unwrap();
        let first = AuthHolder::new(Arc::new(database.auth_provider(4))).await;
        let session = first
            .sign_up("foo@bar.baz", "hunter22", "hunter22")
            .await
            .unwrap();

        let second = AuthHolder::new(Arc::new(database.auth_provider(4))).await;

        assert_eq!(second.state(), AuthState::Authenticated(session));
    }

    #[tokio::test]
    async fn sign_up_authenticates() {
        let holder = get_holder().await;

        let session = holder
            .sign_up("foo@bar.baz", "hunter22", "hunter22")
            .await
            .unwrap();

        assert_eq!(holder.state(), AuthState::Authenticated(session.clone()));
        assert_eq!(holder.session(), Some(session));
    }

    #[tokio::test]
    async fn invalid_sign_up_leaves_state_alone() {
        let holder = get_holder().await;

        let result = holder.sign_up("foo@bar.baz", "hunter22", "hunter2").await;

        assert_eq!(result, Err(Error::PasswordMismatch));
        assert_eq!(holder.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn failed_log_in_publishes_error() {
        let holder = get_holder().await;
        holder
            .sign_up("foo@bar.baz", "hunter22", "hunter22")
            .await
            .unwrap();
        holder.log_out().await.unwrap();

        let result = holder.log_in("foo@bar.baz", "wrong password").await;

        assert_eq!(result, Err(Error::InvalidCredentials));
        assert_eq!(
            holder.state(),
            AuthState::Error(Error::InvalidCredentials.to_string())
        );
    }

    #[tokio::test]
    async fn log_in_ignores_email_case() {
        let holder = get_holder().await;
        holder
            .sign_up("Foo@Bar.baz", "hunter22", "hunter22")
            .await
            .unwrap();
        holder.log_out().await.unwrap();

        let session = holder.log_in("foo@bar.BAZ", "hunter22").await.unwrap();

        assert_eq!(session.email.as_ref(), "foo@bar.baz");
    }

    #[tokio::test]
    async fn log_out_unauthenticates() {
        let holder = get_holder().await;
        holder
            .sign_up("foo@bar.baz", "hunter22", "hunter22")
            .await
            .unwrap();

        holder.log_out().await.unwrap();

        assert_eq!(holder.state(), AuthState::Unauthenticated);
    }
}
