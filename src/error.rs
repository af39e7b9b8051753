//! Defines the crate level error type.

/// The errors that may occur in the application.
///
/// Variants fall into four groups: validation errors that are rejected before
/// any remote call, authentication errors, errors from the remote store and
/// [Error::Cascade], which wraps a store error raised during the bulk step of
/// a category deletion.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An empty or whitespace-only string was used as a transaction title.
    #[error("Title cannot be empty")]
    EmptyTitle,

    /// An empty or whitespace-only string was used as a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// A transaction amount that was zero, negative or not a finite number.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    NonPositiveAmount(f64),

    /// The string could not be parsed as a colour.
    #[error("\"{0}\" is not a valid colour, expected #RRGGBB or #AARRGGBB")]
    InvalidColor(String),

    /// The string is not a well-formed email address.
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    /// The password is shorter than [crate::auth::MIN_PASSWORD_LENGTH].
    #[error("Password must be at least {min} characters", min = crate::auth::MIN_PASSWORD_LENGTH)]
    PasswordTooShort,

    /// The password and its confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Transactions cannot be reassigned to the category that is being deleted.
    #[error("cannot reassign transactions to the category that is being deleted")]
    ReassignToSelf,

    /// Reassignment was requested but there is no other category to move the
    /// transactions to.
    #[error("there is no other category to reassign the transactions to")]
    NoReassignTarget,

    /// The user provided an invalid combination of email and password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// An account with the email address already exists.
    #[error("an account with that email address already exists")]
    EmailTaken,

    /// The operation needs a signed in user.
    #[error("User not logged in")]
    NotAuthenticated,

    /// An unexpected error occurred with the underlying hashing library.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete a category that does not exist.
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to delete a transaction that does not exist.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a transaction that does not exist.
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The live subscription ended before delivering an event.
    #[error("the subscription was closed")]
    SubscriptionClosed,

    /// The bulk update or delete of a category's transactions failed, so the
    /// category itself was left in place.
    #[error("failed during cascade delete operation: {0}")]
    Cascade(Box<Error>),
}

impl Error {
    /// Whether the error was raised by input validation, i.e. before any call
    /// to the store or the authentication provider.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyTitle
                | Error::EmptyCategoryName
                | Error::NonPositiveAmount(_)
                | Error::InvalidColor(_)
                | Error::InvalidEmail(_)
                | Error::PasswordTooShort
                | Error::PasswordMismatch
                | Error::ReassignToSelf
                | Error::NoReassignTarget
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.email") =>
            {
                Error::EmailTaken
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error.to_string())
            }
        }
    }
}
