//! Account creation, sign in and the signed in user's session.

mod email;
mod holder;
mod password;
mod provider;

pub use email::Email;
pub use holder::{AuthHolder, AuthState, validate_sign_up};
pub use password::{PasswordHash, ValidatedPassword};
pub use provider::{AuthProvider, Session};

/// The fewest characters a new password may have.
pub const MIN_PASSWORD_LENGTH: usize = 6;
