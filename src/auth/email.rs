//! The validated email address used to identify an account.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// An email address that has passed a basic format check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address. Surrounding whitespace is removed
    /// and the address is lowercased.
    ///
    /// An address is accepted when it has a non-empty local part, a single `@`
    /// and a domain made of at least two non-empty labels, e.g. `foo@bar.baz`.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidEmail] if `raw_email` is not a valid email address.
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        let email = raw_email.trim();

        if is_well_formed(email) {
            Ok(Self(email.to_lowercase()))
        } else {
            Err(Error::InvalidEmail(raw_email.to_owned()))
        }
    }

    /// Create a new `Email` without any validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted email address.
    /// For emails coming from the user this function should **not** be used, use [Email::new] instead.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_owned())
    }
}

fn is_well_formed(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let is_label = |label: &str| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };

    !local.is_empty()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
        && domain.contains('.')
        && domain.split('.').all(is_label)
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Email {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Email::new(s)
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod email_tests {
    use crate::Error;

    use super::Email;

    #[test]
    fn create_email_success() {
        let email = Email::new(" foo.bar+budget@example.co.nz ");

        assert_eq!(email.unwrap().as_ref(), "foo.bar+budget@example.co.nz");
    }

    #[test]
    fn create_email_lowercases_address() {
        let email = Email::new("Foo.Bar@Example.COM");

        assert_eq!(email.unwrap().as_ref(), "foo.bar@example.com");
    }

    #[test]
    fn create_email_fails_with_no_at_symbol() {
        let email = Email::new("foobar.baz");

        assert_eq!(email, Err(Error::InvalidEmail("foobar.baz".to_owned())));
    }

    #[test]
    fn create_email_fails_with_empty_string() {
        assert!(matches!(Email::new(""), Err(Error::InvalidEmail(_))));
    }

    #[test]
    fn create_email_fails_without_domain_dot() {
        assert!(matches!(Email::new("foo@localhost"), Err(Error::InvalidEmail(_))));
    }

    #[test]
    fn create_email_fails_with_two_at_symbols() {
        assert!(matches!(Email::new("foo@bar@baz.com"), Err(Error::InvalidEmail(_))));
    }

    #[test]
    fn create_email_fails_with_empty_label() {
        assert!(matches!(Email::new("foo@bar..com"), Err(Error::InvalidEmail(_))));
        assert!(matches!(Email::new("@bar.com"), Err(Error::InvalidEmail(_))));
    }
}
