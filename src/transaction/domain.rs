//! Defines the core data models for transactions.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, category::CategoryId, user::UserId};

/// Identifier for a transaction, generated when the transaction is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Generate a new, random transaction ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A validated, non-empty transaction title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Title(String);

impl Title {
    /// Create a title, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyTitle] if `title` is empty after trimming.
    pub fn new(title: &str) -> Result<Self, Error> {
        let title = title.trim();

        if title.is_empty() {
            Err(Error::EmptyTitle)
        } else {
            Ok(Self(title.to_owned()))
        }
    }

    /// Create a title without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(title: &str) -> Self {
        Self(title.to_owned())
    }
}

impl AsRef<str> for Title {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive amount of money.
///
/// Whether the money was earned or spent is recorded by [TransactionKind], not
/// by the sign of the amount.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Amount(f64);

impl Amount {
    /// Create an amount.
    ///
    /// # Errors
    ///
    /// Returns [Error::NonPositiveAmount] if `amount` is not a finite number greater than zero.
    pub fn new(amount: f64) -> Result<Self, Error> {
        if amount.is_finite() && amount > 0.0 {
            Ok(Self(amount))
        } else {
            Err(Error::NonPositiveAmount(amount))
        }
    }

    /// The amount as a float.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Amount {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for f64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = Error;

    /// Parse a plain decimal such as `12`, `12.5` or `.5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let is_plain_decimal = !s.is_empty()
            && s.chars().all(|c| c.is_ascii_digit() || c == '.')
            && s.chars().filter(|&c| c == '.').count() <= 1
            && !s.ends_with('.');

        if !is_plain_decimal {
            return Err(Error::NonPositiveAmount(f64::NAN));
        }

        let value = s
            .parse::<f64>()
            .map_err(|_| Error::NonPositiveAmount(f64::NAN))?;

        Amount::new(value)
    }
}

/// Whether a transaction earned or spent money.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum TransactionKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        };
        f.write_str(label)
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A short description of what the transaction was for.
    pub title: Title,
    /// How much money was earned or spent. Always positive.
    pub amount: Amount,
    /// Whether money was earned or spent.
    pub kind: TransactionKind,
    /// The category the transaction belongs to, `None` if uncategorised.
    pub category_id: Option<CategoryId>,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
    /// Free text details. Never blank.
    pub note: Option<String>,
    /// The user that recorded the transaction.
    pub owner_id: UserId,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(title: Title, amount: Amount, kind: TransactionKind) -> TransactionBuilder {
        TransactionBuilder {
            title,
            amount,
            kind,
            category_id: None,
            occurred_at: None,
            note: None,
        }
    }

    /// Whether the transaction counts towards the category with `category_id`.
    pub fn is_in_category(&self, category_id: CategoryId) -> bool {
        self.category_id == Some(category_id)
    }
}

/// A builder for creating [Transaction] instances.
///
/// Optional fields default to no category, no note, and the current time.
/// Call [TransactionBuilder::finalise] to assign an ID and owner.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// See [Transaction::title].
    pub title: Title,
    /// See [Transaction::amount].
    pub amount: Amount,
    /// See [Transaction::kind].
    pub kind: TransactionKind,
    /// See [Transaction::category_id].
    pub category_id: Option<CategoryId>,
    /// Defaults to the time [TransactionBuilder::finalise] is called.
    pub occurred_at: Option<OffsetDateTime>,
    /// See [Transaction::note].
    pub note: Option<String>,
}

impl TransactionBuilder {
    /// Set the category for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set when the transaction happened.
    pub fn occurred_at(mut self, occurred_at: OffsetDateTime) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Set the note. Blank notes are dropped.
    pub fn note(mut self, note: Option<&str>) -> Self {
        self.note = normalise_note(note);
        self
    }

    /// Create the transaction with a new ID, owned by `owner_id`.
    pub fn finalise(self, owner_id: UserId) -> Transaction {
        Transaction {
            id: TransactionId::generate(),
            title: self.title,
            amount: self.amount,
            kind: self.kind,
            category_id: self.category_id,
            occurred_at: self.occurred_at.unwrap_or_else(OffsetDateTime::now_utc),
            note: self.note,
            owner_id,
        }
    }
}

pub(crate) fn normalise_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod title_tests {
    use crate::{Error, transaction::Title};

    #[test]
    fn new_fails_on_blank() {
        assert_eq!(Title::new(" \t"), Err(Error::EmptyTitle));
    }

    #[test]
    fn new_trims() {
        assert_eq!(Title::new(" Rent ").unwrap().as_ref(), "Rent");
    }
}
