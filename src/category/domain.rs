//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, user::UserId};

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is empty after trimming.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 32-bit ARGB colour used to display a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Color(u32);

impl Color {
    /// The colour given to categories when the user does not pick one.
    pub const DEFAULT: Color = Color(0xFF21_96F3);

    /// Create a colour from a packed `0xAARRGGBB` value.
    pub const fn from_argb(argb: u32) -> Self {
        Self(argb)
    }

    /// The packed `0xAARRGGBB` value.
    pub fn argb(&self) -> u32 {
        self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parse `#RRGGBB` (fully opaque) or `#AARRGGBB`. The leading `#` is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || Error::InvalidColor(s.to_owned());

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match hex.len() {
            6 => u32::from_str_radix(hex, 16)
                .map(|rgb| Self(0xFF00_0000 | rgb))
                .map_err(|_| invalid()),
            8 => u32::from_str_radix(hex, 16)
                .map(Self)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

/// Identifier for a category, generated when the category is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct CategoryId(Uuid);

impl CategoryId {
    /// Generate a new, random category ID.
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

impl Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CategoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A user-defined category for transactions (e.g., 'Groceries', 'Salary').
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The name of the category.
    pub name: CategoryName,
    /// The colour used to display the category.
    pub color: Color,
    /// The user that created the category.
    pub owner_id: UserId,
}

impl Category {
    /// Create a new category with a freshly generated ID.
    pub fn new(name: CategoryName, color: Color, owner_id: UserId) -> Self {
        Self {
            id: CategoryId::generate(),
            name,
            color,
            owner_id,
        }
    }
}
