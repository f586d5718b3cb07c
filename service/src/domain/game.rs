//! [`Game`] definitions.

use std::str::FromStr;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Board game in the library catalog.
#[derive(Clone, Debug)]
pub struct Game {
    /// ID of this [`Game`].
    pub id: Id,

    /// [`Name`] of this [`Game`].
    pub name: Name,

    /// [`Description`] of this [`Game`].
    pub description: Description,

    /// [`Category`] of this [`Game`].
    pub category: Category,

    /// Physical [`Condition`] of this [`Game`].
    pub condition: Condition,

    /// [`DateTime`] when this [`Game`] was entered into the catalog.
    pub entered_at: EntryDateTime,

    /// Indicator whether this [`Game`] can be borrowed right now.
    ///
    /// Kept in sync with borrowings: it's `false` exactly while an open
    /// [`Borrowing`] of this [`Game`] exists.
    ///
    /// [`Borrowing`]: crate::domain::Borrowing
    pub is_available: bool,
}

/// ID of a [`Game`].
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(try_from = "i32", into = "i32")
)]
pub struct Id(i32);

impl Id {
    /// Creates a new [`Id`] if the given `id` is positive.
    #[must_use]
    pub fn new(id: i32) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }
}

impl TryFrom<i32> for Id {
    type Error = &'static str;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        Self::new(id).ok_or("`game::Id` must be positive")
    }
}

/// Name of a [`Game`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        let len = name.chars().count();
        name.trim() == name && (2..=256).contains(&len)
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Free-form description of a [`Game`], possibly empty.
#[derive(AsRef, Clone, Debug, Default, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (text.chars().count() <= 4096).then_some(Self(text))
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// Category of a [`Game`] (like "Strategy" or "Party").
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Category(String);

impl Category {
    /// Creates a new [`Category`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `category` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(category: impl Into<String>) -> Self {
        Self(category.into())
    }

    /// Creates a new [`Category`] if the given `category` is valid.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Option<Self> {
        let category = category.into();
        Self::check(&category).then_some(Self(category))
    }

    /// Checks whether the given `category` is a valid [`Category`].
    fn check(category: impl AsRef<str>) -> bool {
        let category = category.as_ref();
        let len = category.chars().count();
        category.trim() == category && (1..=128).contains(&len)
    }
}

impl FromStr for Category {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Category`")
    }
}

define_kind! {
    #[doc = "Physical condition of a [`Game`]."]
    enum Condition {
        #[doc = "Like new."]
        Excellent = 1,

        #[doc = "Minor wear."]
        Good = 2,

        #[doc = "Visible wear, complete."]
        Fair = 3,

        #[doc = "Damaged or missing pieces."]
        Poor = 4,
    }
}

/// [`DateTime`] when a [`Game`] was entered into the catalog.
pub type EntryDateTime = DateTimeOf<(Game, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Category, Condition, Description, Name};

    #[test]
    fn condition_has_lowercase_wire_form() {
        assert_eq!(Condition::Good.to_string(), "good");
        assert_eq!("excellent".parse(), Ok(Condition::Excellent));
        assert_eq!("Poor".parse(), Ok(Condition::Poor));
        assert!("mint".parse::<Condition>().is_err());
    }

    #[test]
    fn validates_text_fields() {
        assert!(Name::new("Go").is_some());
        assert!(Name::new("G").is_none());
        assert!(Description::new("").is_some());
        assert!(Description::new("x".repeat(4097)).is_none());
        assert!(Category::new("").is_none());
        assert!(Category::new("Strategy").is_some());
    }
}
