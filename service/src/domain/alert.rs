//! [`Alert`] definitions.

use std::str::FromStr;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::domain::{borrowing, game, user, Game};
#[cfg(doc)]
use crate::domain::{Borrowing, User};

/// Notification addressed to a [`User`] about a [`Game`].
///
/// Alerts are append-only facts: they stay until explicitly read or removed.
#[derive(Clone, Debug)]
pub struct Alert {
    /// ID of this [`Alert`].
    pub id: Id,

    /// ID of the [`User`] this [`Alert`] is addressed to.
    pub user_id: user::Id,

    /// ID of the [`Game`] this [`Alert`] is about.
    pub game_id: game::Id,

    /// [`Kind`] of this [`Alert`].
    pub kind: Kind,

    /// [`Message`] of this [`Alert`].
    pub message: Message,

    /// [`DateTime`] when this [`Alert`] was created.
    pub created_at: CreationDateTime,

    /// Indicator whether this [`Alert`] has been read.
    pub is_read: bool,
}

impl Alert {
    /// Returns [`Subject`] of this [`Alert`].
    #[must_use]
    pub fn subject(&self) -> Subject {
        Subject {
            user_id: self.user_id,
            game_id: self.game_id,
            kind: self.kind,
        }
    }
}

/// ID of an [`Alert`].
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
        Self::new(id).ok_or("`alert::Id` must be positive")
    }
}

define_kind! {
    #[doc = "Kind of an [`Alert`]."]
    enum Kind {
        #[doc = "[`Borrowing`] is past its due date."]
        Overdue = 1,

        #[doc = "[`Borrowing`] is due soon."]
        Reminder = 2,

        #[doc = "Written by an operator."]
        Custom = 3,
    }
}

impl Kind {
    /// Indicates whether [`Alert`]s of this [`Kind`] are derived from
    /// [`Borrowing`]s automatically.
    #[must_use]
    pub fn is_automatic(self) -> bool {
        matches!(self, Self::Overdue | Self::Reminder)
    }
}

/// Text of an [`Alert`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Message(String);

impl Message {
    /// Creates a new [`Message`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Creates an [`Kind::Overdue`] [`Message`] about the given [`Game`].
    #[must_use]
    pub fn overdue(game: &Game, due_at: borrowing::DueDateTime) -> Self {
        Self(format!(
            "\"{}\" was due on {} and is overdue. Please return it as soon as \
             possible.",
            game.name,
            due_at.date(),
        ))
    }

    /// Creates an [`Kind::Reminder`] [`Message`] about the given [`Game`].
    #[must_use]
    pub fn reminder(game: &Game, due_at: borrowing::DueDateTime) -> Self {
        Self(format!(
            "\"{}\" is due on {}. Please return or extend it in time.",
            game.name,
            due_at.date(),
        ))
    }

    /// Checks whether the given `text` is a valid [`Message`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.chars().count() <= 2048
    }
}

impl FromStr for Message {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Message`")
    }
}

/// Deduplication key of automatically generated [`Alert`]s.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Subject {
    /// ID of the [`User`] the [`Alert`] is addressed to.
    pub user_id: user::Id,

    /// ID of the [`Game`] the [`Alert`] is about.
    pub game_id: game::Id,

    /// [`Kind`] of the [`Alert`].
    pub kind: Kind,
}

/// [`DateTime`] when an [`Alert`] was created.
pub type CreationDateTime = DateTimeOf<(Alert, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{game, Game};

    use super::{Kind, Message};

    #[test]
    fn only_custom_kind_is_manual() {
        assert!(Kind::Overdue.is_automatic());
        assert!(Kind::Reminder.is_automatic());
        assert!(!Kind::Custom.is_automatic());
        assert_eq!("reminder".parse(), Ok(Kind::Reminder));
        assert_eq!(Kind::Overdue.to_string(), "overdue");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_kind_in_snake_case() {
        use serde::{de::value, Deserialize as _};

        let de = value::StrDeserializer::<value::Error>::new("reminder");
        assert_eq!(Kind::deserialize(de), Ok(Kind::Reminder));

        let de = value::I32Deserializer::<value::Error>::new(7);
        assert!(super::Id::deserialize(de).is_ok());
        let de = value::I32Deserializer::<value::Error>::new(0);
        assert!(super::Id::deserialize(de).is_err());
    }

    #[test]
    fn message_must_not_be_blank() {
        assert!(Message::new("").is_none());
        assert!(Message::new("   ").is_none());
        assert!(Message::new("x".repeat(2049)).is_none());
        assert!(Message::new("Game night moved to Friday").is_some());
    }

    #[test]
    fn generated_messages_name_game_and_deadline() {
        let game = Game {
            id: game::Id::new(1).unwrap(),
            name: game::Name::new("Chess").unwrap(),
            description: game::Description::default(),
            category: game::Category::new("Strategy").unwrap(),
            condition: game::Condition::Good,
            entered_at: DateTime::now().coerce(),
            is_available: false,
        };
        let due_at = DateTime::now() + Duration::from_secs(3600);
        let date = due_at.date().to_string();

        for msg in [
            Message::overdue(&game, due_at.coerce()),
            Message::reminder(&game, due_at.coerce()),
        ] {
            assert!(msg.to_string().contains("Chess"), "{msg}");
            assert!(msg.to_string().contains(&date), "{msg}");
        }
    }
}
