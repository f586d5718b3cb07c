//! [`Borrowing`] definitions.

use std::time::Duration;

use common::{unit, DateTime, DateTimeOf};
use derive_more::{Display, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::domain::{game, user};
#[cfg(doc)]
use crate::domain::{Game, User};

/// Maximum term of a [`Borrowing`], measured from its
/// [`Borrowing::borrowed_at`].
///
/// Neither the initial due date nor any extension may go beyond it.
pub const MAX_TERM: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// One [`Game`] lent to one [`User`] for a bounded period.
#[derive(Clone, Copy, Debug)]
pub struct Borrowing {
    /// ID of this [`Borrowing`].
    pub id: Id,

    /// ID of the [`User`] who borrowed the [`Game`].
    pub user_id: user::Id,

    /// ID of the borrowed [`Game`].
    pub game_id: game::Id,

    /// [`DateTime`] when the [`Game`] was borrowed.
    pub borrowed_at: CreationDateTime,

    /// [`DateTime`] when the [`Game`] must be returned.
    pub due_at: DueDateTime,

    /// [`DateTime`] when the [`Game`] was returned, if it was.
    pub returned_at: Option<ReturnDateTime>,

    /// Stored overdue flag.
    ///
    /// Written only by an explicit operator action, so it may lag behind the
    /// real state. Use [`Borrowing::is_overdue_at()`] for decisions.
    pub is_overdue: bool,
}

impl Borrowing {
    /// Indicates whether this [`Borrowing`] is terminal.
    #[must_use]
    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    /// Indicates whether this [`Borrowing`] is overdue at the given moment,
    /// regardless of the stored [`Borrowing::is_overdue`] flag.
    #[must_use]
    pub fn is_overdue_at(&self, now: DateTime) -> bool {
        !self.is_returned() && self.due_at < now.coerce()
    }

    /// Returns the latest due date this [`Borrowing`] may be extended to.
    #[must_use]
    pub fn extension_limit(&self) -> DueDateTime {
        (self.borrowed_at + MAX_TERM).coerce()
    }
}

/// ID of a [`Borrowing`].
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
        Self::new(id).ok_or("`borrowing::Id` must be positive")
    }
}

/// [`DateTime`] when a [`Borrowing`] was created.
pub type CreationDateTime = DateTimeOf<(Borrowing, unit::Creation)>;

/// [`DateTime`] when a [`Borrowing`] is due.
pub type DueDateTime = DateTimeOf<(Borrowing, unit::Due)>;

/// [`DateTime`] when a [`Borrowing`] was returned.
pub type ReturnDateTime = DateTimeOf<(Borrowing, unit::Return)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{game, user};

    use super::{Borrowing, Id, MAX_TERM};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn borrowing(due_in: i32) -> Borrowing {
        let now = DateTime::now();
        let due_at = if due_in >= 0 {
            now + DAY * due_in.unsigned_abs()
        } else {
            now - DAY * due_in.unsigned_abs()
        };
        Borrowing {
            id: Id::new(1).unwrap(),
            user_id: user::Id::new(1).unwrap(),
            game_id: game::Id::new(1).unwrap(),
            borrowed_at: (now - DAY * 20).coerce(),
            due_at: due_at.coerce(),
            returned_at: None,
            is_overdue: false,
        }
    }

    #[test]
    fn overdue_is_recomputed_from_due_date() {
        let now = DateTime::now();

        assert!(borrowing(-2).is_overdue_at(now));
        assert!(!borrowing(3).is_overdue_at(now));

        let mut flagged = borrowing(3);
        flagged.is_overdue = true;
        assert!(!flagged.is_overdue_at(now));
    }

    #[test]
    fn returned_borrowing_is_never_overdue() {
        let mut b = borrowing(-2);
        b.returned_at = Some(DateTime::now().coerce());

        assert!(b.is_returned());
        assert!(!b.is_overdue_at(DateTime::now()));
    }

    #[test]
    fn extension_limit_counts_from_borrow_date() {
        let b = borrowing(5);

        assert_eq!(b.extension_limit(), (b.borrowed_at + MAX_TERM).coerce());
        assert_eq!(b.extension_limit() - b.borrowed_at.coerce(), MAX_TERM);
    }
}
