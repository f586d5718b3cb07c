//! [`Borrowing`]-related read definitions.

use derive_more::Deref;

#[cfg(doc)]
use crate::domain::Borrowing;

/// Wrapper around a [`Borrowing`] that is not returned yet.
#[derive(Clone, Copy, Debug, Deref)]
pub struct Open<T>(pub T);

pub mod list {
    //! [`Borrowing`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};
    use strum::{Display, EnumString};

    use crate::domain::{borrowing, game, user, Borrowing};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = Borrowing;

    /// Cursor pointing to a specific [`Borrowing`] in a list.
    pub type Cursor = borrowing::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the borrowing [`User`] to match.
        ///
        /// [`User`]: crate::domain::User
        pub user_id: Option<user::Id>,

        /// ID of the borrowed [`Game`] to match.
        ///
        /// [`Game`]: crate::domain::Game
        pub game_id: Option<game::Id>,

        /// [`Status`] to match.
        pub status: Option<Status>,
    }

    /// Status of a [`Borrowing`] at the moment of selection.
    #[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, PartialEq)]
    #[strum(ascii_case_insensitive, serialize_all = "snake_case")]
    pub enum Status {
        /// Not returned yet (overdue ones included).
        Open,

        /// Not returned and past its due date.
        ///
        /// Computed from [`Borrowing::due_at`], never from the stored
        /// [`Borrowing::is_overdue`] flag.
        Overdue,

        /// Returned.
        Returned,
    }

    /// Total count of [`Borrowing`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
