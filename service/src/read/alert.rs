//! [`Alert`]-related read definitions.

use derive_more::Deref;

#[cfg(doc)]
use crate::domain::{Alert, Borrowing};

/// Wrapper around an [`Alert`] that is not read yet.
#[derive(Clone, Debug, Deref)]
pub struct Unread<T>(pub T);

/// Selector of automatically generated [`Alert`]s whose [`Borrowing`] is
/// resolved, so no open [`Borrowing`] exists for their user and game anymore.
#[derive(Clone, Copy, Debug, Default)]
pub struct Resolved;

pub mod list {
    //! [`Alert`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::{alert, game, user, Alert};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = Alert;

    /// Cursor pointing to a specific [`Alert`] in a list.
    pub type Cursor = alert::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the addressed [`User`] to match.
        ///
        /// [`User`]: crate::domain::User
        pub user_id: Option<user::Id>,

        /// ID of the [`Game`] to match.
        ///
        /// [`Game`]: crate::domain::Game
        pub game_id: Option<game::Id>,

        /// [`alert::Kind`] to match.
        pub kind: Option<alert::Kind>,

        /// Value of [`Alert::is_read`] to match.
        pub is_read: Option<bool>,
    }

    /// Total count of [`Alert`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
