//! [`Game`] read model definition.
//!
//! [`Game`]: crate::domain::Game

pub mod list {
    //! [`Game`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::{game, Game};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = Game;

    /// Cursor pointing to a specific [`Game`] in a list.
    pub type Cursor = game::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// Part of a [`game::Name`] to fuzzy search for.
        pub name: Option<String>,

        /// Exact [`game::Category`] to match.
        pub category: Option<game::Category>,

        /// Value of [`Game::is_available`] to match.
        pub is_available: Option<bool>,
    }

    /// Total count of [`Game`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
