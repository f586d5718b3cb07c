//! [`Borrowing`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, read};

use crate::{
    api::{self, scalar},
    Context,
};

/// A [`Borrowing`] of a `Game` by a `User`.
#[derive(Clone, Debug)]
pub struct Borrowing {
    /// [`domain::Borrowing`] representing this [`Borrowing`].
    borrowing: domain::Borrowing,

    /// Preloaded [`domain::User`] who borrowed the `Game`, if any.
    user: Option<domain::User>,

    /// Preloaded borrowed [`domain::Game`], if any.
    game: Option<domain::Game>,
}

impl From<domain::Borrowing> for Borrowing {
    fn from(borrowing: domain::Borrowing) -> Self {
        Self {
            borrowing,
            user: None,
            game: None,
        }
    }
}

impl From<query::borrowing::Output> for Borrowing {
    fn from(output: query::borrowing::Output) -> Self {
        let query::borrowing::Output {
            borrowing,
            user,
            game,
        } = output;
        Self {
            borrowing,
            user: Some(user),
            game: Some(game),
        }
    }
}

/// A `Borrowing` of a `Game` by a `User`.
#[graphql_object(context = Context)]
impl Borrowing {
    /// Unique identifier of this `Borrowing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Borrowing.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.borrowing.id.into()
    }

    /// `User` who borrowed the `Game`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Borrowing.user",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn user(&self) -> api::User {
        self.user.clone().map_or_else(
            || {
                #[expect(
                    unsafe_code,
                    reason = "`Borrowing` references existing `User`"
                )]
                unsafe {
                    api::User::new_unchecked(self.borrowing.user_id)
                }
            },
            Into::into,
        )
    }

    /// Borrowed `Game`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Borrowing.game",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn game(&self) -> api::Game {
        self.game.clone().map_or_else(
            || {
                #[expect(
                    unsafe_code,
                    reason = "`Borrowing` references existing `Game`"
                )]
                unsafe {
                    api::Game::new_unchecked(self.borrowing.game_id)
                }
            },
            Into::into,
        )
    }

    /// `DateTime` when the `Game` was borrowed.
    #[must_use]
    pub fn borrowed_at(&self) -> DateTime {
        self.borrowing.borrowed_at.coerce()
    }

    /// `DateTime` when the `Game` must be returned.
    #[must_use]
    pub fn due_at(&self) -> DateTime {
        self.borrowing.due_at.coerce()
    }

    /// `DateTime` when the `Game` was returned, if it was.
    #[must_use]
    pub fn returned_at(&self) -> Option<DateTime> {
        self.borrowing.returned_at.map(|at| at.coerce())
    }

    /// Stored overdue flag of this `Borrowing`.
    ///
    /// Set only by the `markOverdueBorrowings` mutation, so may lag behind.
    /// Use `status` to get the actual state.
    #[must_use]
    pub fn is_overdue(&self) -> bool {
        self.borrowing.is_overdue
    }

    /// Actual `BorrowingStatus` of this `Borrowing`.
    #[must_use]
    pub fn status(&self) -> Status {
        if self.borrowing.is_returned() {
            Status::Returned
        } else if self.borrowing.is_overdue_at(DateTime::now()) {
            Status::Overdue
        } else {
            Status::Open
        }
    }
}

/// Unique identifier of a `Borrowing`.
#[derive(
    AsRef, Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[graphql(
    name = "BorrowingId",
    with = scalar::Int::<domain::borrowing::Id>,
)]
pub struct Id(domain::borrowing::Id);

/// Status of a `Borrowing`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "BorrowingStatus")]
pub enum Status {
    /// The `Game` is not returned yet.
    ///
    /// When filtering, overdue `Borrowing`s match too.
    Open,

    /// The `Game` is not returned and the due date has passed.
    Overdue,

    /// The `Game` is returned.
    Returned,
}

impl From<Status> for read::borrowing::list::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Open => Self::Open,
            Status::Overdue => Self::Overdue,
            Status::Returned => Self::Returned,
        }
    }
}

pub mod list {
    //! Definitions related to the [`Borrowing`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    use crate::{api::scalar, AsError, Context, Error};

    use super::{Borrowing, Id};

    /// Cursor for the `Borrowing` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::borrowing::list::Cursor)]
    #[graphql(
        name = "BorrowingListCursor",
        with = scalar::Int::<read::borrowing::list::Cursor>,
    )]
    pub struct Cursor(pub read::borrowing::list::Cursor);

    /// Edge in the [`Borrowing`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::borrowing::list::Edge);

    /// Edge in the `Borrowing` list.
    #[graphql_object(name = "BorrowingListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `BorrowingListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `BorrowingListEdge`.
        #[must_use]
        pub fn node(&self) -> Borrowing {
            self.0.node.into()
        }
    }

    /// Connection of the [`Borrowing`] list.
    #[derive(Clone, Debug)]
    pub struct Connection {
        /// Loaded page of the list.
        pub(crate) page: read::borrowing::list::Connection,

        /// Filter the page was selected with.
        pub(crate) filter: read::borrowing::list::Filter,
    }

    /// Connection of the `Borrowing` list.
    #[graphql_object(name = "BorrowingListConnection", context = Context)]
    impl Connection {
        /// Edges in this `BorrowingListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.page.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                info: self.page.page_info(),
                start_cursor: self.page.edges.first().map(|e| e.cursor.into()),
                end_cursor: self.page.edges.last().map(|e| e.cursor.into()),
            }
        }

        /// Total count of `Borrowing`s matching the same filter.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            ctx.service()
                .execute(query::borrowings::TotalCount::by(self.filter))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())
                .map(Into::into)
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::borrowing::list::PageInfo`].
        info: read::borrowing::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about a `BorrowingListConnection` page.
    #[graphql_object(name = "BorrowingListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.info.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.info.has_previous_page
        }

        /// Start cursor of the page.
        #[must_use]
        pub fn start_cursor(&self) -> &Option<Cursor> {
            &self.start_cursor
        }

        /// End cursor of the page.
        #[must_use]
        pub fn end_cursor(&self) -> &Option<Cursor> {
            &self.end_cursor
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;
    use service::domain::{self, borrowing, game, user};

    use super::{Borrowing, Status};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn borrowing(due_at: DateTime, returned: bool) -> Borrowing {
        let now = DateTime::now();
        domain::Borrowing {
            id: borrowing::Id::new(1).unwrap(),
            user_id: user::Id::new(1).unwrap(),
            game_id: game::Id::new(1).unwrap(),
            borrowed_at: (now - DAY * 10).coerce(),
            due_at: due_at.coerce(),
            returned_at: returned.then(|| now.coerce()),
            is_overdue: false,
        }
        .into()
    }

    #[test]
    fn recomputes_status_ignoring_stored_flag() {
        let now = DateTime::now();

        assert_eq!(borrowing(now + DAY, false).status(), Status::Open);
        assert_eq!(borrowing(now - DAY, false).status(), Status::Overdue);
        assert_eq!(borrowing(now - DAY, true).status(), Status::Returned);
    }
}
