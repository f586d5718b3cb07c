//! [`Alert`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;

use crate::{
    api::{self, scalar},
    Context,
};

/// An [`Alert`] addressed to a `User` about a `Game`.
#[derive(Clone, Debug, From, Into)]
pub struct Alert(domain::Alert);

/// An `Alert` addressed to a `User` about a `Game`.
#[graphql_object(context = Context)]
impl Alert {
    /// Unique identifier of this `Alert`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Alert.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `User` this `Alert` is addressed to.
    #[must_use]
    pub fn user(&self) -> api::User {
        #[expect(unsafe_code, reason = "`Alert` references existing `User`")]
        unsafe {
            api::User::new_unchecked(self.0.user_id)
        }
    }

    /// `Game` this `Alert` is about.
    #[must_use]
    pub fn game(&self) -> api::Game {
        #[expect(unsafe_code, reason = "`Alert` references existing `Game`")]
        unsafe {
            api::Game::new_unchecked(self.0.game_id)
        }
    }

    /// Kind of this `Alert`.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.0.kind.into()
    }

    /// Text of this `Alert`.
    #[must_use]
    pub fn message(&self) -> Message {
        self.0.message.clone().into()
    }

    /// `DateTime` when this `Alert` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// Indicator whether this `Alert` has been read.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.0.is_read
    }
}

/// Unread `Alert`s of a single `User`.
#[derive(Clone, Debug)]
pub struct UserAlerts {
    /// ID of the `User` the [`Alert`]s are addressed to.
    pub user_id: api::user::Id,

    /// Unread [`Alert`]s of the `User`.
    pub alerts: Vec<domain::Alert>,
}

/// Unread `Alert`s of a single `User`.
#[graphql_object(context = Context)]
impl UserAlerts {
    /// `User` the `Alert`s are addressed to.
    #[must_use]
    pub fn user(&self) -> api::User {
        #[expect(unsafe_code, reason = "`Alert` references existing `User`")]
        unsafe {
            api::User::new_unchecked(self.user_id)
        }
    }

    /// Unread `Alert`s of the `User`.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().map(Into::into).collect()
    }

    /// Number of unread `Alert`s of the `User`.
    #[must_use]
    pub fn count(&self) -> i32 {
        i32::try_from(self.alerts.len()).unwrap_or(i32::MAX)
    }
}

/// Unique identifier of an `Alert`.
#[derive(
    AsRef, Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[graphql(name = "AlertId", with = scalar::Int::<domain::alert::Id>)]
pub struct Id(domain::alert::Id);

/// Text of an `Alert`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "AlertMessage",
    with = scalar::Via::<domain::alert::Message>,
)]
pub struct Message(domain::alert::Message);

/// Kind of an `Alert`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "AlertKind")]
pub enum Kind {
    /// A `Borrowing` is past its due date.
    Overdue,

    /// A `Borrowing` is due soon.
    Reminder,

    /// Written by an operator.
    Custom,
}

impl From<domain::alert::Kind> for Kind {
    fn from(kind: domain::alert::Kind) -> Self {
        use domain::alert::Kind as K;
        match kind {
            K::Overdue => Self::Overdue,
            K::Reminder => Self::Reminder,
            K::Custom => Self::Custom,
        }
    }
}

impl From<Kind> for domain::alert::Kind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Overdue => Self::Overdue,
            Kind::Reminder => Self::Reminder,
            Kind::Custom => Self::Custom,
        }
    }
}

pub mod list {
    //! Definitions related to the [`Alert`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    use crate::{api::scalar, AsError, Context, Error};

    use super::{Alert, Id};

    /// Cursor for the `Alert` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::alert::list::Cursor)]
    #[graphql(
        name = "AlertListCursor",
        with = scalar::Int::<read::alert::list::Cursor>,
    )]
    pub struct Cursor(pub read::alert::list::Cursor);

    /// Edge in the [`Alert`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Edge(read::alert::list::Edge);

    /// Edge in the `Alert` list.
    #[graphql_object(name = "AlertListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `AlertListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `AlertListEdge`.
        #[must_use]
        pub fn node(&self) -> Alert {
            self.0.node.clone().into()
        }
    }

    /// Connection of the [`Alert`] list.
    #[derive(Clone, Debug)]
    pub struct Connection {
        /// Loaded page of the list.
        pub(crate) page: read::alert::list::Connection,

        /// Filter the page was selected with.
        pub(crate) filter: read::alert::list::Filter,
    }

    /// Connection of the `Alert` list.
    #[graphql_object(name = "AlertListConnection", context = Context)]
    impl Connection {
        /// Edges in this `AlertListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.page.edges.iter().cloned().map(Into::into).collect()
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

        /// Total count of `Alert`s matching the same filter.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            ctx.service()
                .execute(query::alerts::TotalCount::by(self.filter))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())
                .map(Into::into)
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::alert::list::PageInfo`].
        info: read::alert::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about an `AlertListConnection` page.
    #[graphql_object(name = "AlertListPageInfo", context = Context)]
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
