//! [`Game`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use futures::{future, TryFutureExt as _};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A board [`Game`] in the library catalog.
#[derive(Clone, Debug)]
pub struct Game {
    /// ID of this [`Game`].
    pub id: Id,

    /// [`domain::Game`] representing this [`Game`].
    game: OnceCell<domain::Game>,
}

impl From<domain::Game> for Game {
    fn from(game: domain::Game) -> Self {
        Self {
            id: game.id.into(),
            game: OnceCell::new_with(Some(game)),
        }
    }
}

impl Game {
    /// Creates a new [`Game`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Game`] with the provided ID exists,
    /// otherwise accessing this [`Game`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            game: OnceCell::new(),
        }
    }

    /// Returns the [`domain::Game`] representing this [`Game`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::Game`] doesn't exist.
    async fn game(&self, ctx: &Context) -> Result<&domain::Game, Error> {
        let id = self.id.into();
        self.game
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::game::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|g| {
                        future::ready(
                            g.ok_or_else(|| {
                                api::query::GameError::NotExists.into()
                            })
                            .map_err(ctx.error()),
                        )
                    })
            })
            .await
    }
}

/// A board `Game` in the library catalog.
#[graphql_object(context = Context)]
impl Game {
    /// Unique identifier of this `Game`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Game.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name of this `Game`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Game.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.game(ctx).await?.name.clone().into())
    }

    /// Description of this `Game`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Game.description",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn description(
        &self,
        ctx: &Context,
    ) -> Result<Description, Error> {
        Ok(self.game(ctx).await?.description.clone().into())
    }

    /// Category of this `Game`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Game.category",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn category(&self, ctx: &Context) -> Result<Category, Error> {
        Ok(self.game(ctx).await?.category.clone().into())
    }

    /// Physical condition of this `Game`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Game.condition",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn condition(&self, ctx: &Context) -> Result<Condition, Error> {
        Ok(self.game(ctx).await?.condition.into())
    }

    /// `DateTime` when this `Game` was entered into the catalog.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Game.enteredAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn entered_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.game(ctx).await?.entered_at.coerce())
    }

    /// Indicator whether this `Game` can be borrowed right now.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Game.isAvailable",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn is_available(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.game(ctx).await?.is_available)
    }
}

/// Unique identifier of a `Game`.
#[derive(
    AsRef, Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[graphql(name = "GameId", with = scalar::Int::<domain::game::Id>)]
pub struct Id(domain::game::Id);

/// Name of a `Game`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "GameName",
    with = scalar::Via::<domain::game::Name>,
)]
pub struct Name(domain::game::Name);

/// Description of a `Game`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "GameDescription",
    with = scalar::Via::<domain::game::Description>,
)]
pub struct Description(domain::game::Description);

/// Category of a `Game`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "GameCategory",
    with = scalar::Via::<domain::game::Category>,
)]
pub struct Category(domain::game::Category);

/// Physical condition of a `Game`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "GameCondition")]
pub enum Condition {
    /// Like new.
    Excellent,

    /// Minor wear.
    Good,

    /// Visible wear, complete.
    Fair,

    /// Damaged or missing pieces.
    Poor,
}

impl From<domain::game::Condition> for Condition {
    fn from(condition: domain::game::Condition) -> Self {
        use domain::game::Condition as C;
        match condition {
            C::Excellent => Self::Excellent,
            C::Good => Self::Good,
            C::Fair => Self::Fair,
            C::Poor => Self::Poor,
        }
    }
}

impl From<Condition> for domain::game::Condition {
    fn from(condition: Condition) -> Self {
        match condition {
            Condition::Excellent => Self::Excellent,
            Condition::Good => Self::Good,
            Condition::Fair => Self::Fair,
            Condition::Poor => Self::Poor,
        }
    }
}

pub mod list {
    //! Definitions related to the [`Game`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    use crate::{api::scalar, AsError, Context, Error};

    use super::{Game, Id};

    /// Cursor for the `Game` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::game::list::Cursor)]
    #[graphql(
        name = "GameListCursor",
        with = scalar::Int::<read::game::list::Cursor>,
    )]
    pub struct Cursor(pub read::game::list::Cursor);

    /// Edge in the [`Game`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Edge(read::game::list::Edge);

    /// Edge in the `Game` list.
    #[graphql_object(name = "GameListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `GameListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `GameListEdge`.
        #[must_use]
        pub fn node(&self) -> Game {
            self.0.node.clone().into()
        }
    }

    /// Connection of the [`Game`] list.
    #[derive(Clone, Debug)]
    pub struct Connection {
        /// Loaded page of the list.
        pub(crate) page: read::game::list::Connection,

        /// Filter the page was selected with.
        pub(crate) filter: read::game::list::Filter,
    }

    /// Connection of the `Game` list.
    #[graphql_object(name = "GameListConnection", context = Context)]
    impl Connection {
        /// Edges in this `GameListConnection`.
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

        /// Total count of `Game`s matching the same filter.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            ctx.service()
                .execute(query::games::TotalCount::by(self.filter.clone()))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())
                .map(Into::into)
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::game::list::PageInfo`].
        info: read::game::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about a `GameListConnection` page.
    #[graphql_object(name = "GameListPageInfo", context = Context)]
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
