//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";

    /// Default number of items on a page of any list.
    const DEFAULT_PAGE_SIZE: i32 = 10;
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `User` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "user",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn user(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.service()
            .execute(query::user::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `User`s.
    ///
    /// `name` is matched fuzzily and case-insensitively.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "users",
            is_active = ?is_active,
            last = ?last,
            name = ?name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn users(
        first: Option<i32>,
        after: Option<api::user::list::Cursor>,
        last: Option<i32>,
        before: Option<api::user::list::Cursor>,
        name: Option<String>,
        is_active: Option<bool>,
        ctx: &Context,
    ) -> Result<api::user::list::Connection, Error> {
        let arguments = read::user::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            Self::DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;
        let filter = read::user::list::Filter { name, is_active };

        let page = ctx
            .service()
            .execute(query::users::List::by(read::user::list::Selector {
                arguments,
                filter: filter.clone(),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(api::user::list::Connection { page, filter })
    }

    /// Returns the `Game` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `GAME_NOT_EXISTS` - the `Game` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "game",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn game(
        id: api::game::Id,
        ctx: &Context,
    ) -> Result<api::Game, Error> {
        ctx.service()
            .execute(query::game::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| GameError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Game`s in the catalog.
    ///
    /// `name` is matched fuzzily and case-insensitively, while `category`
    /// must match exactly.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            category = ?category.as_ref().map(ToString::to_string),
            first = ?first,
            gql.name = "games",
            is_available = ?is_available,
            last = ?last,
            name = ?name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn games(
        first: Option<i32>,
        after: Option<api::game::list::Cursor>,
        last: Option<i32>,
        before: Option<api::game::list::Cursor>,
        name: Option<String>,
        category: Option<api::game::Category>,
        is_available: Option<bool>,
        ctx: &Context,
    ) -> Result<api::game::list::Connection, Error> {
        let arguments = read::game::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            Self::DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;
        let filter = read::game::list::Filter {
            name,
            category: category.map(Into::into),
            is_available,
        };

        let page = ctx
            .service()
            .execute(query::games::List::by(read::game::list::Selector {
                arguments,
                filter: filter.clone(),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(api::game::list::Connection { page, filter })
    }

    /// Returns all the distinct `GameCategory`s present in the catalog,
    /// sorted alphabetically.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "gameCategories",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn game_categories(
        ctx: &Context,
    ) -> Result<Vec<api::game::Category>, Error> {
        ctx.service()
            .execute(query::games::Categories::by(()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|cs| cs.into_iter().map(Into::into).collect())
    }

    /// Returns the `Borrowing` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `BORROWING_NOT_EXISTS` - the `Borrowing` with the specified ID does
    ///                            not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "borrowing",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn borrowing(
        id: api::borrowing::Id,
        ctx: &Context,
    ) -> Result<api::Borrowing, Error> {
        ctx.service()
            .execute(query::borrowing::Details {
                borrowing_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| BorrowingError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Borrowing`s.
    ///
    /// `status` is computed at the moment of the request from the due dates,
    /// so `OPEN` matches overdue `Borrowing`s too.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            game_id = ?game_id,
            gql.name = "borrowings",
            last = ?last,
            otel.name = Self::SPAN_NAME,
            status = ?status,
            user_id = ?user_id,
        ),
    )]
    pub async fn borrowings(
        first: Option<i32>,
        after: Option<api::borrowing::list::Cursor>,
        last: Option<i32>,
        before: Option<api::borrowing::list::Cursor>,
        user_id: Option<api::user::Id>,
        game_id: Option<api::game::Id>,
        status: Option<api::borrowing::Status>,
        ctx: &Context,
    ) -> Result<api::borrowing::list::Connection, Error> {
        let arguments = read::borrowing::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            Self::DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;
        let filter = read::borrowing::list::Filter {
            user_id: user_id.map(Into::into),
            game_id: game_id.map(Into::into),
            status: status.map(Into::into),
        };

        let page = ctx
            .service()
            .execute(query::borrowings::List::by(
                read::borrowing::list::Selector { arguments, filter },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(api::borrowing::list::Connection { page, filter })
    }

    /// Checks whether the `User` with the specified ID may borrow a `Game`
    /// right now.
    ///
    /// Returns `false` while any of the not returned `Borrowing`s of the
    /// `User` is past its due date.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "canUserBorrow",
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn can_user_borrow(
        user_id: api::user::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        use query::can_user_borrow::ExecutionError as E;

        _ = ctx
            .service()
            .execute(query::user::ById::by(user_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())?;

        match ctx
            .service()
            .execute(query::CanUserBorrow {
                user_id: user_id.into(),
            })
            .await
        {
            Ok(()) => Ok(true),
            Err(e) if matches!(e.as_ref(), E::OverdueBorrowings(..)) => {
                Ok(false)
            }
            Err(e) => Err(ctx.error()(e.into_error())),
        }
    }

    /// Returns the `Alert` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ALERT_NOT_EXISTS` - the `Alert` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "alert",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn alert(
        id: api::alert::Id,
        ctx: &Context,
    ) -> Result<api::Alert, Error> {
        ctx.service()
            .execute(query::alert::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| AlertError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Alert`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            game_id = ?game_id,
            gql.name = "alerts",
            is_read = ?is_read,
            kind = ?kind,
            last = ?last,
            otel.name = Self::SPAN_NAME,
            user_id = ?user_id,
        ),
    )]
    pub async fn alerts(
        first: Option<i32>,
        after: Option<api::alert::list::Cursor>,
        last: Option<i32>,
        before: Option<api::alert::list::Cursor>,
        user_id: Option<api::user::Id>,
        game_id: Option<api::game::Id>,
        kind: Option<api::alert::Kind>,
        is_read: Option<bool>,
        ctx: &Context,
    ) -> Result<api::alert::list::Connection, Error> {
        let arguments = read::alert::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            Self::DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;
        let filter = read::alert::list::Filter {
            user_id: user_id.map(Into::into),
            game_id: game_id.map(Into::into),
            kind: kind.map(Into::into),
            is_read,
        };

        let page = ctx
            .service()
            .execute(query::alerts::List::by(read::alert::list::Selector {
                arguments,
                filter,
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(api::alert::list::Connection { page, filter })
    }

    /// Returns unread `Alert`s grouped by the `User` they are addressed to.
    ///
    /// `User`s without unread `Alert`s are omitted.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "alertsSummary",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn alerts_summary(
        ctx: &Context,
    ) -> Result<Vec<api::alert::UserAlerts>, Error> {
        ctx.service()
            .execute(query::AlertsSummary)
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|summary| {
                summary
                    .into_iter()
                    .map(|(user_id, alerts)| api::alert::UserAlerts {
                        user_id: user_id.into(),
                        alerts,
                    })
                    .collect()
            })
    }
}

impl AsError for query::can_user_borrow::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::OverdueBorrowings(..) => None,
        }
    }
}

define_error! {
    enum AlertError {
        #[code = "ALERT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Alert` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum BorrowingError {
        #[code = "BORROWING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Borrowing` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum GameError {
        #[code = "GAME_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Game` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}
