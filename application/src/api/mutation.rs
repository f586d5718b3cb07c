//! GraphQL [`Mutation`]s definitions.

use common::DateTime;
use juniper::graphql_object;
use service::{command, domain, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Registers a new active `User` of the library.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `EMAIL_OCCUPIED` - provided `UserEmail` is occupied by another
    ///                      `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "registerUser",
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn register_user(
        name: api::user::Name,
        email: api::user::Email,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.service()
            .execute(command::RegisterUser {
                name: name.into(),
                email: email.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Edits the profile of the `User` with the specified ID.
    ///
    /// Omitted arguments are left untouched.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `EMAIL_OCCUPIED` - provided `UserEmail` is occupied by another
    ///                      `User`;
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            email = ?email.as_ref().map(ToString::to_string),
            gql.name = "updateUser",
            id = %id,
            is_active = ?is_active,
            name = ?name.as_ref().map(ToString::to_string),
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_user(
        id: api::user::Id,
        name: Option<api::user::Name>,
        email: Option<api::user::Email>,
        is_active: Option<bool>,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.service()
            .execute(command::UpdateUser {
                user_id: id.into(),
                name: name.map(Into::into),
                email: email.map(Into::into),
                is_active,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Removes the `User` with the specified ID along with their `Alert`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_HAS_BORROWINGS` - the `User` has borrowed a `Game` at least
    ///                           once;
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteUser",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_user(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        ctx.service()
            .execute(command::DeleteUser { user_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Adds a new available `Game` to the catalog.
    #[tracing::instrument(
        skip_all,
        fields(
            category = %category,
            condition = ?condition,
            gql.name = "addGame",
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn add_game(
        name: api::game::Name,
        description: Option<api::game::Description>,
        category: api::game::Category,
        condition: api::game::Condition,
        ctx: &Context,
    ) -> Result<api::Game, Error> {
        ctx.service()
            .execute(command::AddGame {
                name: name.into(),
                description: description.map(Into::into).unwrap_or_default(),
                category: category.into(),
                condition: condition.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Edits the `Game` with the specified ID.
    ///
    /// Omitted arguments are left untouched.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `GAME_NOT_EXISTS` - the `Game` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            category = ?category.as_ref().map(ToString::to_string),
            condition = ?condition,
            gql.name = "updateGame",
            id = %id,
            name = ?name.as_ref().map(ToString::to_string),
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_game(
        id: api::game::Id,
        name: Option<api::game::Name>,
        description: Option<api::game::Description>,
        category: Option<api::game::Category>,
        condition: Option<api::game::Condition>,
        ctx: &Context,
    ) -> Result<api::Game, Error> {
        ctx.service()
            .execute(command::UpdateGame {
                game_id: id.into(),
                name: name.map(Into::into),
                description: description.map(Into::into),
                category: category.map(Into::into),
                condition: condition.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Removes the `Game` with the specified ID from the catalog along with
    /// its `Alert`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `GAME_HAS_BORROWINGS` - the `Game` has been borrowed at least once;
    /// - `GAME_NOT_EXISTS` - the `Game` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteGame",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_game(
        id: api::game::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        ctx.service()
            .execute(command::DeleteGame { game_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Lends the `Game` to the `User` until the specified `dueAt`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `DUE_DATE_NOT_IN_FUTURE` - provided `dueAt` has already passed;
    /// - `GAME_NOT_AVAILABLE` - the `Game` is borrowed by someone already;
    /// - `GAME_NOT_EXISTS` - the `Game` with the specified ID does not exist;
    /// - `USER_HAS_OVERDUE_BORROWINGS` - the `User` must return overdue
    ///                                   `Game`s first;
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            due_at = ?due_at,
            game_id = %game_id,
            gql.name = "borrowGame",
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn borrow_game(
        user_id: api::user::Id,
        game_id: api::game::Id,
        due_at: DateTime,
        ctx: &Context,
    ) -> Result<api::Borrowing, Error> {
        ctx.service()
            .execute(command::BorrowGame {
                user_id: user_id.into(),
                game_id: game_id.into(),
                due_at: due_at.coerce(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Closes the `Borrowing` with the specified ID, making its `Game`
    /// available again.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ALREADY_RETURNED` - the `Game` has been returned already;
    /// - `BORROWING_NOT_EXISTS` - the `Borrowing` with the specified ID does
    ///                            not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "returnGame",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn return_game(
        id: api::borrowing::Id,
        ctx: &Context,
    ) -> Result<api::Borrowing, Error> {
        ctx.service()
            .execute(command::ReturnGame {
                borrowing_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Moves the due date of the `Borrowing` with the specified ID further.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ALREADY_RETURNED` - the `Game` has been returned already;
    /// - `BORROWING_NOT_EXISTS` - the `Borrowing` with the specified ID does
    ///                            not exist;
    /// - `DUE_DATE_NOT_EXTENDED` - provided `dueAt` is not later than the
    ///                             current one;
    /// - `EXTENSION_LIMIT_EXCEEDED` - provided `dueAt` is beyond the maximum
    ///                                borrowing term.
    #[tracing::instrument(
        skip_all,
        fields(
            due_at = ?due_at,
            gql.name = "extendDueDate",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn extend_due_date(
        id: api::borrowing::Id,
        due_at: DateTime,
        ctx: &Context,
    ) -> Result<api::Borrowing, Error> {
        ctx.service()
            .execute(command::ExtendDueDate {
                borrowing_id: id.into(),
                due_at: due_at.coerce(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Sets the stored overdue flag on every not returned `Borrowing` past
    /// its due date.
    ///
    /// Returns the number of newly flagged `Borrowing`s.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "markOverdueBorrowings",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn mark_overdue_borrowings(ctx: &Context) -> Result<i32, Error> {
        ctx.service()
            .execute(command::MarkOverdueBorrowings)
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(saturate)
    }

    /// Raises an `OVERDUE` `Alert` for every overdue `Borrowing` not having
    /// an unread one yet.
    ///
    /// Returns the number of raised `Alert`s.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "generateOverdueAlerts",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn generate_overdue_alerts(ctx: &Context) -> Result<i32, Error> {
        ctx.service()
            .execute(command::GenerateOverdueAlerts)
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(saturate)
    }

    /// Raises a `REMINDER` `Alert` for every `Borrowing` due within the
    /// reminder window and not having an unread one yet.
    ///
    /// Returns the number of raised `Alert`s.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "generateReminderAlerts",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn generate_reminder_alerts(
        ctx: &Context,
    ) -> Result<i32, Error> {
        ctx.service()
            .execute(command::GenerateReminderAlerts)
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(saturate)
    }

    /// Removes automatically raised `Alert`s whose `Game` is not borrowed
    /// by their `User` anymore.
    ///
    /// Returns the number of removed `Alert`s.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cleanupResolvedAlerts",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cleanup_resolved_alerts(ctx: &Context) -> Result<i32, Error> {
        ctx.service()
            .execute(command::CleanupResolvedAlerts)
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(saturate)
    }

    /// Writes a new `Alert` to the `User` about the `Game`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `GAME_NOT_EXISTS` - the `Game` with the specified ID does not exist;
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            game_id = %game_id,
            gql.name = "createCustomAlert",
            kind = ?kind,
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn create_custom_alert(
        user_id: api::user::Id,
        game_id: api::game::Id,
        message: api::alert::Message,
        kind: Option<api::alert::Kind>,
        ctx: &Context,
    ) -> Result<api::Alert, Error> {
        ctx.service()
            .execute(command::CreateCustomAlert {
                user_id: user_id.into(),
                game_id: game_id.into(),
                kind: kind.map_or(domain::alert::Kind::Custom, Into::into),
                message: message.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the `Alert` with the specified ID as read.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ALERT_NOT_EXISTS` - the `Alert` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "markAlertAsRead",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn mark_alert_as_read(
        id: api::alert::Id,
        ctx: &Context,
    ) -> Result<api::Alert, Error> {
        ctx.service()
            .execute(command::MarkAlertAsRead { alert_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks all the `Alert`s of the `User` as read.
    ///
    /// Returns the number of affected `Alert`s.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "markAllAlertsAsRead",
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn mark_all_alerts_as_read(
        user_id: api::user::Id,
        ctx: &Context,
    ) -> Result<i32, Error> {
        ctx.service()
            .execute(command::MarkAllAlertsAsRead {
                user_id: user_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(saturate)
    }

    /// Removes the `Alert` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ALERT_NOT_EXISTS` - the `Alert` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteAlert",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_alert(
        id: api::alert::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        ctx.service()
            .execute(command::DeleteAlert { alert_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }
}

/// Converts the provided count into a GraphQL `Int`, saturating on overflow.
fn saturate<N: TryInto<i32>>(count: N) -> i32 {
    count.try_into().unwrap_or(i32::MAX)
}

impl AsError for command::register_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`UserEmail` is occupied by another `User`"]
                EmailOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
        }
    }
}

impl AsError for command::update_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`UserEmail` is occupied by another `User`"]
                EmailOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
            Self::UserNotExists(_) => {
                Some(api::query::UserError::NotExists.into())
            }
        }
    }
}

impl AsError for command::delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "USER_HAS_BORROWINGS"]
                #[status = CONFLICT]
                #[message = "`User` has borrowing history"]
                UserHasBorrowings,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserHasBorrowings(_) => {
                Some(Error::UserHasBorrowings.into())
            }
            Self::UserNotExists(_) => {
                Some(api::query::UserError::NotExists.into())
            }
        }
    }
}

impl AsError for command::add_game::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::update_game::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::GameNotExists(_) => {
                Some(api::query::GameError::NotExists.into())
            }
        }
    }
}

impl AsError for command::delete_game::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "GAME_HAS_BORROWINGS"]
                #[status = CONFLICT]
                #[message = "`Game` has borrowing history"]
                GameHasBorrowings,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::GameHasBorrowings(_) => {
                Some(Error::GameHasBorrowings.into())
            }
            Self::GameNotExists(_) => {
                Some(api::query::GameError::NotExists.into())
            }
        }
    }
}

impl AsError for command::borrow_game::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "DUE_DATE_NOT_IN_FUTURE"]
                #[status = UNPROCESSABLE_ENTITY]
                #[message = "Due date must be in the future"]
                DueDateNotInFuture,

                #[code = "GAME_NOT_AVAILABLE"]
                #[status = CONFLICT]
                #[message = "`Game` is borrowed already"]
                GameNotAvailable,

                #[code = "USER_HAS_OVERDUE_BORROWINGS"]
                #[status = CONFLICT]
                #[message = "`User` must return overdue `Game`s first"]
                UserHasOverdueBorrowings,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DueDateNotInFuture(_) => {
                Some(Error::DueDateNotInFuture.into())
            }
            Self::GameNotAvailable(_) => Some(Error::GameNotAvailable.into()),
            Self::GameNotExists(_) => {
                Some(api::query::GameError::NotExists.into())
            }
            Self::UserHasOverdueBorrowings(..) => {
                Some(Error::UserHasOverdueBorrowings.into())
            }
            Self::UserNotExists(_) => {
                Some(api::query::UserError::NotExists.into())
            }
        }
    }
}

impl AsError for command::return_game::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_RETURNED"]
                #[status = CONFLICT]
                #[message = "`Game` has been returned already"]
                AlreadyReturned,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlreadyReturned(_) => Some(Error::AlreadyReturned.into()),
            Self::BorrowingNotExists(_) => {
                Some(api::query::BorrowingError::NotExists.into())
            }
            Self::GameNotExists(_) => None,
        }
    }
}

impl AsError for command::extend_due_date::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_RETURNED"]
                #[status = CONFLICT]
                #[message = "`Game` has been returned already"]
                AlreadyReturned,

                #[code = "DUE_DATE_NOT_EXTENDED"]
                #[status = UNPROCESSABLE_ENTITY]
                #[message = "New due date must be later than the current one"]
                DueDateNotExtended,

                #[code = "EXTENSION_LIMIT_EXCEEDED"]
                #[status = UNPROCESSABLE_ENTITY]
                #[message = "Due date is beyond the maximum borrowing term"]
                ExtensionLimitExceeded,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlreadyReturned(_) => Some(Error::AlreadyReturned.into()),
            Self::BorrowingNotExists(_) => {
                Some(api::query::BorrowingError::NotExists.into())
            }
            Self::DueDateNotExtended(_) => {
                Some(Error::DueDateNotExtended.into())
            }
            Self::ExtensionLimitExceeded(_) => {
                Some(Error::ExtensionLimitExceeded.into())
            }
        }
    }
}

impl AsError for command::mark_overdue_borrowings::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::generate_overdue_alerts::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::generate_reminder_alerts::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::cleanup_resolved_alerts::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::create_custom_alert::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::GameNotExists(_) => {
                Some(api::query::GameError::NotExists.into())
            }
            Self::UserNotExists(_) => {
                Some(api::query::UserError::NotExists.into())
            }
        }
    }
}

impl AsError for command::mark_alert_as_read::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlertNotExists(_) => {
                Some(api::query::AlertError::NotExists.into())
            }
        }
    }
}

impl AsError for command::mark_all_alerts_as_read::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::delete_alert::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlertNotExists(_) => {
                Some(api::query::AlertError::NotExists.into())
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{command, domain};

    use crate::AsError as _;

    #[test]
    fn maps_lending_rule_violations_to_codes() {
        use command::borrow_game::ExecutionError as E;

        let user_id = domain::user::Id::new(1).unwrap();
        let game_id = domain::game::Id::new(2).unwrap();

        let err = E::GameNotAvailable(game_id).into_error();
        assert_eq!(err.code, "GAME_NOT_AVAILABLE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);

        let err = E::UserHasOverdueBorrowings(user_id, vec![]).into_error();
        assert_eq!(err.code, "USER_HAS_OVERDUE_BORROWINGS");

        let err = E::UserNotExists(user_id).into_error();
        assert_eq!(err.code, "USER_NOT_EXISTS");
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn hides_broken_invariants_as_internal() {
        use command::return_game::ExecutionError as E;

        let err = E::GameNotExists(domain::game::Id::new(2).unwrap())
            .into_error();

        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
