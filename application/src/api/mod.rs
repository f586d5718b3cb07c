//! GraphQL API definitions.

pub mod alert;
pub mod borrowing;
pub mod game;
mod mutation;
mod query;
pub mod scalar;
pub mod user;

use juniper::EmptySubscription;

use crate::{define_error, Context};

pub use self::{
    alert::Alert, borrowing::Borrowing, game::Game, mutation::Mutation,
    query::Query, user::User,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

/// Creates a new GraphQL [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}

define_error! {
    enum PaginationError {
        #[code = "AMBIGUOUS_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "Ambiguous pagination arguments"]
        Ambiguous,
    }
}

#[cfg(test)]
mod spec {
    #[test]
    fn schema_exposes_library_operations() {
        let sdl = super::schema().as_sdl();

        for op in [
            "registerUser",
            "addGame",
            "borrowGame",
            "returnGame",
            "extendDueDate",
            "canUserBorrow",
            "generateOverdueAlerts",
            "generateReminderAlerts",
            "cleanupResolvedAlerts",
            "createCustomAlert",
            "markAlertAsRead",
            "deleteAlert",
            "alertsSummary",
        ] {
            assert!(sdl.contains(op), "`{op}` is missing from schema");
        }
    }
}
