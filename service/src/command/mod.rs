//! [`Command`] definition.

pub mod add_game;
pub mod borrow_game;
pub mod cleanup_resolved_alerts;
pub mod create_custom_alert;
pub mod delete_alert;
pub mod delete_game;
pub mod delete_user;
pub mod extend_due_date;
pub mod generate_overdue_alerts;
pub mod generate_reminder_alerts;
pub mod mark_alert_as_read;
pub mod mark_all_alerts_as_read;
pub mod mark_overdue_borrowings;
pub mod register_user;
pub mod return_game;
pub mod update_game;
pub mod update_user;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    add_game::AddGame, borrow_game::BorrowGame,
    cleanup_resolved_alerts::CleanupResolvedAlerts,
    create_custom_alert::CreateCustomAlert, delete_alert::DeleteAlert,
    delete_game::DeleteGame, delete_user::DeleteUser,
    extend_due_date::ExtendDueDate,
    generate_overdue_alerts::GenerateOverdueAlerts,
    generate_reminder_alerts::GenerateReminderAlerts,
    mark_alert_as_read::MarkAlertAsRead,
    mark_all_alerts_as_read::MarkAllAlertsAsRead,
    mark_overdue_borrowings::MarkOverdueBorrowings,
    register_user::RegisterUser, return_game::ReturnGame,
    update_game::UpdateGame, update_user::UpdateUser,
};

#[cfg(test)]
pub(crate) mod fixture {
    //! Shared setup of [`Command`] tests.

    use std::time::Duration;

    use common::{
        operations::{Allocate, Commit, Insert, Transact, Update},
        DateTime,
    };

    use crate::{
        domain::{borrowing, game, user, Borrowing, Game, User},
        infra::{Database, Memory},
        Config, Service,
    };

    use super::{AddGame, RegisterUser};

    /// One day.
    pub(crate) const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    /// Creates a new [`Service`] backed by an empty [`Memory`] database.
    pub(crate) fn service() -> Service<Memory> {
        Service::new(Config::default(), Memory::new()).0
    }

    /// Registers a new [`User`].
    pub(crate) async fn user(svc: &Service<Memory>, email: &str) -> User {
        svc.execute(RegisterUser {
            name: user::Name::new("Alice").unwrap(),
            email: user::Email::new(email).unwrap(),
        })
        .await
        .unwrap()
    }

    /// Adds a new [`Game`] to the catalog.
    pub(crate) async fn game(svc: &Service<Memory>, name: &str) -> Game {
        svc.execute(AddGame {
            name: game::Name::new(name).unwrap(),
            description: game::Description::new("desc").unwrap(),
            category: game::Category::new("Strategy").unwrap(),
            condition: game::Condition::Good,
        })
        .await
        .unwrap()
    }

    /// Lends the [`Game`] to the [`User`] directly in the database, so the
    /// [`Borrowing`] may be already overdue.
    pub(crate) async fn lend(
        svc: &Service<Memory>,
        user: &User,
        game: &Game,
        borrowed_at: DateTime,
        due_at: DateTime,
    ) -> Borrowing {
        let tx = svc.database().execute(Transact).await.unwrap();
        let borrowing = Borrowing {
            id: tx
                .execute(Allocate::<borrowing::Id>::new())
                .await
                .unwrap(),
            user_id: user.id,
            game_id: game.id,
            borrowed_at: borrowed_at.coerce(),
            due_at: due_at.coerce(),
            returned_at: None,
            is_overdue: false,
        };
        tx.execute(Insert(borrowing)).await.unwrap();
        tx.execute(Update(Game {
            is_available: false,
            ..game.clone()
        }))
        .await
        .unwrap();
        tx.execute(Commit).await.unwrap();
        borrowing
    }
}
