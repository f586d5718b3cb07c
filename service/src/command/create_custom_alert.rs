//! [`Command`] for sending an operator-authored [`Alert`].

use common::{
    operations::{Allocate, By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{alert, game, user, Alert, Game, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for sending an operator-authored [`Alert`] to a [`User`].
///
/// Unlike generated [`Alert`]s, no deduplication is applied.
#[derive(Clone, Debug)]
pub struct CreateCustomAlert {
    /// ID of the [`User`] to notify.
    pub user_id: user::Id,

    /// ID of the [`Game`] the [`Alert`] is about.
    pub game_id: game::Id,

    /// [`alert::Kind`] of the [`Alert`].
    pub kind: alert::Kind,

    /// [`alert::Message`] of the [`Alert`].
    pub message: alert::Message,
}

impl<Db> Command<CreateCustomAlert> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Game>, game::Id>>,
            Ok = Option<Game>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Allocate<alert::Id>,
            Ok = alert::Id,
            Err = Traced<database::Error>,
        > + Database<Insert<Alert>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Alert;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateCustomAlert,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateCustomAlert {
            user_id,
            game_id,
            kind,
            message,
        } = cmd;

        _ = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        _ = self
            .database()
            .execute(Select(By::<Option<Game>, _>::new(game_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::GameNotExists(game_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let alert = Alert {
            id: tx
                .execute(Allocate::new())
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            user_id,
            game_id,
            kind,
            message,
            created_at: DateTime::now().coerce(),
            is_read: false,
        };
        tx.execute(Insert(alert.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(alert)
    }
}

/// Error of [`CreateCustomAlert`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Game`] with the provided ID does not exist.
    #[display("`Game(id: {_0})` does not exist")]
    GameNotExists(#[error(not(source))] game::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{fixture, GenerateOverdueAlerts},
        domain::{alert, game},
        query::{self, Query as _},
        read,
    };

    use super::{Command as _, CreateCustomAlert, ExecutionError as E};

    #[tokio::test]
    async fn sends_every_message_without_dedup() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let cmd = CreateCustomAlert {
            user_id: u.id,
            game_id: g.id,
            kind: alert::Kind::Custom,
            message: alert::Message::new("Tournament on Friday").unwrap(),
        };

        let first = svc.execute(cmd.clone()).await.unwrap();
        let second = svc.execute(cmd).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(!first.is_read);
        assert_eq!(second.kind, alert::Kind::Custom);
    }

    #[tokio::test]
    async fn keeps_operator_alerts_next_to_generated_ones() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        _ = fixture::lend(
            &svc,
            &u,
            &g,
            now - fixture::DAY * 3,
            now - fixture::DAY,
        )
        .await;
        _ = svc.execute(GenerateOverdueAlerts).await.unwrap();
        let cmd = CreateCustomAlert {
            user_id: u.id,
            game_id: g.id,
            kind: alert::Kind::Overdue,
            message: alert::Message::new("Please bring Chess back").unwrap(),
        };

        _ = svc.execute(cmd.clone()).await.unwrap();
        _ = svc.execute(cmd).await.unwrap();

        let unread = svc
            .execute(query::alerts::TotalCount::by(read::alert::list::Filter {
                user_id: Some(u.id),
                kind: Some(alert::Kind::Overdue),
                is_read: Some(false),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(i32::from(unread), 3);
    }

    #[tokio::test]
    async fn fails_for_unknown_game() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;

        let err = svc
            .execute(CreateCustomAlert {
                user_id: u.id,
                game_id: game::Id::new(9).unwrap(),
                kind: alert::Kind::Custom,
                message: alert::Message::new("Hi").unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::GameNotExists(_)), "{err}");
    }
}
