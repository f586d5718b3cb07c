//! [`Command`] for raising [`Alert`]s about overdue [`Borrowing`]s.

use std::ops::Range;

use common::{
    operations::{
        Allocate, By, Commit, Insert, Lock, Select, Transact, Transacted,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{alert, borrowing, game, Alert, Borrowing, Game},
    infra::{database, Database},
    read::{alert::Unread, borrowing::Open},
    Service,
};

use super::Command;

/// [`Command`] for raising an [`alert::Kind::Overdue`] [`Alert`] for every
/// open [`Borrowing`] past its due date.
///
/// Overdue state is recomputed from [`Borrowing::due_at`], regardless of the
/// stored [`Borrowing::is_overdue`] flag. No [`Alert`] is raised while an
/// unread one with the same [`alert::Subject`] exists, so repeated runs are
/// idempotent. Returns the number of raised [`Alert`]s.
#[derive(Clone, Copy, Debug)]
pub struct GenerateOverdueAlerts;

impl<Db> Command<GenerateOverdueAlerts> for Service<Db>
where
    Db: Database<
            Select<By<Vec<Open<Borrowing>>, Range<borrowing::DueDateTime>>>,
            Ok = Vec<Open<Borrowing>>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Borrowing, borrowing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Borrowing>, borrowing::Id>>,
            Ok = Option<Borrowing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unread<Alert>>, alert::Subject>>,
            Ok = Option<Unread<Alert>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Game>, game::Id>>,
            Ok = Option<Game>,
            Err = Traced<database::Error>,
        > + Database<
            Allocate<alert::Id>,
            Ok = alert::Id,
            Err = Traced<database::Error>,
        > + Database<Insert<Alert>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = usize;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        _: GenerateOverdueAlerts,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let now = DateTime::now();
        let overdue = self
            .database()
            .execute(Select(By::new(
                borrowing::DueDateTime::UNIX_EPOCH..now.coerce(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut count = 0;
        for Open(b) in overdue {
            let raised = raise_alert(
                self.database(),
                b.id,
                alert::Kind::Overdue,
                |b| b.is_overdue_at(now),
                alert::Message::overdue,
            )
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if raised {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Error of [`GenerateOverdueAlerts`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}

/// Raises an [`Alert`] of the provided [`alert::Kind`] for the [`Borrowing`]
/// with the provided ID in its own transaction.
///
/// Holds a lock on the [`Borrowing`] while checking for a duplicate. Does
/// nothing if the [`Borrowing`] doesn't satisfy the `applies` predicate
/// anymore, or an unread [`Alert`] with the same [`alert::Subject`] exists.
/// Returns whether an [`Alert`] has been raised.
pub(super) async fn raise_alert<Db>(
    database: &Db,
    borrowing_id: borrowing::Id,
    kind: alert::Kind,
    applies: impl FnOnce(&Borrowing) -> bool,
    message: impl FnOnce(&Game, borrowing::DueDateTime) -> alert::Message,
) -> Result<bool, Traced<database::Error>>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Borrowing, borrowing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Borrowing>, borrowing::Id>>,
            Ok = Option<Borrowing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unread<Alert>>, alert::Subject>>,
            Ok = Option<Unread<Alert>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Game>, game::Id>>,
            Ok = Option<Game>,
            Err = Traced<database::Error>,
        > + Database<
            Allocate<alert::Id>,
            Ok = alert::Id,
            Err = Traced<database::Error>,
        > + Database<Insert<Alert>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    let tx = database.execute(Transact).await.map_err(tracerr::wrap!())?;

    // Concurrent raisers for the same `Borrowing` must queue here, so the
    // unread `Alert` check below sees the one committed before.
    tx.execute(Lock(By::<Borrowing, _>::new(borrowing_id)))
        .await
        .map_err(tracerr::wrap!())
        .map(drop)?;

    let borrowing = tx
        .execute(Select(By::<Option<Borrowing>, _>::new(borrowing_id)))
        .await
        .map_err(tracerr::wrap!())?;
    let Some(borrowing) = borrowing.filter(|b| applies(b)) else {
        return Ok(false);
    };

    let subject = alert::Subject {
        user_id: borrowing.user_id,
        game_id: borrowing.game_id,
        kind,
    };
    let existing = tx
        .execute(Select(By::<Option<Unread<Alert>>, _>::new(subject)))
        .await
        .map_err(tracerr::wrap!())?;
    if existing.is_some() {
        return Ok(false);
    }

    let Some(game) = tx
        .execute(Select(By::<Option<Game>, _>::new(borrowing.game_id)))
        .await
        .map_err(tracerr::wrap!())?
    else {
        return Ok(false);
    };

    let alert = Alert {
        id: tx.execute(Allocate::new()).await.map_err(tracerr::wrap!())?,
        user_id: borrowing.user_id,
        game_id: borrowing.game_id,
        kind,
        message: message(&game, borrowing.due_at),
        created_at: DateTime::now().coerce(),
        is_read: false,
    };
    tx.execute(Insert(alert))
        .await
        .map_err(tracerr::wrap!())
        .map(drop)?;
    tx.execute(Commit)
        .await
        .map_err(tracerr::wrap!())
        .map(drop)?;

    Ok(true)
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{fixture, MarkAlertAsRead},
        domain::alert,
        query::{self, Query as _},
        read,
    };

    use super::{Command as _, GenerateOverdueAlerts};

    #[tokio::test]
    async fn raises_single_alert_per_overdue_borrowing() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        _ = fixture::lend(
            &svc,
            &u,
            &g,
            now - fixture::DAY * 9,
            now - fixture::DAY * 2,
        )
        .await;

        let first = svc.execute(GenerateOverdueAlerts).await.unwrap();
        let second = svc.execute(GenerateOverdueAlerts).await.unwrap();

        assert_eq!((first, second), (1, 0));
        let alerts = svc
            .execute(query::alerts::TotalCount::by(read::alert::list::Filter {
                user_id: Some(u.id),
                kind: Some(alert::Kind::Overdue),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(i32::from(alerts), 1);
    }

    #[tokio::test]
    async fn concurrent_rounds_raise_single_alert() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        _ = fixture::lend(
            &svc,
            &u,
            &g,
            now - fixture::DAY * 9,
            now - fixture::DAY * 2,
        )
        .await;

        let (first, second) = tokio::join!(
            svc.execute(GenerateOverdueAlerts),
            svc.execute(GenerateOverdueAlerts),
        );

        assert_eq!(first.unwrap() + second.unwrap(), 1);
        let alerts = svc
            .execute(query::alerts::TotalCount::by(read::alert::list::Filter {
                user_id: Some(u.id),
                kind: Some(alert::Kind::Overdue),
                is_read: Some(false),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(i32::from(alerts), 1);
    }

    #[tokio::test]
    async fn ignores_stored_overdue_flag() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g1 = fixture::game(&svc, "Chess").await;
        let g2 = fixture::game(&svc, "Go").await;
        let now = DateTime::now();
        _ = fixture::lend(
            &svc,
            &u,
            &g1,
            now - fixture::DAY * 3,
            now - fixture::DAY,
        )
        .await;
        _ = fixture::lend(&svc, &u, &g2, now, now + fixture::DAY).await;

        let count = svc.execute(GenerateOverdueAlerts).await.unwrap();

        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn raises_again_once_previous_alert_is_read() {
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
        let alerts = svc
            .execute(query::alerts::List::by(read::alert::list::Selector {
                arguments: read::alert::list::Arguments::Forward {
                    first: 10,
                    after: None,
                    including: false,
                },
                filter: read::alert::list::Filter::default(),
            }))
            .await
            .unwrap();
        let alert_id = alerts.edges[0].node.id;
        _ = svc.execute(MarkAlertAsRead { alert_id }).await.unwrap();

        let count = svc.execute(GenerateOverdueAlerts).await.unwrap();

        assert_eq!(count, 1);
    }
}
