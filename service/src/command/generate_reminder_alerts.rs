//! [`Command`] for raising [`Alert`]s about soon due [`Borrowing`]s.

use std::ops::Range;

use common::{
    operations::{
        Allocate, By, Commit, Insert, Lock, Select, Transact, Transacted,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::Config;
use crate::{
    domain::{alert, borrowing, game, Alert, Borrowing, Game},
    infra::{database, Database},
    read::{alert::Unread, borrowing::Open},
    Service,
};

use super::{generate_overdue_alerts::raise_alert, Command};

/// [`Command`] for raising an [`alert::Kind::Reminder`] [`Alert`] for every
/// open [`Borrowing`] not overdue yet, but due within the
/// [`Config::reminder_window`].
///
/// Deduplicated the same way as [`GenerateOverdueAlerts`] does. Returns the
/// number of raised [`Alert`]s.
///
/// [`GenerateOverdueAlerts`]: super::GenerateOverdueAlerts
#[derive(Clone, Copy, Debug)]
pub struct GenerateReminderAlerts;

impl<Db> Command<GenerateReminderAlerts> for Service<Db>
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
        _: GenerateReminderAlerts,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let now = DateTime::now();
        let until = now + self.config().reminder_window;
        let due_soon = self
            .database()
            .execute(Select(By::new(now.coerce()..until.coerce())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut count = 0;
        for Open(b) in due_soon {
            let raised = raise_alert(
                self.database(),
                b.id,
                alert::Kind::Reminder,
                |b| {
                    !b.is_returned()
                        && !b.is_overdue_at(now)
                        && b.due_at < until.coerce()
                },
                alert::Message::reminder,
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

/// Error of [`GenerateReminderAlerts`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::{
        command::fixture,
        domain::alert,
        infra::Memory,
        query::{self, Query as _},
        read, Config, Service,
    };

    use super::{Command as _, GenerateReminderAlerts};

    #[tokio::test]
    async fn reminds_about_borrowings_due_within_window() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let soon = fixture::game(&svc, "Chess").await;
        let later = fixture::game(&svc, "Go").await;
        let late = fixture::game(&svc, "Catan").await;
        let now = DateTime::now();
        _ = fixture::lend(&svc, &u, &soon, now, now + fixture::DAY).await;
        _ = fixture::lend(&svc, &u, &later, now, now + fixture::DAY * 5).await;
        _ = fixture::lend(
            &svc,
            &u,
            &late,
            now - fixture::DAY * 5,
            now - fixture::DAY,
        )
        .await;

        let first = svc.execute(GenerateReminderAlerts).await.unwrap();
        let second = svc.execute(GenerateReminderAlerts).await.unwrap();

        assert_eq!((first, second), (1, 0));
        let alerts = svc
            .execute(query::alerts::TotalCount::by(read::alert::list::Filter {
                game_id: Some(soon.id),
                kind: Some(alert::Kind::Reminder),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(i32::from(alerts), 1);
    }

    #[tokio::test]
    async fn respects_configured_window() {
        let (svc, _) = Service::new(
            Config {
                reminder_window: Duration::from_secs(60 * 60),
                ..Config::default()
            },
            Memory::new(),
        );
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        _ = fixture::lend(&svc, &u, &g, now, now + fixture::DAY).await;

        let count = svc.execute(GenerateReminderAlerts).await.unwrap();

        assert_eq!(count, 0);
    }
}
