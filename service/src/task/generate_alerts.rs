//! [`GenerateAlerts`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Perform, Start};
use derive_more::{Display, Error as StdError, From};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{
        cleanup_resolved_alerts, generate_overdue_alerts,
        generate_reminder_alerts, CleanupResolvedAlerts,
        GenerateOverdueAlerts, GenerateReminderAlerts,
    },
    Command, Service,
};

use super::Task;

/// Configuration for [`GenerateAlerts`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between alert generation rounds.
    #[default(time::Duration::from_secs(60 * 60))]
    pub interval: time::Duration,
}

/// [`Task`] periodically deriving alerts from the borrowings state.
///
/// Every round runs [`GenerateOverdueAlerts`], [`GenerateReminderAlerts`] and
/// [`CleanupResolvedAlerts`] in this order. The stored overdue flag of
/// borrowings is never written here.
#[derive(Clone, Copy, Debug)]
pub struct GenerateAlerts<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<GenerateAlerts<Self>, Config>>> for Service<Db>
where
    GenerateAlerts<Service<Db>>:
        Task<Perform<()>, Ok = (), Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<GenerateAlerts<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = GenerateAlerts {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::GenerateAlerts` failed: {e}");
            });
        }
    }
}

impl<Db> Task<Perform<()>> for GenerateAlerts<Service<Db>>
where
    Service<Db>: Command<
            GenerateOverdueAlerts,
            Ok = usize,
            Err = Traced<generate_overdue_alerts::ExecutionError>,
        > + Command<
            GenerateReminderAlerts,
            Ok = usize,
            Err = Traced<generate_reminder_alerts::ExecutionError>,
        > + Command<
            CleanupResolvedAlerts,
            Ok = u64,
            Err = Traced<cleanup_resolved_alerts::ExecutionError>,
        >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let overdue = self.service.execute(GenerateOverdueAlerts).await?;
        let reminders = self.service.execute(GenerateReminderAlerts).await?;
        let removed = self.service.execute(CleanupResolvedAlerts).await?;

        log::debug!(
            "`task::GenerateAlerts` raised {overdue} overdue and {reminders} \
             reminder alerts, removed {removed} resolved ones",
        );
        Ok(())
    }
}

/// Error of [`GenerateAlerts`] execution.
#[derive(Debug, Display, From, StdError)]
pub enum ExecutionError {
    /// [`GenerateOverdueAlerts`] failed.
    #[display("overdue alerts generation failed: {_0}")]
    Overdue(Traced<generate_overdue_alerts::ExecutionError>),

    /// [`GenerateReminderAlerts`] failed.
    #[display("reminder alerts generation failed: {_0}")]
    Reminder(Traced<generate_reminder_alerts::ExecutionError>),

    /// [`CleanupResolvedAlerts`] failed.
    #[display("resolved alerts cleanup failed: {_0}")]
    Cleanup(Traced<cleanup_resolved_alerts::ExecutionError>),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Perform, Start},
        DateTime,
    };

    use crate::{
        command::fixture,
        query::{self, Query as _},
        read,
    };

    use super::{Config, GenerateAlerts, Task as _};

    #[tokio::test]
    async fn performs_all_alert_policies() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let late = fixture::game(&svc, "Chess").await;
        let soon = fixture::game(&svc, "Go").await;
        let now = DateTime::now();
        _ = fixture::lend(
            &svc,
            &u,
            &late,
            now - fixture::DAY * 3,
            now - fixture::DAY,
        )
        .await;
        _ = fixture::lend(&svc, &u, &soon, now, now + fixture::DAY).await;
        let task = GenerateAlerts {
            config: Config::default(),
            service: svc.clone(),
        };

        task.execute(Perform(())).await.unwrap();
        task.execute(Perform(())).await.unwrap();

        let alerts = svc
            .execute(query::alerts::TotalCount::by(
                read::alert::list::Filter::default(),
            ))
            .await
            .unwrap();
        assert_eq!(i32::from(alerts), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_first_round_right_away() {
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

        // The loop never ends, so only the first round fits the timeout.
        _ = tokio::time::timeout(
            Duration::from_secs(1),
            svc.execute(Start(By::<GenerateAlerts<_>, _>::new(Config {
                interval: Duration::from_secs(60),
            }))),
        )
        .await
        .unwrap_err();

        let alerts = svc
            .execute(query::alerts::TotalCount::by(
                read::alert::list::Filter::default(),
            ))
            .await
            .unwrap();
        assert_eq!(i32::from(alerts), 1);
    }
}
