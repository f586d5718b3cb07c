//! [`Command`] for marking an [`Alert`] as read.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{alert, Alert},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for marking an [`Alert`] as read.
#[derive(Clone, Copy, Debug)]
pub struct MarkAlertAsRead {
    /// ID of the [`Alert`] to mark.
    pub alert_id: alert::Id,
}

impl<Db> Command<MarkAlertAsRead> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Alert, alert::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Alert>, alert::Id>>,
            Ok = Option<Alert>,
            Err = Traced<database::Error>,
        > + Database<Update<Alert>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Alert;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        MarkAlertAsRead { alert_id }: MarkAlertAsRead,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(alert_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut alert = tx
            .execute(Select(By::<Option<Alert>, _>::new(alert_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::AlertNotExists(alert_id))
            .map_err(tracerr::wrap!())?;
        if alert.is_read {
            return Ok(alert);
        }

        alert.is_read = true;
        tx.execute(Update(alert.clone()))
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

/// Error of [`MarkAlertAsRead`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Alert`] with the provided ID does not exist.
    #[display("`Alert(id: {_0})` does not exist")]
    AlertNotExists(#[error(not(source))] alert::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{fixture, CreateCustomAlert},
        domain::alert,
    };

    use super::{Command as _, ExecutionError as E, MarkAlertAsRead};

    #[tokio::test]
    async fn marks_alert_as_read() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let a = svc
            .execute(CreateCustomAlert {
                user_id: u.id,
                game_id: g.id,
                kind: alert::Kind::Custom,
                message: alert::Message::new("Hello").unwrap(),
            })
            .await
            .unwrap();

        let read = svc
            .execute(MarkAlertAsRead { alert_id: a.id })
            .await
            .unwrap();
        assert!(read.is_read);

        let again = svc
            .execute(MarkAlertAsRead { alert_id: a.id })
            .await
            .unwrap();
        assert!(again.is_read);
    }

    #[tokio::test]
    async fn fails_for_unknown_alert() {
        let svc = fixture::service();

        let err = svc
            .execute(MarkAlertAsRead {
                alert_id: alert::Id::new(1).unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::AlertNotExists(_)), "{err}");
    }
}
