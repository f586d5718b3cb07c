//! [`AlertsSummary`] definition.

use std::collections::BTreeMap;

use common::operations::{By, Select};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{user, Alert},
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] collecting unread [`Alert`]s of every [`User`] having any.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlertsSummary;

/// Output of the [`AlertsSummary`] [`Query`]: unread [`Alert`]s per [`User`],
/// ordered by [`user::Id`].
pub type Output = BTreeMap<user::Id, Vec<Alert>>;

impl<Db> Query<AlertsSummary> for Service<Db>
where
    Db: Database<
        Select<By<Vec<Alert>, read::alert::list::Filter>>,
        Ok = Vec<Alert>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Output;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: AlertsSummary) -> Result<Self::Ok, Self::Err> {
        let unread = self
            .database()
            .execute(Select(By::<Vec<Alert>, _>::new(
                read::alert::list::Filter {
                    is_read: Some(false),
                    ..read::alert::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::wrap!())?;

        let mut summary = Output::new();
        for alert in unread {
            summary.entry(alert.user_id).or_default().push(alert);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{fixture, CreateCustomAlert, MarkAlertAsRead},
        domain::alert,
        Command as _,
    };

    use super::{AlertsSummary, Query as _};

    #[tokio::test]
    async fn groups_unread_alerts_by_user() {
        let svc = fixture::service();
        let alice = fixture::user(&svc, "a@x.com").await;
        let bob = fixture::user(&svc, "b@x.com").await;
        let carol = fixture::user(&svc, "c@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let mut ids = vec![];
        for user_id in [alice.id, bob.id, alice.id, carol.id] {
            let a = svc
                .execute(CreateCustomAlert {
                    user_id,
                    game_id: g.id,
                    kind: alert::Kind::Custom,
                    message: alert::Message::new("Hey").unwrap(),
                })
                .await
                .unwrap();
            ids.push(a.id);
        }
        _ = svc
            .execute(MarkAlertAsRead { alert_id: ids[3] })
            .await
            .unwrap();

        let summary = svc.execute(AlertsSummary).await.unwrap();

        assert_eq!(
            summary.keys().copied().collect::<Vec<_>>(),
            [alice.id, bob.id],
        );
        assert_eq!(summary[&alice.id].len(), 2);
        assert_eq!(summary[&bob.id].len(), 1);
    }
}
