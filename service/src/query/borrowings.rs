//! [`Query`] collection related to the multiple [`Borrowing`]s.

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{
    domain::{user, Borrowing},
    read::{self, borrowing::Open},
};

use super::DatabaseQuery;

/// Queries a list of [`Borrowing`]s.
pub type List = DatabaseQuery<
    By<read::borrowing::list::Page, read::borrowing::list::Selector>,
>;

/// Queries total count of [`Borrowing`]s matching a filter.
pub type TotalCount = DatabaseQuery<
    By<read::borrowing::list::TotalCount, read::borrowing::list::Filter>,
>;

/// Queries all the [`Open`] [`Borrowing`]s of a [`User`].
///
/// [`User`]: crate::domain::User
pub type OpenByUser = DatabaseQuery<By<Vec<Open<Borrowing>>, user::Id>>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{fixture, ReturnGame},
        query::Query as _,
        read::borrowing::list::{Arguments, Filter, Selector, Status},
        Command as _,
    };

    use super::{List, OpenByUser, TotalCount};

    #[tokio::test]
    async fn filters_by_recomputed_status() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let chess = fixture::game(&svc, "Chess").await;
        let go = fixture::game(&svc, "Go").await;
        let catan = fixture::game(&svc, "Catan").await;
        let now = DateTime::now();
        let late = fixture::lend(
            &svc,
            &u,
            &chess,
            now - fixture::DAY * 5,
            now - fixture::DAY,
        )
        .await;
        _ = fixture::lend(&svc, &u, &go, now, now + fixture::DAY).await;
        let done =
            fixture::lend(&svc, &u, &catan, now, now + fixture::DAY).await;
        _ = svc
            .execute(ReturnGame {
                borrowing_id: done.id,
            })
            .await
            .unwrap();

        let count = |status: Status| {
            let svc = &svc;
            async move {
                i32::from(
                    svc.execute(TotalCount::by(Filter {
                        status: Some(status),
                        ..Filter::default()
                    }))
                    .await
                    .unwrap(),
                )
            }
        };
        assert_eq!(count(Status::Open).await, 2);
        assert_eq!(count(Status::Overdue).await, 1);
        assert_eq!(count(Status::Returned).await, 1);

        let page = svc
            .execute(List::by(Selector {
                arguments: Arguments::Forward {
                    first: 10,
                    after: None,
                    including: false,
                },
                filter: Filter {
                    status: Some(Status::Overdue),
                    ..Filter::default()
                },
            }))
            .await
            .unwrap();
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].node.id, late.id);

        let open = svc.execute(OpenByUser::by(u.id)).await.unwrap();
        assert_eq!(open.len(), 2);
    }
}
