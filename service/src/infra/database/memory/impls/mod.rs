//! [`Database`] implementations.

mod alert;
mod borrowing;
mod game;
mod user;

use std::collections::BTreeMap;

use common::{
    operations::{Commit, Transact},
    pagination::{self, Arguments, Kind},
};
use tracerr::Traced;

use crate::infra::{database, Database};

use super::{Memory, NonTx, Tx};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(self.begin().await))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

/// Selects a [`pagination::Page`] out of the `items` matching the `filter`,
/// ordered by their keys.
fn paginate<K, V>(
    items: &BTreeMap<K, V>,
    arguments: &Arguments<K>,
    filter: impl Fn(&V) -> bool,
) -> pagination::Page<K, V>
where
    K: Copy + Ord,
    V: Clone,
{
    let limit = arguments.limit();
    let cursor = arguments.cursor().copied();
    let kind = arguments.kind();

    let matched = |(k, v): &(&K, &V)| {
        let by_cursor = cursor.map_or(true, |c| match kind {
            Kind::Forward => **k > c,
            Kind::ForwardIncluding => **k >= c,
            Kind::Backward => **k < c,
            Kind::BackwardIncluding => **k <= c,
        });
        by_cursor && filter(v)
    };

    let rows: Vec<_> = if kind.is_forward() {
        items.iter().filter(matched).take(limit + 1).collect()
    } else {
        items.iter().rev().filter(matched).take(limit + 1).collect()
    };

    let has_more = rows.len() > limit;
    let edges = rows
        .into_iter()
        .take(limit)
        .map(|(k, v)| (*k, v.clone()))
        .collect::<Vec<_>>();

    pagination::Page::new(arguments, edges, has_more)
}

/// Checks whether the `text` contains any whitespace-separated word of the
/// `pattern`, ignoring case.
fn fuzzy_matches(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    pattern
        .split_whitespace()
        .any(|word| text.contains(&word.to_lowercase()))
}

#[cfg(test)]
mod spec {
    use std::collections::BTreeMap;

    use common::pagination::Arguments;

    use super::{fuzzy_matches, paginate};

    fn items() -> BTreeMap<i32, &'static str> {
        (1..=5).zip(["a", "b", "c", "d", "e"]).collect()
    }

    #[test]
    fn paginates_forward() {
        let args = Arguments::Forward {
            first: 2,
            after: Some(1),
            including: false,
        };
        let page = paginate(&items(), &args, |_| true);

        let keys = page.edges.iter().map(|e| e.cursor).collect::<Vec<_>>();
        assert_eq!(keys, [2, 3]);
        assert!(page.has_more);
    }

    #[test]
    fn paginates_backward() {
        let args = Arguments::Backward {
            last: 3,
            before: Some(3),
            including: true,
        };
        let page = paginate(&items(), &args, |_| true);

        let keys = page.edges.iter().map(|e| e.cursor).collect::<Vec<_>>();
        assert_eq!(keys, [3, 2, 1]);
        assert!(!page.has_more);
    }

    #[test]
    fn applies_filter() {
        let args = Arguments::Forward {
            first: 10,
            after: None,
            including: false,
        };
        let page = paginate(&items(), &args, |v| *v != "c");

        assert_eq!(page.edges.len(), 4);
        assert!(!page.has_more);
    }

    #[test]
    fn matches_any_word_ignoring_case() {
        assert!(fuzzy_matches("Ticket to Ride", "ride"));
        assert!(fuzzy_matches("Ticket to Ride", "chess TICKET"));
        assert!(!fuzzy_matches("Chess", "go"));
    }
}
