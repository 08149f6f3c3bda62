//! Paged-query support.
//!
//! List endpoints share one request shape: skip, take, a sort column name,
//! and a sort direction. Handlers declare the sortable columns as a static
//! [`SortKey`] table mapping names to comparators, then hand the backing
//! rows to [`sort_and_page`].

use std::cmp::Ordering;

use super::field::{Field, FieldKind};
use super::rules::Rule;
use super::Schema;
use crate::protocol::wire::response_code;

/// Standard request parameters for a paged list endpoint.
#[derive(Debug, Default, Clone)]
pub struct PageQuery {
    /// Rows to skip before the page starts.
    pub skip: u32,
    /// Maximum rows in the page.
    pub take: u32,
    /// Name of the column to sort by; must match a declared [`SortKey`].
    pub order_by: String,
    /// Sort ascending when true, descending otherwise.
    pub ascending: bool,
}

impl Schema for PageQuery {
    const INPUT: &'static [Field<Self>] = &[
        Field {
            name: "skip",
            kind: FieldKind::Leaf(|q| &mut q.skip),
            rules: &[],
        },
        Field {
            name: "take",
            kind: FieldKind::Leaf(|q| &mut q.take),
            rules: &[],
        },
        Field {
            name: "order_by",
            kind: FieldKind::Leaf(|q| &mut q.order_by),
            rules: &[Rule::string_length(1, 64)],
        },
        Field {
            name: "ascending",
            kind: FieldKind::Leaf(|q| &mut q.ascending),
            rules: &[],
        },
    ];
    const OUTPUT: &'static [Field<Self>] = &[];
}

/// One sortable column: its request name and its comparator.
pub struct SortKey<T> {
    pub name: &'static str,
    pub compare: fn(&T, &T) -> Ordering,
}

impl<T> SortKey<T> {
    pub const fn new(name: &'static str, compare: fn(&T, &T) -> Ordering) -> Self {
        Self { name, compare }
    }
}

/// Sorts rows by the query's column and cuts the requested page.
///
/// An `order_by` naming no declared key fails with
/// [`response_code::PARAMETER_VALIDATION_FAILED`].
pub fn sort_and_page<T: Clone>(
    rows: &[T],
    query: &PageQuery,
    keys: &[SortKey<T>],
) -> Result<Vec<T>, u16> {
    sort_page_map(rows, query, keys, |row| row.clone())
}

/// [`sort_and_page`] with a projection applied to each row in the page.
pub fn sort_page_map<T, U>(
    rows: &[T],
    query: &PageQuery,
    keys: &[SortKey<T>],
    map: impl Fn(&T) -> U,
) -> Result<Vec<U>, u16> {
    let key = keys
        .iter()
        .find(|key| key.name == query.order_by)
        .ok_or(response_code::PARAMETER_VALIDATION_FAILED)?;

    let mut order: Vec<&T> = rows.iter().collect();
    order.sort_by(|a, b| {
        let ordering = (key.compare)(a, b);
        if query.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });

    Ok(order
        .into_iter()
        .skip(query.skip as usize)
        .take(query.take as usize)
        .map(map)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u64,
        name: &'static str,
    }

    const KEYS: &[SortKey<Row>] = &[
        SortKey::new("id", |a, b| a.id.cmp(&b.id)),
        SortKey::new("name", |a, b| a.name.cmp(b.name)),
    ];

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 3, name: "c" },
            Row { id: 1, name: "a" },
            Row { id: 2, name: "b" },
        ]
    }

    fn query(skip: u32, take: u32, order_by: &str, ascending: bool) -> PageQuery {
        PageQuery {
            skip,
            take,
            order_by: order_by.into(),
            ascending,
        }
    }

    #[test]
    fn sorts_and_pages() {
        let page = sort_and_page(&rows(), &query(1, 1, "id", true), KEYS).unwrap();
        assert_eq!(page, vec![Row { id: 2, name: "b" }]);
    }

    #[test]
    fn descending_reverses_order() {
        let page = sort_and_page(&rows(), &query(0, 3, "name", false), KEYS).unwrap();
        assert_eq!(
            page.iter().map(|r| r.name).collect::<Vec<_>>(),
            vec!["c", "b", "a"]
        );
    }

    #[test]
    fn unknown_column_fails_validation() {
        assert_eq!(
            sort_and_page(&rows(), &query(0, 3, "height", true), KEYS),
            Err(response_code::PARAMETER_VALIDATION_FAILED)
        );
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = sort_and_page(&rows(), &query(10, 5, "id", true), KEYS).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn projection_variant_maps_rows() {
        let ids = sort_page_map(&rows(), &query(0, 2, "id", true), KEYS, |r| r.id).unwrap();
        assert_eq!(ids, vec![1, 2]);
    }
}
