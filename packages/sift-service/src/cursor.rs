//! Cursor pagination over the ranked row set.
//!
//! Relevance is computed, non-unique, and non-monotonic, so pages cannot be
//! cut by value alone. The engine re-derives the anchor row's score per
//! request and slices with a compound predicate over (relevance,
//! published_at, id). Backward pagination flips the relevance and date order
//! terms, fetches the "last" rows as the smallest in natural order, and
//! re-reverses the slice before emission so every page reads in natural
//! (forward) order.

use sift_domain::{cursor, filters::Direction};

use crate::{
	query_mod::{BindValue, OrderDirection, Predicate, QueryMod},
	relevance::RankedRow,
};

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
	pub has_next_page: bool,
	pub has_previous_page: bool,
	pub start_cursor: Option<String>,
	pub end_cursor: Option<String>,
}
impl PageInfo {
	pub fn empty() -> Self {
		Self {
			has_next_page: false,
			has_previous_page: false,
			start_cursor: None,
			end_cursor: None,
		}
	}
}

#[derive(Clone, Debug)]
pub struct Page {
	pub rows: Vec<RankedRow>,
	pub info: PageInfo,
}
impl Page {
	pub fn empty() -> Self {
		Self { rows: Vec::new(), info: PageInfo::empty() }
	}
}

/// The ordering mod every search carries: relevance, then publication date,
/// then id as the stabilizing tiebreak. The first two flip with direction;
/// id stays descending, which the cursor predicate's final arm mirrors.
pub fn ordering_mod(direction: Direction) -> QueryMod {
	let flipped = match direction {
		Direction::Forward => OrderDirection::Desc,
		Direction::Backward => OrderDirection::Asc,
	};
	let mut ordering = QueryMod::global();

	ordering.add_order("{w}", flipped, 0);
	ordering.add_order("{a}.published_at", flipped, 5);
	ordering.add_order("{a}.id", OrderDirection::Desc, 10);

	ordering
}

/// The compound comparison predicate anchored at the cursor row. `<` walks
/// forward through descending relevance; `>` walks backward.
pub fn cursor_mod(direction: Direction, anchor: &RankedRow) -> QueryMod {
	let op = match direction {
		Direction::Forward => "<",
		Direction::Backward => ">",
	};
	let mut cursor_mod = QueryMod::global();

	cursor_mod.add_where(Predicate::Raw {
		template: format!(
			"({{w}} {op} ? OR ({{w}} = ? AND ({{a}}.published_at {op} ? OR ({{a}}.published_at = ? AND {{a}}.id > ?))))"
		),
		binds: vec![
			BindValue::Float(anchor.relevance),
			BindValue::Float(anchor.relevance),
			BindValue::Timestamp(anchor.published_at),
			BindValue::Timestamp(anchor.published_at),
			BindValue::Int(anchor.id),
		],
	});

	cursor_mod
}

/// Slices the `page_size + 1` probe fetch into a page. The extra row only
/// proves another page exists in the fetch direction; it is never emitted.
pub fn assemble_page(
	mut rows: Vec<RankedRow>,
	page_size: usize,
	direction: Direction,
	has_cursor: bool,
) -> Page {
	let has_extra = rows.len() > page_size;

	rows.truncate(page_size);

	if direction == Direction::Backward {
		rows.reverse();
	}

	let (has_next_page, has_previous_page) = match direction {
		Direction::Forward => (has_extra, has_cursor),
		Direction::Backward => (has_cursor, has_extra),
	};
	let info = PageInfo {
		has_next_page,
		has_previous_page,
		start_cursor: rows.first().map(|row| cursor::encode(row.id)),
		end_cursor: rows.last().map(|row| cursor::encode(row.id)),
	};

	Page { rows, info }
}

#[cfg(test)]
mod tests {
	use time::OffsetDateTime;

	use super::*;

	fn row(id: i64, relevance: f64) -> RankedRow {
		RankedRow {
			id,
			site: 1,
			source: "post".to_string(),
			published_at: OffsetDateTime::from_unix_timestamp(1_577_836_800 + id)
				.expect("Valid timestamp."),
			relevance,
		}
	}

	#[test]
	fn forward_page_with_extra_row_has_next() {
		let rows = vec![row(4, 40.), row(3, 30.), row(2, 20.)];
		let page = assemble_page(rows, 2, Direction::Forward, false);

		assert_eq!(page.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![4, 3]);
		assert!(page.info.has_next_page);
		assert!(!page.info.has_previous_page);
		assert_eq!(page.info.start_cursor.as_deref(), Some(cursor::encode(4).as_str()));
		assert_eq!(page.info.end_cursor.as_deref(), Some(cursor::encode(3).as_str()));
	}

	#[test]
	fn forward_page_after_cursor_has_previous() {
		let rows = vec![row(2, 20.), row(1, 10.)];
		let page = assemble_page(rows, 2, Direction::Forward, true);

		assert!(!page.info.has_next_page);
		assert!(page.info.has_previous_page);
	}

	#[test]
	fn backward_page_restores_natural_order() {
		// Backward fetch returns ascending relevance; the page must read
		// descending, like a forward page would.
		let rows = vec![row(1, 10.), row(2, 20.), row(3, 30.)];
		let page = assemble_page(rows, 2, Direction::Backward, false);

		assert_eq!(page.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1]);
		assert!(!page.info.has_next_page);
		assert!(page.info.has_previous_page);
		assert_eq!(page.info.start_cursor.as_deref(), Some(cursor::encode(2).as_str()));
		assert_eq!(page.info.end_cursor.as_deref(), Some(cursor::encode(1).as_str()));
	}

	#[test]
	fn backward_page_before_cursor_has_next() {
		let rows = vec![row(1, 10.)];
		let page = assemble_page(rows, 4, Direction::Backward, true);

		assert!(page.info.has_next_page);
		assert!(!page.info.has_previous_page);
	}

	#[test]
	fn empty_fetch_yields_an_empty_page() {
		let page = assemble_page(Vec::new(), 4, Direction::Forward, false);

		assert!(page.rows.is_empty());
		assert_eq!(page.info, PageInfo::empty());
	}

	#[test]
	fn ordering_flips_with_direction_except_the_id_tiebreak() {
		let forward = ordering_mod(Direction::Forward);
		let backward = ordering_mod(Direction::Backward);

		let directions = |m: &QueryMod| {
			m.orders().iter().map(|t| (t.expression.clone(), t.direction)).collect::<Vec<_>>()
		};

		assert_eq!(
			directions(&forward),
			vec![
				("{w}".to_string(), OrderDirection::Desc),
				("{a}.published_at".to_string(), OrderDirection::Desc),
				("{a}.id".to_string(), OrderDirection::Desc),
			]
		);
		assert_eq!(
			directions(&backward),
			vec![
				("{w}".to_string(), OrderDirection::Asc),
				("{a}.published_at".to_string(), OrderDirection::Asc),
				("{a}.id".to_string(), OrderDirection::Desc),
			]
		);
	}

	#[test]
	fn cursor_predicate_compares_weight_then_date_then_id() {
		let anchor = row(7, 25.);
		let forward = cursor_mod(Direction::Forward, &anchor);
		let wheres = forward.wheres();

		assert_eq!(wheres.len(), 1);
		assert!(wheres[0].references_weight());

		let Predicate::Raw { template, binds } = &wheres[0] else {
			panic!("Expected a raw predicate.");
		};

		assert_eq!(
			template,
			"({w} < ? OR ({w} = ? AND ({a}.published_at < ? OR ({a}.published_at = ? AND {a}.id > ?))))"
		);
		assert_eq!(binds.len(), 5);
		assert_eq!(binds[4], BindValue::Int(7));

		let backward = cursor_mod(Direction::Backward, &anchor);
		let Predicate::Raw { template, .. } = &backward.wheres()[0] else {
			panic!("Expected a raw predicate.");
		};

		assert!(template.contains("{w} > ?"), "Unexpected template: {template}");
	}
}
