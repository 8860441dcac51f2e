//! Translates a structured where clause into query mods.
//!
//! Taxonomy terms must be resolved to `term_taxonomy` ids (including child
//! expansion) before translation; the resolver does that lookup and hands in
//! one [`ResolvedTaxClause`] per taxonomy filter. Translation itself is pure:
//! malformed clauses (a compare missing its value, a taxonomy clause whose
//! terms resolved to nothing) are dropped per the boundary contract, since
//! shape validation happens at the resolver.

use sift_domain::filters::{
	DateClause, MetaCompare, MetaFilter, Relation, TaxOperator, WhereClause,
};

use crate::query_mod::{BindValue, Fragment, Predicate, QueryMod};

/// A taxonomy filter clause with its terms resolved to assignment ids.
#[derive(Clone, Debug)]
pub struct ResolvedTaxClause {
	pub taxonomy: String,
	pub operator: TaxOperator,
	pub term_taxonomy_ids: Vec<i64>,
}

pub fn translate(clause: &WhereClause, taxonomies: &[ResolvedTaxClause]) -> Vec<QueryMod> {
	let mut mods = Vec::new();

	if let Some(ids) = clause.post_in.as_ref().filter(|ids| !ids.is_empty()) {
		let mut id_mod = QueryMod::global();

		id_mod.add_where(Predicate::InList {
			column: "{a}.id".to_string(),
			values: BindValue::IntList(ids.clone()),
			negated: false,
		});
		mods.push(id_mod);
	}
	if let Some(ids) = clause.post_not_in.as_ref().filter(|ids| !ids.is_empty()) {
		let mut id_mod = QueryMod::global();

		id_mod.add_where(Predicate::InList {
			column: "{a}.id".to_string(),
			values: BindValue::IntList(ids.clone()),
			negated: true,
		});
		mods.push(id_mod);
	}
	if let Some(meta) = &clause.meta_query
		&& let Some(meta_mod) = translate_meta(meta.relation, &meta.meta_array)
	{
		mods.push(meta_mod);
	}
	if let Some(tax) = &clause.tax_query
		&& let Some(tax_mod) = translate_taxonomies(tax.relation, taxonomies)
	{
		mods.push(tax_mod);
	}
	if let Some(dates) = clause.date_query.as_ref().filter(|dates| !dates.is_empty())
		&& let Some(date_mod) = translate_dates(dates)
	{
		mods.push(date_mod);
	}

	mods
}

/// Metadata clauses join the meta store once per clause under a fresh alias,
/// so AND semantics over a repeated key compare different rows instead of
/// contradicting each other on one row.
fn translate_meta(relation: Relation, filters: &[MetaFilter]) -> Option<QueryMod> {
	let mut meta_mod = QueryMod::global();
	let mut predicates = Vec::new();

	for filter in filters {
		let n = predicates.len();

		match filter.compare {
			MetaCompare::Exists | MetaCompare::NotExists => {
				let negation =
					if filter.compare == MetaCompare::NotExists { "NOT " } else { "" };

				predicates.push(Predicate::Raw {
					template: format!(
						"{negation}EXISTS (SELECT 1 FROM content_meta WHERE content_meta.content_id = {{a}}.id AND content_meta.meta_key = ?)"
					),
					binds: vec![BindValue::Text(filter.key.clone())],
				});
			},
			compare => {
				let Some(value) = filter.value.as_ref() else {
					continue;
				};
				let Some(predicate) = meta_value_predicate(filter, compare, n, value.as_list())
				else {
					continue;
				};

				meta_mod.add_join(Fragment::literal_with_binds(
					format!(
						"LEFT JOIN content_meta meta{n} ON meta{n}.content_id = {{a}}.id AND meta{n}.meta_key = ?"
					),
					vec![BindValue::Text(filter.key.clone())],
				));
				predicates.push(predicate);
			},
		}
	}

	if predicates.is_empty() {
		return None;
	}

	meta_mod.add_where(Predicate::Group { relation: relation.as_sql(), children: predicates });

	Some(meta_mod)
}

fn meta_value_predicate(
	filter: &MetaFilter,
	compare: MetaCompare,
	n: usize,
	values: Vec<String>,
) -> Option<Predicate> {
	let column = format!("meta{n}.meta_value");
	let cast = filter.meta_type.pg_cast();

	match compare {
		MetaCompare::EqualTo
		| MetaCompare::NotEqualTo
		| MetaCompare::GreaterThan
		| MetaCompare::GreaterThanOrEqualTo
		| MetaCompare::LessThan
		| MetaCompare::LessThanOrEqualTo => {
			let value = values.into_iter().next()?;

			Some(Predicate::Cmp { column, op: compare.as_sql(), value: BindValue::Text(value), cast })
		},
		MetaCompare::Like | MetaCompare::NotLike => {
			let value = values.into_iter().next()?;

			Some(Predicate::Cmp {
				column,
				op: compare.as_sql(),
				value: BindValue::Text(format!("%{value}%")),
				cast: None,
			})
		},
		MetaCompare::In | MetaCompare::NotIn => Some(Predicate::InList {
			column,
			values: BindValue::TextList(values),
			negated: compare == MetaCompare::NotIn,
		}),
		MetaCompare::Between | MetaCompare::NotBetween => {
			let mut values = values.into_iter();
			let low = values.next()?;
			let high = values.next()?;
			let cast_suffix = cast.map(|cast| format!("::{cast}")).unwrap_or_default();

			Some(Predicate::Raw {
				template: format!(
					"{column}{cast_suffix} {} ?{cast_suffix} AND ?{cast_suffix}",
					compare.as_sql()
				),
				binds: vec![BindValue::Text(low), BindValue::Text(high)],
			})
		},
		MetaCompare::Exists | MetaCompare::NotExists => None,
	}
}

/// Under AND, `IN` clauses become term-relationship joins; everything else,
/// and every clause under OR, renders as an EXISTS probe so clauses stay
/// independently satisfiable.
fn translate_taxonomies(relation: Relation, clauses: &[ResolvedTaxClause]) -> Option<QueryMod> {
	let mut tax_mod = QueryMod::global();
	let mut predicates = Vec::new();
	let mut join_count = 0;

	for clause in clauses {
		match clause.operator {
			// A positive clause whose terms resolved to nothing can match
			// nothing; dropping it would silently broaden the query instead.
			TaxOperator::In | TaxOperator::And if clause.term_taxonomy_ids.is_empty() => {
				predicates.push(Predicate::Raw { template: "FALSE".to_string(), binds: Vec::new() });
			},
			TaxOperator::NotIn if clause.term_taxonomy_ids.is_empty() => {},
			TaxOperator::In => {
				if relation == Relation::And {
					let n = join_count;

					join_count += 1;

					tax_mod.add_join(Fragment::literal_with_binds(
						format!(
							"JOIN term_relationships tax{n} ON tax{n}.content_id = {{a}}.id AND tax{n}.term_taxonomy_id = ANY(?)"
						),
						vec![BindValue::IntList(clause.term_taxonomy_ids.clone())],
					));
				} else {
					predicates.push(term_membership(&clause.term_taxonomy_ids, false));
				}
			},
			TaxOperator::NotIn => {
				predicates.push(term_membership(&clause.term_taxonomy_ids, true));
			},
			TaxOperator::And => {
				predicates.push(Predicate::Raw {
					template: "(SELECT count(DISTINCT tr.term_taxonomy_id) FROM term_relationships tr WHERE tr.content_id = {a}.id AND tr.term_taxonomy_id = ANY(?)) = ?".to_string(),
					binds: vec![
						BindValue::IntList(clause.term_taxonomy_ids.clone()),
						BindValue::Int(clause.term_taxonomy_ids.len() as i64),
					],
				});
			},
			TaxOperator::Exists | TaxOperator::NotExists => {
				let negation =
					if clause.operator == TaxOperator::NotExists { "NOT " } else { "" };

				predicates.push(Predicate::Raw {
					template: format!(
						"{negation}EXISTS (SELECT 1 FROM term_relationships tr JOIN term_taxonomy tt ON tt.term_taxonomy_id = tr.term_taxonomy_id WHERE tr.content_id = {{a}}.id AND tt.taxonomy = ?)"
					),
					binds: vec![BindValue::Text(clause.taxonomy.clone())],
				});
			},
		}
	}

	if !predicates.is_empty() {
		tax_mod.add_where(Predicate::Group { relation: relation.as_sql(), children: predicates });
	}
	if tax_mod.is_empty() {
		return None;
	}

	Some(tax_mod)
}

fn term_membership(term_taxonomy_ids: &[i64], negated: bool) -> Predicate {
	let negation = if negated { "NOT " } else { "" };

	Predicate::Raw {
		template: format!(
			"{negation}EXISTS (SELECT 1 FROM term_relationships tr WHERE tr.content_id = {{a}}.id AND tr.term_taxonomy_id = ANY(?))"
		),
		binds: vec![BindValue::IntList(term_taxonomy_ids.to_vec())],
	}
}

fn translate_dates(dates: &[DateClause]) -> Option<QueryMod> {
	let mut date_mod = QueryMod::global();
	let mut clauses = Vec::new();

	for date in dates {
		let mut parts = Vec::new();

		if let Some(year) = date.year {
			parts.push(Predicate::Raw {
				template: "EXTRACT(YEAR FROM {a}.published_at) = ?".to_string(),
				binds: vec![BindValue::Int(year.into())],
			});
		}
		if let Some(month) = date.month {
			parts.push(Predicate::Raw {
				template: "EXTRACT(MONTH FROM {a}.published_at) = ?".to_string(),
				binds: vec![BindValue::Int(month.into())],
			});
		}
		if let Some(day) = date.day {
			parts.push(Predicate::Raw {
				template: "EXTRACT(DAY FROM {a}.published_at) = ?".to_string(),
				binds: vec![BindValue::Int(day.into())],
			});
		}
		if let Some(before) = &date.before {
			parts.push(Predicate::Raw {
				template: "{a}.published_at < ?::timestamptz".to_string(),
				binds: vec![BindValue::Text(before.clone())],
			});
		}
		if let Some(after) = &date.after {
			parts.push(Predicate::Raw {
				template: "{a}.published_at > ?::timestamptz".to_string(),
				binds: vec![BindValue::Text(after.clone())],
			});
		}
		if !parts.is_empty() {
			clauses.push(Predicate::Group { relation: "AND", children: parts });
		}
	}

	if clauses.is_empty() {
		return None;
	}

	date_mod.add_where(Predicate::Group { relation: "AND", children: clauses });

	Some(date_mod)
}

#[cfg(test)]
mod tests {
	use sift_domain::filters::{MetaQuery, MetaType, MetaValue, TaxField, TaxFilter, TaxQuery};
	use sqlx::QueryBuilder;

	use super::*;
	use crate::query_mod::AliasContext;

	const CTX: AliasContext<'_> = AliasContext { alias: "c", weight_expr: None };

	fn render_wheres(query_mod: &QueryMod) -> String {
		let mut builder = QueryBuilder::new("");

		for (i, predicate) in query_mod.wheres().iter().enumerate() {
			if i > 0 {
				builder.push(" AND ");
			}

			predicate.push_to(&mut builder, &CTX);
		}

		builder.sql().to_string()
	}

	fn render_joins(query_mod: &QueryMod) -> String {
		let mut builder = QueryBuilder::new("");

		for (i, join) in query_mod.joins().iter().enumerate() {
			if i > 0 {
				builder.push(" ");
			}

			join.push_to(&mut builder, &CTX);
		}

		builder.sql().to_string()
	}

	#[test]
	fn empty_clause_translates_to_no_mods() {
		assert!(translate(&WhereClause::default(), &[]).is_empty());
	}

	#[test]
	fn id_filters_become_membership_predicates() {
		let clause = WhereClause {
			post_in: Some(vec![1, 2]),
			post_not_in: Some(vec![3]),
			..Default::default()
		};
		let mods = translate(&clause, &[]);

		assert_eq!(mods.len(), 2);
		assert_eq!(render_wheres(&mods[0]), "c.id = ANY($1)");
		assert_eq!(render_wheres(&mods[1]), "c.id <> ALL($1)");
	}

	#[test]
	fn meta_clauses_self_join_with_distinct_aliases() {
		let clause = WhereClause {
			meta_query: Some(MetaQuery {
				relation: Relation::And,
				meta_array: vec![
					MetaFilter {
						key: "color".to_string(),
						value: Some(MetaValue::One("red".to_string())),
						compare: MetaCompare::EqualTo,
						meta_type: MetaType::Char,
					},
					MetaFilter {
						key: "color".to_string(),
						value: Some(MetaValue::One("blue".to_string())),
						compare: MetaCompare::NotEqualTo,
						meta_type: MetaType::Char,
					},
				],
			}),
			..Default::default()
		};
		let mods = translate(&clause, &[]);

		assert_eq!(mods.len(), 1);

		let joins = render_joins(&mods[0]);

		assert!(joins.contains("content_meta meta0"), "Unexpected joins: {joins}");
		assert!(joins.contains("content_meta meta1"), "Unexpected joins: {joins}");
		assert_eq!(
			render_wheres(&mods[0]),
			"(meta0.meta_value = $1 AND meta1.meta_value != $2)"
		);
	}

	#[test]
	fn meta_in_compare_uses_list_membership() {
		let clause = WhereClause {
			meta_query: Some(MetaQuery {
				relation: Relation::And,
				meta_array: vec![MetaFilter {
					key: "test_meta".to_string(),
					value: Some(MetaValue::Many(vec!["key-2".to_string(), "key-3".to_string()])),
					compare: MetaCompare::In,
					meta_type: MetaType::Char,
				}],
			}),
			..Default::default()
		};
		let mods = translate(&clause, &[]);

		assert_eq!(render_wheres(&mods[0]), "(meta0.meta_value = ANY($1))");
	}

	#[test]
	fn meta_exists_needs_no_join() {
		let clause = WhereClause {
			meta_query: Some(MetaQuery {
				relation: Relation::And,
				meta_array: vec![MetaFilter {
					key: "featured".to_string(),
					value: None,
					compare: MetaCompare::Exists,
					meta_type: MetaType::Char,
				}],
			}),
			..Default::default()
		};
		let mods = translate(&clause, &[]);

		assert!(mods[0].joins().is_empty());
		assert!(render_wheres(&mods[0]).contains("EXISTS (SELECT 1 FROM content_meta"));
	}

	#[test]
	fn meta_numeric_between_casts_both_sides() {
		let clause = WhereClause {
			meta_query: Some(MetaQuery {
				relation: Relation::And,
				meta_array: vec![MetaFilter {
					key: "price".to_string(),
					value: Some(MetaValue::Many(vec!["10".to_string(), "20".to_string()])),
					compare: MetaCompare::Between,
					meta_type: MetaType::Numeric,
				}],
			}),
			..Default::default()
		};
		let mods = translate(&clause, &[]);

		assert_eq!(
			render_wheres(&mods[0]),
			"(meta0.meta_value::numeric BETWEEN $1::numeric AND $2::numeric)"
		);
	}

	#[test]
	fn meta_compare_missing_value_is_dropped() {
		let clause = WhereClause {
			meta_query: Some(MetaQuery {
				relation: Relation::And,
				meta_array: vec![MetaFilter {
					key: "color".to_string(),
					value: None,
					compare: MetaCompare::EqualTo,
					meta_type: MetaType::Char,
				}],
			}),
			..Default::default()
		};

		assert!(translate(&clause, &[]).is_empty());
	}

	fn tax_query(relation: Relation) -> WhereClause {
		WhereClause {
			tax_query: Some(TaxQuery {
				relation,
				tax_array: vec![
					TaxFilter {
						taxonomy: "category".to_string(),
						field: TaxField::Slug,
						terms: vec!["news".to_string()],
						include_children: false,
						operator: TaxOperator::In,
					},
					TaxFilter {
						taxonomy: "post_tag".to_string(),
						field: TaxField::Slug,
						terms: vec!["featured".to_string()],
						include_children: false,
						operator: TaxOperator::In,
					},
				],
			}),
			..Default::default()
		}
	}

	fn resolved() -> Vec<ResolvedTaxClause> {
		vec![
			ResolvedTaxClause {
				taxonomy: "category".to_string(),
				operator: TaxOperator::In,
				term_taxonomy_ids: vec![10],
			},
			ResolvedTaxClause {
				taxonomy: "post_tag".to_string(),
				operator: TaxOperator::In,
				term_taxonomy_ids: vec![20],
			},
		]
	}

	#[test]
	fn taxonomy_and_relation_joins_per_clause() {
		let mods = translate(&tax_query(Relation::And), &resolved());

		assert_eq!(mods.len(), 1);

		let joins = render_joins(&mods[0]);

		assert!(joins.contains("term_relationships tax0"), "Unexpected joins: {joins}");
		assert!(joins.contains("term_relationships tax1"), "Unexpected joins: {joins}");
		assert!(mods[0].wheres().is_empty());
	}

	#[test]
	fn taxonomy_or_relation_unions_exists_probes() {
		let mods = translate(&tax_query(Relation::Or), &resolved());

		assert_eq!(mods.len(), 1);
		assert!(mods[0].joins().is_empty());

		let wheres = render_wheres(&mods[0]);

		assert_eq!(wheres.matches("EXISTS (SELECT 1 FROM term_relationships").count(), 2);
		assert!(wheres.contains(" OR "), "Unexpected wheres: {wheres}");
	}

	#[test]
	fn taxonomy_and_operator_counts_distinct_assignments() {
		let clauses = vec![ResolvedTaxClause {
			taxonomy: "category".to_string(),
			operator: TaxOperator::And,
			term_taxonomy_ids: vec![10, 11],
		}];
		let mods = translate(&tax_query(Relation::And), &clauses);
		let wheres = render_wheres(&mods[0]);

		assert!(
			wheres.contains("count(DISTINCT tr.term_taxonomy_id)"),
			"Unexpected wheres: {wheres}"
		);
	}

	#[test]
	fn unresolved_positive_taxonomy_clause_matches_nothing() {
		let clauses = vec![ResolvedTaxClause {
			taxonomy: "category".to_string(),
			operator: TaxOperator::In,
			term_taxonomy_ids: Vec::new(),
		}];
		let mods = translate(&tax_query(Relation::And), &clauses);

		assert!(mods[0].joins().is_empty());
		assert_eq!(render_wheres(&mods[0]), "(FALSE)");
	}

	#[test]
	fn date_components_and_bounds_combine_with_and() {
		let clause = WhereClause {
			date_query: Some(vec![DateClause {
				year: Some(2020),
				month: Some(3),
				day: None,
				before: None,
				after: Some("2020-03-10".to_string()),
			}]),
			..Default::default()
		};
		let mods = translate(&clause, &[]);
		let wheres = render_wheres(&mods[0]);

		assert_eq!(
			wheres,
			"((EXTRACT(YEAR FROM c.published_at) = $1 AND EXTRACT(MONTH FROM c.published_at) = $2 AND c.published_at > $3::timestamptz))"
		);
	}
}
