//! Weighted relevance query assembly and execution.
//!
//! One subquery per in-scope source computes a weighted sum of per-field
//! token matches against the index tables; the subqueries union into a single
//! ranked row set that is thresholded, ordered, and sliced at the outer
//! level. The same builder serves the main paginated query and the cursor
//! anchor probe, so the two can never drift apart on a weight formula: the
//! probe is just the full query restricted to one row.

use sift_config::SourceConfig;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
	ServiceResult,
	query_mod::{AliasContext, OrderTerm, QueryMod},
};
use sift_storage::db::Db;

/// Alias of the content row inside each per-source subquery.
pub const SUBQUERY_ALIAS: &str = "c";
/// Alias of the aggregated row set at the outer level.
pub const OUTER_ALIAS: &str = "ranked";
/// Total relevance expression at the outer level.
pub const WEIGHT_EXPR: &str = "ranked.relevance";

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RankedRow {
	pub id: i64,
	pub site: i64,
	pub source: String,
	pub published_at: OffsetDateTime,
	pub relevance: f64,
}

/// Whether the query ranks the full result set or re-derives the score of one
/// row (the cursor anchor probe).
#[derive(Clone, Copy, Debug)]
pub enum WeightScope {
	All,
	Row(i64),
}

pub struct RelevanceQuery<'a> {
	pub sources: Vec<&'a SourceConfig>,
	pub tokens: &'a [String],
	pub mods: &'a [QueryMod],
	pub threshold: f64,
}
impl RelevanceQuery<'_> {
	pub async fn fetch(&self, db: &Db, limit: i64) -> ServiceResult<Vec<RankedRow>> {
		if self.sources.is_empty() || self.tokens.is_empty() {
			return Ok(Vec::new());
		}

		let mut builder = self.build(WeightScope::All, Some(limit));
		let rows = builder.build_query_as().fetch_all(&db.pool).await?;

		Ok(rows)
	}

	/// Recomputes the ranked row for one content id under the same tokens,
	/// mods, and threshold as [`fetch`](Self::fetch). `None` means the row no
	/// longer matches the query, i.e. the cursor is stale.
	pub async fn probe(&self, db: &Db, id: i64) -> ServiceResult<Option<RankedRow>> {
		if self.sources.is_empty() || self.tokens.is_empty() {
			return Ok(None);
		}

		let mut builder = self.build(WeightScope::Row(id), None);
		let row = builder.build_query_as().fetch_optional(&db.pool).await?;

		Ok(row)
	}

	pub fn build(&self, scope: WeightScope, limit: Option<i64>) -> QueryBuilder<'static, Postgres> {
		let mut builder = QueryBuilder::new(
			"SELECT ranked.id, ranked.site, ranked.source, ranked.published_at, ranked.relevance FROM (\
			SELECT per_source.id, per_source.site, per_source.source, per_source.published_at, \
			SUM(per_source.weight)::float8 AS relevance FROM (",
		);

		for (i, source) in self.sources.iter().enumerate() {
			if i > 0 {
				builder.push(" UNION ALL ");
			}

			self.push_source_subquery(&mut builder, source, scope);
		}

		builder.push(
			") AS per_source GROUP BY per_source.id, per_source.site, per_source.source, \
			per_source.published_at) AS ranked WHERE ranked.relevance > ",
		);
		builder.push_bind(self.threshold);

		let outer_ctx = AliasContext { alias: OUTER_ALIAS, weight_expr: Some(WEIGHT_EXPR) };

		for query_mod in self.mods.iter().filter(|m| m.target_scope.is_none()) {
			for predicate in query_mod.wheres().iter().filter(|p| p.references_weight()) {
				builder.push(" AND ");
				predicate.push_to(&mut builder, &outer_ctx);
			}
		}

		if matches!(scope, WeightScope::All) {
			self.push_order_by(&mut builder, &outer_ctx);
		}
		if let Some(limit) = limit {
			builder.push(" LIMIT ");
			builder.push_bind(limit);
		}

		builder
	}

	fn push_source_subquery(
		&self,
		builder: &mut QueryBuilder<'static, Postgres>,
		source: &SourceConfig,
		scope: WeightScope,
	) {
		let ctx = AliasContext { alias: SUBQUERY_ALIAS, weight_expr: None };
		let tokens = self.tokens.to_vec();
		let mods: Vec<_> = self
			.mods
			.iter()
			.filter(|m| m.applies_to(&source.content_type) && !m.is_empty())
			.collect();

		builder.push("SELECT c.id, c.site, ");
		builder.push_bind(source.content_type.clone());
		builder.push("::text AS source, c.published_at, (COALESCE(core.weight, 0)");

		for i in 0..source.custom_fields.len() {
			builder.push(format!(" + COALESCE(cf{i}.weight, 0)"));
		}
		for i in 0..source.taxonomies.len() {
			builder.push(format!(" + COALESCE(tx{i}.weight, 0)"));
		}
		for query_mod in &mods {
			for fragment in query_mod.weights() {
				builder.push(" + (");
				fragment.push_to(builder, &ctx);
				builder.push(")");
			}
		}

		builder.push(
			")::float8 AS weight FROM contents c LEFT JOIN (\
			SELECT content_id, SUM(title * ",
		);
		builder.push_bind(source.weights.title);
		builder.push(" + slug * ");
		builder.push_bind(source.weights.slug);
		builder.push(" + excerpt * ");
		builder.push_bind(source.weights.excerpt);
		builder.push(" + content * ");
		builder.push_bind(source.weights.content);
		builder.push(" + comment * ");
		builder.push_bind(source.weights.comment);
		builder.push(")::float8 AS weight FROM index_entries WHERE token = ANY(");
		builder.push_bind(tokens.clone());
		builder.push(") GROUP BY content_id) core ON core.content_id = c.id");

		for (i, custom_field) in source.custom_fields.iter().enumerate() {
			// Keys carrying `%` match with LIKE, everything else exactly.
			let key_op = if custom_field.key.contains('%') { "LIKE" } else { "=" };

			builder.push(" LEFT JOIN (SELECT content_id, SUM(occurrences)::float8 * ");
			builder.push_bind(custom_field.weight);
			builder.push(" AS weight FROM index_custom_fields WHERE token = ANY(");
			builder.push_bind(tokens.clone());
			builder.push(format!(") AND meta_key {key_op} "));
			builder.push_bind(custom_field.key.clone());
			builder.push(format!(" GROUP BY content_id) cf{i} ON cf{i}.content_id = c.id"));
		}
		for (i, taxonomy) in source.taxonomies.iter().enumerate() {
			builder.push(" LEFT JOIN (SELECT content_id, SUM(occurrences)::float8 * ");
			builder.push_bind(taxonomy.weight);
			builder.push(" AS weight FROM index_taxonomies WHERE token = ANY(");
			builder.push_bind(tokens.clone());
			builder.push(") AND taxonomy = ");
			builder.push_bind(taxonomy.taxonomy.clone());
			builder.push(format!(" GROUP BY content_id) tx{i} ON tx{i}.content_id = c.id"));
		}
		for query_mod in &mods {
			for join in query_mod.joins() {
				builder.push(" ");
				join.push_to(builder, &ctx);
			}
		}

		builder.push(" WHERE c.content_type = ");
		builder.push_bind(source.content_type.clone());
		builder.push(" AND c.status = 'publish'");

		if let WeightScope::Row(id) = scope {
			builder.push(" AND c.id = ");
			builder.push_bind(id);
		}

		for query_mod in &mods {
			for predicate in query_mod.wheres().iter().filter(|p| !p.references_weight()) {
				builder.push(" AND ");
				predicate.push_to(builder, &ctx);
			}
		}
	}

	fn push_order_by(
		&self,
		builder: &mut QueryBuilder<'static, Postgres>,
		ctx: &AliasContext<'_>,
	) {
		let mut terms: Vec<&OrderTerm> =
			self.mods.iter().flat_map(|m| m.orders().iter()).collect();

		terms.sort_by_key(|term| term.priority);

		if terms.is_empty() {
			builder.push(" ORDER BY ranked.relevance DESC, ranked.id DESC");

			return;
		}

		builder.push(" ORDER BY ");

		for (i, term) in terms.iter().enumerate() {
			if i > 0 {
				builder.push(", ");
			}

			builder.push(ctx.resolve(&term.expression));
			builder.push(format!(" {}", term.direction.as_sql()));
		}
	}
}
