use std::collections::HashSet;

use sift_domain::filters::TaxField;

use crate::{Error, Result, db::Db, models::ContentRecord};

/// Looks up one piece of content by id. Missing or unpublished content is an
/// error; single lookups have nothing sensible to degrade to.
pub async fn get_content(db: &Db, id: i64) -> Result<ContentRecord> {
	sqlx::query_as(
		"\
SELECT id, site, content_type, status, title, slug, excerpt, published_at
FROM contents
WHERE id = $1
	AND status = 'publish'",
	)
	.bind(id)
	.fetch_optional(&db.pool)
	.await?
	.ok_or_else(|| Error::NotFound(format!("No published content with id {id}.")))
}

/// Batch lookup preserving the order of `ids`. Ids that no longer resolve are
/// silently dropped; callers decide whether a hole is worth reporting.
pub async fn fetch_contents_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<ContentRecord>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows: Vec<ContentRecord> = sqlx::query_as(
		"\
SELECT id, site, content_type, status, title, slug, excerpt, published_at
FROM contents
WHERE id = ANY($1)
	AND status = 'publish'",
	)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;
	let mut ordered = Vec::with_capacity(rows.len());

	for id in ids {
		if let Some(row) = rows.iter().find(|row| row.id == *id) {
			ordered.push(row.clone());
		}
	}

	Ok(ordered)
}

/// Resolves taxonomy filter terms to `term_taxonomy` ids, honoring the field
/// the caller matched against. Numeric fields reject non-numeric terms.
pub async fn resolve_term_taxonomy_ids(
	db: &Db,
	taxonomy: &str,
	field: TaxField,
	terms: &[String],
) -> Result<Vec<i64>> {
	if terms.is_empty() {
		return Ok(Vec::new());
	}

	let rows: Vec<(i64,)> = match field {
		TaxField::Id | TaxField::TaxonomyId => {
			let ids = parse_numeric_terms(terms)?;
			let column = if field == TaxField::Id { "term_id" } else { "term_taxonomy_id" };

			sqlx::query_as(&format!(
				"\
SELECT term_taxonomy_id
FROM term_taxonomy
WHERE taxonomy = $1
	AND {column} = ANY($2)"
			))
			.bind(taxonomy)
			.bind(&ids)
			.fetch_all(&db.pool)
			.await?
		},
		TaxField::Name | TaxField::Slug => {
			let column = if field == TaxField::Name { "name" } else { "slug" };

			sqlx::query_as(&format!(
				"\
SELECT tt.term_taxonomy_id
FROM term_taxonomy tt
JOIN terms t ON t.term_id = tt.term_id
WHERE tt.taxonomy = $1
	AND t.{column} = ANY($2)"
			))
			.bind(taxonomy)
			.bind(terms)
			.fetch_all(&db.pool)
			.await?
		},
	};

	Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Expands `term_taxonomy` ids to include every descendant assignment, for
/// filters that opt into child terms.
pub async fn expand_term_children(db: &Db, ids: &[i64]) -> Result<Vec<i64>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows: Vec<(i64,)> = sqlx::query_as(
		"\
WITH RECURSIVE descendants AS (
	SELECT term_taxonomy_id
	FROM term_taxonomy
	WHERE term_taxonomy_id = ANY($1)
	UNION
	SELECT tt.term_taxonomy_id
	FROM term_taxonomy tt
	JOIN descendants d ON tt.parent = d.term_taxonomy_id
)
SELECT term_taxonomy_id
FROM descendants",
	)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(rows.len());

	for (id,) in rows {
		if seen.insert(id) {
			out.push(id);
		}
	}

	Ok(out)
}

fn parse_numeric_terms(terms: &[String]) -> Result<Vec<i64>> {
	terms
		.iter()
		.map(|term| {
			term.parse().map_err(|_| {
				Error::InvalidArgument(format!("Term {term:?} is not a numeric term id."))
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn numeric_terms_parse_or_reject() {
		let parsed = parse_numeric_terms(&["1".to_string(), "42".to_string()])
			.expect("Expected numeric terms to parse.");

		assert_eq!(parsed, vec![1, 42]);

		let err = parse_numeric_terms(&["news".to_string()])
			.expect_err("Expected non-numeric term rejection.");

		assert!(matches!(err, Error::InvalidArgument(_)));
	}
}
