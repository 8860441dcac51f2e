//! Connection resolver: argument validation, scope resolution, and the
//! search pipeline (translate, extend, probe, fetch, assemble, map).

use sift_config::{DEFAULT_ENGINE, SourceConfig};
use sift_domain::{
	cursor as cursor_codec,
	filters::{Direction, PaginationArgs, WhereClause},
	tokenize,
};
use sift_storage::{models::ContentRecord, queries};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
	ExtensionContext, ServiceError, ServiceResult, SiftService,
	cursor::{PageInfo, assemble_page, cursor_mod, ordering_mod},
	relevance::RelevanceQuery,
	translate::{ResolvedTaxClause, translate},
};

/// Terms beyond this cap are ignored; overlong inputs degrade to their
/// leading terms instead of fanning out the index scan.
const MAX_INPUT_TERMS: usize = 32;

#[derive(Clone, Debug)]
pub struct Edge {
	pub cursor: String,
	pub node: ContentRecord,
	pub source: String,
	pub relevance: f64,
	pub site: i64,
}

#[derive(Clone, Debug)]
pub struct SearchConnection {
	pub edges: Vec<Edge>,
	pub page_info: PageInfo,
}
impl SearchConnection {
	pub fn empty() -> Self {
		Self { edges: Vec::new(), page_info: PageInfo::empty() }
	}

	pub fn nodes(&self) -> impl Iterator<Item = &ContentRecord> {
		self.edges.iter().map(|edge| &edge.node)
	}
}

impl SiftService {
	/// Resolves one search connection request.
	pub async fn search(
		&self,
		clause: &WhereClause,
		pagination: &PaginationArgs,
	) -> ServiceResult<SearchConnection> {
		validate_pagination(pagination)?;

		let query_id = Uuid::new_v4();
		let direction = pagination.direction();
		let engine_name = clause.engine.as_deref().unwrap_or(DEFAULT_ENGINE);
		let engine = self.cfg.engines.get(engine_name).ok_or_else(|| {
			ServiceError::InvalidRequest { message: format!("Unknown engine {engine_name:?}.") }
		})?;
		let sources = resolve_scope(engine.sources.as_slice(), clause);

		if sources.is_empty() {
			return Ok(SearchConnection::empty());
		}

		let tokens = clause
			.input
			.as_deref()
			.map(|input| tokenize::tokenize(input, MAX_INPUT_TERMS))
			.unwrap_or_default();

		if tokens.is_empty() {
			return Ok(SearchConnection::empty());
		}

		let page_size = self.page_size(clause, pagination);
		let source_names: Vec<String> =
			sources.iter().map(|source| source.content_type.clone()).collect();

		debug!(
			%query_id,
			engine = engine_name,
			sources = source_names.len(),
			tokens = tokens.len(),
			page_size,
			"Resolving search connection."
		);

		let taxonomies = self.resolve_taxonomies(clause).await?;
		let mut mods = translate(clause, &taxonomies);
		let ctx =
			ExtensionContext { engine: engine_name, tokens: &tokens, sources: &source_names };

		for extension in self.extensions() {
			extension.apply(&ctx, &mut mods);
		}

		mods.push(ordering_mod(direction));

		let threshold = self.cfg.search.weight_threshold;
		let mut has_cursor = false;

		// A malformed or non-positive cursor degrades to no cursor at all;
		// a well-formed cursor whose row no longer matches is exhausted.
		if let Some(anchor_id) = cursor_id(pagination, direction) {
			let anchor = RelevanceQuery {
				sources: sources.clone(),
				tokens: &tokens,
				mods: &mods,
				threshold,
			}
			.probe(&self.db, anchor_id)
			.await?;
			let Some(anchor) = anchor else {
				debug!(%query_id, anchor_id, "Cursor row no longer matches; returning empty page.");

				return Ok(SearchConnection::empty());
			};

			mods.push(cursor_mod(direction, &anchor));

			has_cursor = true;
		}

		let rows = RelevanceQuery { sources, tokens: &tokens, mods: &mods, threshold }
			.fetch(&self.db, page_size as i64 + 1)
			.await?;
		let page = assemble_page(rows, page_size, direction, has_cursor);
		let records = queries::fetch_contents_by_ids(
			&self.db,
			&page.rows.iter().map(|row| row.id).collect::<Vec<_>>(),
		)
		.await?;
		let mut edges = Vec::with_capacity(page.rows.len());

		for row in &page.rows {
			let Some(record) = records.iter().find(|record| record.id == row.id) else {
				warn!(%query_id, id = row.id, "Dropping ranked row without resolvable content.");

				continue;
			};

			edges.push(Edge {
				cursor: cursor_codec::encode(row.id),
				node: record.clone(),
				source: row.source.clone(),
				relevance: row.relevance,
				site: row.site,
			});
		}

		let page_info = PageInfo {
			has_next_page: page.info.has_next_page,
			has_previous_page: page.info.has_previous_page,
			start_cursor: edges.first().map(|edge| edge.cursor.clone()),
			end_cursor: edges.last().map(|edge| edge.cursor.clone()),
		};

		Ok(SearchConnection { edges, page_info })
	}

	/// Direct single-result lookup. Unlike the connection path, an
	/// unresolvable id here is a user-facing error.
	pub async fn get_result(&self, id: i64) -> ServiceResult<ContentRecord> {
		Ok(queries::get_content(&self.db, id).await?)
	}

	fn page_size(&self, clause: &WhereClause, pagination: &PaginationArgs) -> usize {
		let max = self.cfg.search.max_page_size as usize;

		if clause.nopaging {
			return max;
		}

		let requested = pagination
			.first
			.or(pagination.last)
			.map(|value| value as usize)
			.unwrap_or(self.cfg.search.default_page_size as usize);

		requested.min(max)
	}

	async fn resolve_taxonomies(
		&self,
		clause: &WhereClause,
	) -> ServiceResult<Vec<ResolvedTaxClause>> {
		let Some(tax) = &clause.tax_query else {
			return Ok(Vec::new());
		};
		let mut resolved = Vec::with_capacity(tax.tax_array.len());

		for filter in &tax.tax_array {
			let mut ids = queries::resolve_term_taxonomy_ids(
				&self.db,
				&filter.taxonomy,
				filter.field,
				&filter.terms,
			)
			.await?;

			if filter.include_children {
				ids = queries::expand_term_children(&self.db, &ids).await?;
			}

			resolved.push(ResolvedTaxClause {
				taxonomy: filter.taxonomy.clone(),
				operator: filter.operator,
				term_taxonomy_ids: ids,
			});
		}

		Ok(resolved)
	}
}

fn validate_pagination(pagination: &PaginationArgs) -> ServiceResult<()> {
	if let Some(first) = pagination.first
		&& first <= 0
	{
		return Err(ServiceError::InvalidRequest {
			message: "first must be greater than zero.".to_string(),
		});
	}
	if let Some(last) = pagination.last
		&& last <= 0
	{
		return Err(ServiceError::InvalidRequest {
			message: "last must be greater than zero.".to_string(),
		});
	}
	if pagination.first.is_some() && pagination.last.is_some() {
		return Err(ServiceError::InvalidRequest {
			message: "Provide at most one of first and last.".to_string(),
		});
	}

	Ok(())
}

/// `postType` removes out-of-scope sources before assembly; it is a
/// structural filter, not a WHERE predicate.
fn resolve_scope<'a>(sources: &'a [SourceConfig], clause: &WhereClause) -> Vec<&'a SourceConfig> {
	sources
		.iter()
		.filter(|source| {
			clause
				.post_type
				.as_ref()
				.is_none_or(|types| types.iter().any(|t| t == &source.content_type))
		})
		.collect()
}

fn cursor_id(pagination: &PaginationArgs, direction: Direction) -> Option<i64> {
	let raw = match direction {
		Direction::Forward => pagination.after.as_deref(),
		Direction::Backward => pagination.before.as_deref(),
	}?;

	cursor_codec::decode(raw).filter(|id| *id > 0)
}
