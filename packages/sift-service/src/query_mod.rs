//! Composable units of SQL augmentation.
//!
//! A [`QueryMod`] bundles joins, WHERE predicates, weight expressions, and
//! ORDER BY terms that attach to the relevance query at assembly time.
//! Fragments reference assembly-time identifiers through placeholders instead
//! of hardcoding aliases: `{a}` resolves to the content-row alias of the scope
//! being rendered and `{w}` to the total relevance expression, which only
//! exists at the outer level of the assembled query.
//!
//! Everything value-like goes through parameter binding; the only raw SQL a
//! mod can carry is a template whose `?` markers are interleaved with bound
//! values when rendered.

use std::sync::Arc;

use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

const ALIAS_PLACEHOLDER: &str = "{a}";
const WEIGHT_PLACEHOLDER: &str = "{w}";

/// Assembly-time identifiers fragments may reference.
#[derive(Clone, Copy, Debug)]
pub struct AliasContext<'a> {
	/// Alias of the content row in the scope being rendered.
	pub alias: &'a str,
	/// Total relevance expression. `None` inside per-source subqueries, where
	/// the total is not yet computed.
	pub weight_expr: Option<&'a str>,
}
impl AliasContext<'_> {
	pub fn resolve(&self, template: &str) -> String {
		let mut out = template.replace(ALIAS_PLACEHOLDER, self.alias);

		if let Some(weight_expr) = self.weight_expr {
			out = out.replace(WEIGHT_PLACEHOLDER, weight_expr);
		}

		out
	}
}

/// A value destined for a bind parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
	Int(i64),
	Float(f64),
	Text(String),
	IntList(Vec<i64>),
	TextList(Vec<String>),
	Timestamp(OffsetDateTime),
}

/// A join or weight fragment: either a literal template or a deferred
/// function receiving the alias-resolution context.
#[derive(Clone)]
pub enum Fragment {
	Literal { template: String, binds: Vec<BindValue> },
	Deferred(Arc<dyn Fn(&AliasContext<'_>) -> String + Send + Sync>),
}
impl Fragment {
	pub fn literal(template: impl Into<String>) -> Self {
		Self::Literal { template: template.into(), binds: Vec::new() }
	}

	pub fn literal_with_binds(template: impl Into<String>, binds: Vec<BindValue>) -> Self {
		Self::Literal { template: template.into(), binds }
	}

	pub fn deferred<F>(f: F) -> Self
	where
		F: Fn(&AliasContext<'_>) -> String + Send + Sync + 'static,
	{
		Self::Deferred(Arc::new(f))
	}

	pub fn push_to(&self, builder: &mut QueryBuilder<'static, Postgres>, ctx: &AliasContext<'_>) {
		match self {
			Self::Literal { template, binds } =>
				push_template(builder, &ctx.resolve(template), binds),
			Self::Deferred(f) => {
				builder.push(f(ctx));
			},
		}
	}

	fn references_weight(&self) -> bool {
		match self {
			Self::Literal { template, .. } => template.contains(WEIGHT_PLACEHOLDER),
			Self::Deferred(_) => false,
		}
	}
}
impl std::fmt::Debug for Fragment {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Literal { template, binds } => f
				.debug_struct("Literal")
				.field("template", template)
				.field("binds", binds)
				.finish(),
			Self::Deferred(_) => f.debug_tuple("Deferred").finish(),
		}
	}
}

/// A WHERE predicate. Structured variants cover column compares and list
/// membership; `Raw` is the escape hatch for sub-grammars (EXISTS probes,
/// date extraction, the cursor comparison) and still binds every value.
#[derive(Clone, Debug)]
pub enum Predicate {
	Cmp { column: String, op: &'static str, value: BindValue, cast: Option<&'static str> },
	InList { column: String, values: BindValue, negated: bool },
	Raw { template: String, binds: Vec<BindValue> },
	Group { relation: &'static str, children: Vec<Predicate> },
}
impl Predicate {
	/// Whether rendering this predicate needs the total relevance expression.
	/// Such predicates only render at the outer level of the assembled query.
	pub fn references_weight(&self) -> bool {
		match self {
			Self::Cmp { column, .. } | Self::InList { column, .. } =>
				column.contains(WEIGHT_PLACEHOLDER),
			Self::Raw { template, .. } => template.contains(WEIGHT_PLACEHOLDER),
			Self::Group { children, .. } =>
				children.iter().any(Predicate::references_weight),
		}
	}

	pub fn push_to(&self, builder: &mut QueryBuilder<'static, Postgres>, ctx: &AliasContext<'_>) {
		match self {
			Self::Cmp { column, op, value, cast } => {
				builder.push(ctx.resolve(column));

				if let Some(cast) = cast {
					builder.push(format!("::{cast}"));
				}

				builder.push(format!(" {op} "));
				push_bind_value(builder, value);

				if let Some(cast) = cast {
					builder.push(format!("::{cast}"));
				}
			},
			Self::InList { column, values, negated } => {
				builder.push(ctx.resolve(column));
				builder.push(if *negated { " <> ALL(" } else { " = ANY(" });
				push_bind_value(builder, values);
				builder.push(")");
			},
			Self::Raw { template, binds } => push_template(builder, &ctx.resolve(template), binds),
			Self::Group { relation, children } => {
				builder.push("(");

				for (i, child) in children.iter().enumerate() {
					if i > 0 {
						builder.push(format!(" {relation} "));
					}

					child.push_to(builder, ctx);
				}

				builder.push(")");
			},
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderDirection {
	Asc,
	Desc,
}
impl OrderDirection {
	pub fn as_sql(&self) -> &'static str {
		match self {
			Self::Asc => "ASC",
			Self::Desc => "DESC",
		}
	}
}

/// One ORDER BY term. Lower priority sorts first; ties between equal
/// priorities keep insertion order.
#[derive(Clone, Debug)]
pub struct OrderTerm {
	pub expression: String,
	pub direction: OrderDirection,
	pub priority: i32,
}

#[derive(Clone, Debug, Default)]
pub struct QueryMod {
	/// Content type this mod is scoped to; `None` applies to every source.
	pub target_scope: Option<String>,
	joins: Vec<Fragment>,
	wheres: Vec<Predicate>,
	weights: Vec<Fragment>,
	orders: Vec<OrderTerm>,
}
impl QueryMod {
	pub fn global() -> Self {
		Self::default()
	}

	pub fn scoped(content_type: impl Into<String>) -> Self {
		Self { target_scope: Some(content_type.into()), ..Self::default() }
	}

	pub fn add_join(&mut self, fragment: Fragment) -> &mut Self {
		self.joins.push(fragment);

		self
	}

	pub fn add_where(&mut self, predicate: Predicate) -> &mut Self {
		self.wheres.push(predicate);

		self
	}

	pub fn add_weight(&mut self, fragment: Fragment) -> &mut Self {
		self.weights.push(fragment);

		self
	}

	pub fn add_order(
		&mut self,
		expression: impl Into<String>,
		direction: OrderDirection,
		priority: i32,
	) -> &mut Self {
		self.orders.push(OrderTerm { expression: expression.into(), direction, priority });

		self
	}

	/// A mod with no joins, predicates, or weights contributes nothing to the
	/// query body and is skipped during assembly (order terms still apply).
	pub fn is_empty(&self) -> bool {
		self.joins.is_empty() && self.wheres.is_empty() && self.weights.is_empty()
	}

	pub fn applies_to(&self, content_type: &str) -> bool {
		self.target_scope.as_deref().is_none_or(|scope| scope == content_type)
	}

	pub fn joins(&self) -> &[Fragment] {
		&self.joins
	}

	pub fn wheres(&self) -> &[Predicate] {
		&self.wheres
	}

	pub fn weights(&self) -> impl Iterator<Item = &Fragment> {
		self.weights.iter().filter(|fragment| !fragment.references_weight())
	}

	pub fn orders(&self) -> &[OrderTerm] {
		&self.orders
	}
}

fn push_bind_value(builder: &mut QueryBuilder<'static, Postgres>, value: &BindValue) {
	match value {
		BindValue::Int(v) => builder.push_bind(*v),
		BindValue::Float(v) => builder.push_bind(*v),
		BindValue::Text(v) => builder.push_bind(v.clone()),
		BindValue::IntList(v) => builder.push_bind(v.clone()),
		BindValue::TextList(v) => builder.push_bind(v.clone()),
		BindValue::Timestamp(v) => builder.push_bind(*v),
	};
}

/// Pushes `template`, replacing each `?` marker with the next bound value.
fn push_template(
	builder: &mut QueryBuilder<'static, Postgres>,
	template: &str,
	binds: &[BindValue],
) {
	let mut binds = binds.iter();

	for (i, segment) in template.split('?').enumerate() {
		if i > 0 {
			if let Some(bind) = binds.next() {
				push_bind_value(builder, bind);
			}
		}

		builder.push(segment);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn render(predicate: &Predicate, ctx: &AliasContext<'_>) -> String {
		let mut builder = QueryBuilder::new("");

		predicate.push_to(&mut builder, ctx);

		builder.sql().to_string()
	}

	const CTX: AliasContext<'_> = AliasContext { alias: "c", weight_expr: None };
	const OUTER: AliasContext<'_> = AliasContext { alias: "ranked", weight_expr: Some("ranked.relevance") };

	#[test]
	fn cmp_renders_with_cast_on_both_sides() {
		let predicate = Predicate::Cmp {
			column: "meta0.meta_value".to_string(),
			op: ">=",
			value: BindValue::Text("5".to_string()),
			cast: Some("numeric"),
		};

		assert_eq!(render(&predicate, &CTX), "meta0.meta_value::numeric >= $1::numeric");
	}

	#[test]
	fn in_list_renders_any_and_all() {
		let include = Predicate::InList {
			column: "{a}.id".to_string(),
			values: BindValue::IntList(vec![1, 2]),
			negated: false,
		};
		let exclude = Predicate::InList {
			column: "{a}.id".to_string(),
			values: BindValue::IntList(vec![3]),
			negated: true,
		};

		assert_eq!(render(&include, &CTX), "c.id = ANY($1)");
		assert_eq!(render(&exclude, &CTX), "c.id <> ALL($1)");
	}

	#[test]
	fn raw_interleaves_binds_at_markers() {
		let predicate = Predicate::Raw {
			template: "{a}.published_at < ?::timestamptz".to_string(),
			binds: vec![BindValue::Text("2020-01-01".to_string())],
		};

		assert_eq!(render(&predicate, &CTX), "c.published_at < $1::timestamptz");
	}

	#[test]
	fn group_joins_children_with_relation() {
		let predicate = Predicate::Group {
			relation: "OR",
			children: vec![
				Predicate::Cmp {
					column: "{a}.site".to_string(),
					op: "=",
					value: BindValue::Int(1),
					cast: None,
				},
				Predicate::Cmp {
					column: "{a}.site".to_string(),
					op: "=",
					value: BindValue::Int(2),
					cast: None,
				},
			],
		};

		assert_eq!(render(&predicate, &CTX), "(c.site = $1 OR c.site = $2)");
	}

	#[test]
	fn weight_placeholder_only_resolves_at_the_outer_level() {
		let predicate = Predicate::Raw {
			template: "{w} < ?".to_string(),
			binds: vec![BindValue::Float(3.5)],
		};

		assert!(predicate.references_weight());
		assert_eq!(render(&predicate, &OUTER), "ranked.relevance < $1");
	}

	#[test]
	fn deferred_fragments_see_the_alias_context() {
		let fragment = Fragment::deferred(|ctx| format!("{}.site = 1", ctx.alias));
		let mut builder = QueryBuilder::new("");

		fragment.push_to(&mut builder, &CTX);

		assert_eq!(builder.sql(), "c.site = 1");
	}

	#[test]
	fn empty_mod_is_reported_empty() {
		let mut query_mod = QueryMod::global();

		assert!(query_mod.is_empty());

		query_mod.add_order("{w}", OrderDirection::Desc, 0);

		assert!(query_mod.is_empty());

		query_mod.add_where(Predicate::Raw { template: "1 = 1".to_string(), binds: Vec::new() });

		assert!(!query_mod.is_empty());
	}

	#[test]
	fn scoped_mods_only_apply_to_their_source() {
		let scoped = QueryMod::scoped("post");

		assert!(scoped.applies_to("post"));
		assert!(!scoped.applies_to("page"));
		assert!(QueryMod::global().applies_to("page"));
	}
}
