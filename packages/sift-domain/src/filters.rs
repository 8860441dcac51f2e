use serde::Deserialize;

/// Filter input accepted by the search connection.
///
/// Every field is optional; an empty clause matches everything the engine
/// indexes, ranked by relevance against `input`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhereClause {
	/// Free-text search input.
	pub input: Option<String>,
	/// Engine name; falls back to the default engine when absent.
	pub engine: Option<String>,
	/// Restricts results to these content types, intersected with the
	/// engine's configured sources.
	pub post_type: Option<Vec<String>>,
	pub post_in: Option<Vec<i64>>,
	pub post_not_in: Option<Vec<i64>>,
	pub tax_query: Option<TaxQuery>,
	pub meta_query: Option<MetaQuery>,
	pub date_query: Option<Vec<DateClause>>,
	/// Disables pagination and returns every match in one page.
	pub nopaging: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxQuery {
	#[serde(default)]
	pub relation: Relation,
	pub tax_array: Vec<TaxFilter>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxFilter {
	pub taxonomy: String,
	#[serde(default)]
	pub field: TaxField,
	#[serde(default)]
	pub terms: Vec<String>,
	#[serde(default)]
	pub include_children: bool,
	#[serde(default)]
	pub operator: TaxOperator,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaQuery {
	#[serde(default)]
	pub relation: Relation,
	pub meta_array: Vec<MetaFilter>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaFilter {
	pub key: String,
	pub value: Option<MetaValue>,
	#[serde(default)]
	pub compare: MetaCompare,
	#[serde(default, rename = "type")]
	pub meta_type: MetaType,
}

/// Meta values arrive either as a scalar or a list; list-shaped values feed
/// `IN`/`NOT IN`/`BETWEEN` compares.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
	One(String),
	Many(Vec<String>),
}
impl MetaValue {
	pub fn as_list(&self) -> Vec<String> {
		match self {
			Self::One(value) => vec![value.clone()],
			Self::Many(values) => values.clone(),
		}
	}
}

/// Constrains `published_at`. `year`/`month`/`day` match calendar components;
/// `before`/`after` are inclusive-exclusive timestamp bounds.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateClause {
	pub year: Option<i32>,
	pub month: Option<u8>,
	pub day: Option<u8>,
	pub before: Option<String>,
	pub after: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relation {
	#[default]
	And,
	Or,
}
impl Relation {
	pub fn as_sql(&self) -> &'static str {
		match self {
			Self::And => "AND",
			Self::Or => "OR",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
pub enum MetaCompare {
	#[default]
	#[serde(rename = "EQUAL_TO")]
	EqualTo,
	#[serde(rename = "NOT_EQUAL_TO")]
	NotEqualTo,
	#[serde(rename = "GREATER_THAN")]
	GreaterThan,
	#[serde(rename = "GREATER_THAN_OR_EQUAL_TO")]
	GreaterThanOrEqualTo,
	#[serde(rename = "LESS_THAN")]
	LessThan,
	#[serde(rename = "LESS_THAN_OR_EQUAL_TO")]
	LessThanOrEqualTo,
	#[serde(rename = "LIKE")]
	Like,
	#[serde(rename = "NOT_LIKE")]
	NotLike,
	#[serde(rename = "IN")]
	In,
	#[serde(rename = "NOT_IN")]
	NotIn,
	#[serde(rename = "BETWEEN")]
	Between,
	#[serde(rename = "NOT_BETWEEN")]
	NotBetween,
	#[serde(rename = "EXISTS")]
	Exists,
	#[serde(rename = "NOT_EXISTS")]
	NotExists,
}
impl MetaCompare {
	pub fn as_sql(&self) -> &'static str {
		match self {
			Self::EqualTo => "=",
			Self::NotEqualTo => "!=",
			Self::GreaterThan => ">",
			Self::GreaterThanOrEqualTo => ">=",
			Self::LessThan => "<",
			Self::LessThanOrEqualTo => "<=",
			Self::Like => "LIKE",
			Self::NotLike => "NOT LIKE",
			Self::In => "IN",
			Self::NotIn => "NOT IN",
			Self::Between => "BETWEEN",
			Self::NotBetween => "NOT BETWEEN",
			Self::Exists => "EXISTS",
			Self::NotExists => "NOT EXISTS",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetaType {
	#[default]
	Char,
	Numeric,
	Binary,
	Date,
	Datetime,
	Decimal,
	Signed,
	Time,
	Unsigned,
}
impl MetaType {
	/// Cast applied to the meta value column before comparing. `Char`
	/// compares the stored text as-is.
	pub fn pg_cast(&self) -> Option<&'static str> {
		match self {
			Self::Char => None,
			Self::Binary => Some("bytea"),
			Self::Numeric | Self::Decimal | Self::Unsigned => Some("numeric"),
			Self::Signed => Some("bigint"),
			Self::Date => Some("date"),
			Self::Datetime => Some("timestamptz"),
			Self::Time => Some("time"),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
pub enum TaxField {
	#[default]
	#[serde(rename = "ID")]
	Id,
	#[serde(rename = "NAME")]
	Name,
	#[serde(rename = "SLUG")]
	Slug,
	#[serde(rename = "TAXONOMY_ID")]
	TaxonomyId,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
pub enum TaxOperator {
	#[default]
	#[serde(rename = "IN")]
	In,
	#[serde(rename = "NOT_IN")]
	NotIn,
	#[serde(rename = "AND")]
	And,
	#[serde(rename = "EXISTS")]
	Exists,
	#[serde(rename = "NOT_EXISTS")]
	NotExists,
}

/// Relay-style pagination arguments.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaginationArgs {
	pub first: Option<i64>,
	pub after: Option<String>,
	pub last: Option<i64>,
	pub before: Option<String>,
}
impl PaginationArgs {
	pub fn direction(&self) -> Direction {
		if self.last.is_some() || self.before.is_some() {
			Direction::Backward
		} else {
			Direction::Forward
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
	Forward,
	Backward,
}
