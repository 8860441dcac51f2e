use std::collections::HashMap;

use serde::Deserialize;

/// Engine looked up when a request does not name one explicitly.
pub const DEFAULT_ENGINE: &str = "default";

#[derive(Debug, Deserialize)]
pub struct Config {
	pub storage: Storage,
	#[serde(default)]
	pub search: Search,
	pub engines: HashMap<String, Engine>,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	/// Page size used when a request supplies neither `first` nor `last`.
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
	#[serde(default = "max_page_size")]
	pub max_page_size: u32,
	/// Rows whose summed weight does not exceed this value are dropped.
	#[serde(default)]
	pub weight_threshold: f64,
}

/// A named scope of content sources and field weights defining how relevance
/// is computed for a search.
#[derive(Debug, Deserialize)]
pub struct Engine {
	pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
	pub content_type: String,
	#[serde(default)]
	pub weights: FieldWeights,
	#[serde(default)]
	pub custom_fields: Vec<CustomFieldWeight>,
	#[serde(default)]
	pub taxonomies: Vec<TaxonomyWeight>,
}

#[derive(Debug, Deserialize)]
pub struct FieldWeights {
	#[serde(default = "weight_title")]
	pub title: f64,
	#[serde(default = "weight_slug")]
	pub slug: f64,
	#[serde(default = "weight_excerpt")]
	pub excerpt: f64,
	#[serde(default = "weight_content")]
	pub content: f64,
	#[serde(default = "weight_comment")]
	pub comment: f64,
}
impl Default for FieldWeights {
	fn default() -> Self {
		Self {
			title: weight_title(),
			slug: weight_slug(),
			excerpt: weight_excerpt(),
			content: weight_content(),
			comment: weight_comment(),
		}
	}
}

/// A metadata key whose indexed occurrences contribute to relevance. Keys
/// containing `%` match with LIKE instead of equality.
#[derive(Debug, Deserialize)]
pub struct CustomFieldWeight {
	pub key: String,
	pub weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct TaxonomyWeight {
	pub taxonomy: String,
	pub weight: f64,
}

impl Default for Search {
	fn default() -> Self {
		Self {
			default_page_size: default_page_size(),
			max_page_size: max_page_size(),
			weight_threshold: 0.,
		}
	}
}

fn default_page_size() -> u32 {
	10
}

fn max_page_size() -> u32 {
	100
}

fn weight_title() -> f64 {
	20.
}

fn weight_slug() -> f64 {
	10.
}

fn weight_excerpt() -> f64 {
	6.
}

fn weight_content() -> f64 {
	2.
}

fn weight_comment() -> f64 {
	1.
}
