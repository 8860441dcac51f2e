pub mod connection;
pub mod cursor;
pub mod query_mod;
pub mod relevance;
pub mod translate;

use std::sync::Arc;

pub use connection::{Edge, SearchConnection};
pub use cursor::{Page, PageInfo};
pub use query_mod::{AliasContext, BindValue, Fragment, OrderDirection, Predicate, QueryMod};
pub use relevance::RankedRow;

use sift_config::Config;
use sift_storage::db::Db;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for ServiceError {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<sift_storage::Error> for ServiceError {
	fn from(err: sift_storage::Error) -> Self {
		match err {
			sift_storage::Error::Sqlx(err) => Self::Storage { message: err.to_string() },
			sift_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			sift_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

/// Context handed to registered extensions when a search is assembled.
pub struct ExtensionContext<'a> {
	pub engine: &'a str,
	pub tokens: &'a [String],
	/// Content types the search is scoped to, after `postType` intersection.
	pub sources: &'a [String],
}

/// Extension point invoked after filter translation and before query
/// assembly. Extensions may append or rewrite mods; anything they add flows
/// through the main query and the cursor anchor probe alike.
pub trait SearchExtension: Send + Sync {
	fn apply(&self, ctx: &ExtensionContext<'_>, mods: &mut Vec<QueryMod>);
}

pub struct SiftService {
	pub cfg: Config,
	pub db: Db,
	extensions: Vec<Arc<dyn SearchExtension>>,
}
impl SiftService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db, extensions: Vec::new() }
	}

	pub fn register_extension(&mut self, extension: Arc<dyn SearchExtension>) {
		self.extensions.push(extension);
	}

	pub(crate) fn extensions(&self) -> &[Arc<dyn SearchExtension>] {
		&self.extensions
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn service_error_messages_carry_their_category() {
		let invalid = ServiceError::InvalidRequest { message: "first must be positive.".to_string() };
		let missing = ServiceError::NotFound { message: "no content 7.".to_string() };

		assert_eq!(invalid.to_string(), "Invalid request: first must be positive.");
		assert_eq!(missing.to_string(), "Not found: no content 7.");
	}

	#[test]
	fn storage_errors_map_by_kind() {
		let invalid: ServiceError =
			sift_storage::Error::InvalidArgument("bad term".to_string()).into();
		let missing: ServiceError = sift_storage::Error::NotFound("no row".to_string()).into();
		let storage: ServiceError = sift_storage::Error::Sqlx(sqlx::Error::PoolClosed).into();

		assert!(matches!(invalid, ServiceError::InvalidRequest { .. }));
		assert!(matches!(missing, ServiceError::NotFound { .. }));
		assert!(matches!(storage, ServiceError::Storage { .. }));
	}
}
