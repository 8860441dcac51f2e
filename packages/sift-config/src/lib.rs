mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, CustomFieldWeight, DEFAULT_ENGINE, Engine, FieldWeights, Postgres, Search, SourceConfig,
	Storage, TaxonomyWeight,
};

use std::{collections::HashSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_page_size == 0 {
		return Err(Error::Validation {
			message: "search.default_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_page_size > cfg.search.max_page_size {
		return Err(Error::Validation {
			message: "search.default_page_size must not exceed search.max_page_size.".to_string(),
		});
	}
	if !cfg.search.weight_threshold.is_finite() || cfg.search.weight_threshold < 0. {
		return Err(Error::Validation {
			message: "search.weight_threshold must be a finite number of zero or greater."
				.to_string(),
		});
	}
	if cfg.engines.is_empty() {
		return Err(Error::Validation {
			message: "engines must define at least one engine.".to_string(),
		});
	}

	for (name, engine) in &cfg.engines {
		if engine.sources.is_empty() {
			return Err(Error::Validation {
				message: format!("Engine {name:?} must define at least one source."),
			});
		}

		let mut seen = HashSet::new();

		for source in &engine.sources {
			if source.content_type.is_empty() {
				return Err(Error::Validation {
					message: format!("Engine {name:?} has a source with an empty content_type."),
				});
			}
			if !seen.insert(source.content_type.as_str()) {
				return Err(Error::Validation {
					message: format!(
						"Engine {name:?} lists source {:?} more than once.",
						source.content_type
					),
				});
			}

			for (label, weight) in [
				("title", source.weights.title),
				("slug", source.weights.slug),
				("excerpt", source.weights.excerpt),
				("content", source.weights.content),
				("comment", source.weights.comment),
			] {
				if !weight.is_finite() || weight < 0. {
					return Err(Error::Validation {
						message: format!(
							"Engine {name:?} source {:?} weight {label} must be a finite number of zero or greater.",
							source.content_type
						),
					});
				}
			}
			for custom_field in &source.custom_fields {
				if custom_field.key.is_empty() {
					return Err(Error::Validation {
						message: format!(
							"Engine {name:?} source {:?} has a custom field with an empty key.",
							source.content_type
						),
					});
				}
				if !custom_field.weight.is_finite() || custom_field.weight < 0. {
					return Err(Error::Validation {
						message: format!(
							"Engine {name:?} source {:?} custom field {:?} weight must be a finite number of zero or greater.",
							source.content_type, custom_field.key
						),
					});
				}
			}
			for taxonomy in &source.taxonomies {
				if taxonomy.taxonomy.is_empty() {
					return Err(Error::Validation {
						message: format!(
							"Engine {name:?} source {:?} has a taxonomy weight with an empty taxonomy.",
							source.content_type
						),
					});
				}
				if !taxonomy.weight.is_finite() || taxonomy.weight < 0. {
					return Err(Error::Validation {
						message: format!(
							"Engine {name:?} source {:?} taxonomy {:?} weight must be a finite number of zero or greater.",
							source.content_type, taxonomy.taxonomy
						),
					});
				}
			}
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.storage.postgres.dsn = cfg.storage.postgres.dsn.trim().to_string();

	for engine in cfg.engines.values_mut() {
		for source in &mut engine.sources {
			source.content_type = source.content_type.trim().to_string();

			for custom_field in &mut source.custom_fields {
				custom_field.key = custom_field.key.trim().to_string();
			}
			for taxonomy in &mut source.taxonomies {
				taxonomy.taxonomy = taxonomy.taxonomy.trim().to_string();
			}
		}
	}
}
