use std::collections::HashSet;

/// Splits free-text search input into lowercase alphanumeric terms,
/// deduplicated in first-seen order. Single-character fragments are noise and
/// are dropped.
pub fn tokenize(input: &str, max_terms: usize) -> Vec<String> {
	let mut normalized = String::with_capacity(input.len());

	for ch in input.chars() {
		if ch.is_alphanumeric() {
			for lower in ch.to_lowercase() {
				normalized.push(lower);
			}
		} else {
			normalized.push(' ');
		}
	}

	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for token in normalized.split_whitespace() {
		if token.chars().count() < 2 {
			continue;
		}
		if seen.insert(token) {
			out.push(token.to_string());
		}
		if out.len() >= max_terms {
			break;
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_lowercases_and_dedups() {
		assert_eq!(tokenize("Hello, WORLD! hello", 16), vec!["hello", "world"]);
	}

	#[test]
	fn drops_single_character_fragments() {
		assert_eq!(tokenize("a b cd e", 16), vec!["cd"]);
	}

	#[test]
	fn respects_the_term_cap() {
		assert_eq!(tokenize("one two three", 2), vec!["one", "two"]);
	}

	#[test]
	fn empty_and_punctuation_only_input_yields_no_terms() {
		assert!(tokenize("", 16).is_empty());
		assert!(tokenize("!?—…", 16).is_empty());
	}
}
