//! Opaque connection cursor.
//!
//! A cursor is the base64 form of `result:<id>`. Clients must treat it as an
//! opaque token; decoding tolerates any malformed input by returning `None`,
//! which callers treat as a stale cursor.

use base64::{Engine as _, engine::general_purpose::STANDARD};

const CURSOR_PREFIX: &str = "result:";

pub fn encode(id: i64) -> String {
	STANDARD.encode(format!("{CURSOR_PREFIX}{id}"))
}

pub fn decode(cursor: &str) -> Option<i64> {
	let raw = STANDARD.decode(cursor).ok()?;
	let text = String::from_utf8(raw).ok()?;

	text.strip_prefix(CURSOR_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn roundtrip() {
		assert_eq!(decode(&encode(0)), Some(0));
		assert_eq!(decode(&encode(42)), Some(42));
		assert_eq!(decode(&encode(i64::MAX)), Some(i64::MAX));
	}

	#[test]
	fn malformed_cursors_decode_to_none() {
		assert_eq!(decode(""), None);
		assert_eq!(decode("not base64!!"), None);
		// Valid base64, wrong payload.
		assert_eq!(decode(&STANDARD.encode("post:42")), None);
		assert_eq!(decode(&STANDARD.encode("result:forty-two")), None);
		assert_eq!(decode(&STANDARD.encode([0xff, 0xfe])), None);
	}
}
