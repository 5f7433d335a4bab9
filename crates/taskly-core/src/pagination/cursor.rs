//! Page token codec: store cursors to and from URL-transportable strings.
//!
//! A token is the standard base64 encoding of the cursor components written
//! as `name=value` pairs joined by commas, in store order. Decoding is
//! lenient: anything that is not a well-formed token decodes to the empty
//! cursor, which restarts pagination from the first page.
//!
//! Component names and values must not contain `,` and names must not
//! contain `=`. Every key attribute the store emits (ids, status names,
//! dates, RFC 3339 timestamps, the partition tag) satisfies this.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use crate::store::Cursor;

/// Encode a cursor as a page token. The empty cursor encodes to `""`.
pub fn encode(cursor: &Cursor) -> String {
    if cursor.is_empty() {
        return String::new();
    }
    let joined = cursor
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    STANDARD.encode(joined.as_bytes())
}

/// Encode the continuation key of a page, if any.
pub fn encode_opt(cursor: Option<&Cursor>) -> Option<String> {
    cursor.filter(|c| !c.is_empty()).map(encode)
}

/// Decode a page token. Never fails; see the module docs.
pub fn decode(token: Option<&str>) -> Cursor {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Cursor::new();
    };
    match try_decode(token) {
        Some(cursor) => cursor,
        None => {
            warn!(token_len = token.len(), "discarding malformed page token");
            Cursor::new()
        }
    }
}

fn try_decode(token: &str) -> Option<Cursor> {
    let bytes = STANDARD.decode(token).ok()?;
    let joined = String::from_utf8(bytes).ok()?;

    let mut cursor = Cursor::new();
    for segment in joined.split(',') {
        let (name, value) = segment.split_once('=')?;
        if name.is_empty() {
            return None;
        }
        cursor.push(name, value);
    }
    Some(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Cursor {
        Cursor::new()
            .with("id", "3f2b8c1e-6a51-4c1f-9d0e-4b8f1f0c2a77")
            .with("status", "ONGOING")
            .with("createdAt", "2025-01-01T10:00:00.000000000Z")
    }

    #[test]
    fn test_encode_is_base64_of_joined_pairs() {
        let cursor = Cursor::new().with("id", "a").with("sortKey", "TODOS");
        let token = encode(&cursor);
        assert_eq!(token, STANDARD.encode("id=a,sortKey=TODOS"));
        assert_eq!(decode(Some(&token)), cursor);
    }

    #[test]
    fn test_round_trip_keeps_order() {
        let cursor = sample();
        let decoded = decode(Some(&encode(&cursor)));
        assert_eq!(decoded, cursor);
        let names: Vec<&str> = decoded.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "status", "createdAt"]);
    }

    #[test]
    fn test_empty_and_absent_tokens_decode_empty() {
        assert!(decode(None).is_empty());
        assert!(decode(Some("")).is_empty());
        assert!(decode(Some("   ")).is_empty());
    }

    #[test]
    fn test_invalid_base64_decodes_empty() {
        assert!(decode(Some("not-valid-base64!!")).is_empty());
    }

    #[test]
    fn test_segment_without_separator_decodes_empty() {
        let token = STANDARD.encode("id=a,garbage");
        assert!(decode(Some(&token)).is_empty());

        let token = STANDARD.encode("=a");
        assert!(decode(Some(&token)).is_empty());
    }

    #[test]
    fn test_non_utf8_payload_decodes_empty() {
        let token = STANDARD.encode([0xff, 0xfe, 0x3d]);
        assert!(decode(Some(&token)).is_empty());
    }

    #[test]
    fn test_empty_cursor_encodes_to_nothing() {
        assert_eq!(encode(&Cursor::new()), "");
        assert_eq!(encode_opt(None), None);
        assert_eq!(encode_opt(Some(&Cursor::new())), None);
        assert!(encode_opt(Some(&sample())).is_some());
    }

    #[test]
    fn test_tokens_have_no_stack_separator() {
        // Token stacks join tokens with commas.
        assert!(!encode(&sample()).contains(','));
    }

    fn component() -> impl Strategy<Value = (String, String)> {
        ("[A-Za-z][A-Za-z0-9_]{0,11}", "[A-Za-z0-9:.=#_ -]{0,40}")
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(parts in prop::collection::vec(component(), 1..5)) {
            let mut cursor = Cursor::new();
            for (name, value) in parts {
                cursor.push(name, value);
            }
            prop_assert_eq!(decode(Some(&encode(&cursor))), cursor);
        }

        #[test]
        fn prop_decode_never_panics(token in ".{0,64}") {
            let _ = decode(Some(&token));
        }
    }
}
