// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::KernelError;
use crate::keys::{entry_key, parse_counter, LAST_SEEN_KEY, NEXT_KEY};
use crate::types::id::{IdentifierKey, LogEntry};

#[test]
fn test_key_names() {
    assert_eq!(LAST_SEEN_KEY, "ua-idx");
    assert_eq!(NEXT_KEY, "ua-next");
    assert_eq!(entry_key(42), "ua-42");
}

#[test]
fn test_identifier_key_is_md5_hex() {
    // md5("") and md5("abc") reference digests.
    assert_eq!(IdentifierKey::of("").as_str(), "d41d8cd98f00b204e9800998ecf8427e");
    let key = IdentifierKey::of("abc");
    assert_eq!(key.as_str(), "900150983cd24fb0d6963f7d28e17f72");
    assert_eq!(key.cache_key(), "ua-900150983cd24fb0d6963f7d28e17f72");
}

#[test]
fn test_identical_strings_share_a_key() {
    let a = LogEntry { sequence: 3, identifier: "Mozilla/5.0 (X11; Linux x86_64)".into() };
    let b = LogEntry { sequence: 910, identifier: "Mozilla/5.0 (X11; Linux x86_64)".into() };
    assert_eq!(a.key(), b.key());

    let c = LogEntry { sequence: 3, identifier: "Mozilla/5.0 (X11; Linux x86_64) ".into() };
    assert_ne!(a.key(), c.key());
}

#[test]
fn test_parse_counter() {
    assert_eq!(parse_counter("17"), Ok(17));
    assert_eq!(parse_counter(" 17\r\n"), Ok(17));
    assert_eq!(parse_counter("-1"), Err(KernelError::InvalidCounter("-1".into())));
    assert!(parse_counter("").is_err());
    assert!(parse_counter("12abc").is_err());
}
