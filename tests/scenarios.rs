// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

use jsonray::{delete, get, set, Kind, SetValue};
use proptest::prelude::*;

#[test]
fn scenario_1_simple_key() {
    let v = get(r#"{"name":"John","age":30,"active":true,"score":95.5}"#, "name");
    assert_eq!(v.kind(), Kind::String);
    assert_eq!(v.str(), "John");
}

#[test]
fn scenario_2_bracket_index_chain() {
    let v = get(
        r#"{"items":[{"id":1,"tags":["a","b"]},{"id":2,"tags":["c","d"]}]}"#,
        "items[1].tags[0]",
    );
    assert_eq!(v.str(), "c");
}

#[test]
fn scenario_3_sort_then_first() {
    let v = get(r#"{"nums":[1,4,2,3]}"#, "nums|@sort:desc|@first");
    assert_eq!(v.kind(), Kind::Number);
    assert_eq!(v.f64(), 4.0);
}

#[test]
fn scenario_4_multipath() {
    let v = get(r#"{"u":{"n":"A"},"m":{"a":true,"s":2.5}}"#, "u.n,m.a,m.s,missing");
    assert_eq!(v.kind(), Kind::Array);
    let arr = v.array();
    assert_eq!(arr.len(), 4);
    assert_eq!(arr[0].str(), "A");
    assert_eq!(arr[1].kind(), Kind::True);
    assert_eq!(arr[2].f64(), 2.5);
    assert_eq!(arr[3].kind(), Kind::Null);
}

#[test]
fn scenario_5_set_adds_key() {
    let out = set(r#"{"user":{"name":"Alice"}}"#, "user.age", &SetValue::from(30i64)).unwrap();
    assert_eq!(out, r#"{"user":{"name":"Alice","age":30}}"#);
}

#[test]
fn scenario_6_delete_removes_key() {
    let out = delete(r#"{"user":{"name":"Alice","temp":"x"}}"#, "user.temp").unwrap();
    assert_eq!(out, r#"{"user":{"name":"Alice"}}"#);
}

#[test]
fn boundary_empty_document() {
    let v = get("", "anything");
    assert!(!v.exists());
}

#[test]
fn boundary_single_value_documents() {
    assert_eq!(get(r#""x""#, "").str(), "x");
    assert_eq!(get("42", "").f64(), 42.0);
    assert_eq!(get("null", "").kind(), Kind::Null);
}

#[test]
fn boundary_empty_object_and_array() {
    assert!(!get("{}", "missing").exists());
    assert_eq!(get("[]", "0").kind(), Kind::Undefined);
}

#[test]
fn boundary_around_fast_path_threshold() {
    // a document that straddles FAST_PATH_THRESHOLD exercises both the
    // direct scan and the compiled-path route for the same plain key.
    let padding = "x".repeat(1100);
    let doc = format!(r#"{{"pad":"{padding}","name":"John"}}"#);
    assert_eq!(get(&doc, "name").str(), "John");
}

#[test]
fn boundary_deeply_nested() {
    let mut doc = String::new();
    for _ in 0..40 {
        doc.push_str(r#"{"a":"#);
    }
    doc.push_str("1");
    for _ in 0..40 {
        doc.push('}');
    }
    let path = "a.".repeat(39) + "a";
    assert_eq!(get(&doc, &path).f64(), 1.0);
}

#[test]
fn boundary_escaped_key() {
    let doc = r#"{"a.b":1}"#;
    assert_eq!(get(doc, r"a\.b").f64(), 1.0);
}

#[test]
fn boundary_strings_with_special_chars() {
    let doc = r#"{"a":"has {braces} [brackets] \"quotes\" and é"}"#;
    assert_eq!(get(doc, "a").str(), "has {braces} [brackets] \"quotes\" and \u{e9}");
}

#[test]
fn boundary_strings_with_unicode_escape() {
    let doc = "{\"a\":\"caf\\u00e9\"}";
    assert_eq!(get(doc, "a").str(), "caf\u{e9}");
}

#[test]
fn delete_is_idempotent() {
    let doc = r#"{"a":1,"b":2}"#;
    let once = delete(doc, "a").unwrap();
    let twice = delete(&once, "a");
    assert!(twice.is_err());
}

#[test]
fn set_then_get_round_trips() {
    let doc = r#"{"a":1}"#;
    let out = set(doc, "b", &SetValue::from("hi")).unwrap();
    assert_eq!(get(&out, "b").str(), "hi");
    assert_eq!(get(&out, "a").f64(), 1.0);
}

proptest! {
    #[test]
    fn get_raw_is_balanced_or_empty(
        a in 0i64..1000,
        b in 0i64..1000,
        key in "[a-z]{1,6}",
    ) {
        let doc = format!(r#"{{"x":{a},"y":{b}}}"#);
        let v = get(&doc, &key);
        let raw = v.raw();
        if raw.is_empty() {
            prop_assert!(!v.exists() || v.kind() == jsonray::Kind::Null);
        } else {
            let first = raw.as_bytes()[0];
            let last = raw.as_bytes()[raw.len() - 1];
            if first == b'{' {
                prop_assert_eq!(last, b'}');
            }
            if first == b'[' {
                prop_assert_eq!(last, b']');
            }
        }
    }

    #[test]
    fn set_then_get_roundtrips_numbers(n in -100000i64..100000) {
        let doc = r#"{"a":1}"#;
        let out = set(doc, "a", &SetValue::from(n)).unwrap();
        prop_assert_eq!(get(&out, "a").f64(), n as f64);
    }

    #[test]
    fn delete_then_reapply_errors_consistently(key in "[a-z]{1,4}") {
        let doc = format!(r#"{{"{key}":1,"other":2}}"#);
        let once = delete(&doc, &key);
        if let Ok(out) = once {
            let twice = delete(&out, &key);
            prop_assert!(twice.is_err());
            prop_assert!(get(&out, "other").exists());
        }
    }
}
