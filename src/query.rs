// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

//! The query engine: `Get`, `GetMany`, `Parse`, and the [`Value`] query
//! result type. Drives [`crate::scanner`] through a [`crate::path`] segment
//! chain without ever materializing a parsed tree; plain `Key`/`Index`
//! chains stay zero-copy all the way through, while wildcards, filters,
//! multipath and modifiers synthesize a small owned buffer only at the
//! point they actually need to combine more than one source range (this is
//! what spec's `RawJSON` kind exists for).

use crate::path::{self, CompiledPath, FilterLiteral, FilterOp, MultipathBranch, PathSegment};
use crate::scanner;
use std::borrow::Cow;

/// Paths containing no special characters scan directly against documents
/// up to this size, skipping path compilation entirely.
pub const FAST_PATH_THRESHOLD: usize = 1024;

/// The kind of JSON value a [`Value`] holds. Discriminants match the stable
/// constant table in the path-language reference (`Null=0 .. Undefined=8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    Null = 0,
    False = 1,
    Number = 2,
    String = 3,
    True = 4,
    RawJson = 5,
    Array = 6,
    Object = 7,
    Undefined = 8,
}

fn classify_raw(bytes: &[u8]) -> Kind {
    match bytes.first() {
        None => Kind::Undefined,
        Some(b'"') => Kind::String,
        Some(b'{') => Kind::Object,
        Some(b'[') => Kind::Array,
        Some(b't') => Kind::True,
        Some(b'f') => Kind::False,
        Some(b'n') => Kind::Null,
        Some(b'-') | Some(b'0'..=b'9') => Kind::Number,
        _ => Kind::RawJson,
    }
}

/// A typed view of one JSON value. Borrows from the source document when
/// possible (`raw` is `Cow::Borrowed`); wildcard/filter/multipath/modifier
/// results are synthesized into an owned buffer (`Cow::Owned`) since they
/// combine more than one source range. `index` is the byte offset `raw`
/// begins at in whatever buffer backs it, used by the mutation engine.
#[derive(Debug, Clone)]
pub struct Value<'a> {
    kind: Kind,
    raw: Cow<'a, str>,
    index: Option<usize>,
}

impl<'a> Default for Value<'a> {
    fn default() -> Self {
        Value::undefined()
    }
}

impl<'a> Value<'a> {
    pub fn undefined() -> Value<'a> {
        Value {
            kind: Kind::Undefined,
            raw: Cow::Borrowed(""),
            index: None,
        }
    }

    pub fn null() -> Value<'a> {
        Value {
            kind: Kind::Null,
            raw: Cow::Borrowed("null"),
            index: None,
        }
    }

    pub fn number(n: f64) -> Value<'a> {
        Value {
            kind: Kind::Number,
            raw: Cow::Owned(crate::value::encode(&crate::value::Value::Number(n))
                .ok()
                .and_then(|b| String::from_utf8(b).ok())
                .unwrap_or_else(|| "0".to_string())),
            index: None,
        }
    }

    /// Detaches `self` from whatever buffer it borrowed, so the result can
    /// outlive that buffer. Used when a modifier rewrites the value and the
    /// remaining path segments must scan the rewritten text instead of the
    /// original document.
    pub fn into_owned<'b>(self) -> Value<'b> {
        Value {
            kind: self.kind,
            raw: Cow::Owned(self.raw.into_owned()),
            index: self.index,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn exists(&self) -> bool {
        self.kind != Kind::Undefined
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Decoded string payload. Aliases `raw` (minus quotes) unless the
    /// source string contains escape sequences, in which case it is
    /// unescaped into a fresh `String`.
    pub fn str(&self) -> Cow<'_, str> {
        match self.kind {
            Kind::String => {
                if self.raw.as_bytes().contains(&b'\\') {
                    Cow::Owned(crate::util::unescape(&self.raw))
                } else {
                    let s: &str = &self.raw;
                    Cow::Borrowed(&s[1..s.len() - 1])
                }
            }
            Kind::True => Cow::Borrowed("true"),
            Kind::False => Cow::Borrowed("false"),
            Kind::Null | Kind::Undefined => Cow::Borrowed(""),
            Kind::Number | Kind::Array | Kind::Object | Kind::RawJson => Cow::Borrowed(&self.raw),
        }
    }

    pub fn f64(&self) -> f64 {
        match self.kind {
            Kind::True => 1.0,
            Kind::Number => self.raw.parse().unwrap_or(0.0),
            Kind::String => self.str().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn i64(&self) -> i64 {
        match self.kind {
            Kind::True => 1,
            Kind::Number => self.raw.parse::<i64>().unwrap_or_else(|_| self.f64() as i64),
            Kind::String => self
                .str()
                .parse::<i64>()
                .unwrap_or_else(|_| self.f64() as i64),
            _ => 0,
        }
    }

    pub fn u64(&self) -> u64 {
        self.i64().max(0) as u64
    }

    pub fn bool(&self) -> bool {
        match self.kind {
            Kind::True => true,
            Kind::False => false,
            Kind::Number => self.f64() != 0.0,
            Kind::String => matches!(
                self.str().as_ref(),
                "true" | "1" | "t" | "T" | "TRUE" | "True"
            ),
            _ => false,
        }
    }

    /// Iterate the members of an object or array, yielding `(Some(key),
    /// value)` for objects and `(None, value)` for arrays, in source
    /// order. A non-container existing value yields itself once.
    pub fn each(&'a self, mut f: impl FnMut(Option<Value<'a>>, Value<'a>) -> bool) {
        if !self.exists() {
            return;
        }
        let kind = self.kind;
        if kind != Kind::Object && kind != Kind::Array {
            f(None, self.shallow_clone());
            return;
        }
        let s = self.as_str_a();
        let bytes = s.as_bytes();
        scanner::for_each_member(bytes, 0, kind == Kind::Object, |key_range, vs, ve| {
            let key_val = key_range.map(|(ks, ke)| Value {
                kind: Kind::String,
                raw: Cow::Borrowed(&s[ks..ke]),
                index: Some(ks),
            });
            let val = Value {
                kind: classify_raw(&bytes[vs..ve]),
                raw: Cow::Borrowed(&s[vs..ve]),
                index: Some(vs),
            };
            f(key_val, val)
        });
    }

    pub fn array(&'a self) -> Vec<Value<'a>> {
        let mut out = Vec::new();
        if self.kind == Kind::Array {
            self.each(|_, v| {
                out.push(v);
                true
            });
        }
        out
    }

    fn shallow_clone(&self) -> Value<'a> {
        Value {
            kind: self.kind,
            raw: match &self.raw {
                Cow::Borrowed(s) => Cow::Borrowed(s),
                Cow::Owned(s) => Cow::Owned(s.clone()),
            },
            index: self.index,
        }
    }

    /// Obtain `self`'s backing text with the full `'a` lifetime (not just
    /// `&self`'s). Requires `&'a self`, mirroring gjson's own `Value::get`.
    fn as_str_a(&'a self) -> &'a str {
        match &self.raw {
            Cow::Borrowed(s) => s,
            Cow::Owned(s) => s.as_str(),
        }
    }

    /// Navigate further from this value, as if `path` were appended.
    pub fn get(&'a self, path: &'a str) -> Value<'a> {
        get(self.as_str_a(), path)
    }
}

/// Searches `json` for `path` (dot/bracket syntax, `#`/`@`/`{}` operators —
/// see the crate-level path grammar). Returns `Undefined` rather than
/// erroring on a bad path or a missing target.
pub fn get<'a>(json: &'a str, path: &'a str) -> Value<'a> {
    if path.is_empty() {
        return parse(json);
    }
    if json.len() <= FAST_PATH_THRESHOLD && is_plain_path(path) {
        return get_plain_fast(json, path);
    }
    let compiled = path::compile(path);
    get_compiled(json, &compiled)
}

/// `Get` against an already-[`path::compile`]d path — the entry point
/// `SetWithCompiledPath`'s read-side counterpart, letting callers reuse a
/// compiled path across repeated `Get` calls.
pub fn get_compiled<'a>(json: &'a str, compiled: &CompiledPath<'a>) -> Value<'a> {
    if compiled.segments.is_empty() {
        return parse(json);
    }
    let bytes = json.as_bytes();
    let start = scanner::skip_whitespace(bytes, 0);
    if start >= bytes.len() {
        return Value::undefined();
    }
    eval_segments(json, start, &compiled.segments)
}

pub fn get_many<'a>(json: &'a str, paths: &[&'a str]) -> Vec<Value<'a>> {
    paths.iter().map(|p| get(json, p)).collect()
}

/// Classifies the top-level value without descending into it.
pub fn parse<'a>(json: &'a str) -> Value<'a> {
    let bytes = json.as_bytes();
    let i = scanner::skip_whitespace(bytes, 0);
    if i >= bytes.len() {
        return Value::undefined();
    }
    let (vs, ve) = scanner::value_span(bytes, i);
    if vs >= ve {
        return Value::undefined();
    }
    Value {
        kind: classify_raw(&bytes[vs..ve]),
        raw: Cow::Borrowed(&json[vs..ve]),
        index: Some(vs),
    }
}

fn value_at<'a>(json: &'a str, vstart: usize) -> Value<'a> {
    let bytes = json.as_bytes();
    if vstart >= bytes.len() {
        return Value::undefined();
    }
    let (vs, ve) = scanner::value_span(bytes, vstart);
    if vs >= ve {
        return Value::undefined();
    }
    Value {
        kind: classify_raw(&bytes[vs..ve]),
        raw: Cow::Borrowed(&json[vs..ve]),
        index: Some(vs),
    }
}

fn is_plain_path(path: &str) -> bool {
    path.bytes()
        .all(|b| !matches!(b, b'#' | b'@' | b'*' | b'?' | b'{' | b'[' | b',' | b'\\' | b'|'))
}

fn get_plain_fast<'a>(json: &'a str, path: &'a str) -> Value<'a> {
    let bytes = json.as_bytes();
    let mut vstart = scanner::skip_whitespace(bytes, 0);
    for seg in path.split('.') {
        if vstart >= bytes.len() {
            return Value::undefined();
        }
        match bytes[vstart] {
            b'{' => {
                let found = scanner::locate_key(bytes, vstart, |raw_key, _esc| {
                    raw_key.len() == seg.len() + 2 && &raw_key[1..raw_key.len() - 1] == seg.as_bytes()
                });
                match found {
                    Some((vs, _)) => vstart = vs,
                    None => return Value::undefined(),
                }
            }
            b'[' => match seg.parse::<usize>() {
                Ok(ix) => match scanner::locate_index(bytes, vstart, ix) {
                    Some((vs, _)) => vstart = vs,
                    None => return Value::undefined(),
                },
                Err(_) => return Value::undefined(),
            },
            _ => return Value::undefined(),
        }
    }
    value_at(json, vstart)
}

pub(crate) fn key_eq(raw_key: &[u8], has_escape: bool, target: &str) -> bool {
    if has_escape {
        let decoded = crate::util::unescape(std::str::from_utf8(raw_key).unwrap_or(""));
        decoded == target
    } else if raw_key.len() < 2 {
        false
    } else {
        &raw_key[1..raw_key.len() - 1] == target.as_bytes()
    }
}

fn decode_key(raw_key: &[u8], has_escape: bool) -> String {
    if has_escape {
        crate::util::unescape(std::str::from_utf8(raw_key).unwrap_or(""))
    } else if raw_key.len() >= 2 {
        String::from_utf8_lossy(&raw_key[1..raw_key.len() - 1]).into_owned()
    } else {
        String::new()
    }
}

pub(crate) fn owned_of<'a>(kind: Kind, text: String) -> Value<'a> {
    Value {
        kind,
        raw: Cow::Owned(text),
        index: None,
    }
}

fn eval_segments<'a>(json: &'a str, vstart: usize, segments: &[PathSegment<'a>]) -> Value<'a> {
    if segments.is_empty() {
        return value_at(json, vstart);
    }
    let bytes = json.as_bytes();
    let rest = &segments[1..];
    match &segments[0] {
        PathSegment::Key { name, .. } => {
            if bytes.get(vstart) != Some(&b'{') {
                return Value::undefined();
            }
            let target = name.as_ref();
            match scanner::locate_key(bytes, vstart, |raw_key, esc| key_eq(raw_key, esc, target)) {
                Some((vs, _)) => eval_segments(json, vs, rest),
                None => Value::undefined(),
            }
        }
        PathSegment::Index(i) => {
            if bytes.get(vstart) != Some(&b'[') {
                return Value::undefined();
            }
            // A literal negative index (e.g. `-1`) never matches here — it
            // only means "append" for Set. Get's "last element" is reached
            // via the `@last` modifier, not by overloading this segment.
            if *i < 0 {
                return Value::undefined();
            }
            match scanner::locate_index(bytes, vstart, *i as usize) {
                Some((vs, _)) => eval_segments(json, vs, rest),
                None => Value::undefined(),
            }
        }
        PathSegment::Wildcard(pattern) => {
            if bytes.get(vstart) != Some(&b'{') {
                return Value::undefined();
            }
            let mut out = vec![b'['];
            let mut count = 0usize;
            scanner::for_each_member(bytes, vstart, true, |key_range, vs, _ve| {
                if let Some((ks, ke)) = key_range {
                    let raw_key = &bytes[ks..ke];
                    let has_escape = raw_key.contains(&b'\\');
                    let key_str = decode_key(raw_key, has_escape);
                    if crate::util::pmatch(pattern.as_bytes(), key_str.as_bytes()) {
                        let v = eval_segments(json, vs, rest);
                        if v.exists() {
                            if count > 0 {
                                out.push(b',');
                            }
                            out.extend_from_slice(v.raw().as_bytes());
                            count += 1;
                        }
                    }
                }
                true
            });
            out.push(b']');
            owned_of(Kind::Array, String::from_utf8(out).unwrap_or_default())
        }
        PathSegment::ArrayAll => {
            if bytes.get(vstart) != Some(&b'[') {
                return Value::undefined();
            }
            let mut out = vec![b'['];
            let mut count = 0usize;
            scanner::for_each_member(bytes, vstart, false, |_, vs, _ve| {
                let v = eval_segments(json, vs, rest);
                if v.exists() {
                    if count > 0 {
                        out.push(b',');
                    }
                    out.extend_from_slice(v.raw().as_bytes());
                    count += 1;
                }
                true
            });
            out.push(b']');
            owned_of(Kind::Array, String::from_utf8(out).unwrap_or_default())
        }
        PathSegment::ArrayCount => {
            if bytes.get(vstart) != Some(&b'[') {
                return Value::undefined();
            }
            let mut count = 0usize;
            scanner::for_each_member(bytes, vstart, false, |_, _, _| {
                count += 1;
                true
            });
            Value::number(count as f64)
        }
        PathSegment::Filter { subpath, op, literal } => {
            if bytes.get(vstart) != Some(&b'[') {
                return Value::undefined();
            }
            let sub_compiled = if subpath.is_empty() {
                None
            } else {
                Some(path::compile(subpath))
            };
            let mut out = vec![b'['];
            let mut count = 0usize;
            scanner::for_each_member(bytes, vstart, false, |_, vs, _ve| {
                let candidate = match &sub_compiled {
                    Some(cp) => eval_segments(json, vs, &cp.segments),
                    None => value_at(json, vs),
                };
                if filter_matches(&candidate, *op, literal.as_ref()) {
                    let v = eval_segments(json, vs, rest);
                    if v.exists() {
                        if count > 0 {
                            out.push(b',');
                        }
                        out.extend_from_slice(v.raw().as_bytes());
                        count += 1;
                    }
                }
                true
            });
            out.push(b']');
            owned_of(Kind::Array, String::from_utf8(out).unwrap_or_default())
        }
        PathSegment::Modifier { name, arg } => {
            let cur = value_at(json, vstart);
            let modified = crate::modifiers::apply(name, arg.unwrap_or(""), &cur);
            if rest.is_empty() {
                modified.into_owned()
            } else {
                let owned_json = modified.raw().to_string();
                let sub = eval_segments(&owned_json, 0, rest);
                sub.into_owned()
            }
        }
        PathSegment::Multipath(branches) => multipath_eval(json, vstart, branches),
    }
}

fn multipath_eval<'a>(json: &'a str, vstart: usize, branches: &[MultipathBranch<'a>]) -> Value<'a> {
    let is_object = branches.iter().any(|b| b.label.is_some());
    let mut out = vec![if is_object { b'{' } else { b'[' }];
    for (i, b) in branches.iter().enumerate() {
        let v = eval_segments(json, vstart, &b.path.segments);
        if i > 0 {
            out.push(b',');
        }
        if is_object {
            let label = b.label.clone().unwrap_or_else(|| "_".to_string());
            crate::util::extend_json_string(&mut out, label.as_bytes());
            out.push(b':');
        }
        if v.exists() {
            out.extend_from_slice(v.raw().as_bytes());
        } else {
            out.extend_from_slice(b"null");
        }
    }
    out.push(if is_object { b'}' } else { b']' });
    owned_of(
        if is_object { Kind::Object } else { Kind::Array },
        String::from_utf8(out).unwrap_or_default(),
    )
}

fn filter_matches(candidate: &Value, op: FilterOp, literal: Option<&FilterLiteral>) -> bool {
    if op == FilterOp::Exists {
        return candidate.exists();
    }
    if !candidate.exists() {
        return false;
    }
    let lit = match literal {
        Some(l) => l,
        None => return false,
    };
    if matches!(op, FilterOp::Glob | FilterOp::NotGlob) {
        let pat = match lit {
            FilterLiteral::Str(s) => s.as_str(),
            FilterLiteral::Raw(s) => s.as_str(),
            _ => return false,
        };
        let m = crate::util::pmatch(pat.as_bytes(), candidate.str().as_bytes());
        return if op == FilterOp::Glob { m } else { !m };
    }
    match (candidate.kind(), lit) {
        (Kind::Number, FilterLiteral::Number(n)) => numeric_cmp(candidate.f64(), *n, op),
        (Kind::True, FilterLiteral::Bool(b)) => bool_cmp(true, *b, op),
        (Kind::False, FilterLiteral::Bool(b)) => bool_cmp(false, *b, op),
        (Kind::Null, FilterLiteral::Null) => op == FilterOp::Eq,
        _ => {
            let lit_str = match lit {
                FilterLiteral::Str(s) => Cow::Borrowed(s.as_str()),
                FilterLiteral::Raw(s) => Cow::Borrowed(s.as_str()),
                FilterLiteral::Number(n) => Cow::Owned(format!("{n}")),
                FilterLiteral::Bool(b) => Cow::Owned(b.to_string()),
                FilterLiteral::Null => Cow::Borrowed("null"),
            };
            str_cmp(&candidate.str(), &lit_str, op)
        }
    }
}

fn numeric_cmp(a: f64, b: f64, op: FilterOp) -> bool {
    match op {
        FilterOp::Eq => a == b,
        FilterOp::Ne => a != b,
        FilterOp::Lt => a < b,
        FilterOp::Le => a <= b,
        FilterOp::Gt => a > b,
        FilterOp::Ge => a >= b,
        _ => false,
    }
}

fn bool_cmp(a: bool, b: bool, op: FilterOp) -> bool {
    match op {
        FilterOp::Eq => a == b,
        FilterOp::Ne => a != b,
        FilterOp::Lt => !a && b,
        FilterOp::Le => !a || b,
        FilterOp::Gt => a && !b,
        FilterOp::Ge => a || !b,
        _ => false,
    }
}

fn str_cmp(a: &str, b: &str, op: FilterOp) -> bool {
    match op {
        FilterOp::Eq => a == b,
        FilterOp::Ne => a != b,
        FilterOp::Lt => a < b,
        FilterOp::Le => a <= b,
        FilterOp::Gt => a > b,
        FilterOp::Ge => a >= b,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scenario_name() {
        let v = get(r#"{"name":"John","age":30,"active":true,"score":95.5}"#, "name");
        assert_eq!(v.kind(), Kind::String);
        assert_eq!(v.str(), "John");
    }

    #[test]
    fn scenario_nested_array_index() {
        let v = get(
            r#"{"items":[{"id":1,"tags":["a","b"]},{"id":2,"tags":["c","d"]}]}"#,
            "items[1].tags[0]",
        );
        assert_eq!(v.str(), "c");
    }

    #[test]
    fn scenario_nested_array_index_dot_form() {
        let v = get(
            r#"{"items":[{"id":1,"tags":["a","b"]},{"id":2,"tags":["c","d"]}]}"#,
            "items.1.tags.0",
        );
        assert_eq!(v.str(), "c");
    }

    #[test]
    fn negative_index_is_undefined_not_last() {
        let v = get(r#"{"items":[1,2,3]}"#, "items.-1");
        assert!(!v.exists());
        // "last" is reached via the modifier, not index overloading.
        let last = get(r#"{"items":[1,2,3]}"#, "items|@last");
        assert_eq!(last.f64(), 3.0);
    }

    #[test]
    fn scenario_filter() {
        let v = get(
            r#"{"items":[{"id":1,"tags":["a","b"]},{"id":2,"tags":["c","d"]}]}"#,
            "items.#(id==2).tags.0",
        );
        assert_eq!(v.str(), "c");
    }

    #[test]
    fn scenario_multipath() {
        let v = get(
            r#"{"u":{"n":"A"},"m":{"a":true,"s":2.5}}"#,
            "u.n,m.a,m.s,missing",
        );
        assert_eq!(v.kind(), Kind::Array);
        let arr = v.array();
        assert_eq!(arr.len(), 4);
        assert_eq!(arr[0].str(), "A");
        assert_eq!(arr[1].kind(), Kind::True);
        assert_eq!(arr[2].f64(), 2.5);
        assert_eq!(arr[3].kind(), Kind::Null);
    }

    #[test]
    fn wildcard_collects_matches() {
        let v = get(r#"{"aa":1,"ab":2,"bc":3}"#, "a*");
        assert_eq!(v.kind(), Kind::Array);
        assert_eq!(v.array().len(), 2);
    }

    #[test]
    fn array_count_vs_all() {
        let v = get(r#"{"items":[1,2,3]}"#, "items.#");
        assert_eq!(v.f64(), 3.0);
        let v = get(r#"{"items":[{"a":1},{"a":2}]}"#, "items.#.a");
        assert_eq!(v.array().len(), 2);
    }

    #[test]
    fn undefined_on_missing() {
        let v = get(r#"{"a":1}"#, "b.c.d");
        assert!(!v.exists());
    }
}
