//! `Set`/`Delete`: single-sweep splice emission against the source buffer.
//!
//! Unlike `Get`, the mutation path never appeared in the teacher crate
//! (gjson is read-only; sjson's logic does not ship in this repo), so this
//! module is designed fresh, in gjson's byte-cursor idiom: walk the path
//! with the same `scanner` primitives `query` uses, then emit exactly one
//! [`Splice`] describing the edit rather than rebuilding the document
//! node-by-node.

use crate::error::Error;
use crate::path::{self, CompiledPath, PathSegment};
use crate::scanner;
use crate::value::{encode, Value as SetValue};

/// One replace/insert/delete region against the original buffer.
#[derive(Debug, Clone)]
pub struct Splice {
    pub at: usize,
    pub delete_len: usize,
    pub insert: Vec<u8>,
}

/// A fully resolved edit, ready to apply to the source text. `Set` and
/// `Delete` each currently produce a single-`Splice` plan; the type stays
/// a `Vec` so a future batched-edit entry point can reuse [`MutationPlan::apply`].
#[derive(Debug, Clone, Default)]
pub struct MutationPlan {
    pub splices: Vec<Splice>,
}

impl MutationPlan {
    pub fn apply(&self, json: &str) -> String {
        let bytes = json.as_bytes();
        let mut out = Vec::with_capacity(json.len() + self.splices.iter().map(|s| s.insert.len()).sum::<usize>());
        let mut cursor = 0usize;
        for s in &self.splices {
            out.extend_from_slice(&bytes[cursor..s.at]);
            out.extend_from_slice(&s.insert);
            cursor = s.at + s.delete_len;
        }
        out.extend_from_slice(&bytes[cursor..]);
        String::from_utf8(out).unwrap_or_default()
    }
}

/// Controls how `Set` resolves an existing container value at the target
/// path. All default to `false`/plain-replace.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// When the existing and new values are both objects, union their keys
    /// instead of replacing wholesale (new value's keys win on conflict).
    pub merge_objects: bool,
    /// When the existing and new values are both arrays, concatenate
    /// instead of replacing wholesale.
    pub merge_arrays: bool,
    /// Advisory only: when the new encoding is exactly as long as the
    /// region it replaces, this hints that an in-place byte overwrite would
    /// suffice. The splice path always reconstructs a fresh buffer either
    /// way, so this changes nothing observable — see DESIGN.md.
    pub replace_in_place: bool,
}

pub fn set(json: &str, path: &str, value: &SetValue) -> Result<String, Error> {
    set_with_options(json, path, value, &SetOptions::default())
}

pub fn set_with_options(
    json: &str,
    path: &str,
    value: &SetValue,
    opts: &SetOptions,
) -> Result<String, Error> {
    let compiled = path::compile(path);
    set_with_compiled_path(json, &compiled, value, opts)
}

pub fn set_with_compiled_path(
    json: &str,
    compiled: &CompiledPath,
    value: &SetValue,
    opts: &SetOptions,
) -> Result<String, Error> {
    let value_bytes = encode(value)?;
    if compiled.segments.is_empty() {
        log::trace!("set: empty path replaces the whole document");
        return String::from_utf8(value_bytes)
            .map_err(|_| Error::InvalidValue { reason: "non-utf8 encoding".into() });
    }
    only_plain(&compiled.segments)?;
    let bytes = json.as_bytes();
    let start = scanner::skip_whitespace(bytes, 0);
    let (at, end, insert) = build_splice(bytes, start, &compiled.segments, &value_bytes, opts)?;
    log::debug!("set: splice at {at}, delete_len {}, insert_len {}", end - at, insert.len());
    let plan = MutationPlan {
        splices: vec![Splice {
            at,
            delete_len: end - at,
            insert,
        }],
    };
    Ok(plan.apply(json))
}

pub fn delete(json: &str, path: &str) -> Result<String, Error> {
    let compiled = path::compile(path);
    if compiled.segments.is_empty() {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "empty path cannot be deleted".into(),
        });
    }
    only_plain(&compiled.segments)?;
    let bytes = json.as_bytes();
    let start = scanner::skip_whitespace(bytes, 0);
    let (del_start, del_end) = locate_for_delete(bytes, start, &compiled.segments, path)?;
    let (at, end) = adjust_delete_range(bytes, del_start, del_end);
    log::debug!("delete {path:?}: removing bytes {at}..{end}");
    let plan = MutationPlan {
        splices: vec![Splice {
            at,
            delete_len: end - at,
            insert: Vec::new(),
        }],
    };
    Ok(plan.apply(json))
}

fn only_plain(segments: &[PathSegment]) -> Result<(), Error> {
    for s in segments {
        match s {
            PathSegment::Key { .. } | PathSegment::Index(_) => {}
            _ => {
                return Err(Error::InvalidPath {
                    path: String::new(),
                    reason: "only plain key/index segments are settable".into(),
                })
            }
        }
    }
    Ok(())
}

fn kind_name(bytes: &[u8], vstart: usize) -> &'static str {
    match bytes.get(vstart) {
        Some(b'"') => "string",
        Some(b'{') => "object",
        Some(b'[') => "array",
        Some(b't') | Some(b'f') => "bool",
        Some(b'n') => "null",
        Some(b'-') | Some(b'0'..=b'9') => "number",
        _ => "unknown",
    }
}

fn array_len(bytes: &[u8], arr_start: usize) -> usize {
    let mut count = 0usize;
    scanner::for_each_member(bytes, arr_start, false, |_, _, _| {
        count += 1;
        true
    });
    count
}

fn object_nonempty(bytes: &[u8], obj_start: usize) -> bool {
    let i = scanner::skip_whitespace(bytes, obj_start + 1);
    bytes.get(i) != Some(&b'}')
}

fn find_object_insert_point(bytes: &[u8], obj_start: usize) -> Result<usize, Error> {
    let end = scanner::skip_container(bytes, obj_start);
    if end == 0 || bytes.get(end - 1) != Some(&b'}') {
        return Err(Error::InvalidJson {
            at: obj_start,
            reason: "unterminated object".into(),
        });
    }
    Ok(end - 1)
}

fn find_array_insert_point(bytes: &[u8], arr_start: usize) -> Result<usize, Error> {
    let end = scanner::skip_container(bytes, arr_start);
    if end == 0 || bytes.get(end - 1) != Some(&b']') {
        return Err(Error::InvalidJson {
            at: arr_start,
            reason: "unterminated array".into(),
        });
    }
    Ok(end - 1)
}

/// Builds the nested container text for path segments that don't exist
/// yet, e.g. `synthesize([Key("b"), Index(0)], "5")` -> `{"b":[5]}`.
fn synthesize(remaining: &[PathSegment], value_bytes: &[u8]) -> Vec<u8> {
    if remaining.is_empty() {
        return value_bytes.to_vec();
    }
    match &remaining[0] {
        PathSegment::Key { name, .. } => {
            let mut out = vec![b'{'];
            crate::util::extend_json_string(&mut out, name.as_bytes());
            out.push(b':');
            out.extend_from_slice(&synthesize(&remaining[1..], value_bytes));
            out.push(b'}');
            out
        }
        PathSegment::Index(_) => {
            let mut out = vec![b'['];
            out.extend_from_slice(&synthesize(&remaining[1..], value_bytes));
            out.push(b']');
            out
        }
        _ => value_bytes.to_vec(),
    }
}

fn value_leads_with(bytes: &[u8], b: u8) -> bool {
    bytes.first() == Some(&b)
}

/// Recursively overlays `new`'s keys onto `old`: a colliding key whose value
/// is an object on both sides is merged in turn; any other collision has the
/// new value win outright. Keys only `old` has are preserved.
fn merge_objects_bytes(old: &[u8], new: &[u8]) -> Vec<u8> {
    let mut order: Vec<String> = Vec::new();
    let mut values: Vec<Vec<u8>> = Vec::new();
    let mut upsert = |key: String, val: Vec<u8>| {
        if let Some(pos) = order.iter().position(|k| k == &key) {
            if value_leads_with(&values[pos], b'{') && value_leads_with(&val, b'{') {
                values[pos] = merge_objects_bytes(&values[pos], &val);
            } else {
                values[pos] = val;
            }
        } else {
            order.push(key);
            values.push(val);
        }
    };
    scanner::for_each_member(old, 0, true, |key_range, vs, ve| {
        if let Some((ks, ke)) = key_range {
            let raw_key = &old[ks..ke];
            let key = crate::util::unescape(std::str::from_utf8(raw_key).unwrap_or(""));
            upsert(key, old[vs..ve].to_vec());
        }
        true
    });
    scanner::for_each_member(new, 0, true, |key_range, vs, ve| {
        if let Some((ks, ke)) = key_range {
            let raw_key = &new[ks..ke];
            let key = crate::util::unescape(std::str::from_utf8(raw_key).unwrap_or(""));
            upsert(key, new[vs..ve].to_vec());
        }
        true
    });
    let mut out = vec![b'{'];
    for (i, (key, val)) in order.iter().zip(values.iter()).enumerate() {
        if i > 0 {
            out.push(b',');
        }
        crate::util::extend_json_string(&mut out, key.as_bytes());
        out.push(b':');
        out.extend_from_slice(val);
    }
    out.push(b'}');
    out
}

fn merge_arrays_bytes(old: &[u8], new: &[u8]) -> Vec<u8> {
    let mut out = vec![b'['];
    let mut count = 0usize;
    scanner::for_each_member(old, 0, false, |_, vs, ve| {
        if count > 0 {
            out.push(b',');
        }
        out.extend_from_slice(&old[vs..ve]);
        count += 1;
        true
    });
    scanner::for_each_member(new, 0, false, |_, vs, ve| {
        if count > 0 {
            out.push(b',');
        }
        out.extend_from_slice(&new[vs..ve]);
        count += 1;
        true
    });
    out.push(b']');
    out
}

/// Returns `(splice_start, splice_end, insert_bytes)`.
fn build_splice(
    bytes: &[u8],
    vstart: usize,
    segments: &[PathSegment],
    value_bytes: &[u8],
    opts: &SetOptions,
) -> Result<(usize, usize, Vec<u8>), Error> {
    match &segments[0] {
        PathSegment::Key { name, .. } => {
            let key = name.as_ref();
            if bytes.get(vstart) != Some(&b'{') {
                return Err(Error::TypeMismatch {
                    path: key.to_string(),
                    expected: "object",
                    found: kind_name(bytes, vstart),
                });
            }
            let found = scanner::locate_key(bytes, vstart, |raw_key, esc| {
                crate::query::key_eq(raw_key, esc, key)
            });
            match found {
                Some((vs, ve)) => {
                    if segments.len() == 1 {
                        replace_existing(bytes, vs, ve, value_bytes, opts)
                    } else {
                        build_splice(bytes, vs, &segments[1..], value_bytes, opts)
                    }
                }
                None => {
                    let insert_pos = find_object_insert_point(bytes, vstart)?;
                    let needs_comma = object_nonempty(bytes, vstart);
                    let mut ins = Vec::new();
                    if needs_comma {
                        ins.push(b',');
                    }
                    crate::util::extend_json_string(&mut ins, key.as_bytes());
                    ins.push(b':');
                    ins.extend_from_slice(&synthesize(&segments[1..], value_bytes));
                    Ok((insert_pos, insert_pos, ins))
                }
            }
        }
        PathSegment::Index(i) => {
            if bytes.get(vstart) != Some(&b'[') {
                return Err(Error::TypeMismatch {
                    path: String::new(),
                    expected: "array",
                    found: kind_name(bytes, vstart),
                });
            }
            let len = array_len(bytes, vstart);
            if *i < 0 {
                return append_to_array(bytes, vstart, len, &segments[1..], value_bytes);
            }
            let idx = *i as usize;
            if idx < len {
                let (vs, ve) = scanner::locate_index(bytes, vstart, idx).unwrap();
                if segments.len() == 1 {
                    replace_existing(bytes, vs, ve, value_bytes, opts)
                } else {
                    build_splice(bytes, vs, &segments[1..], value_bytes, opts)
                }
            } else if idx == len {
                append_to_array(bytes, vstart, len, &segments[1..], value_bytes)
            } else {
                Err(Error::InvalidPath {
                    path: String::new(),
                    reason: format!("index {idx} extends beyond array length {len}"),
                })
            }
        }
        _ => unreachable!("only_plain rejects non key/index segments before build_splice runs"),
    }
}

fn replace_existing(
    bytes: &[u8],
    vs: usize,
    ve: usize,
    value_bytes: &[u8],
    opts: &SetOptions,
) -> Result<(usize, usize, Vec<u8>), Error> {
    if opts.merge_objects && bytes.get(vs) == Some(&b'{') && value_leads_with(value_bytes, b'{') {
        return Ok((vs, ve, merge_objects_bytes(&bytes[vs..ve], value_bytes)));
    }
    if opts.merge_arrays && bytes.get(vs) == Some(&b'[') && value_leads_with(value_bytes, b'[') {
        return Ok((vs, ve, merge_arrays_bytes(&bytes[vs..ve], value_bytes)));
    }
    Ok((vs, ve, value_bytes.to_vec()))
}

fn append_to_array(
    bytes: &[u8],
    arr_start: usize,
    len: usize,
    remaining: &[PathSegment],
    value_bytes: &[u8],
) -> Result<(usize, usize, Vec<u8>), Error> {
    let insert_pos = find_array_insert_point(bytes, arr_start)?;
    let mut ins = Vec::new();
    if len > 0 {
        ins.push(b',');
    }
    ins.extend_from_slice(&synthesize(remaining, value_bytes));
    Ok((insert_pos, insert_pos, ins))
}

fn locate_key_with_key_span(bytes: &[u8], obj_start: usize, target: &str) -> Option<(usize, usize)> {
    let mut i = obj_start + 1;
    loop {
        i = scanner::skip_whitespace(bytes, i);
        if i >= bytes.len() || bytes[i] == b'}' {
            return None;
        }
        if bytes[i] != b'"' {
            return None;
        }
        let key_start = i;
        let key_end = scanner::skip_string(bytes, i);
        let j = scanner::skip_whitespace(bytes, key_end);
        if j >= bytes.len() || bytes[j] != b':' {
            return None;
        }
        let j = scanner::skip_whitespace(bytes, j + 1);
        let (vs, ve) = scanner::value_span(bytes, j);
        let raw_key = &bytes[key_start..key_end];
        let has_escape = raw_key.contains(&b'\\');
        if crate::query::key_eq(raw_key, has_escape, target) {
            return Some((key_start, ve));
        }
        i = scanner::skip_whitespace(bytes, ve);
        if i >= bytes.len() {
            return None;
        }
        if bytes[i] == b',' {
            i += 1;
            continue;
        }
        return None;
    }
}

fn locate_for_delete(
    bytes: &[u8],
    vstart: usize,
    segments: &[PathSegment],
    path: &str,
) -> Result<(usize, usize), Error> {
    let not_found = || Error::PathNotFound {
        path: path.to_string(),
    };
    match &segments[0] {
        PathSegment::Key { name, .. } => {
            if bytes.get(vstart) != Some(&b'{') {
                return Err(not_found());
            }
            if segments.len() == 1 {
                locate_key_with_key_span(bytes, vstart, name.as_ref()).ok_or_else(not_found)
            } else {
                let (vs, _ve) = scanner::locate_key(bytes, vstart, |raw_key, esc| {
                    crate::query::key_eq(raw_key, esc, name.as_ref())
                })
                .ok_or_else(not_found)?;
                locate_for_delete(bytes, vs, &segments[1..], path)
            }
        }
        PathSegment::Index(i) => {
            if bytes.get(vstart) != Some(&b'[') {
                return Err(not_found());
            }
            let len = array_len(bytes, vstart);
            let idx = if *i >= 0 {
                *i as usize
            } else if len > 0 {
                len - 1
            } else {
                return Err(not_found());
            };
            if idx >= len {
                return Err(not_found());
            }
            let (vs, ve) = scanner::locate_index(bytes, vstart, idx).ok_or_else(not_found)?;
            if segments.len() == 1 {
                Ok((vs, ve))
            } else {
                locate_for_delete(bytes, vs, &segments[1..], path)
            }
        }
        _ => unreachable!("only_plain rejects non key/index segments before locate_for_delete runs"),
    }
}

/// Deleting a member must also remove its separating comma, so the
/// remaining document stays syntactically valid: absorb the comma that
/// follows, or if there isn't one (last member), the one that precedes.
fn adjust_delete_range(bytes: &[u8], start: usize, end: usize) -> (usize, usize) {
    let mut k = end;
    while k < bytes.len() && matches!(bytes[k], b' ' | b'\t' | b'\n' | b'\r') {
        k += 1;
    }
    if k < bytes.len() && bytes[k] == b',' {
        return (start, k + 1);
    }
    let mut k = start;
    while k > 0 && matches!(bytes[k - 1], b' ' | b'\t' | b'\n' | b'\r') {
        k -= 1;
    }
    if k > 0 && bytes[k - 1] == b',' {
        return (k - 1, end);
    }
    (start, end)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value as SetValue;

    #[test]
    fn set_existing_key() {
        let out = set(r#"{"name":"John","age":30}"#, "name", &SetValue::from("Jane")).unwrap();
        assert_eq!(out, r#"{"name":"Jane","age":30}"#);
    }

    #[test]
    fn set_adds_nested_key() {
        let out = set(r#"{"a":{}}"#, "a.b.c", &SetValue::from(5i64)).unwrap();
        assert_eq!(out, r#"{"a":{"b":{"c":5}}}"#);
    }

    #[test]
    fn set_appends_to_array() {
        let out = set(r#"{"items":[1,2]}"#, "items.-1", &SetValue::from(3i64)).unwrap();
        assert_eq!(out, r#"{"items":[1,2,3]}"#);
    }

    #[test]
    fn set_rejects_out_of_range_index() {
        let err = set(r#"{"items":[1,2]}"#, "items.5", &SetValue::from(3i64)).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn delete_removes_key_and_comma() {
        let out = delete(r#"{"a":1,"b":2,"c":3}"#, "b").unwrap();
        assert_eq!(out, r#"{"a":1,"c":3}"#);
    }

    #[test]
    fn delete_last_member_absorbs_preceding_comma() {
        let out = delete(r#"{"a":1,"b":2}"#, "b").unwrap();
        assert_eq!(out, r#"{"a":1}"#);
    }

    #[test]
    fn delete_missing_errors() {
        let err = delete(r#"{"a":1}"#, "z").unwrap_err();
        assert!(matches!(err, Error::PathNotFound { .. }));
    }

    #[test]
    fn delete_is_idempotent_on_reapply_error() {
        let out = delete(r#"{"a":1,"b":2}"#, "b").unwrap();
        assert!(delete(&out, "b").is_err());
    }

    #[test]
    fn merge_objects_recurses_into_nested_collision() {
        let mut replacement = indexmap::IndexMap::new();
        replacement.insert("z".to_string(), SetValue::Number(3.0));
        let opts = SetOptions {
            merge_objects: true,
            ..SetOptions::default()
        };
        let out = set_with_options(
            r#"{"a":{"x":1,"y":2}}"#,
            "a",
            &SetValue::Object(replacement),
            &opts,
        )
        .unwrap();
        assert_eq!(out, r#"{"a":{"x":1,"y":2,"z":3}}"#);
    }
}
