// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

//! Path expression compiler.
//!
//! `compile` turns a path string into a [`CompiledPath`]: an ordered list of
//! [`PathSegment`]s plus a small set of precomputed flags. Unlike gjson's own
//! `Path`, which recomputes the next component lazily on every call, this
//! walks the string once and keeps the whole chain around — `Get` can still
//! take the scanner straight through the source without ever building this
//! for short, plain paths (see [`crate::query::FAST_PATH_THRESHOLD`]), but
//! `SetWithCompiledPath` and repeated `Get` calls over the same path get to
//! reuse the work.

use std::borrow::Cow;

/// One parsed element of a path.
#[derive(Debug, Clone)]
pub enum PathSegment<'a> {
    /// Object-member access. `escaped` flags that `name` required unescaping
    /// `\\`/`\.`/`\|`/`\#`/`\@`/`\*`/`\?` out of the source text.
    Key { name: Cow<'a, str>, escaped: bool },
    /// Array element. `-1` denotes "append" (meaningful only for `Set`).
    Index(i64),
    /// `*`/`?` glob matched against every key at this level.
    Wildcard(&'a str),
    /// The `#` token when more segments follow: project over every element.
    ArrayAll,
    /// The `#` token as the final segment: produce the element count.
    ArrayCount,
    /// `#(subpath op literal)`, optionally written `#(...)#`. Both forms
    /// collect every matching element into an array here — per this
    /// engine's no-short-circuit filter guarantee the trailing `#` is
    /// accepted as a syntax variant but does not change behavior.
    Filter {
        subpath: &'a str,
        op: FilterOp,
        literal: Option<FilterLiteral>,
    },
    /// `@name` or `@name:arg`.
    Modifier { name: &'a str, arg: Option<&'a str> },
    /// Top-level comma-separated list, or a bracketed `{..}`/`[..]` form.
    /// `{..}` branches may carry a `label:` prefix and produce an object;
    /// everything else produces an array.
    Multipath(Vec<MultipathBranch<'a>>),
}

#[derive(Debug, Clone)]
pub struct MultipathBranch<'a> {
    pub label: Option<String>,
    pub path: CompiledPath<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Exists,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Glob,
    NotGlob,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterLiteral {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Raw(String),
}

/// Ordered segment list plus flags the query/mutation engines use to pick
/// fast paths.
#[derive(Debug, Clone)]
pub struct CompiledPath<'a> {
    pub segments: Vec<PathSegment<'a>>,
    pub has_wildcards: bool,
    pub has_filters: bool,
    pub is_single_literal: bool,
}

/// Compile a path string into an ordered segment list.
pub fn compile<'a>(path: &'a str) -> CompiledPath<'a> {
    let segments = if path.is_empty() {
        Vec::new()
    } else if path.as_bytes()[0] == b'{' || path.as_bytes()[0] == b'[' {
        compile_bracketed_or_chain(path)
    } else if has_top_level_byte(path, b',') {
        vec![PathSegment::Multipath(
            split_top_level(path, b',')
                .into_iter()
                .map(|p| MultipathBranch {
                    label: None,
                    path: compile(p),
                })
                .collect(),
        )]
    } else {
        compile_chain(path)
    };
    finalize(segments)
}

fn compile_bracketed_or_chain<'a>(path: &'a str) -> Vec<PathSegment<'a>> {
    let close = match find_matching_bracket(path.as_bytes(), 0) {
        Some(i) => i,
        None => return compile_chain(path),
    };
    let is_object = path.as_bytes()[0] == b'{';
    let inner = &path[1..close];
    let branches: Vec<MultipathBranch<'a>> = split_top_level(inner, b',')
        .into_iter()
        .filter(|b| !b.is_empty())
        .map(|branch| {
            if is_object {
                if let Some(ci) = find_unescaped(branch, b':') {
                    let label = unescape_key(&branch[..ci]);
                    return MultipathBranch {
                        label: Some(label),
                        path: compile(&branch[ci + 1..]),
                    };
                }
                MultipathBranch {
                    label: Some(auto_label(branch)),
                    path: compile(branch),
                }
            } else {
                MultipathBranch {
                    label: None,
                    path: compile(branch),
                }
            }
        })
        .collect();
    let mut segments = vec![PathSegment::Multipath(branches)];
    let rest = &path[close + 1..];
    if !rest.is_empty() {
        // rest begins with the separator that followed the closing bracket.
        let rest = &rest[1..];
        if !rest.is_empty() {
            segments.extend(compile_chain(rest));
        }
    }
    segments
}

fn auto_label(path_text: &str) -> String {
    let bytes = path_text.as_bytes();
    let mut i = bytes.len();
    while i > 0 {
        let b = bytes[i - 1];
        if (b == b'.' || b == b'|') && (i < 2 || bytes[i - 2] != b'\\') {
            break;
        }
        i -= 1;
    }
    let last = &path_text[i..];
    if is_simple_label(last) {
        last.to_string()
    } else {
        "_".to_string()
    }
}

fn is_simple_label(s: &str) -> bool {
    s.bytes()
        .all(|b| !matches!(b, b'[' | b']' | b'{' | b'}' | b'(' | b')' | b'#' | b'|' | b':') && b >= b' ')
}

fn compile_chain<'a>(path: &'a str) -> Vec<PathSegment<'a>> {
    let mut segments = Vec::new();
    let mut rest = path;
    while !rest.is_empty() {
        let (tok, next) = next_token(rest);
        if !tok.is_empty() {
            segments.push(token_to_segment(tok));
        }
        rest = next;
    }
    segments
}

fn finalize<'a>(mut segments: Vec<PathSegment<'a>>) -> CompiledPath<'a> {
    if let Some(last) = segments.last_mut() {
        if matches!(last, PathSegment::ArrayAll) {
            *last = PathSegment::ArrayCount;
        }
    }
    let has_wildcards = segments
        .iter()
        .any(|s| matches!(s, PathSegment::Wildcard(_) | PathSegment::ArrayAll));
    let has_filters = segments.iter().any(|s| matches!(s, PathSegment::Filter { .. }));
    let is_single_literal = segments.len() == 1
        && matches!(&segments[0], PathSegment::Key { escaped, .. } if !escaped)
        && !has_wildcards;
    CompiledPath {
        segments,
        has_wildcards,
        has_filters,
        is_single_literal,
    }
}

/// Splits `tok` (one segment's worth of text) into the right [`PathSegment`].
/// `#` alone always starts life as `ArrayAll`; `finalize` downgrades a
/// trailing one to `ArrayCount`.
fn token_to_segment<'a>(tok: &'a str) -> PathSegment<'a> {
    if let Some(rest) = tok.strip_prefix('@') {
        return match find_unescaped(rest, b':') {
            Some(i) => PathSegment::Modifier {
                name: &rest[..i],
                arg: Some(&rest[i + 1..]),
            },
            None => PathSegment::Modifier {
                name: rest,
                arg: None,
            },
        };
    }
    if tok == "#" {
        return PathSegment::ArrayAll;
    }
    if tok.starts_with("#(") {
        return parse_filter(tok);
    }
    if tok.as_bytes()[0] == b'{' {
        // A bracketed multipath that appears mid-chain (rare but legal).
        let segs = compile_bracketed_or_chain(tok);
        if segs.len() == 1 {
            return segs.into_iter().next().unwrap();
        }
        return PathSegment::Multipath(vec![MultipathBranch {
            label: None,
            path: finalize(segs),
        }]);
    }
    if tok.as_bytes()[0] == b'[' && tok.as_bytes()[tok.len() - 1] == b']' {
        // `[…]` is just the separator made visible around its token, so
        // `tags[0]` parses identically to `tags.0`.
        let inner = &tok[1..tok.len() - 1];
        if inner.is_empty() {
            return PathSegment::Key {
                name: Cow::Borrowed(inner),
                escaped: false,
            };
        }
        return token_to_segment(inner);
    }
    if let Some(n) = parse_index(tok) {
        return PathSegment::Index(n);
    }
    if contains_unescaped_glob(tok) {
        return PathSegment::Wildcard(tok);
    }
    let escaped = tok.as_bytes().contains(&b'\\');
    let name = if escaped {
        Cow::Owned(unescape_key(tok))
    } else {
        Cow::Borrowed(tok)
    };
    PathSegment::Key { name, escaped }
}

fn parse_index(tok: &str) -> Option<i64> {
    if tok == "-1" {
        return Some(-1);
    }
    if tok.bytes().all(|b| b.is_ascii_digit()) && !tok.is_empty() {
        return tok.parse::<i64>().ok();
    }
    None
}

fn contains_unescaped_glob(tok: &str) -> bool {
    let bytes = tok.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == b'*' || bytes[i] == b'?' {
            return true;
        }
        i += 1;
    }
    false
}

/// Finds the next top-level `.`/`|`-separated token. Returns the token text
/// (separator stripped) and the remainder of the path (also separator
/// stripped). `#(...)`/`#(...)#` and bracketed multipaths are consumed as a
/// single token even though they may contain `.`/`|` internally.
fn next_token<'a>(path: &'a str) -> (&'a str, &'a str) {
    let bytes = path.as_bytes();
    if bytes[0] == b'#' && bytes.len() > 1 && bytes[1] == b'(' {
        if let Some(close) = find_matching_paren(bytes, 1) {
            let mut end = close + 1;
            if end < bytes.len() && bytes[end] == b'#' {
                end += 1;
            }
            return split_at_sep(path, end);
        }
    }
    if bytes[0] == b'{' || bytes[0] == b'[' {
        if let Some(close) = find_matching_bracket(bytes, 0) {
            return split_at_sep(path, close + 1);
        }
    }
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'.' | b'|' => {
                return (&path[..i], &path[i + 1..]);
            }
            b'[' if i > 0 => {
                return (&path[..i], &path[i..]);
            }
            _ => {}
        }
        i += 1;
    }
    (path, "")
}

fn split_at_sep<'a>(path: &'a str, end: usize) -> (&'a str, &'a str) {
    let bytes = path.as_bytes();
    if end < bytes.len() && (bytes[end] == b'.' || bytes[end] == b'|') {
        (&path[..end], &path[end + 1..])
    } else {
        (&path[..end.min(path.len())], &path[end.min(path.len())..])
    }
}

fn parse_filter<'a>(tok: &'a str) -> PathSegment<'a> {
    let bytes = tok.as_bytes();
    let inner_end = if bytes[bytes.len() - 1] == b'#' {
        bytes.len() - 2
    } else {
        bytes.len() - 1
    };
    let inner = trim(&tok[2..inner_end]);
    match find_top_level_operator(inner) {
        Some((lh, op, rh)) => PathSegment::Filter {
            subpath: lh,
            op,
            literal: Some(parse_literal(rh)),
        },
        None => PathSegment::Filter {
            subpath: inner,
            op: FilterOp::Exists,
            literal: None,
        },
    }
}

fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c == ' ' || c == '\t' || c == '\r' || c == '\n')
}

fn find_top_level_operator<'a>(query: &'a str) -> Option<(&'a str, FilterOp, &'a str)> {
    let bytes = query.as_bytes();
    let mut i = 0;
    let mut depth = 0i32;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                i += 1;
                continue;
            }
            b')' | b']' | b'}' => {
                depth -= 1;
                i += 1;
                continue;
            }
            _ if depth > 0 => {
                i += 1;
                continue;
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
                continue;
            }
            _ => {}
        }
        let (op, len) = match bytes[i] {
            b'=' if i + 1 < bytes.len() && bytes[i + 1] == b'=' => (FilterOp::Eq, 2),
            b'!' if i + 1 < bytes.len() && bytes[i + 1] == b'=' => (FilterOp::Ne, 2),
            b'!' if i + 1 < bytes.len() && bytes[i + 1] == b'%' => (FilterOp::NotGlob, 2),
            b'<' if i + 1 < bytes.len() && bytes[i + 1] == b'=' => (FilterOp::Le, 2),
            b'>' if i + 1 < bytes.len() && bytes[i + 1] == b'=' => (FilterOp::Ge, 2),
            b'<' => (FilterOp::Lt, 1),
            b'>' => (FilterOp::Gt, 1),
            b'%' => (FilterOp::Glob, 1),
            _ => {
                i += 1;
                continue;
            }
        };
        let lh = trim(&query[..i]);
        let rh = trim(&query[i + len..]);
        return Some((lh, op, rh));
    }
    None
}

fn parse_literal(rh: &str) -> FilterLiteral {
    if rh == "true" {
        return FilterLiteral::Bool(true);
    }
    if rh == "false" {
        return FilterLiteral::Bool(false);
    }
    if rh == "null" {
        return FilterLiteral::Null;
    }
    if rh.len() >= 2 && rh.as_bytes()[0] == b'"' && rh.as_bytes()[rh.len() - 1] == b'"' {
        return FilterLiteral::Str(crate::util::unescape(rh));
    }
    if let Ok(n) = rh.parse::<f64>() {
        return FilterLiteral::Number(n);
    }
    FilterLiteral::Raw(rh.to_string())
}

/// Splits `s` on `sep` at bracket/paren depth 0, outside quotes, and not
/// escaped. Used for multipath comma-splitting.
pub fn split_top_level<'a>(s: &'a str, sep: u8) -> Vec<&'a str> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut depth = 0i32;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b if b == sep && depth == 0 => {
                out.push(&s[start..i]);
                start = i + 1;
                i += 1;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    out.push(&s[start..]);
    out
}

fn has_top_level_byte(s: &str, byte: u8) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut depth = 0i32;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b if b == byte && depth == 0 => return true,
            _ => {}
        }
        i += 1;
    }
    false
}

fn find_unescaped(s: &str, byte: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == byte {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// `bytes[open]` must be `(`. Returns the index of the matching `)`,
/// quote-aware, supporting nested parens/brackets/braces.
fn find_matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    find_matching(bytes, open, b'(', b')')
}

/// `bytes[open]` must be `{` or `[`. Returns the index of the matching
/// close, quote-aware, supporting nested containers of any bracket kind.
fn find_matching_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let close = if bytes[open] == b'{' { b'}' } else { b']' };
    find_matching(bytes, open, bytes[open], close)
}

fn find_matching(bytes: &[u8], open: usize, open_b: u8, close_b: u8) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
                continue;
            }
            b if b == open_b => depth += 1,
            b if b == close_b => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Decodes `\\`, `\.`, `\|`, `\#`, `\@`, `\*`, `\?` out of a key or label.
pub fn unescape_key(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            out.push(bytes[i + 1] as char);
            i += 2;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simple_chain() {
        let p = compile("name.last");
        assert_eq!(p.segments.len(), 2);
        assert!(p.is_single_literal == false);
        match &p.segments[0] {
            PathSegment::Key { name, .. } => assert_eq!(name, "name"),
            _ => panic!("expected key"),
        }
    }

    #[test]
    fn single_literal() {
        let p = compile("age");
        assert!(p.is_single_literal);
    }

    #[test]
    fn array_count_vs_all() {
        let p = compile("items.#");
        assert!(matches!(p.segments[1], PathSegment::ArrayCount));
        let p = compile("items.#.first");
        assert!(matches!(p.segments[1], PathSegment::ArrayAll));
    }

    #[test]
    fn filter() {
        let p = compile("items.#(id==1)");
        match &p.segments[1] {
            PathSegment::Filter { subpath, op, literal } => {
                assert_eq!(*subpath, "id");
                assert_eq!(*op, FilterOp::Eq);
                assert_eq!(*literal, Some(FilterLiteral::Number(1.0)));
            }
            _ => panic!("expected filter"),
        }
    }

    #[test]
    fn modifier_with_arg() {
        let p = compile("nums|@sort:desc");
        match &p.segments[1] {
            PathSegment::Modifier { name, arg } => {
                assert_eq!(*name, "sort");
                assert_eq!(*arg, Some("desc"));
            }
            _ => panic!("expected modifier"),
        }
    }

    #[test]
    fn bare_multipath() {
        let p = compile("u.n,m.a,m.s,missing");
        match &p.segments[0] {
            PathSegment::Multipath(branches) => assert_eq!(branches.len(), 4),
            _ => panic!("expected multipath"),
        }
    }

    #[test]
    fn wildcard() {
        let p = compile("child*.2");
        assert!(p.has_wildcards);
    }

    #[test]
    fn bracket_index_is_sugar_for_dot() {
        let bracketed = compile("items[1].tags[0]");
        let dotted = compile("items.1.tags.0");
        assert_eq!(bracketed.segments.len(), dotted.segments.len());
        assert!(matches!(bracketed.segments[0], PathSegment::Key { .. }));
        assert!(matches!(bracketed.segments[1], PathSegment::Index(1)));
        assert!(matches!(bracketed.segments[2], PathSegment::Key { .. }));
        assert!(matches!(bracketed.segments[3], PathSegment::Index(0)));
    }

    #[test]
    fn bracket_key_name() {
        let p = compile("a[b]");
        assert_eq!(p.segments.len(), 2);
        match &p.segments[1] {
            PathSegment::Key { name, .. } => assert_eq!(name, "b"),
            _ => panic!("expected key"),
        }
    }
}
