// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

//! The `@name` / `@name:arg` pipeline. Every modifier takes the current
//! [`Value`] and produces a new one; unsupported input (wrong kind, empty
//! array) always degrades to [`Kind::Undefined`] rather than erroring —
//! `Get` never fails.

use crate::query::{owned_of, Kind, Value};
use std::cmp::Ordering;

pub fn apply<'a>(name: &str, arg: &str, value: &'a Value<'a>) -> Value<'a> {
    match name {
        "reverse" => reverse(value),
        "sort" => sort(value, arg),
        "distinct" => distinct(value),
        "flatten" => flatten(value, arg),
        "first" => first(value),
        "last" => last(value),
        "sum" => reduce(value, Reduce::Sum),
        "avg" => reduce(value, Reduce::Avg),
        "min" => reduce(value, Reduce::Min),
        "max" => reduce(value, Reduce::Max),
        "group" => group(value),
        "this" => value.clone(),
        "valid" => valid(value),
        "pretty" | "ugly" => value.clone(),
        _ => Value::undefined(),
    }
}

fn elements<'a>(value: &'a Value<'a>) -> Option<Vec<Value<'a>>> {
    if value.kind() == Kind::Array {
        Some(value.array())
    } else {
        None
    }
}

fn encode_array<'a>(items: &[Value<'_>]) -> Value<'a> {
    let mut out = vec![b'['];
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(v.raw().as_bytes());
    }
    out.push(b']');
    owned_of(Kind::Array, String::from_utf8(out).unwrap_or_default())
}

fn reverse<'a>(value: &'a Value<'a>) -> Value<'a> {
    match elements(value) {
        Some(mut items) => {
            items.reverse();
            encode_array(&items)
        }
        None => Value::undefined(),
    }
}

fn sort<'a>(value: &'a Value<'a>, arg: &str) -> Value<'a> {
    match elements(value) {
        Some(mut items) => {
            let all_numeric = items.iter().all(|v| v.kind() == Kind::Number);
            if all_numeric {
                items.sort_by(|a, b| a.f64().partial_cmp(&b.f64()).unwrap_or(Ordering::Equal));
            } else {
                items.sort_by(|a, b| a.str().cmp(&b.str()));
            }
            if arg == "desc" {
                items.reverse();
            }
            encode_array(&items)
        }
        None => Value::undefined(),
    }
}

fn distinct<'a>(value: &'a Value<'a>) -> Value<'a> {
    match elements(value) {
        Some(items) => {
            let mut seen: Vec<String> = Vec::new();
            let mut out = Vec::new();
            for v in items {
                let key = v.raw().to_string();
                if !seen.contains(&key) {
                    seen.push(key);
                    out.push(v);
                }
            }
            encode_array(&out)
        }
        None => Value::undefined(),
    }
}

fn flatten<'a>(value: &'a Value<'a>, arg: &str) -> Value<'a> {
    let deep = arg == "deep";
    match elements(value) {
        Some(items) => {
            let mut out = Vec::new();
            flatten_into(&items, deep, &mut out);
            encode_array(&out)
        }
        None => Value::undefined(),
    }
}

fn flatten_into<'a>(items: &[Value<'a>], deep: bool, out: &mut Vec<Value<'a>>) {
    for v in items {
        if v.kind() == Kind::Array {
            let nested = v.array();
            if deep {
                flatten_into(&nested, deep, out);
            } else {
                out.extend(nested);
            }
        } else {
            out.push(v.clone());
        }
    }
}

fn first<'a>(value: &'a Value<'a>) -> Value<'a> {
    match elements(value) {
        Some(items) => items.into_iter().next().unwrap_or_else(Value::undefined),
        None => Value::undefined(),
    }
}

fn last<'a>(value: &'a Value<'a>) -> Value<'a> {
    match elements(value) {
        Some(items) => items.into_iter().last().unwrap_or_else(Value::undefined),
        None => Value::undefined(),
    }
}

enum Reduce {
    Sum,
    Avg,
    Min,
    Max,
}

fn reduce<'a>(value: &'a Value<'a>, kind: Reduce) -> Value<'a> {
    match elements(value) {
        Some(items) if !items.is_empty() => {
            // Numbers always count; strings count too if they parse as a
            // number ("numeric coercions" per the modifier table) — anything
            // else (bool, null, object, array, non-numeric string) is skipped.
            let nums: Vec<f64> = items
                .iter()
                .filter_map(|v| match v.kind() {
                    Kind::Number => Some(v.f64()),
                    Kind::String => v.str().parse::<f64>().ok(),
                    _ => None,
                })
                .collect();
            if nums.is_empty() {
                return Value::undefined();
            }
            let result = match kind {
                Reduce::Sum => nums.iter().sum(),
                Reduce::Avg => nums.iter().sum::<f64>() / nums.len() as f64,
                Reduce::Min => nums.iter().cloned().fold(f64::INFINITY, f64::min),
                Reduce::Max => nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            };
            Value::number(result)
        }
        _ => Value::undefined(),
    }
}

/// Transposes an array of arrays, e.g. `[[1,2],[3,4]]` -> `[[1,3],[2,4]]`.
/// Undefined unless every element is itself an array.
fn group<'a>(value: &'a Value<'a>) -> Value<'a> {
    match elements(value) {
        Some(items) if !items.is_empty() && items.iter().all(|v| v.kind() == Kind::Array) => {
            let rows: Vec<Vec<Value<'a>>> = items.iter().map(|v| v.array()).collect();
            let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
            let mut columns = Vec::with_capacity(width);
            for col in 0..width {
                let column: Vec<Value<'a>> = rows
                    .iter()
                    .filter_map(|row| row.get(col).cloned())
                    .collect();
                columns.push(encode_array(&column));
            }
            encode_array(&columns)
        }
        _ => Value::undefined(),
    }
}

fn valid<'a>(value: &'a Value<'a>) -> Value<'a> {
    if crate::valid::valid(value.raw().as_bytes()) {
        value.clone()
    } else {
        Value::undefined()
    }
}
