// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

//! Byte-level JSON query and mutation: `Get` reads a path expression
//! straight off a `&str` without building a parse tree; `Set`/`Delete`
//! edit it the same way, emitting a single spliced buffer.
//!
//! ```
//! let doc = r#"{"name":"John","age":30}"#;
//! assert_eq!(jsonray::get(doc, "name").str(), "John");
//! ```

mod error;
mod modifiers;
mod mutation;
mod path;
mod query;
mod scanner;
pub mod tools;
mod util;
mod valid;
mod value;

pub use error::Error;
pub use mutation::{set, set_with_options, Splice, MutationPlan, SetOptions};
pub use path::{compile, CompiledPath};
pub use query::{get, get_compiled, get_many, parse, Kind, Value};
pub use valid::valid;
pub use value::Value as SetValue;

/// `Set` with an already-[`compile`]d path, letting callers reuse a
/// compiled path across repeated mutations on the same shape of document.
pub fn set_with_compiled_path(
    json: &str,
    compiled: &CompiledPath,
    value: &SetValue,
    opts: &SetOptions,
) -> Result<String, Error> {
    mutation::set_with_compiled_path(json, compiled, value, opts)
}

pub fn delete(json: &str, path: &str) -> Result<String, Error> {
    mutation::delete(json, path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn readme_get_example() {
        let doc = r#"{"name":"John","age":30}"#;
        assert_eq!(get(doc, "name").str(), "John");
    }

    #[test]
    fn readme_set_example() {
        let doc = r#"{"name":"John"}"#;
        let out = set(doc, "age", &SetValue::from(31i64)).unwrap();
        assert_eq!(get(&out, "age").f64(), 31.0);
    }

    #[test]
    fn readme_delete_example() {
        let doc = r#"{"name":"John","age":30}"#;
        let out = delete(doc, "age").unwrap();
        assert!(!get(&out, "age").exists());
    }
}
