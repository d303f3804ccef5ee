// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

//! String-escaping helpers shared by the query and mutation engines,
//! re-exported for callers that want to build their own path-adjacent
//! tooling (e.g. constructing a literal for a filter expression).

pub use super::util::{escape, unescape};
pub use super::valid::valid;
