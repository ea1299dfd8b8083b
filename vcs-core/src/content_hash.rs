// Copyright 2026 The vcs-core Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Content-addressing for [`crate::op_store::Operation`] and
//! [`crate::op_store::View`] records.
//!
//! These records are already serde-`Serialize` documents stored as JSON
//! (see [`crate::storage`]), so content-hashing them canonically (sorted map
//! keys, via [`serde_json::to_vec`] over a `BTreeMap`-backed value) is
//! simpler than hashing each field's bytes directly, and gives the same
//! guarantee: two semantically identical records hash identically.

use blake2::Blake2b512;
use blake2::Digest as _;
use serde::Serialize;

/// A type whose values can be deterministically content-hashed.
pub trait ContentHash {
    /// Returns the hex-encoded Blake2b-512 digest of the canonical encoding.
    fn content_hash(&self) -> String;
}

impl<T> ContentHash for T
where
    T: Serialize,
{
    fn content_hash(&self) -> String {
        let canonical = to_canonical_value(self);
        let bytes = serde_json::to_vec(&canonical).expect("canonical value always serializes");
        blake2b_hash(&bytes)
    }
}

/// Re-serializes through `serde_json::Value`, which sorts object keys,
/// giving a canonical byte representation independent of struct field order.
fn to_canonical_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).expect("value is JSON-representable")
}

/// Hex-encoded Blake2b-512 digest of arbitrary bytes.
pub fn blake2b_hash(data: &[u8]) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Point {
        y: i32,
        x: i32,
    }

    #[test]
    fn field_order_does_not_affect_hash() {
        #[derive(Serialize)]
        struct PointAlt {
            x: i32,
            y: i32,
        }
        let a = Point { y: 2, x: 1 };
        let b = PointAlt { x: 1, y: 2 };
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn different_values_hash_differently() {
        let a = Point { x: 1, y: 2 };
        let b = Point { x: 1, y: 3 };
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
