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

//! Content-addressed identifier types: [`ChangeId`], [`CommitId`],
//! [`OperationId`], [`ViewId`].
//!
//! Each id kind has its own fixed hex length, but the byte vector
//! representation and the `id_type!` macro generating it are shared.

use std::fmt;
use std::fmt::Debug;

use crate::hex_util;

/// Common behavior of a content-addressed id: conversion to/from bytes and
/// hex.
pub trait ObjectId {
    fn object_type(&self) -> String;
    fn as_bytes(&self) -> &[u8];
    fn to_bytes(&self) -> Vec<u8>;
    fn hex(&self) -> String;
}

/// Defines a new newtype wrapping a byte vector, with the `ObjectId`
/// boilerplate (hex encode/decode, `Display`, `Debug`, `serde::Serialize`).
macro_rules! id_type {
    ($(#[$attr:meta])* $vis:vis $name:ident) => {
        $(#[$attr])*
        #[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
        $vis struct $name(Vec<u8>);

        impl $name {
            pub fn new(value: Vec<u8>) -> Self {
                Self(value)
            }

            pub fn from_bytes(bytes: &[u8]) -> Self {
                Self(bytes.to_vec())
            }

            /// Parses a hex string known to be valid. Panics otherwise; use
            /// this only for literals.
            pub fn from_hex(hex: &str) -> Self {
                Self::try_from_hex(hex).expect("valid hex literal")
            }

            pub fn try_from_hex(hex: impl AsRef<[u8]>) -> Option<Self> {
                $crate::hex_util::decode_hex(hex).map(Self)
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.hex()).finish()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.pad(&self.hex())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.hex().serialize(serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let hex = String::deserialize(deserializer)?;
                Self::try_from_hex(&hex).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid hex id: {hex}"))
                })
            }
        }

        impl crate::object_id::ObjectId for $name {
            fn object_type(&self) -> String {
                stringify!($name).strip_suffix("Id").unwrap_or(stringify!($name)).to_ascii_lowercase()
            }

            fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            fn to_bytes(&self) -> Vec<u8> {
                self.0.clone()
            }

            fn hex(&self) -> String {
                $crate::hex_util::encode_hex(&self.0)
            }
        }
    };
}
pub(crate) use id_type;

id_type!(
    /// Stable identifier for a [`crate::change::Change`]. Survives amend,
    /// rebase, squash, split, and metaedit. 128 bits / 32 hex characters.
    pub ChangeId
);
id_type!(
    /// Git commit hash backing a change's content. Mutable across rewrites;
    /// 160 bits / 40 hex characters (Git SHA-1).
    pub CommitId
);
id_type!(
    /// Content hash of an [`crate::op_store::Operation`] record. 512 bits /
    /// 128 hex characters.
    pub OperationId
);
id_type!(
    /// Content hash of a [`crate::op_store::View`]. 512 bits / 128 hex
    /// characters; identical views share a `ViewId`.
    pub ViewId
);

/// `0` repeated 40 times: the sentinel "not yet backed by a commit" /
/// "empty tree" `CommitId`/tree hash.
pub fn zero_commit_id() -> CommitId {
    CommitId::from_bytes(&[0u8; 20])
}

/// A hex prefix of an [`ObjectId`], used to resolve short ids (e.g. `jj`-style
/// `abc123` revision arguments) against the full id space.
#[derive(Clone, PartialEq, Eq)]
pub struct HexPrefix {
    min_prefix_bytes: Vec<u8>,
    has_odd_byte: bool,
}

impl HexPrefix {
    pub fn try_from_hex(prefix: impl AsRef<[u8]>) -> Option<Self> {
        let (min_prefix_bytes, has_odd_byte) = hex_util::decode_hex_prefix(prefix)?;
        Some(Self { min_prefix_bytes, has_odd_byte })
    }

    pub fn hex(&self) -> String {
        let mut hex_string = hex_util::encode_hex(&self.min_prefix_bytes);
        if self.has_odd_byte {
            hex_string.pop();
        }
        hex_string
    }

    pub fn min_prefix_bytes(&self) -> &[u8] {
        &self.min_prefix_bytes
    }

    pub fn as_full_bytes(&self) -> Option<&[u8]> {
        (!self.has_odd_byte).then_some(&self.min_prefix_bytes)
    }

    fn split_odd_byte(&self) -> (Option<u8>, &[u8]) {
        if self.has_odd_byte {
            let (&odd, prefix) = self.min_prefix_bytes.split_last().unwrap();
            (Some(odd), prefix)
        } else {
            (None, &self.min_prefix_bytes)
        }
    }

    pub fn matches<Q: ObjectId>(&self, id: &Q) -> bool {
        let id_bytes = id.as_bytes();
        let (maybe_odd, prefix) = self.split_odd_byte();
        if !id_bytes.starts_with(prefix) {
            return false;
        }
        match maybe_odd {
            Some(odd) => matches!(id_bytes.get(prefix.len()), Some(v) if v & 0xf0 == odd),
            None => true,
        }
    }
}

impl Debug for HexPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HexPrefix").field(&self.hex()).finish()
    }
}

/// The result of resolving a [`HexPrefix`] against a set of ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixResolution<T> {
    NoMatch,
    SingleMatch(T),
    AmbiguousMatch,
}

impl<T> PrefixResolution<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PrefixResolution<U> {
        match self {
            Self::NoMatch => PrefixResolution::NoMatch,
            Self::SingleMatch(x) => PrefixResolution::SingleMatch(f(x)),
            Self::AmbiguousMatch => PrefixResolution::AmbiguousMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_hex() {
        let id = ChangeId::from_hex("deadbeef0123");
        assert_eq!(format!("{id}"), "deadbeef0123");
    }

    #[test]
    fn hex_prefix_matches_and_rejects() {
        let id = CommitId::from_hex("1234");
        assert!(HexPrefix::try_from_hex("12").unwrap().matches(&id));
        assert!(HexPrefix::try_from_hex("123").unwrap().matches(&id));
        assert!(!HexPrefix::try_from_hex("124").unwrap().matches(&id));
        assert!(!HexPrefix::try_from_hex("12345").unwrap().matches(&id));
    }

    #[test]
    fn malformed_prefix_is_rejected() {
        assert!(HexPrefix::try_from_hex("zz").is_none());
    }
}
