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

//! Hex string helpers shared by the id types in [`crate::object_id`].

/// Decodes a hex string into bytes. Returns `None` on odd length or any
/// non-hex-digit byte.
pub fn decode_hex(hex: impl AsRef<[u8]>) -> Option<Vec<u8>> {
    let hex = hex.as_ref();
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.chunks_exact(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

/// Encodes bytes as a lowercase hex string.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decodes a hex string prefix, which may have odd length. Returns
/// `(bytes, has_odd_byte)`, where an odd trailing nibble is zero-filled into
/// the low bits of the last byte.
pub fn decode_hex_prefix(prefix: impl AsRef<[u8]>) -> Option<(Vec<u8>, bool)> {
    let prefix = prefix.as_ref();
    let mut decoded = Vec::with_capacity(prefix.len().div_ceil(2));
    let mut chunks = prefix.chunks_exact(2);
    for chunk in &mut chunks {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        decoded.push((hi * 16 + lo) as u8);
    }
    match chunks.remainder() {
        [] => Some((decoded, false)),
        [hi] => {
            let hi = (*hi as char).to_digit(16)?;
            decoded.push((hi * 16) as u8);
            Some((decoded, true))
        }
        _ => unreachable!("chunks_exact(2) remainder is at most 1 element"),
    }
}

/// Returns the number of leading hex digits shared by two byte sequences.
pub fn common_hex_len(bytes_a: &[u8], bytes_b: &[u8]) -> usize {
    std::iter::zip(bytes_a, bytes_b)
        .enumerate()
        .find_map(|(i, (a, b))| match a ^ b {
            0 => None,
            d if d & 0xf0 == 0 => Some(i * 2 + 1),
            _ => Some(i * 2),
        })
        .unwrap_or_else(|| bytes_a.len().min(bytes_b.len()) * 2)
}
