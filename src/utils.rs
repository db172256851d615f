// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt::Write;

use rand::Rng;

/// Generates a random local app UUID (16 bytes) and returns:
/// - `[u8; 16]` for direct use in the envelope's `src` field
/// - `String` containing its hexadecimal representation (no prefix)
pub fn generate_local_uuid() -> ([u8; 16], String) {
    let mut uuid = [0u8; 16];
    rand::rng().fill(&mut uuid);

    let mut hex = String::with_capacity(32);
    for byte in &uuid {
        write!(&mut hex, "{byte:02x}").expect("Writing to String cannot fail");
    }

    (uuid, hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_generation() {
        let (bytes, hex) = generate_local_uuid();
        assert_eq!(bytes.len(), 16);
        assert_eq!(hex.len(), 32);
        let decoded = hex::decode(&hex).expect("failed decode");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_uuid_is_not_all_zero() {
        let (bytes, _) = generate_local_uuid();
        assert_ne!(bytes, [0u8; 16]);
    }
}
