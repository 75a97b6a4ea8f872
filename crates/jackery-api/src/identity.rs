// Device identifier derivation
//
// The login payload carries a `macId` that the server uses to recognise the
// client as a known handset. The mobile app derives it from the Android ID:
// a name-based (MD5, version 3) UUID for real devices, a random one for the
// well-known emulator ID.

use md5::{Digest, Md5};
use uuid::{Builder, Uuid};

/// Android ID reported by emulator images. Never hashed.
pub const EMULATOR_ANDROID_ID: &str = "9774d56d682e549c";

/// Seed used when the caller doesn't supply one.
pub const DEFAULT_ANDROID_ID: &str = "abcd1234567890ef";

/// Marker prefix for identifiers derived from a real seed.
pub const DERIVED_MARKER: char = '2';

/// Marker prefix for randomly generated identifiers.
pub const RANDOM_MARKER: char = '9';

/// Length of every identifier: one marker plus 32 hex digits.
pub const DEVICE_ID_LEN: usize = 33;

/// Derive the device identifier for `seed`.
///
/// Pure for any non-empty seed other than [`EMULATOR_ANDROID_ID`]; those two
/// cases get a fresh random identifier on every call.
pub fn derive(seed: &str) -> String {
    if seed.is_empty() || seed == EMULATOR_ANDROID_ID {
        let id = Uuid::new_v4();
        return format!("{RANDOM_MARKER}{}", id.simple());
    }

    let digest: [u8; 16] = Md5::digest(seed.as_bytes()).into();
    let id = Builder::from_md5_bytes(digest).into_uuid();
    format!("{DERIVED_MARKER}{}", id.simple())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_shape(id: &str, marker: char) {
        assert_eq!(id.len(), DEVICE_ID_LEN, "unexpected length: {id}");
        assert!(id.starts_with(marker), "unexpected marker: {id}");
        assert!(
            id[1..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)),
            "not lowercase hex: {id}"
        );
    }

    #[test]
    fn seeded_identifier_is_stable() {
        let first = derive("a1b2c3d4e5f60708");
        let second = derive("a1b2c3d4e5f60708");
        assert_eq!(first, second);
        assert_shape(&first, DERIVED_MARKER);
    }

    #[test]
    fn seeded_identifier_matches_name_based_uuid() {
        assert_eq!(derive(DEFAULT_ANDROID_ID), "2a24fa0ca7d6a371ebc78abe936eb0834");
    }

    #[test]
    fn seeded_identifier_carries_version_3() {
        let id = derive("some-handset");
        // Version nibble sits at hex offset 12 of the UUID, after the marker.
        assert_eq!(id.as_bytes()[13], b'3');
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(derive("seed-one"), derive("seed-two"));
    }

    #[test]
    fn emulator_seed_is_random() {
        let first = derive(EMULATOR_ANDROID_ID);
        let second = derive(EMULATOR_ANDROID_ID);
        assert_shape(&first, RANDOM_MARKER);
        assert_shape(&second, RANDOM_MARKER);
        assert_ne!(first, second);
    }

    #[test]
    fn empty_seed_is_random() {
        let first = derive("");
        let second = derive("");
        assert_shape(&first, RANDOM_MARKER);
        assert_ne!(first, second);
    }
}
