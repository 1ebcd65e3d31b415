//! Identifier codec
//!
//! Converts 128-bit UUIDs into the engine's 23-character compact form and
//! generates the opaque 22-character file ids attached to PrefabInfo entries.
//! Both use the standard base64 alphabet.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use rand::Rng;

/// Symbol table shared by compression and file id generation
pub const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Length of a compact identifier
pub const COMPACT_LEN: usize = 23;

/// Length of a generated file id
pub const FILE_ID_LEN: usize = 22;

// Leading hex characters copied verbatim
const PREFIX_LEN: usize = 5;

/// Compress a UUID (hyphens optional, any case) into its compact form.
///
/// Input that is not 32 hex digits once hyphens are removed is returned
/// unchanged.
pub fn compress_uuid(uuid: &str) -> String {
    let hex: Vec<u8> = uuid
        .bytes()
        .filter(|b| *b != b'-')
        .map(|b| b.to_ascii_lowercase())
        .collect();

    if !is_hex32(&hex) {
        return uuid.to_string();
    }

    let mut out = String::with_capacity(COMPACT_LEN);
    out.extend(hex[..PREFIX_LEN].iter().map(|b| *b as char));

    for group in hex[PREFIX_LEN..].chunks(3) {
        // short trailing group is zero padded on the right
        let bits = (0..3).fold(0u32, |acc, i| {
            (acc << 4) | group.get(i).map(|b| hex_value(*b)).unwrap_or(0)
        });
        out.push(ALPHABET[(bits >> 6) as usize] as char);
        out.push(ALPHABET[(bits & 0x3f) as usize] as char);
    }

    out
}

/// True when `s` is a 32 digit hex UUID, hyphenated or not
pub fn is_uuid(s: &str) -> bool {
    let hex: Vec<u8> = s.bytes().filter(|b| *b != b'-').collect();
    is_hex32(&hex)
}

/// Generate a random 22-character file id
pub fn generate_file_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    STANDARD_NO_PAD.encode(bytes)
}

fn is_hex32(hex: &[u8]) -> bool {
    hex.len() == 32 && hex.iter().all(u8::is_ascii_hexdigit)
}

fn hex_value(b: u8) -> u32 {
    match b {
        b'0'..=b'9' => (b - b'0') as u32,
        b'a'..=b'f' => (b - b'a' + 10) as u32,
        _ => 0,
    }
}
