//! Record identifiers
//!
//! Ids are 128 random bits rendered as 32 lowercase hex characters. They are
//! generated server-side only and never reused.

/// Length of a rendered record id
pub const ID_LEN: usize = 32;

/// Generate a fresh record id
pub fn generate_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Whether `s` has the shape of a generated id
pub fn is_record_id(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
