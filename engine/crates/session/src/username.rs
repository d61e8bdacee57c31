pub const MAX_USERNAME_LEN: usize = 40;

/// Usernames are 1 to 40 ASCII letters, digits, `_` or `-`. Case-sensitive.
///
/// Anything touching storage keyed by username must check this first.
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_USERNAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
