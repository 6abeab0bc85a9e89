//! Sequential issue key derivation.
//!
//! Keys look like `APP-0042`: a fixed prefix, a hyphen, and a zero-padded
//! decimal sequence. The next key is derived from the most recently created
//! issue's key alone. If that key does not match the prefix, the sequence
//! restarts at 1.

use regex::Regex;

/// Minimum digit width of the sequence part. Sequences past 9999 keep
/// growing; the padding never truncates.
pub const MIN_KEY_DIGITS: usize = 4;

/// Derive the key for the next issue from the last created issue's key.
pub fn next_issue_key(last_key: Option<&str>, prefix: &str) -> String {
    let next = last_key
        .and_then(|key| parse_sequence(key, prefix))
        .map_or(1, |n| n + 1);
    format!("{}-{:0width$}", prefix, next, width = MIN_KEY_DIGITS)
}

/// Extract the sequence number from a key of the form `<PREFIX>-<digits>`.
/// The prefix is matched literally (metacharacters escaped).
pub fn parse_sequence(key: &str, prefix: &str) -> Option<u64> {
    let pattern = format!(r"^{}-(\d+)$", regex::escape(prefix));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(key)?;
    caps[1].parse().ok()
}
