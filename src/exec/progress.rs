// src/exec/progress.rs

//! Percentage detection in raw tool output.

use std::sync::LazyLock;

use regex::Regex;

// ASCII digits only; `\d` would also accept other Unicode digit classes that
// `u32::from_str` rejects.
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,3})%").expect("percent pattern is a valid regex")
});

/// Return the first `N%` (1-3 digits) in `text`, clamped to `0..=100`.
///
/// `None` just means the chunk carries no progress. The function keeps no
/// state between calls, so both pumps can use it concurrently.
pub fn extract(text: &str) -> Option<u8> {
    let caps = PERCENT_RE.captures(text)?;
    let value: u32 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.min(100) as u8)
}
