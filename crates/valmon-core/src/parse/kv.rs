//! Parser for the miner's Erlang-style bracketed key/value output.
//!
//! Commands like `miner print_keys` emit one tuple per line:
//!
//! ```text
//! {name,"curly-peach-owl"}.
//! {address,"11abcdef"}.
//! ```
//!
//! Lines that do not match the pattern (blanks, partial output, noise)
//! are ignored.

use std::collections::HashMap;

/// Parses bracketed `{key,"value"}.` lines into a map.
pub fn parse_kv_lines(input: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for line in input.lines() {
        if let Some((key, value)) = parse_kv_line(line) {
            map.insert(key, value);
        }
    }

    map
}

/// Parses a single `{key,"value"}.` line, if well-formed.
fn parse_kv_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    let body = line
        .strip_prefix('{')?
        .strip_suffix('.')?
        .strip_suffix('}')?;
    let (key, value) = body.split_once(',')?;

    let key = key.trim();
    let value = value.trim().strip_prefix('"')?.strip_suffix('"')?;
    if key.is_empty() {
        return None;
    }

    Some((key.to_string(), value.to_string()))
}
