//! `KEY=VAL,KEY=VAL` environment lists as used by the `environment` directive.
use std::collections::BTreeMap;

/// Environment variables attached to a program definition.
pub type EnvMap = BTreeMap<String, String>;

/// Parses a delimited environment list into `target`.
///
/// One layer of surrounding `"` or `'` is stripped first. Segments without an
/// `=` are skipped and later duplicates overwrite earlier ones.
pub fn parse(value: &str, target: &mut EnvMap) {
    let value = strip_quotes(value.trim());

    for pair in value.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        if let Some((key, val)) = pair.split_once('=') {
            target.insert(key.trim().to_string(), val.trim().to_string());
        }
    }
}

/// Joins the mapping back into `KEY=VAL` pairs separated by `,`.
///
/// Keys come out in sorted order; nothing else about the order is promised.
pub fn format(env: &EnvMap) -> String {
    env.iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Removes at most one leading and one trailing quote character.
pub(crate) fn strip_quotes(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .or_else(|| value.strip_prefix('\''))
        .unwrap_or(value);
    value
        .strip_suffix('"')
        .or_else(|| value.strip_suffix('\''))
        .unwrap_or(value)
}
