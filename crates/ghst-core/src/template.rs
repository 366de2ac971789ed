//! `{{ KEY }}` placeholder substitution
//!
//! Keys match case-insensitively (both sides are upper-cased) and any
//! whitespace inside the braces is ignored. Placeholders without a value
//! stay verbatim.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("placeholder pattern"));

/// Substitute every placeholder in `template` with its value
pub fn render<I, K, V>(template: &str, values: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let values: HashMap<String, V> = values
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_uppercase(), v))
        .collect();

    if values.is_empty() {
        return template.to_string();
    }

    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            match values.get(&caps[1].to_uppercase()) {
                Some(v) => v.as_ref().to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
