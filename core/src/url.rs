//! Path-parameter substitution and query-string assembly.

use std::collections::HashMap;

/// Substitutes `:name` placeholders and appends the query string.
///
/// Every occurrence of a placeholder is replaced. Placeholders without a
/// matching parameter are left untouched. Keys and values are form-urlencoded
/// on the way into the query string; the resulting pair order follows the
/// map's iteration order and is not stable.
pub fn compose(
    target: &str,
    path_params: &HashMap<String, String>,
    query_params: &HashMap<String, String>,
) -> String {
    let mut url = target.to_string();
    for (name, value) in path_params {
        url = url.replace(&format!(":{name}"), value);
    }

    if query_params.is_empty() {
        return url;
    }

    if !url.contains('?') {
        url.push('?');
    } else if !url.ends_with('?') && !url.ends_with('&') {
        url.push('&');
    }
    for (key, value) in query_params {
        url.push_str(&encode(key));
        url.push('=');
        url.push_str(&encode(value));
        url.push('&');
    }
    if url.ends_with('&') {
        url.pop();
    }
    url
}

fn encode(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}
