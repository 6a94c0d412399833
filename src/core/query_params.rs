use std::collections::HashMap;

/// Parse query parameters from a URI string.
///
/// Handles URL decoding; when a key repeats only the last value is kept.
///
/// ```
/// use plaza::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/api/posts?page=2");
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&') {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get an integer parameter with validation and default; never below 1.
pub fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_decodes() {
        let params = parse_query_params("/api/posts?page=3&tag=caf%C3%A9");
        assert_eq!(params.get("page"), Some(&"3".to_string()));
        assert_eq!(params.get("tag"), Some(&"café".to_string()));
    }

    #[test]
    fn no_query_yields_empty_map() {
        assert!(parse_query_params("/api/posts").is_empty());
    }

    #[test]
    fn int_param_defaults_and_floors() {
        let params = parse_query_params("/api/posts?page=0&junk=x");
        assert_eq!(get_int(&params, "page", 1), 1);
        assert_eq!(get_int(&params, "missing", 7), 7);
        assert_eq!(get_int(&params, "junk", 4), 4);
    }
}
