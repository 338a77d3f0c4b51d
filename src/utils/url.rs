//! URL helpers for building endpoint addresses from a configured base URL.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use compass::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.groq.com/openai/v1/"), "https://api.groq.com/openai/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path without doubling slashes.
///
/// # Examples
///
/// ```
/// use compass::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.groq.com/openai/v1/", "/chat/completions"),
///     "https://api.groq.com/openai/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_removed() {
        assert_eq!(
            normalize_base_url("http://localhost:11434/v1///"),
            "http://localhost:11434/v1"
        );
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(
            construct_api_url("https://api.groq.com/openai/v1", "chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            construct_api_url("http://localhost:8080/v1/", "///chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }
}
