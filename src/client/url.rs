//! URL joining.

/// Joins `url` onto `base_url`.
///
/// Absolute `http://` / `https://` URLs are returned unchanged. Without a
/// (non-empty) base the URL is returned unchanged. Otherwise one trailing
/// slash is stripped from the base and the URL is given exactly one leading
/// slash, so the join point never doubles or drops a slash.
pub fn build_url(url: &str, base_url: Option<&str>) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }

    let base = match base_url {
        Some(base) if !base.is_empty() => base,
        _ => return url.to_string(),
    };

    let base = base.strip_suffix('/').unwrap_or(base);
    if url.starts_with('/') {
        format!("{}{}", base, url)
    } else {
        format!("{}/{}", base, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("http://other.test/a", Some("https://api.test") ; "http absolute")]
    #[test_case("https://other.test/a", Some("https://api.test/") ; "https absolute")]
    #[test_case("https://other.test/a", None ; "absolute without base")]
    fn absolute_urls_are_unchanged(url: &str, base: Option<&str>) {
        assert_eq!(build_url(url, base), url);
    }

    #[test_case("/v1/x", None ; "no base")]
    #[test_case("/v1/x", Some("") ; "empty base")]
    #[test_case("v1/x", None ; "relative without slash")]
    fn relative_without_base_is_unchanged(url: &str, base: Option<&str>) {
        assert_eq!(build_url(url, base), url);
    }

    #[test_case("/v1/x", "https://api.test/" ; "both slashes")]
    #[test_case("v1/x", "https://api.test" ; "no slashes")]
    #[test_case("/v1/x", "https://api.test" ; "leading slash only")]
    #[test_case("v1/x", "https://api.test/" ; "trailing slash only")]
    fn joins_with_exactly_one_slash(url: &str, base: &str) {
        assert_eq!(build_url(url, Some(base)), "https://api.test/v1/x");
    }

    #[test]
    fn test_base_with_path_prefix() {
        assert_eq!(
            build_url("orders", Some("https://api.example.com/v2/")),
            "https://api.example.com/v2/orders"
        );
    }
}
