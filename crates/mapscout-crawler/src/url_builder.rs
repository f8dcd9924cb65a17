use url::form_urlencoded::byte_serialize;
use url::Url;

/// Build the search URL for one `(term, location)` combination.
///
/// The query reads `"<term> en <location>"` and is form-encoded, so spaces
/// become `+` and accented letters are percent-escaped.
pub fn build_search_url(base: &str, term: &str, location: &str) -> String {
    let query = format!("{} en {}", term.trim(), location.trim());
    let encoded: String = byte_serialize(query.as_bytes()).collect();
    format!("{}/{}", base.trim_end_matches('/'), encoded)
}

/// Resolve a candidate href against the search page it was found on.
///
/// Place links are usually absolute already; relative ones are joined onto
/// `base`. Returns `None` for hrefs that do not form a valid URL.
pub fn resolve_place_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)
            .and_then(|base| base.join(href))
            .ok()
            .map(|url| url.to_string()),
        Err(_) => None,
    }
}
