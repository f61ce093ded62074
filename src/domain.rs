/// Domain extraction for time tracking
use url::Url;

/// Extract the trackable domain from a URL
///
/// Only `http:` and `https:` pages are tracked. Browser-internal pages
/// (`chrome:`, `about:`), local files and every other scheme yield `None`,
/// as does anything that fails to parse.
///
/// Examples:
/// - https://sub.example.com/path → sub.example.com
/// - http://localhost:3000 → localhost
/// - chrome://extensions → None
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;

    match parsed.scheme() {
        "http" | "https" => parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .map(|host| host.to_string()),
        _ => None,
    }
}
