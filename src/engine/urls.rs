//! URL normalization for covers and links found in site markup.

use reqwest::Url;

/// Make an image or link URL absolute against the site base.
///
/// Protocol-relative URLs (`//cdn/x.jpg`) are forced to https. Absolute http(s) URLs
/// are returned unchanged. Empty input stays empty.
pub fn absolute_url(raw: &str, base: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    match Url::parse(base).and_then(|b| b.join(raw)) {
        Ok(u) => u.to_string(),
        Err(_) if raw.starts_with('/') => format!("{}{}", base.trim_end_matches('/'), raw),
        Err(_) => format!("{}/{}", base.trim_end_matches('/'), raw),
    }
}

/// Strip scheme and host so the value can be re-joined against the base later.
///
/// Keeps path, query and fragment. Already-relative input is returned with a leading `/`.
pub fn relative_path(url: &str, base: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    let Ok(parsed) = Url::parse(url).or_else(|_| Url::parse(base).and_then(|b| b.join(url))) else {
        return url.to_string();
    };
    let mut out = parsed.path().to_string();
    if let Some(q) = parsed.query() {
        out.push('?');
        out.push_str(q);
    }
    if let Some(f) = parsed.fragment() {
        out.push('#');
        out.push_str(f);
    }
    out
}
