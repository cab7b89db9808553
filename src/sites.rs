//! URL classification and site-list policy.

use url::Url;

use crate::settings::UserSettings;

const PROTECTED_SCHEMES: &[&str] = &[
    "about",
    "brave",
    "chrome",
    "chrome-extension",
    "devtools",
    "edge",
    "moz-extension",
    "opera",
    "resource",
    "view-source",
    "vivaldi",
];

const PROTECTED_PAGES: &[&str] = &[
    "addons.mozilla.org",
    "chrome.google.com/webstore",
    "chromewebstore.google.com",
    "microsoftedge.microsoft.com/addons",
];

/// Pattern identifying a whole site: host (with port), the path of a local
/// file, or the bare protocol for host-less URLs.
pub fn host_or_protocol(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            if let Some(host) = url.host_str() {
                match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                }
            } else if url.scheme() == "file" {
                url.path().to_string()
            } else {
                format!("{}:", url.scheme())
            }
        }
        Err(_) => raw.to_string(),
    }
}

pub fn is_pdf(raw: &str) -> bool {
    let path = match Url::parse(raw) {
        Ok(url) => url.path().to_ascii_lowercase(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
    };
    path.ends_with(".pdf")
}

pub fn is_protected(raw: &str) -> bool {
    if let Ok(url) = Url::parse(raw) {
        if PROTECTED_SCHEMES.contains(&url.scheme()) {
            return true;
        }
    }
    let normalized = normalize(raw);
    PROTECTED_PAGES
        .iter()
        .any(|page| match_from(&chars(page), &chars(&normalized), false))
}

/// Lowercase, drop the scheme and a leading `www.`
fn normalize(value: &str) -> String {
    let lower = value.trim().to_ascii_lowercase();
    let without_scheme = match lower.find("://") {
        Some(index) => &lower[index + 3..],
        None => &lower,
    };
    without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme)
        .to_string()
}

fn chars(value: &str) -> Vec<char> {
    value.chars().collect()
}

/// Glob prefix match: `*` spans any run of characters except `/`, and the
/// match must end on a URL boundary unless the pattern ends with `/`.
fn match_from(pattern: &[char], text: &[char], ends_with_slash: bool) -> bool {
    match pattern.split_first() {
        None => {
            ends_with_slash
                || text
                    .first()
                    .map_or(true, |c| matches!(c, '/' | '?' | '#' | ':'))
        }
        Some(('*', rest)) => {
            let mut i = 0;
            loop {
                if match_from(rest, &text[i..], ends_with_slash) {
                    return true;
                }
                if i >= text.len() || text[i] == '/' {
                    return false;
                }
                i += 1;
            }
        }
        Some((c, rest)) => {
            text.first() == Some(c) && match_from(rest, &text[1..], ends_with_slash)
        }
    }
}

pub fn is_url_matched(url: &str, pattern: &str) -> bool {
    let pattern = normalize(pattern);
    if pattern.is_empty() {
        return false;
    }
    let ends_with_slash = pattern.ends_with('/');
    match_from(&chars(&pattern), &chars(&normalize(url)), ends_with_slash)
}

pub fn is_url_in_list(url: &str, list: &[String]) -> bool {
    list.iter().any(|pattern| is_url_matched(url, pattern))
}

/// Whether a document should be styled at all
pub fn is_url_enabled(url: &str, settings: &UserSettings, is_in_dark_list: bool) -> bool {
    if is_protected(url) && !settings.enable_for_protected_pages {
        return false;
    }
    if is_pdf(url) {
        return settings.enable_for_pdf;
    }
    let is_listed = is_url_in_list(url, &settings.site_list);
    let is_in_enabled_list = is_url_in_list(url, &settings.site_list_enabled);
    if settings.apply_to_list_only {
        return is_listed || is_in_enabled_list;
    }
    if is_in_dark_list {
        return is_in_enabled_list;
    }
    !is_listed
}

/// Remove `pattern` if present (exact membership), otherwise append it
pub fn toggle_pattern(list: &[String], pattern: &str) -> Vec<String> {
    if list.iter().any(|entry| entry == pattern) {
        list.iter().filter(|entry| *entry != pattern).cloned().collect()
    } else {
        let mut next = list.to_vec();
        next.push(pattern.to_string());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_or_protocol_variants() {
        assert_eq!(host_or_protocol("https://www.example.com/a?b"), "www.example.com");
        assert_eq!(host_or_protocol("http://localhost:8080/"), "localhost:8080");
        assert_eq!(host_or_protocol("file:///home/me/doc.html"), "/home/me/doc.html");
        assert_eq!(host_or_protocol("data:text/html,hi"), "data:");
    }

    #[test]
    fn matches_host_boundaries() {
        assert!(is_url_matched("https://example.com/page", "example.com"));
        assert!(is_url_matched("https://www.example.com", "example.com"));
        assert!(is_url_matched("https://example.com:8443/x", "example.com"));
        assert!(!is_url_matched("https://example.com.evil.org/", "example.com"));
        assert!(!is_url_matched("https://notexample.com/", "example.com"));
    }

    #[test]
    fn matches_wildcards_and_paths() {
        assert!(is_url_matched("https://mail.google.com/u/0", "*.google.com"));
        assert!(!is_url_matched("https://evil.org/x.google.com", "*.google.com"));
        assert!(is_url_matched("https://github.com/rust-lang/rust", "github.com/rust-lang"));
        assert!(!is_url_matched("https://github.com/rust-lang-nursery", "github.com/rust-lang/"));
    }

    #[test]
    fn detects_pdf_and_protected_pages() {
        assert!(is_pdf("https://example.com/paper.PDF?dl=1"));
        assert!(!is_pdf("https://example.com/pdf/index.html"));
        assert!(is_protected("chrome://settings"));
        assert!(is_protected("https://chromewebstore.google.com/detail/x"));
        assert!(!is_protected("https://example.com"));
    }

    #[test]
    fn eligibility_follows_lists() {
        let mut settings = UserSettings {
            site_list: vec!["off.com".to_string()],
            site_list_enabled: vec!["dark.com".to_string()],
            ..UserSettings::default()
        };
        assert!(is_url_enabled("https://on.com", &settings, false));
        assert!(!is_url_enabled("https://off.com", &settings, false));
        assert!(is_url_enabled("https://dark.com", &settings, true));
        assert!(!is_url_enabled("https://other-dark.com", &settings, true));
        assert!(!is_url_enabled("chrome://newtab", &settings, false));

        settings.enable_for_pdf = false;
        assert!(!is_url_enabled("https://on.com/a.pdf", &settings, false));

        settings.apply_to_list_only = true;
        assert!(is_url_enabled("https://off.com", &settings, false));
        assert!(!is_url_enabled("https://on.com", &settings, false));
    }

    #[test]
    fn list_only_mode_honours_dark_list_exceptions() {
        let settings = UserSettings {
            apply_to_list_only: true,
            site_list_enabled: vec!["dark.com".to_string()],
            ..UserSettings::default()
        };
        assert!(is_url_enabled("https://dark.com/", &settings, true));
        assert!(!is_url_enabled("https://other-dark.com/", &settings, true));
    }

    #[test]
    fn pdf_rule_decides_alone() {
        let mut settings = UserSettings {
            site_list: vec!["docs.com".to_string()],
            ..UserSettings::default()
        };
        assert!(is_url_enabled("https://docs.com/a.pdf", &settings, false));
        assert!(is_url_enabled("https://dark.com/a.pdf", &settings, true));

        settings.enable_for_pdf = false;
        assert!(!is_url_enabled("https://docs.com/a.pdf", &settings, false));
    }

    #[test]
    fn toggle_uses_exact_membership() {
        let list = vec!["a.com".to_string(), "b.com".to_string()];
        assert_eq!(toggle_pattern(&list, "a.com"), vec!["b.com".to_string()]);
        assert_eq!(toggle_pattern(&list, "a.co").len(), 3);
    }
}
