use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed as an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The URL points to a private/internal IP address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL points to localhost.
    #[error("Localhost not allowed")]
    Localhost,
}

/// Validates a feed URL before it is handed to the relay.
///
/// The relay fetches whatever we pass it, so the same SSRF policy applies as
/// for a direct fetch: only absolute `http`/`https` URLs with a public host
/// are accepted.
///
/// # Examples
///
/// ```
/// use feedlens::util::validate_url;
///
/// let url = validate_url("https://example.com/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_url("http://localhost/feed").is_err());
/// assert!(validate_url("http://192.168.1.1/feed").is_err());
/// assert!(validate_url("file:///etc/passwd").is_err());
/// assert!(validate_url("/relative/feed").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if host.eq_ignore_ascii_case("localhost") {
        return Err(UrlValidationError::Localhost);
    }

    // IPv6 hosts come back bracketed from host_str()
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = bare.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(UrlValidationError::Localhost);
        }
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(url)
}

/// Validates an article link before passing it to the system browser.
///
/// Feed-supplied links end up as an argument to `open::that`, so anything
/// that is not a plain public `http`/`https` URL is refused with a message
/// suitable for printing.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, String> {
    validate_url(url_str).map_err(|e| format!("Refusing to open link: {}", e))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let first = ipv6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link-local
            (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_feed_urls_accepted() {
        assert!(validate_url("https://www.shz.de/deutschland-welt/schleswig-holstein/klima/rss").is_ok());
        assert!(validate_url("http://news.example.org/rss").is_ok());
        assert!(validate_url("https://example.com:8443/feed.xml").is_ok());
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let url = validate_url("  https://example.com/feed  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/feed");
    }

    #[test]
    fn test_relative_url_rejected() {
        assert!(matches!(
            validate_url("feed.xml"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        assert!(matches!(
            validate_url("ftp://example.com/feed"),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(validate_url("javascript:alert(1)").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_loopback_rejected() {
        assert!(matches!(
            validate_url("http://LOCALHOST/feed"),
            Err(UrlValidationError::Localhost)
        ));
        assert!(matches!(
            validate_url("http://127.0.0.1:8080/feed"),
            Err(UrlValidationError::Localhost)
        ));
        assert!(matches!(
            validate_url("http://[::1]/feed"),
            Err(UrlValidationError::Localhost)
        ));
    }

    #[test]
    fn test_private_ranges_rejected() {
        for url in [
            "http://10.0.0.1/feed",
            "http://172.16.0.1/feed",
            "http://192.168.1.1:3000/feed",
            "http://169.254.1.1/feed",
            "http://0.0.0.0/feed",
            "http://[fe80::1]/feed",
            "http://[fd00::1]/feed",
        ] {
            assert!(
                matches!(validate_url(url), Err(UrlValidationError::PrivateIp(_))),
                "{url} should be rejected as private"
            );
        }
    }

    #[test]
    fn test_open_validation_reports_reason() {
        let err = validate_url_for_open("file:///etc/passwd").unwrap_err();
        assert!(err.starts_with("Refusing to open link"));
        assert!(err.contains("file"));
        assert!(validate_url_for_open("https://example.com/a").is_ok());
    }
}
