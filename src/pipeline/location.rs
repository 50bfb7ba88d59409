//! Page location handed to the `ready` hook.

use std::fmt;

/// Path and query of the page the application was mounted on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Percent-decoded path (`decodeURI` rules: reserved characters stay encoded).
    pub path: String,
    /// Query string without the leading `?`, not decoded.
    pub query: String,
}

impl Location {
    /// Split an absolute URL or a bare `path?query#fragment`.
    pub fn parse(url: &str) -> Self {
        let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
        let (target, query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));

        let path = match target.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
            None => target,
        };
        let path = if path.is_empty() { "/" } else { path };

        Self {
            path: decode_uri(path),
            query: query.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query)
        }
    }
}

/// `decodeURI`: decode `%XX` sequences except those for reserved characters.
/// Sequences that are malformed or not valid UTF-8 are kept as written.
pub fn decode_uri(src: &str) -> String {
    const RESERVED: &[u8] = b";/?:@&=+$,#";

    let bytes = src.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let decoded = (bytes[i] == b'%')
            .then(|| bytes.get(i + 1..i + 3))
            .flatten()
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match decoded {
            Some(byte) if !RESERVED.contains(&byte) => {
                out.push(byte);
                i += 3;
            }
            _ => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    match String::from_utf8(out) {
        Ok(decoded) => decoded,
        Err(_) => src.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        let loc = Location::parse("https://example.com/caf%C3%A9/list?page=2&q=a%20b#top");
        assert_eq!(loc.path, "/café/list");
        assert_eq!(loc.query, "page=2&q=a%20b");
    }

    #[test]
    fn test_parse_bare_path() {
        assert_eq!(Location::parse("/index.html").query, "");
        assert_eq!(Location::parse("https://example.com").path, "/");
        assert_eq!(Location::parse("/a?x=1").to_string(), "/a?x=1");
    }

    #[test]
    fn test_decode_uri_keeps_reserved() {
        assert_eq!(decode_uri("/a%2Fb%20c"), "/a%2Fb c");
        assert_eq!(decode_uri("100%"), "100%");
        assert_eq!(decode_uri("%E2%82"), "%E2%82");
    }
}
