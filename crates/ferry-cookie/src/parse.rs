//! `Set-Cookie` header scanning.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codec::{form_decode, form_encode};

/// Captures the `name=value` part of each `Set-Cookie:` line, stopping at the
/// first attribute separator or line break.
static SET_COOKIE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^Set-Cookie:[ \t]*([^;\r\n]*)").unwrap());

/// Ordered cookie pairs.
///
/// Inserting a name that is already present replaces its value but keeps the
/// original position, so the last `Set-Cookie` line for a name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    pairs: Vec<(String, String)>,
}

impl Cookies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.pairs.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Renders the pairs as a `Cookie` request header value: form-encoded
/// `name=value` items joined by `"; "`.
impl fmt::Display for Cookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}={}", form_encode(name), form_encode(value))?;
        }
        Ok(())
    }
}

/// Collect every cookie set by a raw response header block.
///
/// Lines are matched case-insensitively. Cookie attributes (`Path`,
/// `Expires`, ...) are dropped. A pair without `=` yields an empty value and a
/// pair with an empty name is skipped.
pub fn parse_set_cookies(header: &str) -> Cookies {
    let mut cookies = Cookies::new();
    for caps in SET_COOKIE_REGEX.captures_iter(header) {
        let pair = caps.get(1).map_or("", |m| m.as_str());
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = form_decode(name);
        if name.is_empty() {
            continue;
        }
        cookies.insert(name, form_decode(value));
    }
    cookies
}

/// Build a `Cookie` header value from the `Set-Cookie` lines of `header`.
///
/// Returns `None` when the header contains no `Set-Cookie` line.
pub fn parse_cookie(header: &str) -> Option<String> {
    let cookies = parse_set_cookies(header);
    if cookies.is_empty() {
        return None;
    }
    Some(cookies.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_multiple_lines() {
        let header = "Set-Cookie: a=1; Path=/\r\nSet-Cookie: b=2; Path=/\r\n";
        assert_eq!(parse_cookie(header).as_deref(), Some("a=1; b=2"));
    }

    #[test]
    fn test_parse_cookie_last_line_wins() {
        let header = "Set-Cookie: a=1\r\nSet-Cookie: a=2\r\n";
        assert_eq!(parse_cookie(header).as_deref(), Some("a=2"));
    }

    #[test]
    fn test_parse_cookie_overwrite_keeps_position() {
        let header = "Set-Cookie: a=1\nSet-Cookie: b=2\nSet-Cookie: a=3\n";
        assert_eq!(parse_cookie(header).as_deref(), Some("a=3; b=2"));
    }

    #[test]
    fn test_parse_cookie_none() {
        assert_eq!(parse_cookie("no cookies here"), None);
        assert_eq!(parse_cookie(""), None);
    }

    #[test]
    fn test_parse_cookie_case_insensitive() {
        let header = "HTTP/1.1 302 Found\r\nset-cookie: token=xyz\r\nSET-COOKIE: id=7; HttpOnly\r\n";
        assert_eq!(parse_cookie(header).as_deref(), Some("token=xyz; id=7"));
    }

    #[test]
    fn test_parse_cookie_ignores_mid_line_match() {
        let header = "X-Note: Set-Cookie: a=1\r\n";
        assert_eq!(parse_cookie(header), None);
    }

    #[test]
    fn test_parse_cookie_reencodes_values() {
        let header = "Set-Cookie: greeting=hello%20world%21\r\n";
        assert_eq!(parse_cookie(header).as_deref(), Some("greeting=hello+world%21"));
    }

    #[test]
    fn test_parse_set_cookies_decodes() {
        let cookies = parse_set_cookies("Set-Cookie: name=J%C3%BCrgen+M\r\n");
        assert_eq!(cookies.get("name"), Some("Jürgen M"));
        assert_eq!(cookies.len(), 1);
    }

    #[test]
    fn test_parse_set_cookies_missing_value() {
        let cookies = parse_set_cookies("Set-Cookie: flag; Secure\r\nSet-Cookie: =orphan\r\n");
        assert_eq!(cookies.get("flag"), Some(""));
        assert_eq!(cookies.len(), 1);
    }

    #[test]
    fn test_value_with_equals_sign() {
        let cookies = parse_set_cookies("Set-Cookie: data=a=b; Path=/\r\n");
        assert_eq!(cookies.get("data"), Some("a=b"));
        assert_eq!(cookies.to_string(), "data=a%3Db");
    }
}
