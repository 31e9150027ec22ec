use ferry_cookie::{form_decode, form_encode, parse_cookie, parse_set_cookies};
use proptest::prelude::*;

#[test]
fn test_parse_realistic_response_header() {
    let header = concat!(
        "HTTP/2 200\r\n",
        "content-type: text/html; charset=UTF-8\r\n",
        "set-cookie: AEC=Ackid1R; expires=Sun, 11-Apr-2027 09:01:22 GMT; path=/; domain=.example.com; Secure; HttpOnly; SameSite=lax\r\n",
        "set-cookie: NID=511=eV1d; expires=Mon, 12-Apr-2027 09:01:22 GMT; path=/; domain=.example.com; HttpOnly\r\n",
        "cache-control: private, max-age=0\r\n",
        "\r\n",
    );

    let cookies = parse_set_cookies(header);
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies.get("AEC"), Some("Ackid1R"));
    assert_eq!(cookies.get("NID"), Some("511=eV1d"));
    assert_eq!(
        parse_cookie(header).as_deref(),
        Some("AEC=Ackid1R; NID=511%3DeV1d")
    );
}

#[test]
fn test_parse_header_without_body_separator() {
    let header = "Set-Cookie: a=1; Path=/\nSet-Cookie: b=2; Path=/";
    assert_eq!(parse_cookie(header).as_deref(), Some("a=1; b=2"));
}

proptest! {
    #[test]
    fn test_encoded_components_decode_back(s in "\\PC*") {
        prop_assert_eq!(form_decode(&form_encode(&s)), s);
    }

    #[test]
    fn test_encoded_output_is_header_safe(s in "\\PC*") {
        let encoded = form_encode(&s);
        prop_assert!(encoded.bytes().all(|b| b.is_ascii_alphanumeric() || b"-_.+%".contains(&b)));
    }

    #[test]
    fn test_single_cookie_survives_parsing(name in "[A-Za-z][A-Za-z0-9_]{0,15}", value in "[^;\r\n]{0,32}") {
        let header = format!("Set-Cookie: {}={}; Path=/\r\n", name, form_encode(&value));
        let cookies = parse_set_cookies(&header);
        prop_assert_eq!(cookies.get(&name), Some(value.as_str()));
    }
}
