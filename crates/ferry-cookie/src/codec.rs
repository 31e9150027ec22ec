//! RFC 1738 style form encoding (`application/x-www-form-urlencoded`).

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Everything except ASCII alphanumerics, `-`, `_` and `.` is escaped.
const FORM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Encode `input` the way HTML forms do: spaces become `+`, every other
/// reserved byte becomes `%XX`.
///
/// ```
/// assert_eq!(ferry_cookie::form_encode("a b&c"), "a+b%26c");
/// ```
pub fn form_encode(input: &str) -> String {
    // A literal "%20" in the input is itself escaped to "%2520", so only
    // encoded spaces are rewritten here.
    utf8_percent_encode(input, FORM).to_string().replace("%20", "+")
}

/// Decode a form-encoded component. Malformed escapes are kept verbatim and
/// invalid UTF-8 is replaced lossily.
pub fn form_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
