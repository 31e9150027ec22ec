//! Cookie header handling for Ferry transfers.
//!
//! Collects the `Set-Cookie` lines of a raw response header block into a
//! single request-ready `Cookie` string.
//!
//! # Example
//!
//! ```
//! use ferry_cookie::parse_cookie;
//!
//! let header = "HTTP/1.1 200 OK\r\nSet-Cookie: sid=abc; Path=/\r\nSet-Cookie: lang=en\r\n";
//! assert_eq!(parse_cookie(header).as_deref(), Some("sid=abc; lang=en"));
//! assert_eq!(parse_cookie("HTTP/1.1 204 No Content\r\n"), None);
//! ```

pub use self::codec::{form_decode, form_encode};
pub use self::parse::{parse_cookie, parse_set_cookies, Cookies};

mod codec;
mod parse;
