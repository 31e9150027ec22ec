//! Transfer option identifiers and their values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of one configurable aspect of a transfer.
///
/// The serialized names are the engine's symbolic option names, so an
/// exported option map reads like an option table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransferOption {
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "CUSTOMREQUEST")]
    CustomRequest,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "HTTPGET")]
    HttpGet,
    #[serde(rename = "POSTFIELDS")]
    PostFields,
    #[serde(rename = "HTTPHEADER")]
    HttpHeader,
    #[serde(rename = "COOKIE")]
    Cookie,
    #[serde(rename = "COOKIEJAR")]
    CookieJar,
    #[serde(rename = "COOKIEFILE")]
    CookieFile,
    #[serde(rename = "REFERER")]
    Referer,
    #[serde(rename = "USERAGENT")]
    UserAgent,
    #[serde(rename = "ENCODING")]
    Encoding,
    #[serde(rename = "CONNECTTIMEOUT")]
    ConnectTimeout,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "PROXY")]
    Proxy,
    #[serde(rename = "PROXYTYPE")]
    ProxyType,
    #[serde(rename = "PROXYUSERNAME")]
    ProxyUserName,
    #[serde(rename = "PROXYPASSWORD")]
    ProxyPassword,
    #[serde(rename = "SSL_VERIFYPEER")]
    SslVerifyPeer,
    #[serde(rename = "SSL_VERIFYHOST")]
    SslVerifyHost,
    #[serde(rename = "SSL_VERIFYSTATUS")]
    SslVerifyStatus,
    #[serde(rename = "PROXY_SSL_VERIFYPEER")]
    ProxySslVerifyPeer,
    #[serde(rename = "PROXY_SSL_VERIFYHOST")]
    ProxySslVerifyHost,
    #[serde(rename = "IPRESOLVE")]
    IpResolve,
    #[serde(rename = "INTERFACE")]
    Interface,
    #[serde(rename = "AUTOREFERER")]
    AutoReferer,
    #[serde(rename = "FOLLOWLOCATION")]
    FollowLocation,
    #[serde(rename = "VERBOSE")]
    Verbose,
    #[serde(rename = "HEADER")]
    Header,
    #[serde(rename = "NOBODY")]
    NoBody,
    #[serde(rename = "CAINFO")]
    CaInfo,
    #[serde(rename = "RETURNTRANSFER")]
    ReturnTransfer,
}

impl TransferOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferOption::Url => "URL",
            TransferOption::CustomRequest => "CUSTOMREQUEST",
            TransferOption::Post => "POST",
            TransferOption::HttpGet => "HTTPGET",
            TransferOption::PostFields => "POSTFIELDS",
            TransferOption::HttpHeader => "HTTPHEADER",
            TransferOption::Cookie => "COOKIE",
            TransferOption::CookieJar => "COOKIEJAR",
            TransferOption::CookieFile => "COOKIEFILE",
            TransferOption::Referer => "REFERER",
            TransferOption::UserAgent => "USERAGENT",
            TransferOption::Encoding => "ENCODING",
            TransferOption::ConnectTimeout => "CONNECTTIMEOUT",
            TransferOption::Timeout => "TIMEOUT",
            TransferOption::Proxy => "PROXY",
            TransferOption::ProxyType => "PROXYTYPE",
            TransferOption::ProxyUserName => "PROXYUSERNAME",
            TransferOption::ProxyPassword => "PROXYPASSWORD",
            TransferOption::SslVerifyPeer => "SSL_VERIFYPEER",
            TransferOption::SslVerifyHost => "SSL_VERIFYHOST",
            TransferOption::SslVerifyStatus => "SSL_VERIFYSTATUS",
            TransferOption::ProxySslVerifyPeer => "PROXY_SSL_VERIFYPEER",
            TransferOption::ProxySslVerifyHost => "PROXY_SSL_VERIFYHOST",
            TransferOption::IpResolve => "IPRESOLVE",
            TransferOption::Interface => "INTERFACE",
            TransferOption::AutoReferer => "AUTOREFERER",
            TransferOption::FollowLocation => "FOLLOWLOCATION",
            TransferOption::Verbose => "VERBOSE",
            TransferOption::Header => "HEADER",
            TransferOption::NoBody => "NOBODY",
            TransferOption::CaInfo => "CAINFO",
            TransferOption::ReturnTransfer => "RETURNTRANSFER",
        }
    }
}

impl fmt::Display for TransferOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a transfer option.
///
/// Serialized untagged, so an exported option map is plain JSON:
/// `{"URL": "https://example.com", "TIMEOUT": 30, "HTTPHEADER": ["Accept: */*"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    /// Positional values, such as header lines.
    List(Vec<String>),
    /// Named values, such as multipart form fields.
    Fields(BTreeMap<String, String>),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            OptionValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, OptionValue::Null)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Null => f.write_str("null"),
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Text(s) => write!(f, "{:?}", s),
            OptionValue::List(items) => write!(f, "{:?}", items),
            OptionValue::Fields(fields) => write!(f, "{:?}", fields),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::List(value)
    }
}

impl From<BTreeMap<String, String>> for OptionValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        OptionValue::Fields(value)
    }
}

impl<T: Into<OptionValue>> From<Option<T>> for OptionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(OptionValue::Null, Into::into)
    }
}

/// Proxy protocol, stored as its name in the option map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    Http,
    Socks4,
    Socks4a,
    Socks5,
    Socks5Hostname,
}

impl ProxyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Http => "HTTP",
            ProxyType::Socks4 => "SOCKS4",
            ProxyType::Socks4a => "SOCKS4A",
            ProxyType::Socks5 => "SOCKS5",
            ProxyType::Socks5Hostname => "SOCKS5_HOSTNAME",
        }
    }
}

impl FromStr for ProxyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HTTP" => Ok(ProxyType::Http),
            "SOCKS4" => Ok(ProxyType::Socks4),
            "SOCKS4A" => Ok(ProxyType::Socks4a),
            "SOCKS5" => Ok(ProxyType::Socks5),
            "SOCKS5_HOSTNAME" => Ok(ProxyType::Socks5Hostname),
            _ => Err(format!("unknown proxy type '{}'", s)),
        }
    }
}

impl From<ProxyType> for OptionValue {
    fn from(value: ProxyType) -> Self {
        OptionValue::Text(value.as_str().to_owned())
    }
}

/// Address family used when resolving the host name of the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpResolve {
    #[default]
    Any,
    V4,
    V6,
}

impl IpResolve {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpResolve::Any => "WHATEVER",
            IpResolve::V4 => "V4",
            IpResolve::V6 => "V6",
        }
    }
}

impl FromStr for IpResolve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WHATEVER" | "ANY" => Ok(IpResolve::Any),
            "V4" => Ok(IpResolve::V4),
            "V6" => Ok(IpResolve::V6),
            _ => Err(format!("unknown address family '{}'", s)),
        }
    }
}

impl From<IpResolve> for OptionValue {
    fn from(value: IpResolve) -> Self {
        OptionValue::Text(value.as_str().to_owned())
    }
}
