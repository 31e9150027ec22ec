use std::time::Duration;

use curl::easy::{Easy, Form, List};
use tracing::trace;

use super::{EngineError, TransferEngine, TransferFailure, TransferInfo};
use crate::option::{IpResolve, OptionValue, ProxyType, TransferOption};

/// First libcurl release with the `PROXY_SSL_VERIFY*` options (7.52.0).
const PROXY_TLS_VERSION: u32 = 0x07_34_00;

/// Transfer engine backed by a libcurl easy handle.
///
/// Options are kept in the order they were last applied so a single option
/// can be cleared by resetting the handle and replaying the rest.
pub struct CurlEngine {
    handle: Easy,
    applied: Vec<(TransferOption, OptionValue)>,
}

impl CurlEngine {
    pub fn new() -> Self {
        Self {
            handle: Easy::new(),
            applied: Vec::new(),
        }
    }

    /// Version string of the linked libcurl.
    pub fn version() -> String {
        curl::Version::get().version().to_owned()
    }

    fn apply(&mut self, option: TransferOption, value: &OptionValue) -> Result<(), EngineError> {
        let h = &mut self.handle;
        match option {
            TransferOption::Url => h.url(text(option, value)?)?,
            TransferOption::CustomRequest => h.custom_request(text(option, value)?)?,
            TransferOption::Post => h.post(flag(option, value)?)?,
            TransferOption::HttpGet => h.get(flag(option, value)?)?,
            TransferOption::PostFields => match value {
                OptionValue::Null => {}
                OptionValue::Text(body) => h.post_fields_copy(body.as_bytes())?,
                OptionValue::Fields(fields) => {
                    let mut form = Form::new();
                    for (name, content) in fields {
                        form.part(name)
                            .contents(content.as_bytes())
                            .add()
                            .map_err(|e| EngineError(e.to_string()))?;
                    }
                    h.httppost(form)?;
                }
                _ => return Err(mismatch(option, "a string or a field map")),
            },
            TransferOption::HttpHeader => {
                let OptionValue::List(lines) = value else {
                    return Err(mismatch(option, "a list of header lines"));
                };
                let mut list = List::new();
                for line in lines {
                    list.append(line)?;
                }
                h.http_headers(list)?;
            }
            TransferOption::Cookie => h.cookie(text(option, value)?)?,
            TransferOption::CookieJar => h.cookie_jar(text(option, value)?)?,
            TransferOption::CookieFile => h.cookie_file(text(option, value)?)?,
            TransferOption::Referer => h.referer(text(option, value)?)?,
            TransferOption::UserAgent => h.useragent(text(option, value)?)?,
            TransferOption::Encoding => h.accept_encoding(text(option, value)?)?,
            TransferOption::ConnectTimeout => h.connect_timeout(seconds(option, value)?)?,
            TransferOption::Timeout => h.timeout(seconds(option, value)?)?,
            TransferOption::Proxy => h.proxy(text(option, value)?)?,
            TransferOption::ProxyType => {
                let kind = text(option, value)?
                    .parse::<ProxyType>()
                    .map_err(EngineError)?;
                h.proxy_type(match kind {
                    ProxyType::Http => curl::easy::ProxyType::Http,
                    ProxyType::Socks4 => curl::easy::ProxyType::Socks4,
                    ProxyType::Socks4a => curl::easy::ProxyType::Socks4a,
                    ProxyType::Socks5 => curl::easy::ProxyType::Socks5,
                    ProxyType::Socks5Hostname => curl::easy::ProxyType::Socks5Hostname,
                })?;
            }
            TransferOption::ProxyUserName => h.proxy_username(text(option, value)?)?,
            TransferOption::ProxyPassword => h.proxy_password(text(option, value)?)?,
            TransferOption::SslVerifyPeer => h.ssl_verify_peer(flag(option, value)?)?,
            TransferOption::SslVerifyHost => h.ssl_verify_host(flag(option, value)?)?,
            TransferOption::ProxySslVerifyPeer => h.proxy_ssl_verify_peer(flag(option, value)?)?,
            TransferOption::ProxySslVerifyHost => h.proxy_ssl_verify_host(flag(option, value)?)?,
            TransferOption::SslVerifyStatus => {
                return Err(EngineError(format!("{} is not supported by this engine", option)));
            }
            TransferOption::IpResolve => {
                let family = text(option, value)?
                    .parse::<IpResolve>()
                    .map_err(EngineError)?;
                h.ip_resolve(match family {
                    IpResolve::Any => curl::easy::IpResolve::Any,
                    IpResolve::V4 => curl::easy::IpResolve::V4,
                    IpResolve::V6 => curl::easy::IpResolve::V6,
                })?;
            }
            TransferOption::Interface => h.interface(text(option, value)?)?,
            TransferOption::AutoReferer => h.autoreferer(flag(option, value)?)?,
            TransferOption::FollowLocation => h.follow_location(flag(option, value)?)?,
            TransferOption::Verbose => h.verbose(flag(option, value)?)?,
            TransferOption::Header => h.show_header(flag(option, value)?)?,
            TransferOption::NoBody => h.nobody(flag(option, value)?)?,
            TransferOption::CaInfo => h.cainfo(text(option, value)?)?,
            // Consumed by the session; only the shape is checked.
            TransferOption::ReturnTransfer => {
                flag(option, value)?;
            }
        }
        Ok(())
    }
}

impl Default for CurlEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferEngine for CurlEngine {
    fn set_option(&mut self, option: TransferOption, value: &OptionValue) -> Result<(), EngineError> {
        self.apply(option, value)?;
        self.applied.retain(|(o, _)| *o != option);
        self.applied.push((option, value.clone()));
        Ok(())
    }

    fn clear_option(&mut self, option: TransferOption) -> Result<(), EngineError> {
        if !self.applied.iter().any(|(o, _)| *o == option) {
            return Ok(());
        }
        self.applied.retain(|(o, _)| *o != option);
        trace!(%option, remaining = self.applied.len(), "resetting handle");
        self.handle.reset();
        let replay = std::mem::take(&mut self.applied);
        let replayed = replay.iter().try_for_each(|(o, v)| self.apply(*o, v));
        self.applied = replay;
        replayed
    }

    fn supports(&self, option: TransferOption) -> bool {
        match option {
            TransferOption::SslVerifyStatus => false,
            TransferOption::ProxySslVerifyPeer | TransferOption::ProxySslVerifyHost => {
                curl::Version::get().version_num() >= PROXY_TLS_VERSION
            }
            _ => true,
        }
    }

    fn perform(&mut self, on_chunk: &mut dyn FnMut(&[u8])) -> Result<(), TransferFailure> {
        let mut transfer = self.handle.transfer();
        transfer.write_function(|data| {
            on_chunk(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
        Ok(())
    }

    fn info(&mut self) -> TransferInfo {
        let h = &mut self.handle;
        let total_time = h.total_time().unwrap_or_default();
        let downloaded = h.download_size().unwrap_or(0.0);
        TransferInfo {
            connect_time: h.connect_time().unwrap_or_default(),
            total_time,
            local_ip: h.local_ip().ok().flatten().map(str::to_owned),
            local_port: h.local_port().ok().filter(|port| *port != 0),
            download_speed: bytes_per_second(downloaded, total_time),
            http_code: h.response_code().unwrap_or(0),
        }
    }

    fn describe_error(&self, code: i32) -> String {
        curl::Error::new(code as _).description().to_owned()
    }
}

impl From<curl::Error> for EngineError {
    fn from(e: curl::Error) -> Self {
        EngineError(e.to_string())
    }
}

impl From<curl::Error> for TransferFailure {
    fn from(e: curl::Error) -> Self {
        TransferFailure {
            code: e.code() as i32,
            message: e.extra_description().unwrap_or(e.description()).to_owned(),
        }
    }
}

fn bytes_per_second(bytes: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { bytes / secs } else { 0.0 }
}

fn mismatch(option: TransferOption, expected: &str) -> EngineError {
    EngineError(format!("{} expects {}", option, expected))
}

fn text(option: TransferOption, value: &OptionValue) -> Result<&str, EngineError> {
    value.as_text().ok_or_else(|| mismatch(option, "a string"))
}

fn flag(option: TransferOption, value: &OptionValue) -> Result<bool, EngineError> {
    value.as_bool().ok_or_else(|| mismatch(option, "a boolean"))
}

fn seconds(option: TransferOption, value: &OptionValue) -> Result<Duration, EngineError> {
    value
        .as_int()
        .and_then(|secs| u64::try_from(secs).ok())
        .map(Duration::from_secs)
        .ok_or_else(|| mismatch(option, "a non-negative number of seconds"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer one request with `body` and hand back the raw request head.
    fn serve_once(body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, server)
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        let mut engine = CurlEngine::new();
        assert!(engine.set_option(TransferOption::Url, &OptionValue::Bool(true)).is_err());
        assert!(engine.set_option(TransferOption::Timeout, &OptionValue::Int(-1)).is_err());
        assert!(engine.set_option(TransferOption::ProxyType, &"ftp".into()).is_err());
        assert!(
            engine
                .set_option(TransferOption::HttpHeader, &"Accept: */*".into())
                .is_err()
        );
        assert!(engine.applied.is_empty());
    }

    #[test]
    fn test_accepts_typed_values() {
        let mut engine = CurlEngine::new();
        engine.set_option(TransferOption::Url, &"http://localhost/".into()).unwrap();
        engine.set_option(TransferOption::Timeout, &OptionValue::Int(5)).unwrap();
        engine.set_option(TransferOption::SslVerifyHost, &OptionValue::Int(2)).unwrap();
        engine
            .set_option(TransferOption::HttpHeader, &OptionValue::List(vec!["X-A: 1".into()]))
            .unwrap();
        engine.set_option(TransferOption::ProxyType, &ProxyType::Socks5.into()).unwrap();
        assert_eq!(engine.applied.len(), 5);
    }

    #[test]
    fn test_clear_replays_remaining_options_in_order() {
        let mut engine = CurlEngine::new();
        engine.set_option(TransferOption::Url, &"http://localhost/".into()).unwrap();
        engine.set_option(TransferOption::CustomRequest, &"DELETE".into()).unwrap();
        engine.set_option(TransferOption::Verbose, &false.into()).unwrap();
        engine.clear_option(TransferOption::CustomRequest).unwrap();
        let order: Vec<_> = engine.applied.iter().map(|(o, _)| *o).collect();
        assert_eq!(order, [TransferOption::Url, TransferOption::Verbose]);
    }

    #[test]
    fn test_ssl_verify_status_unsupported() {
        let mut engine = CurlEngine::new();
        assert!(!engine.supports(TransferOption::SslVerifyStatus));
        assert!(engine.supports(TransferOption::Url));
        assert!(
            engine
                .set_option(TransferOption::SslVerifyStatus, &true.into())
                .is_err()
        );
    }

    #[test]
    fn test_describe_error() {
        let engine = CurlEngine::new();
        assert!(engine.describe_error(6).to_lowercase().contains("resolve"));
    }

    #[test]
    fn test_info_after_local_transfer() {
        let (url, server) = serve_once("hello");
        let mut engine = CurlEngine::new();
        engine.set_option(TransferOption::Url, &url.as_str().into()).unwrap();

        let mut body = Vec::new();
        engine
            .perform(&mut |chunk: &[u8]| body.extend_from_slice(chunk))
            .unwrap();
        server.join().unwrap();

        let info = engine.info();
        assert_eq!(body, b"hello");
        assert_eq!(info.http_code, 200);
        assert_eq!(info.local_ip.as_deref(), Some("127.0.0.1"));
        assert!(info.local_port.is_some());
        assert!(info.download_speed >= 0.0);
        assert!(info.total_time >= info.connect_time);
    }

    #[test]
    fn test_bytes_per_second() {
        assert_eq!(bytes_per_second(2048.0, Duration::from_millis(500)), 4096.0);
        assert_eq!(bytes_per_second(2048.0, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_cleared_post_fields_are_not_sent() {
        let (url, server) = serve_once("ok");
        let mut engine = CurlEngine::new();
        engine.set_option(TransferOption::Url, &url.as_str().into()).unwrap();
        engine.set_option(TransferOption::PostFields, &"secret=1".into()).unwrap();
        engine.clear_option(TransferOption::PostFields).unwrap();
        engine.set_option(TransferOption::PostFields, &OptionValue::Null).unwrap();

        engine.perform(&mut |_| {}).unwrap();
        let request = server.join().unwrap();
        assert!(request.starts_with("GET / "), "{request}");
        assert!(!request.contains("secret=1"));
    }

    #[test]
    fn test_connection_refused_is_a_failure() {
        let closed = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", closed.local_addr().unwrap());
        drop(closed);

        let mut engine = CurlEngine::new();
        engine.set_option(TransferOption::Url, &url.as_str().into()).unwrap();
        engine.set_option(TransferOption::ConnectTimeout, &OptionValue::Int(5)).unwrap();
        let failure = engine.perform(&mut |_| {}).unwrap_err();
        assert_ne!(failure.code, 0);
        assert!(!failure.message.is_empty());
    }
}
