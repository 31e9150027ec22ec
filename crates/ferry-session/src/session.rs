use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ferry_cookie::form_encode;
use tracing::{debug, info, warn};
use url::Url;

use crate::clock::{Clock, SystemClock, pause_duration};
use crate::config::SessionConfig;
use crate::engine::{TransferEngine, TransferFailure};
use crate::error::{Error, Result};
use crate::option::{IpResolve, OptionValue, ProxyType, TransferOption};
use crate::param::{ParamValue, SessionParam};
use crate::progress::ProgressSnapshot;

#[cfg(feature = "curl")]
use crate::engine::CurlEngine;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const MEBIBYTE: f64 = 1024.0 * 1024.0;

/// Callback invoked for every received body chunk.
pub type ProgressCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Outcome of [`TransferSession::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    /// Response body, returned when RETURNTRANSFER is enabled.
    Body(Vec<u8>),

    /// The transfer succeeded and the body was written to the output sink.
    Completed,

    /// The engine reported an error. Details are available from
    /// [`TransferSession::error_code`] and [`TransferSession::error_message`].
    Failed,
}

impl TransferResult {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, TransferResult::Failed)
    }

    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            TransferResult::Body(body) => Some(body),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_body(self) -> Option<Vec<u8>> {
        match self {
            TransferResult::Body(body) => Some(body),
            _ => None,
        }
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.body().map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

/// One configurable HTTP transfer.
///
/// Setters forward each option to the engine immediately and record it; a
/// rejected option is never recorded. `execute` runs the transfer and the
/// getters read the engine's report about it afterwards.
///
/// # Examples
///
/// ```no_run
/// use ferry_session::TransferSession;
///
/// # fn main() -> ferry_session::Result<()> {
/// let mut session = TransferSession::new()?;
/// session
///     .set_post(false)?
///     .set_return(true)?
///     .set_header(false)?
///     .set_user_agent("Mozilla/5.0 (X11; Linux x86_64)")?
///     .set_url("https://www.example.com/search?q=hello+world")?;
///
/// let result = session.execute();
/// if result.is_failed() {
///     eprintln!("{}: {}", session.error_code(), session.error_message());
/// }
/// # Ok(())
/// # }
/// ```
pub struct TransferSession<E: TransferEngine, C: Clock = SystemClock> {
    engine: E,
    clock: C,
    options: BTreeMap<TransferOption, OptionValue>,
    params: BTreeMap<SessionParam, ParamValue>,
    sleep_min_seconds: Option<u64>,
    sleep_max_seconds: Option<u64>,
    bom_removing: bool,
    allow_follow_location: bool,
    progress: ProgressSnapshot,
    last_failure: Option<TransferFailure>,
    output: Box<dyn Write + Send>,
    on_progress: Option<ProgressCallback>,
}

#[cfg(feature = "curl")]
impl TransferSession<CurlEngine> {
    /// Create a libcurl-backed session with the default configuration.
    pub fn new() -> Result<Self> {
        Self::from_config(SessionConfig::default())
    }

    pub fn from_config(config: SessionConfig) -> Result<Self> {
        Self::with_engine(CurlEngine::new(), SystemClock, config)
    }
}

impl<E: TransferEngine, C: Clock> TransferSession<E, C> {
    /// Create a session over an arbitrary engine and clock.
    ///
    /// # Errors
    ///
    /// Fails if the configured CA bundle does not exist or the engine rejects
    /// one of the default options.
    pub fn with_engine(engine: E, clock: C, config: SessionConfig) -> Result<Self> {
        if !config.ca_bundle.is_file() {
            return Err(Error::MissingCaBundle(config.ca_bundle));
        }

        let mut session = Self {
            engine,
            clock,
            options: BTreeMap::new(),
            params: BTreeMap::new(),
            sleep_min_seconds: None,
            sleep_max_seconds: None,
            bom_removing: false,
            allow_follow_location: config.allow_follow_location,
            progress: ProgressSnapshot::default(),
            last_failure: None,
            output: Box::new(std::io::stdout()),
            on_progress: None,
        };

        session
            .set_connect_timeout(config.connect_timeout)?
            .set_timeout(config.timeout)?
            .set_ca_info(&config.ca_bundle)?;

        if config.bom_removing {
            session.set_bom_removing(true);
        }
        if let Some(secs) = config.sleep_min_seconds {
            session.set_sleep_min_seconds(secs);
        }
        if let Some(secs) = config.sleep_max_seconds {
            session.set_sleep_max_seconds(secs);
        }

        debug!(ca_bundle = %config.ca_bundle.display(), "transfer session created");
        Ok(session)
    }

    fn set_option(&mut self, option: TransferOption, value: OptionValue) -> Result<()> {
        if let Err(e) = self.engine.set_option(option, &value) {
            return Err(Error::OptionRejected {
                option,
                value: loggable(option, &value),
                reason: e.0,
            });
        }
        debug!(%option, value = %loggable(option, &value), "option applied");
        self.options.insert(option, value);
        Ok(())
    }

    fn clear_option(&mut self, option: TransferOption) -> Result<()> {
        if let Err(e) = self.engine.clear_option(option) {
            return Err(Error::OptionRejected {
                option,
                value: "default".to_owned(),
                reason: e.0,
            });
        }
        self.options.remove(&option);
        Ok(())
    }

    pub fn set_url(&mut self, url: &str) -> Result<&mut Self> {
        self.set_option(TransferOption::Url, url.into())?;
        Ok(self)
    }

    pub fn set_user_agent(&mut self, user_agent: &str) -> Result<&mut Self> {
        self.set_option(TransferOption::UserAgent, user_agent.into())?;
        Ok(self)
    }

    /// Set the `Cookie` request header, e.g. `"a=1; b=2"`.
    pub fn set_cookie(&mut self, cookie: &str) -> Result<&mut Self> {
        self.set_option(TransferOption::Cookie, cookie.into())?;
        Ok(self)
    }

    /// Switch between POST and GET.
    ///
    /// Any custom method set by [`set_delete`](Self::set_delete) is cleared.
    /// Switching to GET also drops a pending POST body.
    pub fn set_post(&mut self, post: bool) -> Result<&mut Self> {
        self.clear_option(TransferOption::CustomRequest)?;
        if post {
            self.clear_option(TransferOption::HttpGet)?;
            self.set_option(TransferOption::Post, true.into())?;
        } else {
            self.clear_option(TransferOption::PostFields)?;
            self.set_option(TransferOption::Post, false.into())?;
            self.set_option(TransferOption::HttpGet, true.into())?;
        }
        Ok(self)
    }

    /// Set the request body.
    ///
    /// Accepts null (no body), a string (sent as is) or a non-empty map of
    /// named fields (sent as `multipart/form-data`). Null drops any body set
    /// earlier.
    ///
    /// # Errors
    ///
    /// Rejects an empty field map, a positional list and scalar values.
    pub fn set_post_fields(&mut self, fields: impl Into<OptionValue>) -> Result<&mut Self> {
        let fields = fields.into();
        validate_post_fields(&fields)?;
        if fields.is_null() {
            self.clear_option(TransferOption::PostFields)?;
        } else {
            self.clear_option(TransferOption::HttpGet)?;
        }
        self.set_option(TransferOption::PostFields, fields)?;
        Ok(self)
    }

    pub fn set_referer(&mut self, referer: &str) -> Result<&mut Self> {
        self.set_option(TransferOption::Referer, referer.into())?;
        Ok(self)
    }

    /// Return the body from `execute` instead of writing it to the output
    /// sink.
    pub fn set_return(&mut self, return_body: bool) -> Result<&mut Self> {
        self.set_option(TransferOption::ReturnTransfer, return_body.into())?;
        Ok(self)
    }

    /// Include the response header block in the body.
    pub fn set_header(&mut self, include: bool) -> Result<&mut Self> {
        self.set_option(TransferOption::Header, include.into())?;
        Ok(self)
    }

    pub fn set_no_body(&mut self, no_body: bool) -> Result<&mut Self> {
        self.set_option(TransferOption::NoBody, no_body.into())?;
        Ok(self)
    }

    /// Follow `Location` redirects. Ignored when the session configuration
    /// disallows redirect following.
    pub fn set_follow_location(&mut self, follow: bool) -> Result<&mut Self> {
        if !self.allow_follow_location {
            warn!(follow, "redirect following is disabled by configuration, ignoring");
            return Ok(self);
        }
        self.set_option(TransferOption::FollowLocation, follow.into())?;
        Ok(self)
    }

    /// Set the proxy address, e.g. `"10.0.0.1:3128"`.
    pub fn set_proxy(&mut self, proxy: &str) -> Result<&mut Self> {
        self.set_option(TransferOption::Proxy, proxy.into())?;
        Ok(self)
    }

    pub fn set_proxy_type(&mut self, kind: ProxyType) -> Result<&mut Self> {
        self.set_option(TransferOption::ProxyType, kind.into())?;
        Ok(self)
    }

    pub fn set_proxy_user(&mut self, user: &str) -> Result<&mut Self> {
        self.set_option(TransferOption::ProxyUserName, user.into())?;
        Ok(self)
    }

    pub fn set_proxy_password(&mut self, password: &str) -> Result<&mut Self> {
        self.set_option(TransferOption::ProxyPassword, password.into())?;
        Ok(self)
    }

    /// Toggle TLS verification towards the proxy.
    ///
    /// Skipped silently when the engine has no proxy TLS options.
    pub fn set_proxy_ssl_no_verify(&mut self, verify: bool) -> Result<&mut Self> {
        let supported = self.engine.supports(TransferOption::ProxySslVerifyPeer)
            && self.engine.supports(TransferOption::ProxySslVerifyHost);
        if !supported {
            debug!(verify, "engine has no proxy TLS options, skipping");
            return Ok(self);
        }
        self.set_option(TransferOption::ProxySslVerifyPeer, verify.into())?;
        self.set_option(TransferOption::ProxySslVerifyHost, host_check_level(verify))?;
        Ok(self)
    }

    pub fn set_verbose(&mut self, verbose: bool) -> Result<&mut Self> {
        self.set_option(TransferOption::Verbose, verbose.into())?;
        Ok(self)
    }

    /// Toggle TLS verification.
    ///
    /// `false` disables both the peer and the host check. `true` enables the
    /// peer check and the strict host check, plus certificate status checking
    /// when the engine supports it.
    pub fn set_ssl_no_verify(&mut self, verify: bool) -> Result<&mut Self> {
        self.set_option(TransferOption::SslVerifyPeer, verify.into())?;
        self.set_option(TransferOption::SslVerifyHost, host_check_level(verify))?;
        if self.engine.supports(TransferOption::SslVerifyStatus) {
            self.set_option(TransferOption::SslVerifyStatus, verify.into())?;
        } else {
            debug!(verify, "engine has no certificate status option, skipping");
        }
        Ok(self)
    }

    pub fn set_ip_resolve(&mut self, family: IpResolve) -> Result<&mut Self> {
        self.set_option(TransferOption::IpResolve, family.into())?;
        Ok(self)
    }

    /// Bind the outgoing connection to an interface name, IP or host name.
    pub fn set_interface(&mut self, interface: &str) -> Result<&mut Self> {
        self.set_option(TransferOption::Interface, interface.into())?;
        Ok(self)
    }

    pub fn set_auto_referer(&mut self, auto: bool) -> Result<&mut Self> {
        self.set_option(TransferOption::AutoReferer, auto.into())?;
        Ok(self)
    }

    /// Set `Accept-Encoding`. An empty string asks for every encoding the
    /// engine can decode.
    pub fn set_encoding(&mut self, encoding: &str) -> Result<&mut Self> {
        self.set_option(TransferOption::Encoding, encoding.into())?;
        Ok(self)
    }

    pub fn set_connect_timeout(&mut self, secs: u64) -> Result<&mut Self> {
        self.set_option(TransferOption::ConnectTimeout, seconds(secs))?;
        Ok(self)
    }

    pub fn set_timeout(&mut self, secs: u64) -> Result<&mut Self> {
        self.set_option(TransferOption::Timeout, seconds(secs))?;
        Ok(self)
    }

    /// File the engine writes received cookies to when the handle is dropped.
    pub fn set_cookie_jar(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        self.set_option(TransferOption::CookieJar, path_value(path.as_ref()))?;
        Ok(self)
    }

    /// File the engine reads cookies from before the transfer.
    pub fn set_cookie_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        self.set_option(TransferOption::CookieFile, path_value(path.as_ref()))?;
        Ok(self)
    }

    /// Use a different CA certificate bundle.
    ///
    /// # Errors
    ///
    /// Fails if `path` is not an existing file.
    pub fn set_ca_info(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::FileNotFound {
                option: TransferOption::CaInfo,
                path: path.to_path_buf(),
            });
        }
        self.set_option(TransferOption::CaInfo, path_value(path))?;
        Ok(self)
    }

    /// Replace the request headers, one `"Name: value"` line each.
    pub fn set_http_header<I, S>(&mut self, headers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = headers.into_iter().map(Into::into).collect::<Vec<_>>();
        self.set_option(TransferOption::HttpHeader, OptionValue::List(lines))?;
        Ok(self)
    }

    /// Send the request with the `DELETE` method.
    pub fn set_delete(&mut self) -> Result<&mut Self> {
        self.set_option(TransferOption::CustomRequest, "DELETE".into())?;
        Ok(self)
    }

    /// Sleep a random whole number of seconds in `[min, max]` before every
    /// transfer.
    pub fn set_pause(&mut self, min: u64, max: u64) -> &mut Self {
        self.set_sleep_min_seconds(min);
        self.set_sleep_max_seconds(max);
        self
    }

    fn set_sleep_min_seconds(&mut self, secs: u64) -> &mut Self {
        self.sleep_min_seconds = Some(secs);
        self.params.insert(SessionParam::SleepMinSeconds, secs.into());
        self
    }

    fn set_sleep_max_seconds(&mut self, secs: u64) -> &mut Self {
        self.sleep_max_seconds = Some(secs);
        self.params.insert(SessionParam::SleepMaxSeconds, secs.into());
        self
    }

    /// Strip a leading UTF-8 byte order mark from returned bodies.
    pub fn set_bom_removing(&mut self, remove: bool) -> &mut Self {
        self.bom_removing = remove;
        self.params.insert(SessionParam::BomRemoving, remove.into());
        self
    }

    /// Where the body goes when RETURNTRANSFER is off. Defaults to stdout.
    pub fn set_output(&mut self, output: impl Write + Send + 'static) -> &mut Self {
        self.output = Box::new(output);
        self
    }

    pub fn on_progress(&mut self, callback: ProgressCallback) -> &mut Self {
        self.on_progress = Some(callback);
        self
    }

    /// Every option applied so far, keyed by identifier.
    pub fn export_options(&self) -> &BTreeMap<TransferOption, OptionValue> {
        &self.options
    }

    /// Session parameters set so far, keyed by name.
    pub fn export_params(&self) -> &BTreeMap<SessionParam, ParamValue> {
        &self.params
    }

    /// Replace the recorded options and apply each entry to the engine.
    ///
    /// Entries are applied in identifier order; on the first rejected entry
    /// the error is returned and the entries before it stay applied.
    pub fn import_options(
        &mut self,
        options: BTreeMap<TransferOption, OptionValue>,
    ) -> Result<&mut Self> {
        if options.is_empty() {
            return Err(Error::EmptyImport("options"));
        }
        self.options.clear();
        for (option, value) in options {
            match option {
                TransferOption::PostFields => {
                    self.set_post_fields(value)?;
                }
                _ => self.set_option(option, value)?,
            }
        }
        Ok(self)
    }

    /// Replace the recorded session parameters.
    ///
    /// Every entry is checked before any is applied, so a rejected import
    /// leaves the session unchanged.
    pub fn import_params(&mut self, params: BTreeMap<String, ParamValue>) -> Result<&mut Self> {
        if params.is_empty() {
            return Err(Error::EmptyImport("params"));
        }

        enum Update {
            SleepMin(u64),
            SleepMax(u64),
            BomRemoving(bool),
        }

        let mut updates = Vec::with_capacity(params.len());
        for (name, value) in params {
            let Ok(param) = name.parse::<SessionParam>() else {
                return Err(Error::UnknownParam(name));
            };
            let update = match param {
                SessionParam::SleepMinSeconds => value.seconds().map(Update::SleepMin),
                SessionParam::SleepMaxSeconds => value.seconds().map(Update::SleepMax),
                SessionParam::BomRemoving => value.flag().map(Update::BomRemoving),
            };
            let Some(update) = update else {
                return Err(Error::InvalidParamValue {
                    param,
                    value: value.to_string(),
                });
            };
            updates.push(update);
        }

        self.params.clear();
        self.sleep_min_seconds = None;
        self.sleep_max_seconds = None;
        self.bom_removing = false;
        for update in updates {
            match update {
                Update::SleepMin(secs) => self.set_sleep_min_seconds(secs),
                Update::SleepMax(secs) => self.set_sleep_max_seconds(secs),
                Update::BomRemoving(remove) => self.set_bom_removing(remove),
            };
        }
        Ok(self)
    }

    /// Run the transfer.
    ///
    /// Sleeps first when both pause bounds are set. Network failures never
    /// surface as errors: they yield [`TransferResult::Failed`] and leave the
    /// details in [`error_code`](Self::error_code) and
    /// [`error_message`](Self::error_message).
    pub fn execute(&mut self) -> TransferResult {
        self.progress.reset();

        if let (Some(min), Some(max)) = (self.sleep_min_seconds, self.sleep_max_seconds) {
            let pause = pause_duration(min, max, &mut rand::rng());
            debug!(?pause, "pausing before transfer");
            self.clock.sleep(pause);
        }

        let return_body = self
            .options
            .get(&TransferOption::ReturnTransfer)
            .and_then(OptionValue::as_bool)
            .unwrap_or(false);

        let mut body = Vec::new();
        self.progress.start_time = Some(self.clock.now());
        let performed = {
            let progress = &mut self.progress;
            let clock = &self.clock;
            let on_progress = self.on_progress.as_deref();
            self.engine.perform(&mut |chunk: &[u8]| {
                progress.record_chunk(chunk.len(), clock.now());
                if let Some(callback) = on_progress {
                    callback(&*progress);
                }
                body.extend_from_slice(chunk);
            })
        };
        self.progress.end_time = Some(self.clock.now());

        if let Err(failure) = performed {
            warn!(code = failure.code, message = %failure.message, "transfer failed");
            self.last_failure = Some(failure);
            return TransferResult::Failed;
        }
        self.last_failure = None;

        info!(
            bytes = body.len(),
            seconds = self.progress.execution_time(),
            "transfer completed"
        );

        if return_body {
            if self.bom_removing && body.starts_with(UTF8_BOM) {
                body.drain(..UTF8_BOM.len());
            }
            return TransferResult::Body(body);
        }

        if let Err(e) = self.output.write_all(&body).and_then(|()| self.output.flush()) {
            warn!(error = %e, "failed to write response body to output");
        }
        TransferResult::Completed
    }

    /// The request payload: the POST body if one is set, otherwise the query
    /// string of the URL, otherwise empty.
    pub fn query(&self) -> String {
        match self.options.get(&TransferOption::PostFields) {
            Some(OptionValue::Text(body)) if !body.is_empty() => return body.clone(),
            Some(OptionValue::Fields(fields)) => {
                return fields
                    .iter()
                    .map(|(name, value)| format!("{}={}", form_encode(name), form_encode(value)))
                    .collect::<Vec<_>>()
                    .join("&");
            }
            _ => {}
        }

        self.options
            .get(&TransferOption::Url)
            .and_then(OptionValue::as_text)
            .and_then(|url| Url::parse(url).ok())
            .and_then(|url| url.query().map(str::to_owned))
            .unwrap_or_default()
    }

    /// Time until the connection to the remote host was established.
    pub fn connection_time(&mut self) -> Duration {
        self.engine.info().connect_time
    }

    /// Total duration of the last transfer as measured by the engine.
    pub fn total_time(&mut self) -> Duration {
        self.engine.info().total_time
    }

    pub fn local_ip(&mut self) -> Option<String> {
        self.engine.info().local_ip
    }

    pub fn local_port(&mut self) -> Option<u16> {
        self.engine.info().local_port
    }

    /// Average download speed in MiB/s, rounded to four decimals.
    pub fn download_speed(&mut self) -> f64 {
        let mib = self.engine.info().download_speed / MEBIBYTE;
        (mib * 10_000.0).round() / 10_000.0
    }

    /// Last received HTTP status code, `0` if none.
    pub fn http_code(&mut self) -> u32 {
        self.engine.info().http_code
    }

    /// Engine error code of the last execution, `0` if it succeeded.
    pub fn error_code(&self) -> i32 {
        self.last_failure.as_ref().map_or(0, |f| f.code)
    }

    /// Engine error message of the last execution, empty if it succeeded.
    pub fn error_message(&self) -> &str {
        self.last_failure.as_ref().map_or("", |f| f.message.as_str())
    }

    pub fn error_message_by_code(&self, code: i32) -> String {
        self.engine.describe_error(code)
    }

    /// Seconds between the start and end of the last execution.
    pub fn execution_time(&self) -> f64 {
        self.progress.execution_time()
    }

    pub fn progress(&self) -> &ProgressSnapshot {
        &self.progress
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<E: TransferEngine, C: Clock> fmt::Debug for TransferSession<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferSession")
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .field("params", &self.params)
            .field("bom_removing", &self.bom_removing)
            .field("progress", &self.progress)
            .field("last_failure", &self.last_failure)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

fn validate_post_fields(value: &OptionValue) -> Result<()> {
    match value {
        OptionValue::Null | OptionValue::Text(_) => Ok(()),
        OptionValue::Fields(fields) if fields.is_empty() => {
            Err(Error::InvalidPostFields("field map is empty"))
        }
        OptionValue::Fields(_) => Ok(()),
        OptionValue::List(items) if items.is_empty() => {
            Err(Error::InvalidPostFields("field map is empty"))
        }
        OptionValue::List(_) => Err(Error::InvalidPostFields(
            "field names must be strings, got a positional list",
        )),
        OptionValue::Bool(_) | OptionValue::Int(_) => Err(Error::InvalidPostFields(
            "expected null, a string or a field map",
        )),
    }
}

/// Host verification level: 0 disables it, 2 requires the name to match.
fn host_check_level(verify: bool) -> OptionValue {
    OptionValue::Int(if verify { 2 } else { 0 })
}

fn seconds(secs: u64) -> OptionValue {
    OptionValue::Int(i64::try_from(secs).unwrap_or(i64::MAX))
}

fn path_value(path: &Path) -> OptionValue {
    OptionValue::Text(path.to_string_lossy().into_owned())
}

fn loggable(option: TransferOption, value: &OptionValue) -> String {
    match option {
        TransferOption::ProxyPassword => "***".to_owned(),
        _ => value.to_string(),
    }
}
