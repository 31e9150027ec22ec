//! Fluent configuration and execution of single HTTP transfers.
//!
//! # Architecture
//!
//! - [`TransferSession`] - Option builder, execution and post-transfer diagnostics
//! - [`TransferEngine`] - The native engine boundary ([`CurlEngine`] in production)
//! - [`ProgressSnapshot`] - Timing and download bookkeeping of the last execution
//! - [`SessionConfig`] - Construction defaults, loadable from TOML and the environment
//!
//! # Key Features
//!
//! - **Recorded options**: every accepted option can be exported and re-imported
//! - **Non-throwing transfers**: network failures are a result variant, not an error
//! - **Pacing**: optional random pause between requests
//! - **Mechanism-only**: no retries, pooling or redirect logic beyond the engine's own
//!
//! # Example
//!
//! ```no_run
//! use ferry_session::{TransferResult, TransferSession, parse_cookie};
//!
//! # fn main() -> ferry_session::Result<()> {
//! let mut session = TransferSession::new()?;
//! session
//!     .set_url("https://example.com/")?
//!     .set_return(true)?
//!     .set_header(true)?
//!     .set_pause(1, 3);
//!
//! if let TransferResult::Body(body) = session.execute() {
//!     let cookies = parse_cookie(&String::from_utf8_lossy(&body));
//!     println!("{:?} in {:.3}s", cookies, session.execution_time());
//! }
//! # Ok(())
//! # }
//! ```

pub use self::clock::{Clock, SystemClock, pause_duration};
pub use self::config::{SessionConfig, bundled_ca_path};
pub use self::engine::{EngineError, TransferEngine, TransferFailure, TransferInfo};
pub use self::error::{Error, Result};
pub use self::option::{IpResolve, OptionValue, ProxyType, TransferOption};
pub use self::param::{ParamValue, SessionParam};
pub use self::progress::ProgressSnapshot;
pub use self::session::{ProgressCallback, TransferResult, TransferSession};
pub use ferry_cookie::parse_cookie;

#[cfg(feature = "curl")]
pub use self::engine::CurlEngine;

mod clock;
mod config;
mod engine;
mod error;
mod option;
mod param;
mod progress;
mod session;
