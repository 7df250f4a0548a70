//! Request handlers for the scan station.

mod configure;
mod export;
mod scan;
mod session;
mod upload;
mod websocket;

pub use configure::*;
pub use export::*;
pub use scan::*;
pub use session::*;
pub use upload::*;
pub use websocket::*;

use tally_engine::Timestamp;

/// Current wall clock time in milliseconds since epoch.
pub(crate) fn now_millis() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
