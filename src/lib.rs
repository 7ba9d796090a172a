#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod api;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod map;
pub mod model;
pub mod notify;
pub mod offline_store;
pub mod projection;
pub mod reconcile;

pub use app::{App, Model, ToastKind, ViewModel};
pub use capabilities::{Capabilities, Effect};
pub use config::Config;
pub use crux_core::{render::Render, App as CruxApp};
pub use error::{CoreError, CoreResult, ErrorKind, UserFacingError};
pub use event::{BearerToken, Event, FetchScope};

/// Length of the description excerpt shown on report cards.
pub const DESCRIPTION_PREVIEW_LENGTH: usize = 80;

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_after_epoch() {
        assert!(get_current_time_ms() > 1_600_000_000_000);
    }

    #[test]
    fn test_toast_durations() {
        assert_eq!(ToastKind::Success.default_duration_ms(), 2000);
        assert_eq!(ToastKind::Error.default_duration_ms(), 5000);
        assert_eq!(ToastKind::default(), ToastKind::Info);
    }
}
