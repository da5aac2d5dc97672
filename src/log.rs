//! Logging macros, enabled by the `log` feature.
//!
//! Without the feature, arguments are still type checked so that values only used for logging
//! do not trigger unused warnings.
#![allow(unused, reason = "logger")]

macro_rules! info {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::info!(target: "plume", $($tt)*);
        #[cfg(not(feature = "log"))]
        $crate::log::discard!($($tt)*);
    };
}

macro_rules! debug {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::debug!(target: "plume", $($tt)*);
        #[cfg(not(feature = "log"))]
        $crate::log::discard!($($tt)*);
    };
}

macro_rules! warning {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::warn!(target: "plume", $($tt)*);
        #[cfg(not(feature = "log"))]
        $crate::log::discard!($($tt)*);
    };
}

macro_rules! error {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::error!(target: "plume", $($tt)*);
        #[cfg(not(feature = "log"))]
        $crate::log::discard!($($tt)*);
    };
}

macro_rules! discard {
    ($($tt:tt)*) => {{
        let _ = format_args!($($tt)*);
    }};
}

pub(crate) use {debug, discard, error, info, warning};
