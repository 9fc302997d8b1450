// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Logging for the tProc toolchain.
//!
//! Records go through the `log` facade with a `tproc.rust::<module>` target, so
//! a host application can filter compiler output separately from its own. No
//! logger is installed here.

use std::sync::atomic::{AtomicBool, Ordering};

#[doc(hidden)]
pub use log as _log;

#[doc(hidden)]
#[macro_export]
macro_rules! __record {
    ($level:ident, $($arg:tt)+) => {
        $crate::_log::$level!(target: concat!("tproc.rust::", module_path!()), $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        $crate::__record!(info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {
        $crate::__record!(warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        $crate::__record!(debug, $($arg)+)
    };
}

/// Log at info level, only when diagnostics were requested with [`init_logging`].
///
/// Diagnostics cover compiler internals such as register pressure and
/// scheduling statistics.
#[macro_export]
macro_rules! diagnostic {
    ($($arg:tt)+) => {
        if $crate::is_diagnostics_enabled() {
            $crate::__record!(info, $($arg)+);
        }
    };
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

/// Switch diagnostics on or off. Meant to be called once at startup.
pub fn init_logging(with_diagnostics: bool) {
    DIAGNOSTICS_ENABLED.store(with_diagnostics, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_toggle() {
        init_logging(true);
        assert!(is_diagnostics_enabled());
        diagnostic!("visible {}", 1);
        init_logging(false);
        assert!(!is_diagnostics_enabled());
        diagnostic!("suppressed");
    }

    #[test]
    fn test_level_macros() {
        info!("plain message");
        warn!("{} args", 2);
        debug!("named {value}", value = 3);
    }
}
