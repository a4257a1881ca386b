//! Logging shorthands shared by every crate in the workspace.
//!
//! They forward to `tracing`, so whatever subscriber the binary installs decides
//! how the lines look. `success!` uses its own target so formatters can tell a
//! positive outcome apart from plain information.

/// Target used for events that report a successful step.
pub const SUCCESS_TARGET: &str = "vhunt::success";

/// Target used for raw console output (findings, summaries).
pub const PRINT_TARGET: &str = "vhunt::print";

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "vhunt::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::tracing::warn!($($arg)*)
    };
}

