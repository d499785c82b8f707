//! Feature-gated pipeline-stage tracing. Each macro forwards straight to
//! `saying::say!` when its feature is enabled and compiles to nothing
//! otherwise, so none of this costs anything in a release build.

#[macro_export]
#[cfg(feature = "show_tokens")]
macro_rules! token_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_tokens"))]
macro_rules! token_log {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(feature = "show_ast")]
macro_rules! parse_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_ast"))]
macro_rules! parse_log {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(feature = "show_modules")]
macro_rules! module_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_modules"))]
macro_rules! module_log {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(feature = "show_types")]
macro_rules! type_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_types"))]
macro_rules! type_log {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(feature = "show_emit")]
macro_rules! emit_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_emit"))]
macro_rules! emit_log {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(feature = "detailed_timers")]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        saying::say!($msg, Green #$time.elapsed());
    };
}

#[macro_export]
#[cfg(not(feature = "detailed_timers"))]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {};
}

pub use crate::emit_log;
pub use crate::module_log;
pub use crate::parse_log;
pub use crate::timer_log;
pub use crate::token_log;
pub use crate::type_log;
