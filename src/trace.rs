//! Optional structured logging.
//!
//! Every event goes through [`event!`], which forwards to `tracing` when the
//! `with-tracing` feature is enabled and expands to nothing otherwise, so the
//! resolution core has no side channel beyond its network calls.

macro_rules! event {
    ($level:ident, $($arg:tt)+) => {
        #[cfg(feature = "with-tracing")]
        {
            tracing::$level!($($arg)+);
        }
    };
}

pub(crate) use event;
