//! Logging shim
//!
//! Forwards to `defmt` or `log` depending on enabled features and compiles
//! to nothing when neither is enabled (host tests). Arguments are still
//! borrowed in that case so call sites do not trip unused-variable lints.
#![macro_use]
#![allow(unused_macros)]

macro_rules! log_shim {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::$level!($s $(, $x)*);
            #[cfg(all(feature = "log", not(feature = "defmt")))]
            ::log::$level!($s $(, $x)*);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! trace {
    ($($arg:tt)*) => { log_shim!(trace, $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { log_shim!(debug, $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { log_shim!(info, $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { log_shim!(warn, $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { log_shim!(error, $($arg)*) };
}

#[cfg(feature = "defmt")]
pub(crate) use defmt::Debug2Format;

/// Print any `Debug` value with `{:?}`, mirroring `defmt::Debug2Format`
#[cfg(not(feature = "defmt"))]
pub(crate) struct Debug2Format<'a, T: core::fmt::Debug + ?Sized>(pub &'a T);

#[cfg(not(feature = "defmt"))]
impl<T: core::fmt::Debug + ?Sized> core::fmt::Debug for Debug2Format<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}
