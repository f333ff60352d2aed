//! A shorter way to add error context when using the `anyhow` crate.
//!
//! Instead of `.with_context(|| anyhow!("loading {path:?}"))`, this
//! allows writing `.map_err(ctx!("loading {path:?}"))`.

#[macro_export]
macro_rules! ctx {
    ($fmt:tt) => {
        |e| anyhow::Error::from(e).context(format!($fmt))
    };
    ($fmt:tt, $($arg:tt)*) => {
        |e| anyhow::Error::from(e).context(format!($fmt, $($arg)*))
    };
}
