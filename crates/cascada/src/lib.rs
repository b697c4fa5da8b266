//! Haar cascade (Viola-Jones) object detection.
//!
//! A cascade is a sequence of boosted stages, each of which votes on whether a detection window
//! contains the trained object. Windows are rejected as soon as any stage votes against them, so
//! the vast majority of windows in an image are discarded after evaluating just a handful of
//! features.
//!
//! The crate is organized into:
//!
//! - [`haar`]: the cascade model ([`haar::HaarCascade`]) and the [`haar::HaarClassifier`] that
//!   evaluates it on a single window.
//! - [`detection`]: the multi-scale [`detection::HaarObjectDetector`] that slides the classifier
//!   across an image and merges the resulting candidates.
//! - [`image`]: integral images, rectangles and image loading.
//!
//! # Environment Variables
//!
//! * `CASCADA_THREADS`: Number of worker threads used to scan detection windows in parallel. Only
//!   takes effect if [`init_thread_pool`] is called before the first detection. If unset, one
//!   thread per logical CPU is used.

use std::sync::OnceLock;

use log::LevelFilter;

pub mod cancel;
pub mod detection;
pub mod haar;
pub mod image;
pub mod timer;

#[cfg(test)]
mod test;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and cascada will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}

const THREADS_ENV_VAR: &str = "CASCADA_THREADS";

/// Configures the global worker pool used for parallel window scanning.
///
/// `threads` takes precedence over the `CASCADA_THREADS` environment variable. If neither is set,
/// rayon's default (one thread per logical CPU) is used.
///
/// The pool can only be configured once per process. Subsequent calls return the outcome of the
/// first call.
pub fn init_thread_pool(threads: Option<usize>) -> anyhow::Result<()> {
    static RESULT: OnceLock<Result<(), String>> = OnceLock::new();

    RESULT
        .get_or_init(|| {
            let threads = match threads {
                Some(n) => Some(n),
                None => match std::env::var(THREADS_ENV_VAR) {
                    Ok(value) => Some(value.trim().parse::<usize>().map_err(|e| {
                        format!("invalid value '{value}' for {THREADS_ENV_VAR}: {e}")
                    })?),
                    Err(_) => None,
                },
            };

            let mut builder = rayon::ThreadPoolBuilder::new();
            if let Some(n) = threads {
                if n == 0 {
                    return Err(format!("{THREADS_ENV_VAR} must be at least 1"));
                }
                builder = builder.num_threads(n);
            }
            builder.build_global().map_err(|e| e.to_string())?;

            log::debug!(
                "initialized detection thread pool with {} threads",
                rayon::current_num_threads()
            );
            Ok(())
        })
        .clone()
        .map_err(anyhow::Error::msg)
}
