//! Console logging that also works in native unit tests
//!
//! In the browser these forward to `zoon::println!` / `zoon::eprintln!`.
//! Natively the wasm console bindings are unavailable, so the same messages
//! go to stdout/stderr.

macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        zoon::println!($($arg)*);
        #[cfg(not(target_arch = "wasm32"))]
        std::println!($($arg)*);
    }};
}

macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        zoon::eprintln!($($arg)*);
        #[cfg(not(target_arch = "wasm32"))]
        std::eprintln!($($arg)*);
    }};
}

pub(crate) use log_error;
pub(crate) use log_info;
