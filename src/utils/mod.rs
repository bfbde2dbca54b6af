//! Ambient helpers shared by the registry, the built-in modules and the host binary

pub mod error;
pub mod lock;
pub mod logging;
pub mod signal;

pub use error::{log_error, log_error_async};
pub use lock::{with_read_lock, with_write_lock};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use logging::{init_logging, init_logging_from_config};
pub use signal::{cancel_on_shutdown, wait_for_shutdown_signal};
