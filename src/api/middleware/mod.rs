pub mod exception;
pub mod logging;

pub use exception::{exception_handler, handle_panic};
pub use logging::logging_middleware;
