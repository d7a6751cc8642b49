pub mod address;
pub mod logger;

// Re-export common utilities
pub use address::{is_valid_address, is_valid_domain, is_valid_ipv4};
pub use logger::init_logging;
