pub mod constants;
pub mod models;
pub mod platform;
pub mod process;
pub mod settings;
pub mod store;
pub mod utils;
pub mod validator;
pub mod vfs;

// Re-export the main store types for easier access
pub use models::{SingBoxConfig, SystemConfig, TrojanStatus, TunnelConfig, TunnelDocument};
pub use platform::Platform;
pub use settings::StoreSettings;
pub use store::{ConfStore, StoreError, StoreEvent};
pub use validator::{validate, Issue, SchemaId, ValidationErrors};
