//! Locator configuration: active compilation conditions and matcher options.

pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError, ConfigOrigin};
pub use schema::{ConditionsSection, LocatorConfig, ValidationError, ValidationIssue};
