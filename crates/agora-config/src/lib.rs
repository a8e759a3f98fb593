//! # Agora Config
//!
//! Configuration management for the Agora debate runner.

mod error;
mod loader;
mod locale;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use locale::{Locale, LocaleSetting};
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
