//! http handlers for wispd endpoints.

mod admin;
mod config;
mod error;
mod health;
pub mod hmac_auth;
mod middleware;
mod ow_api;
mod register;
mod report_status;

pub use admin::{create_template, get_device, issue_secret, list_devices, list_templates};
pub use config::{checksum, download_config};
pub use error::{ApiError, OptionExt, ResultExt, panic_to_problem};
pub use health::health;
pub use middleware::{openwisp_header, shared_secret_auth};
pub use ow_api::{ow_adopt, ow_config_applied, ow_get_config};
pub use register::register;
pub use report_status::report_status;
