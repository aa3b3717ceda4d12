//! Coaching client for a hosted backend: typed services for clients,
//! workouts, measurements, activities and nutrition, progress statistics and a
//! role-based route guard.

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod import;
pub mod models;
pub mod notify;
pub mod report;
pub mod services;
pub mod stats;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::Config;
pub use error::{ApiError, ApiResult, ErrorKind};
pub use gateway::Gateway;
