#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::pedantic
)]
#![allow(clippy::module_name_repetitions)]
#![forbid(unsafe_code)]

mod config;
pub mod service;

pub use config::{ConfigurationError, ProxyConfig, ServicePrincipal, STORAGE_SCOPE};

#[cfg(feature = "router")]
pub mod api;
#[cfg(feature = "router")]
pub mod metrics;
#[cfg(feature = "router")]
mod request_metadata;
#[cfg(feature = "router")]
pub(crate) mod tracing;

#[cfg(test)]
pub(crate) mod test_util;
