#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod error;
pub mod lro;
pub mod models;
pub mod paging;

#[cfg(feature = "test-support")]
pub mod fake;

pub use error::ArmError;
