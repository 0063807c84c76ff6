#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod artifacts;
pub mod batch;
pub mod config;
pub mod context;
pub mod gateway;
pub mod response;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_fixtures;

#[path = "../encode/mod.rs"]
pub mod encode;

#[path = "../forest/mod.rs"]
pub mod forest;

pub use context::{ServiceError, ServingContext};
