pub mod candidate;
pub mod config;
pub mod context;
pub mod key_match;
pub mod navigator;
pub(crate) mod operators;
pub mod runtime;
