//! Core types and trait definitions for the school mentoring engine.
//!
//! Scoring, growth, comparison, plan templating and risk alerting are all
//! pure functions over the types here. This crate has no HTTP or database
//! dependencies; the store and API crates build on it.

// Native `async fn` in traits; the store traits spell out `Send` bounds
// on their returned futures.
#![allow(async_fn_in_trait)]

pub mod alerts;
pub mod assessment;
pub mod error;
pub mod growth;
pub mod plan;
pub mod school;
pub mod scoring;
pub mod store;
pub mod taxonomy;
pub mod templates;

pub use error::{Error, Result};
