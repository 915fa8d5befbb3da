//! Core types and trait definitions for the Countrydle game server.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! game rules (quotas, terminal states, scoring, ranking, round scheduling)
//! live here; storage and inference backends plug in through the traits in
//! [`store`] and [`oracle`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod country;
pub mod error;
pub mod oracle;
pub mod record;
pub mod round;
pub mod schedule;
pub mod session;
pub mod split;
pub mod standing;
pub mod store;
pub mod user;

pub use error::{Error, Result};
