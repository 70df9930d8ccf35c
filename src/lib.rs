//! Storefront core
//!
//! The stateful pieces behind a lighting storefront: a client-side shopping
//! cart with favorites, persisted through a small storage port, and a
//! fixed-window rate limiter for API route groups.

pub mod cart;
pub mod clock;
pub mod config;
pub mod error;
pub mod ratelimit;
pub mod storage;
