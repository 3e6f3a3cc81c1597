//! Adapters - Implementations of port interfaces.
//!
//! - `stripe` - billing provider REST client and mock
//! - `postgres` - transactional subscription state store
//! - `redis` - entitlement cache and activity publisher
//! - `memory` - in-process doubles with fault injection
//! - `http` - axum routes

pub mod http;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod stripe;
