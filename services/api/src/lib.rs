//! Products API service
//!
//! Product CRUD behind the bearer-token gate from the `auth` crate, plus the
//! router composition, seed data and server configuration used by the
//! `products-api` binary.

pub mod config;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod seed;
pub mod state;

pub use state::AppState;
