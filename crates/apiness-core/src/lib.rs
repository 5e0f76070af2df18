//! Core types and logic for Apiness: turning tabular data into queryable
//! HTTP read endpoints.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::TableStore`] and [`store::Connector`]; the HTTP
//! layer drives the materializer, filter compiler and route configuration
//! store defined here.

pub mod error;
pub mod filter;
pub mod ident;
pub mod kind;
pub mod materialize;
pub mod query;
pub mod routes_config;
pub mod schema;
pub mod store;
pub mod table;

pub use error::{Error, Result};
