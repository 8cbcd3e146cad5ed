//! # GraphQL Transport
//!
//! Executes the Star Wars API queries over HTTP and decodes their fragments.
//!
//! ## Overview
//!
//! - [`Query`]: the named operations and their documents
//! - [`TransportClient`]: the seam repositories depend on
//! - [`GraphQlTransport`]: the production implementation over
//!   [`bridge_traits::http::HttpClient`]
//!
//! The transport performs no caching. Every [`TransportClient::fetch`] is one
//! round trip.

pub mod client;
pub mod error;
pub mod fragments;
pub mod query;
pub mod transport;

pub use client::GraphQlTransport;
pub use error::{Result, TransportError};
pub use fragments::{FilmFragment, FragmentList, HomeworldFragment, PersonFragment};
pub use query::Query;
pub use transport::TransportClient;
