//! httpreactor - an HTTP/1.1 server on an Acceptor-Connector framework
//!
//! The crate is split in three layers:
//!
//! - [`reactor`]: the protocol-agnostic event dispatcher, acceptor and
//!   service-handler traits, and the creation/concurrency strategies
//! - [`http`]: the HTTP/1.1 message model, request parsing and validation,
//!   the error-to-response translator and the concrete HTTP handlers
//! - [`config`]: startup configuration read from the command line and
//!   environment

pub mod config;
pub mod http;
pub mod reactor;
