//! HTTP/1.1 on top of the reactor framework
//!
//! This module holds the protocol side of the server:
//!
//! - the message model: [`Method`], [`RequestTarget`], [`RequestLine`],
//!   [`Request`], [`StatusLine`], [`Response`] and the [`Status`] catalog
//! - request reading and validation ([`RequestReader`])
//! - the error taxonomy ([`Error`]) and its translation into responses
//!   ([`ErrorHandler`])
//! - the concrete framework roles: [`HttpAcceptor`], [`HttpServiceHandler`]
//!   and [`HttpTask`]
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use httpreactor::http::{HttpAcceptor, HttpServiceHandler, HttpSettings};
//! use httpreactor::reactor::{
//!     Acceptor, ConcurrencyPolicy, ConfiguredStrategyFactory, DefaultCreationStrategy,
//!     InitiationDispatcher, Reactor,
//! };
//!
//! let settings = Arc::new(HttpSettings::default());
//! let creation = Arc::new(DefaultCreationStrategy::new(move || {
//!     HttpServiceHandler::new(Arc::clone(&settings))
//! }));
//! let factory = ConfiguredStrategyFactory::with_policy(creation, ConcurrencyPolicy::Reactive)?;
//!
//! let reactor = InitiationDispatcher::new()?;
//! Arc::new(HttpAcceptor::new()).open("127.0.0.1:8080".parse()?, &reactor, Arc::new(factory))?;
//! reactor.handle_events()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod acceptor;
pub mod error;
pub mod error_handler;
pub mod fields;
pub mod headers;
pub mod message;
pub mod parser;
pub mod request;
pub mod resolver;
pub mod response;
pub mod service;
pub mod settings;
pub mod status;
pub mod task;

pub use acceptor::HttpAcceptor;
pub use error::{ArgumentError, ClientError, Error, ServerError};
pub use error_handler::ErrorHandler;
pub use fields::{FieldKind, FieldName};
pub use headers::Headers;
pub use message::{MessageBody, Method, RequestTarget, TargetForm};
pub use parser::{BodyFraming, ParserConfig, RequestReader};
pub use request::{Request, RequestHeader, RequestLine};
pub use resolver::{EchoResolver, Resolver};
pub use response::{format_http_date, Response, ResponseHeader, StatusLine};
pub use service::HttpServiceHandler;
pub use settings::HttpSettings;
pub use status::{Status, StatusClass};
pub use task::{HttpOutcome, HttpTask};

/// The only protocol version this server speaks
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Longest accepted request-target, in bytes
pub const MAX_REQUEST_TARGET_LEN: usize = 8000;

/// Longest accepted reason phrase, in bytes
pub const MAX_REASON_PHRASE_LEN: usize = 64;

/// Maximum number of header fields per request
pub const MAX_HEADERS: usize = 100;

/// Longest accepted request-line or header line, without its terminator
pub const MAX_LINE_LEN: usize = 8192;

/// Value of the `Server` field
pub const SERVER_NAME: &str = concat!("httpreactor/", env!("CARGO_PKG_VERSION"));

/// CRLF line ending
pub const CRLF: &str = "\r\n";

/// Token separator
pub const SP: &str = " ";
