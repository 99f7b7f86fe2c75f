//! Resource resolution
//!
//! A [`Resolver`] turns a valid request into a response. Serving real
//! resources is left to implementations; [`EchoResolver`] answers with a
//! plain-text description of the request head.

use super::error::{Error, ServerError};
use super::message::{MessageBody, Method};
use super::request::Request;
use super::response::{Response, ResponseHeader};
use super::status::Status;
use std::fmt;

/// Maps a parsed request to a response
pub trait Resolver: Send + Sync + fmt::Debug {
    fn resolve(&self, request: &Request) -> Result<Response, Error>;
}

/// Echoes the request head back as `text/plain`
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoResolver;

impl Resolver for EchoResolver {
    fn resolve(&self, request: &Request) -> Result<Response, Error> {
        match request.method() {
            Method::Connect => {
                Err(ServerError::not_implemented("CONNECT tunnels are not supported").into())
            }
            Method::Options => {
                let mut header = standard_header(Status::OK);
                header.add_allow(&Method::ALL[..]).add_content_length(0);
                Ok(Response::new(header, None))
            }
            method => {
                let text = format!(
                    "{}\r\n{}",
                    request.header().request_line(),
                    request.headers()
                );
                let mut header = standard_header(Status::OK);
                header
                    .add_content_type("text/plain; charset=utf-8")
                    .add_content_length(text.len());

                let body = (method != Method::Head).then(|| MessageBody::from(text));
                Ok(Response::new(header, body))
            }
        }
    }
}

fn standard_header(status: Status) -> ResponseHeader {
    let mut header = ResponseHeader::new(status);
    header
        .add_current_date()
        .add_server()
        .add_field("Connection", "close");
    header
}
