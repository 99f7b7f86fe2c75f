//! Server configuration
//!
//! Every setting can come from the command line or the environment:
//!
//! ```bash
//! httpreactor --port 8080 --concurrency pooled --workers 8 --admission reject
//! HTTP_PORT=8080 HTTP_CONCURRENCY=reactive httpreactor
//! ```
//!
//! The concurrency strategy is chosen here once and stays fixed for the life
//! of the process.

use crate::http::{BodyFraming, HttpSettings, ParserConfig};
use crate::reactor::{Admission, ConcurrencyPolicy};
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Where accepted connections run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConcurrencyKind {
    /// Inline on the reactor thread, one connection at a time
    Reactive,
    /// One thread per connection
    ThreadPerConnection,
    /// A bounded pool of worker threads
    Pooled,
}

/// Startup configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "httpreactor")]
#[command(about = "HTTP/1.1 server on a reactor with a pluggable concurrency strategy")]
#[command(version)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Concurrency strategy
    #[arg(short, long, value_enum, default_value = "pooled", env = "HTTP_CONCURRENCY")]
    pub concurrency: ConcurrencyKind,

    /// Worker threads for the pooled strategy
    #[arg(short, long, default_value = "4", env = "HTTP_WORKERS")]
    pub workers: usize,

    /// Connections that may wait for a pool worker
    #[arg(long, default_value = "64", env = "HTTP_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// What to do with a connection when the pool queue is full
    #[arg(long, value_enum, default_value = "block", env = "HTTP_ADMISSION")]
    pub admission: Admission,

    /// How request bodies are delimited
    #[arg(long, value_enum, default_value = "content-length", env = "HTTP_BODY_FRAMING")]
    pub body_framing: BodyFraming,

    /// Largest accepted request body in bytes
    #[arg(long, default_value = "1048576", env = "HTTP_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    /// Read timeout per connection in milliseconds; unset waits forever
    #[arg(long, env = "HTTP_READ_TIMEOUT_MS")]
    pub read_timeout_ms: Option<u64>,
}

impl ServerConfig {
    /// Parse from the process arguments and environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Check the values clap cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        self.address()?;

        if self.concurrency == ConcurrencyKind::Pooled {
            if self.workers == 0 {
                return Err("workers must be greater than 0".to_string());
            }
            if self.queue_capacity == 0 {
                return Err("queue capacity must be greater than 0".to_string());
            }
        }
        if self.max_body_bytes == 0 {
            return Err("max body bytes must be greater than 0".to_string());
        }
        if self.read_timeout_ms == Some(0) {
            return Err("read timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Socket address to bind
    pub fn address(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| format!("invalid host address: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn concurrency_policy(&self) -> ConcurrencyPolicy {
        match self.concurrency {
            ConcurrencyKind::Reactive => ConcurrencyPolicy::Reactive,
            ConcurrencyKind::ThreadPerConnection => ConcurrencyPolicy::ThreadPerConnection,
            ConcurrencyKind::Pooled => ConcurrencyPolicy::Pooled {
                workers: self.workers,
                queue_capacity: self.queue_capacity,
                admission: self.admission,
            },
        }
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            parser: ParserConfig {
                framing: self.body_framing,
                max_body_bytes: self.max_body_bytes,
                ..ParserConfig::default()
            },
            read_timeout: self.read_timeout_ms.map(Duration::from_millis),
            ..HttpSettings::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            concurrency: ConcurrencyKind::Pooled,
            workers: 4,
            queue_capacity: 64,
            admission: Admission::Block,
            body_framing: BodyFraming::ContentLength,
            max_body_bytes: 1024 * 1024,
            read_timeout_ms: None,
        }
    }
}
