//! Per-connection HTTP settings

use super::parser::ParserConfig;
use super::resolver::{EchoResolver, Resolver};
use std::sync::Arc;
use std::time::Duration;

/// Settings shared by every HTTP service handler of a server
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub parser: ParserConfig,
    /// Give up on a silent client after this long; `None` waits forever
    pub read_timeout: Option<Duration>,
    pub resolver: Arc<dyn Resolver>,
}

impl HttpSettings {
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            parser: ParserConfig::default(),
            read_timeout: None,
            resolver: Arc::new(EchoResolver),
        }
    }
}
