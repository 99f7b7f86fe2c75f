use httpreactor::config::ServerConfig;
use httpreactor::http::{HttpAcceptor, HttpServiceHandler};
use httpreactor::reactor::{
    Acceptor, ConfiguredStrategyFactory, CreationStrategy, DefaultCreationStrategy,
    InitiationDispatcher, Reactor,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "httpreactor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = ServerConfig::from_args();
    if let Err(e) = config.validate() {
        tracing::error!("invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.address()?;
    let policy = config.concurrency_policy();
    tracing::info!(
        %addr,
        ?policy,
        framing = ?config.body_framing,
        "httpreactor v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let settings = Arc::new(config.http_settings());
    let creation: Arc<dyn CreationStrategy> = Arc::new(DefaultCreationStrategy::new(move || {
        HttpServiceHandler::new(Arc::clone(&settings))
    }));
    let factory = ConfiguredStrategyFactory::with_policy(creation, policy)?;

    let reactor = InitiationDispatcher::new()?;
    Arc::new(HttpAcceptor::new()).open(addr, &reactor, Arc::new(factory))?;
    reactor.handle_events()?;
    Ok(())
}
