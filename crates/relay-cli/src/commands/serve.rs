//! `relay serve`: run the bridge server.

use std::path::PathBuf;

use anyhow::Context;
use relay_cli::config::Config;
use relay_cli::logging::init_logging;
use relay_cli::Server;
use relay_runtime::{Dispatcher, Session, SCRIPT_STACK_SIZE};

pub struct ServeArgs {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub paths: Vec<PathBuf>,
    pub preload: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

pub fn execute(args: ServeArgs) -> anyhow::Result<()> {
    let (mut config, source) = Config::load(args.config.as_deref())?;
    apply_overrides(&mut config, args);

    let _guard = init_logging(&config.logging).context("cannot initialize logging")?;
    match &source {
        Some(path) => tracing::info!("Loaded config from {}", path.display()),
        None => tracing::info!("No config file found, using defaults"),
    }

    let mut session = Session::new(config.components.resolver());
    if let Some(name) = &config.components.preload {
        super::on_script_stack(|| session.open_component(name))?
            .with_context(|| format!("cannot preload component '{}'", name))?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(SCRIPT_STACK_SIZE)
        .build()?;

    runtime.block_on(async {
        let addr = config.server.to_string();
        let server = Server::bind(&addr, Dispatcher::new(session))
            .await
            .with_context(|| format!("cannot bind {}", addr))?;

        tokio::select! {
            result = server.run() => result?,
            _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn apply_overrides(config: &mut Config, args: ServeArgs) {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if !args.paths.is_empty() {
        config.components.paths = args.paths;
    }
    if args.preload.is_some() {
        config.components.preload = args.preload;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.log_file.is_some() {
        config.logging.file = args.log_file;
    }
}
