//! `relay call`: send one request to a running bridge.

use std::path::PathBuf;

use anyhow::Context;
use relay_cli::config::Config;
use relay_cli::Client;

pub fn execute(
    config: Option<PathBuf>,
    method: String,
    params: String,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _) = Config::load(config.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let params: serde_json::Value =
        serde_json::from_str(&params).context("params must be valid JSON")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let envelope = runtime.block_on(async {
        let mut client = Client::connect(&config.server.to_string()).await?;
        client.call(&method, params).await
    })?;

    if super::print_envelope(&envelope)? {
        std::process::exit(1);
    }
    Ok(())
}
