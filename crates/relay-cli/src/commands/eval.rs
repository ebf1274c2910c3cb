//! `relay eval`: evaluate code in a local session.

use std::path::PathBuf;

use relay_cli::config::Config;
use relay_runtime::{Envelope, Session};

pub fn execute(
    config: Option<PathBuf>,
    code: String,
    component: Option<String>,
    paths: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let (mut config, _) = Config::load(config.as_deref())?;
    if !paths.is_empty() {
        config.components.paths = paths;
    }

    let mut session = Session::new(config.components.resolver());
    let component = component.or(config.components.preload);
    let outcome = super::on_script_stack(|| match component {
        Some(name) => session.open_component(&name).and_then(|()| session.eval(&code)),
        None => session.eval(&code),
    })?;
    let envelope = match &outcome {
        Ok(value) => Envelope::success(value),
        Err(err) => Envelope::failure(err),
    };

    if super::print_envelope(&envelope)? {
        std::process::exit(1);
    }
    Ok(())
}
