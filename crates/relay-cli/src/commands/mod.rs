//! Subcommand implementations.

pub mod call;
pub mod eval;
pub mod serve;

use relay_runtime::{Envelope, SCRIPT_STACK_SIZE};

/// Print an envelope as pretty JSON and report whether it was a failure.
pub(crate) fn print_envelope(envelope: &Envelope) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(envelope.is_error())
}

/// Run `work` on a thread whose stack can hold the deepest script call.
pub(crate) fn on_script_stack<T: Send>(work: impl FnOnce() -> T + Send) -> anyhow::Result<T> {
    std::thread::scope(|scope| {
        let worker = std::thread::Builder::new()
            .name("relay-script".into())
            .stack_size(SCRIPT_STACK_SIZE)
            .spawn_scoped(scope, work)?;
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("script thread panicked"))
    })
}
