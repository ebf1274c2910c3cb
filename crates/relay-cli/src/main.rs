//! Relay command-line tool
//!
//! Serves a component over TCP, calls a running bridge, or evaluates code
//! locally without a server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Remote-object bridge for Relay script components", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./relay.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,
        /// Component search path (repeatable; replaces configured paths)
        #[arg(long = "path")]
        paths: Vec<PathBuf>,
        /// Component to load at startup
        #[arg(long)]
        preload: Option<String>,
        /// Log filter, e.g. "debug" or "relay_runtime=trace"
        #[arg(long)]
        log_level: Option<String>,
        /// Also write logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Send one request to a running bridge and print the envelope
    Call {
        /// Operation, e.g. "object.new"
        method: String,
        /// Parameters as JSON (array or object)
        #[arg(default_value = "[]")]
        params: String,
        /// Bridge host
        #[arg(long)]
        host: Option<String>,
        /// Bridge port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Evaluate code locally and print the envelope
    Eval {
        /// Code to evaluate
        code: String,
        /// Component to load first
        #[arg(long)]
        component: Option<String>,
        /// Component search path (repeatable; replaces configured paths)
        #[arg(long = "path")]
        paths: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            paths,
            preload,
            log_level,
            log_file,
        } => commands::serve::execute(commands::serve::ServeArgs {
            config: cli.config,
            host,
            port,
            paths,
            preload,
            log_level,
            log_file,
        }),

        Commands::Call {
            method,
            params,
            host,
            port,
        } => commands::call::execute(cli.config, method, params, host, port),

        Commands::Eval {
            code,
            component,
            paths,
        } => commands::eval::execute(cli.config, code, component, paths),
    }
}
