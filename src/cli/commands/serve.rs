//! `qbom serve` command - Run the HTTP API

use miette::{IntoDiagnostic, Result};
use std::net::{IpAddr, SocketAddr};

use crate::cli::helpers::open_project_with_config;
use crate::cli::GlobalOpts;
use crate::server::{self, AppState};

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (default: server.address in config, else 127.0.0.1)
    #[arg(long)]
    pub address: Option<IpAddr>,

    /// Port to listen on (default: server.port in config, else 4680)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

pub fn run(args: ServeArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let addr = SocketAddr::new(
        args.address.unwrap_or_else(|| config.server_address()),
        args.port.unwrap_or_else(|| config.server_port()),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    let state = AppState::new(project, config);
    runtime
        .block_on(server::serve(state, addr))
        .map_err(|e| miette::miette!("Server on {} failed: {}", addr, e))
}
