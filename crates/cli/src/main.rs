//! ikecmd: establish a single IKE connection from the command line
//!
//! Collects the connection options, schedules the one initiation attempt
//! and exits once it either succeeded or asked the process to terminate.
//! The controller in this binary is a dry run: it logs (and with `--json`
//! prints) the assembled configuration and reports success.
//!
//! # Usage
//!
//! ```bash
//! ikecmd --host vpn.example.com --identity alice@example.com \
//!        --remote-ts 10.0.0.0/8 --profile ikev2-eap --json
//! ```
//!
//! Set `RUST_LOG=debug` for per-option logging.

use async_trait::async_trait;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use ikecmd_platform::{PlatformError, ProcessHandle, Processor};
use ikecmd_proto::ipsec::{
    self, ChildConfig, CmdOption, ConnectionBuilder, Controller, Daemon, InitiateListener,
    PeerConfig, StaticSocket,
};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ikecmd", version)]
#[command(about = "Establish a single IKE connection")]
#[command(args_override_self = true)]
struct Cli {
    /// DNS name or address of the server to connect to
    #[arg(long)]
    host: Option<String>,

    /// Local identity to authenticate as
    #[arg(long)]
    identity: Option<String>,

    /// Server identity to expect, defaults to the host
    #[arg(long)]
    remote_identity: Option<String>,

    /// Private key to authenticate with
    #[arg(long, value_name = "PATH")]
    rsa: Option<PathBuf>,

    /// Additional local traffic selector (repeatable)
    #[arg(long, value_name = "SUBNET")]
    local_ts: Vec<String>,

    /// Additional remote traffic selector (repeatable)
    #[arg(long, value_name = "SUBNET")]
    remote_ts: Vec<String>,

    /// Connection profile, e.g. ikev2-pub or ikev1-xauth-psk
    #[arg(long)]
    profile: Option<String>,

    /// Local IKE port the socket is bound to
    #[arg(long, default_value_t = 500)]
    port: u16,

    /// Print the assembled configuration as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Builder options in command-line order.
    ///
    /// Repeated single-valued options keep only their last occurrence.
    fn options(&self, matches: &ArgMatches) -> Vec<(CmdOption, String)> {
        let mut options = Vec::new();

        let single = [
            ("host", CmdOption::Host, self.host.clone()),
            ("identity", CmdOption::Identity, self.identity.clone()),
            (
                "remote_identity",
                CmdOption::RemoteIdentity,
                self.remote_identity.clone(),
            ),
            (
                "rsa",
                CmdOption::Rsa,
                self.rsa.as_ref().map(|path| path.display().to_string()),
            ),
            ("profile", CmdOption::Profile, self.profile.clone()),
        ];
        for (id, option, value) in single {
            if let (Some(value), Some(index)) = (value, matches.index_of(id)) {
                options.push((index, option, value));
            }
        }

        let repeated = [
            ("local_ts", CmdOption::LocalTs, &self.local_ts),
            ("remote_ts", CmdOption::RemoteTs, &self.remote_ts),
        ];
        for (id, option, values) in repeated {
            if let Some(indices) = matches.indices_of(id) {
                options.extend(
                    indices
                        .zip(values)
                        .map(|(index, value)| (index, option, value.clone())),
                );
            }
        }

        options.sort_by_key(|(index, _, _)| *index);
        options
            .into_iter()
            .map(|(_, option, value)| (option, value))
            .collect()
    }
}

/// Parse arguments into the CLI and the builder options in argv order
fn parse_args<I, T>(args: I) -> Result<(Cli, Vec<(CmdOption, String)>), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Cli::command().try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    let options = cli.options(&matches);
    Ok((cli, options))
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Setup(#[from] ipsec::Error),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("worker failed: {0}")]
    Worker(#[from] JoinError),

    #[error("terminated: {0}")]
    Terminated(String),
}

/// Controller that accepts every configuration without negotiating
struct DryRunController {
    json: bool,
}

#[async_trait]
impl Controller for DryRunController {
    async fn initiate(
        &self,
        peer: Arc<PeerConfig>,
        child: Arc<ChildConfig>,
        listener: &dyn InitiateListener,
        _timeout: Option<Duration>,
    ) -> ipsec::Result<()> {
        let message = format!(
            "initiating {} connection '{}' to {}[{}]",
            peer.version(),
            peer.name(),
            peer.ike().remote_addr,
            peer.ike().remote_port
        );
        if !listener.on_progress(1, &message) {
            return Err(ipsec::Error::ControllerFailure("cancelled".into()));
        }
        info!(
            child = child.name(),
            local_ts = child.traffic_selectors(ipsec::Side::Local).len(),
            remote_ts = child.traffic_selectors(ipsec::Side::Remote).len(),
            "{}",
            message
        );

        if self.json {
            let json = serde_json::to_string_pretty(peer.as_ref())
                .map_err(|e| ipsec::Error::ControllerFailure(e.to_string()))?;
            println!("{}", json);
        }
        Ok(())
    }
}

async fn join_all(workers: Vec<JoinHandle<()>>) -> Result<(), JoinError> {
    for worker in workers {
        worker.await?;
    }
    Ok(())
}

async fn run(cli: Cli, options: Vec<(CmdOption, String)>) -> Result<(), CliError> {
    let mut builder = ConnectionBuilder::new();
    for (option, value) in options {
        builder.handle(option, &value)?;
    }

    let processor = Processor::new();
    let (process, mut termination) = ProcessHandle::capture();
    let daemon = Daemon::new(
        Arc::new(DryRunController { json: cli.json }),
        Arc::new(StaticSocket::new(cli.port)),
    );

    builder.schedule(&processor, daemon, process)?;
    let workers = processor.spawn_workers(1)?;
    // The initiation job is the only job; workers stop once it ran.
    processor.shutdown();

    tokio::select! {
        Some(request) = termination.wait() => {
            return Err(CliError::Terminated(request.reason));
        }
        joined = join_all(workers) => joined?,
    }

    match termination.try_recv() {
        Some(request) => Err(CliError::Terminated(request.reason)),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (cli, options) = parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit());
    match run(cli, options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "ikecmd failed");
            ExitCode::FAILURE
        }
    }
}
