//! `lseald`: the lseal daemon.
//!
//! Signs a replica's log into a tamper-evident hash chain, or validates a
//! previously signed chain against the log.
//!
//! # Usage
//!
//! ```text
//! lseald sign                          # sign new entries, forever
//! lseald sign --once                   # sign until caught up, then exit
//! lseald validate                      # walk the signed chain
//! lseald hash-and-sign                 # attest the whole replica (Merkle)
//! lseald validate-snapshot             # check the Merkle attestation
//! lseald -c lseal.toml                 # role taken from `run_mode`
//! ```

mod config;
mod keys;

use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lseal_chain::Sha256Chain;
use lseal_gateway::{JsonlLogStore, LogGateway, LseqGateway};
use lseal_orchestrator::{
    ErrorClass, Orchestrator, OrchestratorError, SnapshotReport, ValidationSummary,
};
use lseal_sign::SignatureModule;
use tracing::{debug, error, info, warn};

use config::{CliConfig, RunMode};

type Daemon = Orchestrator<LseqGateway<JsonlLogStore>, Sha256Chain>;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "lseald",
    version,
    about = "Tamper-evident signing and validation for log replicas"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Replica log file (JSON lines).
    #[arg(long, global = true, env = "LSEAL_REPLICA")]
    replica: Option<PathBuf>,

    /// PEM public key used to verify signatures.
    #[arg(long, global = true, env = "LSEAL_PUBLIC_KEY")]
    public_key: Option<PathBuf>,

    /// PEM private key used to sign.
    #[arg(long, global = true, env = "LSEAL_PRIVATE_KEY")]
    private_key: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign new log entries into the hash chain.
    Sign {
        /// Exit once the log is caught up instead of polling.
        #[arg(long)]
        once: bool,

        /// Retry transient backend failures instead of aborting.
        #[arg(long)]
        skip_errors: bool,
    },

    /// Validate the signed hash chain from the start of the log.
    Validate,

    /// Sign a Merkle root over every entry in the replica.
    HashAndSign,

    /// Check the stored Merkle attestation against the replica.
    ValidateSnapshot,
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    // CLI args and env vars override config file values.
    if let Some(path) = cli.replica {
        config.replica.path = config::expand_home(&path);
    }
    if let Some(path) = cli.public_key {
        config.keys.public_key = Some(config::expand_home(&path));
    }
    if let Some(path) = cli.private_key {
        config.keys.private_key = Some(config::expand_home(&path));
    }

    let command = cli.command.unwrap_or(match config.run_mode {
        RunMode::Sign => Commands::Sign {
            once: false,
            skip_errors: false,
        },
        RunMode::Validate => Commands::Validate,
    });

    match command {
        Commands::Sign { once, skip_errors } => {
            if skip_errors {
                config.skip_errors = true;
            }
            let daemon = open(&config, true)?;
            cmd_sign(daemon, &config, once).await
        }
        Commands::Validate => cmd_validate(open(&config, false)?).await,
        Commands::HashAndSign => cmd_hash_and_sign(open(&config, true)?).await,
        Commands::ValidateSnapshot => cmd_validate_snapshot(open(&config, false)?).await,
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Open the replica and assemble an orchestrator over it.
fn open(config: &CliConfig, needs_private_key: bool) -> Result<Arc<Daemon>> {
    let signer = keys::load_signature_module(
        config.keys.public_key.as_deref(),
        config.keys.private_key.as_deref(),
    )?;
    check_keys(&signer, needs_private_key)?;

    info!(
        replica = %config.replica.path.display(),
        replica_id = config.replica.id,
        batch_size = config.db.batch_size,
        chain_mode = ?config.chain.mode,
        "opening replica"
    );
    let store = JsonlLogStore::open(&config.replica.path, config.replica.id)
        .with_context(|| format!("failed to open {}", config.replica.path.display()))?;
    let gateway = LseqGateway::new(store, config.replica.id).with_page_size(config.db.batch_size);

    Ok(Arc::new(Orchestrator::new(
        gateway,
        Sha256Chain::new(config.chain.mode),
        signer,
    )))
}

fn check_keys(signer: &SignatureModule, needs_private_key: bool) -> Result<()> {
    if needs_private_key && !signer.can_sign() {
        bail!("this command needs a private key (--private-key or LSEAL_PRIVATE_KEY)");
    }
    if !signer.can_verify() {
        bail!("this command needs a public key (--public-key or LSEAL_PUBLIC_KEY)");
    }
    Ok(())
}

/// Run a blocking orchestrator call off the async runtime.
async fn blocking<T, F>(daemon: &Arc<Daemon>, f: F) -> Result<Result<T, OrchestratorError>>
where
    T: Send + 'static,
    F: FnOnce(&Daemon) -> Result<T, OrchestratorError> + Send + 'static,
{
    let daemon = Arc::clone(daemon);
    tokio::task::spawn_blocking(move || f(&daemon))
        .await
        .context("orchestrator task panicked")
}

// -----------------------------------------------------------------------
// lseald sign
// -----------------------------------------------------------------------

async fn cmd_sign(daemon: Arc<Daemon>, config: &CliConfig, once: bool) -> Result<ExitCode> {
    info!(
        once,
        skip_errors = config.skip_errors,
        interval_secs = config.sign_interval().as_secs(),
        "sign role started"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut signed = 0usize;

    loop {
        let pause = match blocking(&daemon, |d| d.sign_new()).await? {
            Ok(report) => {
                signed += report.signed;
                Duration::ZERO
            }
            Err(e) => match after_sign_error(&e, once, config.skip_errors) {
                SignStep::Stop => break,
                SignStep::Retry if e.is_exhausted() => {
                    debug!("log caught up");
                    config.sign_interval()
                }
                SignStep::Retry => {
                    warn!(error = %e, "sign pass failed, retrying");
                    config.sign_interval()
                }
                SignStep::Abort => {
                    error!(error = %e, class = ?e.class(), "sign role aborted");
                    return Err(e).context("sign failed");
                }
            },
        };

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            _ = tokio::time::sleep(pause) => {}
        }
    }

    let checkpoint = daemon.gateway().get_last_validated()?;
    daemon.gateway().close()?;
    info!(signed, "sign role stopped");
    println!(
        "{}",
        describe_lseq(checkpoint.and_then(|record| record.source_lseq()))
    );
    Ok(ExitCode::SUCCESS)
}

// -----------------------------------------------------------------------
// lseald validate
// -----------------------------------------------------------------------

async fn cmd_validate(daemon: Arc<Daemon>) -> Result<ExitCode> {
    info!("validate role started");
    let result = blocking(&daemon, |d| d.validate_all()).await?;
    if let Ok(summary) = &result {
        info!(count = summary.validated, "chain verified");
    }
    let outcome = verdict(result, describe_validation).context("validate failed")?;
    if let Verdict::Fail(reason) = &outcome {
        error!(%reason, "validation failed");
    }
    Ok(outcome.finish())
}

// -----------------------------------------------------------------------
// lseald hash-and-sign / validate-snapshot
// -----------------------------------------------------------------------

async fn cmd_hash_and_sign(daemon: Arc<Daemon>) -> Result<ExitCode> {
    let report = blocking(&daemon, |d| d.hash_and_sign())
        .await?
        .context("hash-and-sign failed")?;
    daemon.gateway().close()?;
    println!("{}", describe_snapshot(report));
    Ok(ExitCode::SUCCESS)
}

async fn cmd_validate_snapshot(daemon: Arc<Daemon>) -> Result<ExitCode> {
    let result = blocking(&daemon, |d| d.validate_snapshot()).await?;
    let outcome = verdict(result, describe_snapshot).context("validate-snapshot failed")?;
    Ok(outcome.finish())
}

// -----------------------------------------------------------------------
// Outcome policy
// -----------------------------------------------------------------------

/// What the sign loop does after a failed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignStep {
    /// Sleep for the sign interval, then try again.
    Retry,
    /// Caught up under `--once`.
    Stop,
    /// Give up and exit with the error.
    Abort,
}

/// Caught up means wait (or stop under `--once`). Only transient backend
/// failures are retried, and only with `skip_errors`; tampering, corruption
/// and key problems always abort.
fn after_sign_error(error: &OrchestratorError, once: bool, skip_errors: bool) -> SignStep {
    match error.class() {
        ErrorClass::Exhausted if once => SignStep::Stop,
        ErrorClass::Exhausted => SignStep::Retry,
        ErrorClass::Transient if skip_errors => SignStep::Retry,
        _ => SignStep::Abort,
    }
}

/// How a one-shot command ends.
#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    /// Printed on stdout, exit 0.
    Pass(String),
    /// Printed on stderr, exit 1.
    Fail(String),
}

impl Verdict {
    fn finish(self) -> ExitCode {
        match self {
            Verdict::Pass(line) => {
                println!("{line}");
                ExitCode::SUCCESS
            }
            Verdict::Fail(line) => {
                eprintln!("{line}");
                ExitCode::FAILURE
            }
        }
    }
}

/// Tampering is a verdict, not an error: it ends the command with exit 1.
/// Every other failure propagates.
fn verdict<T>(
    result: std::result::Result<T, OrchestratorError>,
    describe: impl FnOnce(T) -> String,
) -> std::result::Result<Verdict, OrchestratorError> {
    match result {
        Ok(value) => Ok(Verdict::Pass(describe(value))),
        Err(e) if e.class() == ErrorClass::Tampered => Ok(Verdict::Fail(e.to_string())),
        Err(e) => Err(e),
    }
}

fn describe_lseq(lseq: Option<impl Display>) -> String {
    match lseq {
        Some(lseq) => lseq.to_string(),
        None => "nothing signed".to_string(),
    }
}

fn describe_validation(summary: ValidationSummary) -> String {
    describe_lseq(summary.last_lseq)
}

fn describe_snapshot(report: SnapshotReport) -> String {
    format!("{} entries, root {}", report.entries, hex::encode(report.root))
}
