//! ipam-store CLI
//!
//! Command-line access to prefix storage.
//!
//! # Usage
//!
//! ```bash
//! # Create a prefix in a namespace
//! ipam-store create 10.0.0.0/8 --namespace tenant-a
//!
//! # Read it back
//! ipam-store read 10.0.0.0/8 --namespace tenant-a
//!
//! # Replace its payload (retries on concurrent modification)
//! ipam-store update 10.0.0.0/8 --namespace tenant-a --payload '{"ips": []}'
//!
//! # Hammer one prefix from 32 concurrent writers
//! ipam-store race 10.0.0.0/8 --workers 32
//! ```
//!
//! Connection settings come from flags or `IPAM_PG_*` environment variables
//! (a `.env` file is loaded if present).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use ipam_store::{
    MemoryBackend, PostgresBackend, PostgresConfig, Prefix, RequestContext, SslMode,
    StorageBackend, NAMESPACE_DEFAULT, POSTGRES_PORT_DEFAULT, POSTGRES_TABLE_DEFAULT,
};
use tokio_util::sync::CancellationToken;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Application name
pub const APP_NAME: &str = "ipam-store";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Attempts `update` makes before giving up on a contended prefix
pub const UPDATE_ATTEMPTS_MAX: u32 = 16;

/// Upper bound on `race` workers
pub const RACE_WORKERS_MAX: u32 = 1024;

// =============================================================================
// CLI
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Process-local, discarded on exit
    Memory,
    /// PostgreSQL
    Postgres,
}

/// Versioned prefix storage for IPAM
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Versioned, namespace-scoped prefix storage")]
#[command(version)]
struct Cli {
    /// Storage backend
    #[arg(long, value_enum, default_value_t = BackendKind::Postgres, env = "IPAM_BACKEND")]
    backend: BackendKind,

    /// PostgreSQL host
    #[arg(long, default_value = "localhost", env = "IPAM_PG_HOST")]
    pg_host: String,

    /// PostgreSQL port
    #[arg(long, default_value_t = POSTGRES_PORT_DEFAULT, env = "IPAM_PG_PORT")]
    pg_port: u16,

    /// PostgreSQL user
    #[arg(long, default_value = "", env = "IPAM_PG_USER")]
    pg_user: String,

    /// PostgreSQL password
    #[arg(long, default_value = "", env = "IPAM_PG_PASSWORD", hide_env_values = true)]
    pg_password: String,

    /// PostgreSQL database name
    #[arg(long, default_value = "ipam", env = "IPAM_PG_DBNAME")]
    pg_dbname: String,

    /// TLS mode: allow, disable, prefer, require, verify-ca, verify-full
    #[arg(long, default_value = "disable", env = "IPAM_PG_SSLMODE")]
    pg_sslmode: SslMode,

    /// Table holding prefix documents
    #[arg(long, default_value = POSTGRES_TABLE_DEFAULT, env = "IPAM_PG_TABLE")]
    pg_table: String,

    /// Per-command timeout in milliseconds (0 = none)
    #[arg(long, default_value_t = 0)]
    timeout_ms: u64,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a prefix
    Create {
        /// Cidr of the prefix
        cidr: String,
        /// Namespace
        #[arg(long, default_value = NAMESPACE_DEFAULT)]
        namespace: String,
        /// Initial payload as JSON
        #[arg(long)]
        payload: Option<String>,
    },
    /// Read one prefix
    Read {
        /// Cidr of the prefix
        cidr: String,
        /// Namespace
        #[arg(long, default_value = NAMESPACE_DEFAULT)]
        namespace: String,
    },
    /// List prefixes in a namespace
    List {
        /// Namespace
        #[arg(long, default_value = NAMESPACE_DEFAULT)]
        namespace: String,
        /// List every namespace
        #[arg(long)]
        all: bool,
    },
    /// List cidrs in a namespace
    Cidrs {
        /// Namespace
        #[arg(long, default_value = NAMESPACE_DEFAULT)]
        namespace: String,
    },
    /// Replace a prefix payload, retrying on concurrent modification
    Update {
        /// Cidr of the prefix
        cidr: String,
        /// Namespace
        #[arg(long, default_value = NAMESPACE_DEFAULT)]
        namespace: String,
        /// New payload as JSON
        #[arg(long)]
        payload: String,
    },
    /// Delete a prefix (no error if absent)
    Delete {
        /// Cidr of the prefix
        cidr: String,
        /// Namespace
        #[arg(long, default_value = NAMESPACE_DEFAULT)]
        namespace: String,
    },
    /// Delete every prefix in every namespace
    Purge,
    /// Run concurrent read-modify-write increments against one prefix
    Race {
        /// Cidr of the prefix
        cidr: String,
        /// Namespace
        #[arg(long, default_value = NAMESPACE_DEFAULT)]
        namespace: String,
        /// Concurrent writers
        #[arg(long, default_value_t = 8)]
        workers: u32,
    },
}

// =============================================================================
// Commands
// =============================================================================

fn parse_payload(raw: &str) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(raw).with_context(|| format!("payload is not valid JSON: {raw}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_backend(cli: &Cli) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match cli.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
        BackendKind::Postgres => {
            let config = PostgresConfig::new(&cli.pg_host, &cli.pg_dbname)
                .with_port(cli.pg_port)
                .with_credentials(&cli.pg_user, &cli.pg_password)
                .with_ssl_mode(cli.pg_sslmode)
                .with_table(&cli.pg_table);
            tracing::debug!(?config, "opening postgres backend");
            let backend = PostgresBackend::connect(&config).await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Read-modify-write with bounded retries on version conflicts.
async fn update_payload(
    backend: &dyn StorageBackend,
    cx: &RequestContext,
    cidr: &str,
    namespace: &str,
    payload: serde_json::Value,
) -> anyhow::Result<Prefix> {
    for attempt in 1..=UPDATE_ATTEMPTS_MAX {
        let current = backend.read_prefix(cx, cidr, namespace).await?;
        match backend
            .update_prefix(cx, current.with_payload(payload.clone()))
            .await
        {
            Ok(updated) => return Ok(updated),
            Err(e) if e.is_conflict() => {
                tracing::info!(attempt, cidr, namespace, "version conflict, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    anyhow::bail!("{cidr} in namespace {namespace} still contended after {UPDATE_ATTEMPTS_MAX} attempts")
}

async fn race(
    backend: Arc<dyn StorageBackend>,
    cx: &RequestContext,
    cidr: &str,
    namespace: &str,
    workers: u32,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        (1..=RACE_WORKERS_MAX).contains(&workers),
        "workers must be in 1..={RACE_WORKERS_MAX}, got {workers}"
    );

    let start = match backend.read_prefix(cx, cidr, namespace).await {
        Ok(prefix) => prefix,
        Err(e) if e.is_not_found() => {
            let prefix = Prefix::new(cidr).with_namespace(namespace);
            backend.create_prefix(cx, prefix).await?
        }
        Err(e) => return Err(e.into()),
    };

    let mut handles = Vec::with_capacity(workers as usize);
    for _ in 0..workers {
        let backend = Arc::clone(&backend);
        let cx = cx.clone();
        let cidr = cidr.to_string();
        let namespace = namespace.to_string();
        handles.push(tokio::spawn(async move {
            let mut conflicts = 0u64;
            loop {
                let current = backend.read_prefix(&cx, &cidr, &namespace).await?;
                let count = current.payload["race_count"].as_u64().unwrap_or(0);
                let next = current.with_payload(serde_json::json!({ "race_count": count + 1 }));
                match backend.update_prefix(&cx, next).await {
                    Ok(_) => return Ok::<u64, ipam_store::StorageError>(conflicts),
                    Err(e) if e.is_conflict() => {
                        conflicts += 1;
                        tokio::task::yield_now().await;
                    }
                    Err(e) => return Err(e),
                }
            }
        }));
    }

    let mut conflicts = 0;
    for handle in handles {
        conflicts += handle.await??;
    }

    let end = backend.read_prefix(cx, cidr, namespace).await?;
    tracing::info!(
        workers,
        conflicts,
        start_version = start.version,
        end_version = end.version,
        "race finished"
    );
    anyhow::ensure!(
        end.version == start.version + u64::from(workers),
        "lost updates: expected version {}, found {}",
        start.version + u64::from(workers),
        end.version
    );
    print_json(&end)
}

async fn run(cli: Cli, cx: RequestContext) -> anyhow::Result<()> {
    let backend = open_backend(&cli).await?;
    tracing::debug!(backend = backend.name(), "backend ready");

    match cli.command {
        Commands::Create {
            cidr,
            namespace,
            payload,
        } => {
            let mut prefix = Prefix::new(cidr).with_namespace(namespace);
            if let Some(raw) = payload {
                prefix = prefix.with_payload(parse_payload(&raw)?);
            }
            print_json(&backend.create_prefix(&cx, prefix).await?)
        }
        Commands::Read { cidr, namespace } => {
            print_json(&backend.read_prefix(&cx, &cidr, &namespace).await?)
        }
        Commands::List { namespace, all } => {
            let prefixes = if all {
                backend.read_all_prefixes(&cx).await?
            } else {
                backend.read_prefixes(&cx, &namespace).await?
            };
            print_json(&prefixes)
        }
        Commands::Cidrs { namespace } => {
            for cidr in backend.read_all_prefix_cidrs(&cx, &namespace).await? {
                println!("{cidr}");
            }
            Ok(())
        }
        Commands::Update {
            cidr,
            namespace,
            payload,
        } => {
            let payload = parse_payload(&payload)?;
            let updated = update_payload(backend.as_ref(), &cx, &cidr, &namespace, payload).await?;
            print_json(&updated)
        }
        Commands::Delete { cidr, namespace } => {
            let prefix = Prefix::new(cidr).with_namespace(namespace);
            print_json(&backend.delete_prefix(&cx, prefix).await?)
        }
        Commands::Purge => {
            backend.delete_all_prefixes(&cx).await?;
            tracing::info!(backend = backend.name(), "deleted all prefixes");
            Ok(())
        }
        Commands::Race {
            cidr,
            namespace,
            workers,
        } => race(backend, &cx, &cidr, &namespace, workers).await,
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn,ipam_store=info",
        1 => "info,ipam_store=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::debug!("{} v{}", APP_NAME, APP_VERSION);

    let token = CancellationToken::new();
    let mut cx = RequestContext::background().with_cancellation(token.clone());
    if cli.timeout_ms > 0 {
        cx = cx.with_timeout(Duration::from_millis(cli.timeout_ms));
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            token.cancel();
        }
    });

    run(cli, cx).await
}
