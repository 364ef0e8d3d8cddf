//! Sheriff CLI: the cron reconciler and the config generator.
//!
//! `reconcile` runs in dry-run mode unless `--do-it-for-real-this-time` is
//! present; every would-be mutation is narrated either way. `generate`
//! reads an org's live state and prints the canonical permissions document.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sheriff_config::{loader, SheriffEnv};
use sheriff_github::credentials::CredentialProvider;
use sheriff_github::{ClientCache, StaticTokenProvider};
use sheriff_reconcile::{generator, PluginRegistry, ReconcileContext, Reconciler};

mod console;

#[derive(Parser)]
#[command(name = "sheriff-cli", version, about = "Declarative GitHub org permissions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile every declared org against its live state.
    Reconcile {
        /// Actually mutate the platform. Without this flag the run is a
        /// dry run: read-only credentials, narration only.
        #[arg(long = "do-it-for-real-this-time")]
        do_it_for_real_this_time: bool,
    },
    /// Emit a canonical permissions document from an org's live state.
    Generate {
        /// Organization to read.
        #[arg(long)]
        org: String,
    },
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Reconcile {
            do_it_for_real_this_time,
        } => reconcile(!do_it_for_real_this_time).await,
        Command::Generate { org } => generate(&org).await,
    };

    if let Err(err) = result {
        eprintln!("{}", "Sheriff failed".red().bold());
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().compact())
        .init();
}

fn build_cache(env: &SheriffEnv, dry_run: bool) -> anyhow::Result<Arc<ClientCache>> {
    let token = env
        .github_app_creds
        .clone()
        .ok_or_else(|| anyhow::anyhow!("SHERIFF_GITHUB_APP_CREDS is required"))?;
    let provider: Arc<dyn CredentialProvider> =
        Arc::new(StaticTokenProvider::new(token, dry_run));
    Ok(Arc::new(ClientCache::new(provider)))
}

async fn reconcile(dry_run: bool) -> anyhow::Result<()> {
    let env = SheriffEnv::from_env()?;
    let cache = build_cache(&env, dry_run)?;

    if dry_run {
        println!(
            "{}",
            "Dry run: no mutations will be issued. Pass --do-it-for-real-this-time to apply."
                .yellow()
        );
    }

    let config_client = cache.client(&env.permissions_file_org, true).await?;
    let orgs = loader::load(&env, Some(config_client.as_ref())).await?;

    let sink = console::console_sink(&env, dry_run);
    let mut plugins = PluginRegistry::new();
    plugins.activate(&env.plugins)?;

    let ctx = ReconcileContext::new(cache, sink, plugins);
    let reconciler = Reconciler::new(ctx);
    reconciler.run(&orgs).await?;

    println!("{}", "Reconcile complete.".green());
    Ok(())
}

async fn generate(org: &str) -> anyhow::Result<()> {
    let env = SheriffEnv::from_env()?;
    let cache = build_cache(&env, true)?;

    let yaml = generator::generate_org_config(&cache, org).await?;
    print!("{yaml}");
    Ok(())
}
