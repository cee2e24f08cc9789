use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dbcourier_config::{AppConfig, NotifyBackend};
use dbcourier_config_store::FileTargetStore;
use dbcourier_core::{
    BackupPipeline, EmailNotifier, NoopNotifier, Notifier, TargetStore,
};
use dbcourier_discord_destination::{DiscordNotifier, DiscordTransmitter};
use dbcourier_mysql_dumper::MysqlDumper;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "dbcourier")]
#[command(about = "Periodic MySQL backups delivered over Discord webhooks", long_about = None)]
struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, default_value = "config", global = true)]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backup run over the configured targets
    ///
    /// Scheduling is external: point cron (or any trigger) at this command.
    Run,

    /// Manage the configured target list
    Targets {
        #[command(subcommand)]
        action: TargetsAction,
    },
}

#[derive(Subcommand)]
enum TargetsAction {
    /// Print the configured targets in backup order
    List,
    /// Add a database to the end of the list
    Add { name: String },
    /// Remove a database from the list
    Remove { name: String },
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let level = match config.logging.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_notifier(config: &AppConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config.notify.backend {
        NotifyBackend::Discord => Arc::new(DiscordNotifier::new(
            config.discord.report_webhook.clone(),
        )),
        NotifyBackend::Email => Arc::new(EmailNotifier::from_env()?),
        NotifyBackend::None => Arc::new(NoopNotifier),
    };
    Ok(notifier)
}

async fn run_backup(config: AppConfig) -> anyhow::Result<bool> {
    let store = Arc::new(FileTargetStore::new(&config.backup.targets_file));
    let notifier = build_notifier(&config)?;

    let pipeline = BackupPipeline::new(
        store,
        Arc::new(MysqlDumper::new(config.mysql.clone())),
        Arc::new(DiscordTransmitter::new(config.discord.backup_webhook.clone())),
        notifier.clone(),
        config.backup.staging_dir.clone(),
    );

    // the trigger's acknowledgement: results arrive on the report channel
    println!("Backup run started; results will be reported asynchronously.");

    match pipeline.run().await {
        Ok(summary) => {
            println!(
                "Backup run finished: {}/{} succeeded in {} s",
                summary.succeeded,
                summary.total,
                summary.elapsed_secs()
            );
            Ok(summary.is_clean())
        }
        Err(e) => {
            // precondition failures surface on the failure-reporting path too
            error!("Backup run aborted: {}", e);
            if let Err(report_err) = notifier.report_failure("backup run", &e.to_string()).await {
                warn!("Abort report was not delivered: {}", report_err);
            }
            Err(e.into())
        }
    }
}

async fn manage_targets(config: &AppConfig, action: TargetsAction) -> anyhow::Result<()> {
    let store = FileTargetStore::new(&config.backup.targets_file);

    match action {
        TargetsAction::List => {
            let targets = store.load().await?;
            if targets.is_empty() {
                println!("No targets configured ({})", store.path().display());
            } else {
                for (idx, target) in targets.iter().enumerate() {
                    println!("{:>3}. {}", idx + 1, target);
                }
            }
        }
        TargetsAction::Add { name } => {
            let targets = store.add(&name).await?;
            info!("Added '{}'; {} target(s) configured", name, targets.len());
            println!("Added '{}'", name);
        }
        TargetsAction::Remove { name } => {
            let targets = store.remove(&name).await?;
            info!("Removed '{}'; {} target(s) configured", name, targets.len());
            println!("Removed '{}'", name);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from '{}': {}", cli.config_dir, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Run => run_backup(config).await.map(|clean| {
            if clean {
                ExitCode::SUCCESS
            } else {
                // failed targets were already reported; exit code still flags them
                ExitCode::FAILURE
            }
        }),
        Commands::Targets { action } => manage_targets(&config, action)
            .await
            .map(|_| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
