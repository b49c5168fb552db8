mod classify_commands;
mod doctor_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    lungscan_auto_reply::Dispatcher,
    lungscan_config::{BackendKind, LungscanConfig, Severity},
    lungscan_telegram::{HandlerContext, TelegramFileFetcher, TelegramOutbound},
    secrecy::Secret,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "lungscan", about = "Lungscan: chest X-ray classification bot", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Load this config file instead of searching for one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Telegram bot token (overrides config value).
    #[arg(long, global = true, env = "LUNGSCAN_TELEGRAM_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Classifier backend: local or remote (overrides config value).
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// ONNX model for the local backend (overrides config value).
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    /// Classification service URL for the remote backend (overrides config value).
    #[arg(long, global = true)]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot (default when no subcommand is provided).
    Run,
    /// Classify a single image file and print the reply text.
    Classify {
        /// Image to classify.
        image: PathBuf,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and check the classifier setup.
    Doctor,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config file (explicit or discovered) and apply CLI/env overrides.
fn load_config(cli: &Cli) -> anyhow::Result<LungscanConfig> {
    let mut config = match &cli.config {
        Some(path) => lungscan_config::load_config(path)?,
        None => lungscan_config::discover_and_load()?,
    };
    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut LungscanConfig, cli: &Cli) {
    if let Some(token) = &cli.token {
        config.telegram.token = Secret::new(token.clone());
    }
    if let Some(backend) = cli.backend {
        config.classifier.backend = backend;
    }
    if let Some(path) = &cli.model_path {
        config.classifier.local.model_path = Some(path.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config.classifier.remote.endpoint = Some(endpoint.clone());
    }
}

async fn run_bot(config: LungscanConfig) -> anyhow::Result<()> {
    let report = lungscan_config::validate(&config, true);
    for d in report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
    {
        warn!(path = d.path, "{}", d.message);
    }
    report.into_result()?;

    // Model is loaded once here and shared by every message task.
    let backend = lungscan_inference::build_backend(&config.classifier)
        .context("failed to initialise classifier")?;
    info!(
        backend = backend.id(),
        reply_style = ?backend.reply_style(),
        "classifier initialised"
    );

    let connected = lungscan_telegram::connect(&config.telegram)
        .await
        .context("failed to connect to telegram")?;

    let outbound = Arc::new(TelegramOutbound::new(connected.bot.clone()));
    let fetcher = Arc::new(TelegramFileFetcher::new(connected.bot.clone()));
    let ctx = Arc::new(HandlerContext {
        dispatcher: Dispatcher::new(backend, fetcher, outbound.clone()),
        outbound,
        bot_username: connected.username,
    });

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    lungscan_telegram::run_polling(
        connected.bot,
        config.telegram.poll_timeout_secs,
        ctx,
        cancel,
    )
    .await?;
    info!("lungscan stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "lungscan starting");

    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Run) => run_bot(config).await,
        Some(Commands::Classify { ref image, json }) => {
            classify_commands::handle_classify(&config, image, json).await
        },
        Some(Commands::Doctor) => doctor_commands::handle_doctor(&config, cli.config.as_deref()),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn no_subcommand_runs_bot() {
        let cli = Cli::try_parse_from(["lungscan"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn classify_subcommand() {
        let cli = Cli::try_parse_from(["lungscan", "classify", "scan.png", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Classify { image, json }) => {
                assert_eq!(image, PathBuf::from("scan.png"));
                assert!(json);
            },
            _ => panic!("expected classify"),
        }
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["lungscan", "--backend", "cloud"]).is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let cli = Cli::try_parse_from([
            "lungscan",
            "--token",
            "123:abc",
            "--backend",
            "remote",
            "--endpoint",
            "http://localhost:8000/classify",
            "--model-path",
            "model.onnx",
        ])
        .unwrap();
        let mut config = LungscanConfig::default();
        apply_overrides(&mut config, &cli);

        assert_eq!(config.telegram.token.expose_secret(), "123:abc");
        assert_eq!(config.classifier.backend, BackendKind::Remote);
        assert_eq!(
            config.classifier.remote.endpoint.as_deref(),
            Some("http://localhost:8000/classify")
        );
        assert_eq!(
            config.classifier.local.model_path,
            Some(PathBuf::from("model.onnx"))
        );
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.toml");
        std::fs::write(
            &path,
            "[classifier]\nbackend = \"remote\"\n\n[classifier.remote]\nendpoint = \"http://x/classify\"\n",
        )
        .unwrap();
        let cli = Cli::try_parse_from(["lungscan", "--config", path.to_str().unwrap(), "doctor"])
            .unwrap();

        let config = load_config(&cli).unwrap();

        assert_eq!(config.classifier.backend, BackendKind::Remote);
        assert!(matches!(cli.command, Some(Commands::Doctor)));
    }
}
