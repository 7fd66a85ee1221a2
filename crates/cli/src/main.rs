use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "askbot")]
#[command(about = "askbot: Telegram question-answering relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: ASKBOT_CONFIG_PATH or ~/.askbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the relay: connect to Telegram and answer addressed messages.
    Run {
        /// Config file path (default: ASKBOT_CONFIG_PATH or ~/.askbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port for the health endpoint and webhook (default from config or 15151)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Ask the configured backend one question and print the reply users would see.
    Ask {
        /// Config file path (default: ASKBOT_CONFIG_PATH or ~/.askbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// The question (words are joined with spaces).
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("askbot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config, port }) => {
            if let Err(e) = run_relay(config, port).await {
                log::error!("relay failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask { config, question }) => {
            if let Err(e) = run_ask(config, question.join(" ")).await {
                log::error!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_relay(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    log::info!("using config {}", path.display());
    if let Some(p) = port {
        config.gateway.port = p;
    }
    lib::gateway::run_gateway(config).await
}

async fn run_ask(config_path: Option<std::path::PathBuf>, question: String) -> anyhow::Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("question is empty");
    }
    let (config, _) = lib::config::load_config(config_path)?;
    let backend = lib::backend::build_backend(&config);
    let reply = lib::dispatch::ask_with_fallback(
        backend.as_ref(),
        question,
        config.backend.request_timeout(),
    )
    .await;
    println!("{}", lib::dispatch::truncate_reply(&reply));
    Ok(())
}
