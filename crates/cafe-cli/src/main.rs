//! cafe CLI: chat with CaféBot and analyze roasted beans from the terminal

use cafe_engine::{
    AnalysisResult, ChatMode, Chart, Config, Conversation, Dispatcher, HttpClient, Message,
    PreviewRegistry, SelectedFile, UploadMode, UploadWidget,
};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// CaféBot coffee chat and roast analysis
#[derive(Parser, Debug)]
#[command(name = "cafe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Use canned chat replies and simulated uploads
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Open the TUI (default when no command specified)
    Tui,

    /// Ask CaféBot a single question
    Ask {
        /// The question
        question: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze the roast level of a bean photo
    Analyze {
        /// Path to the image
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default config file
    Init,
}

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() {
    let cli = Cli::parse();
    let tui = matches!(cli.command, None | Some(Commands::Tui));
    init_logging(tui);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config.clone().or_else(Config::default_path);

    if cli.command == Some(Commands::Init) {
        return cmd_init(config_path.as_deref());
    }

    let config = resolve_config(&cli, config_path.as_deref())?;
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        None | Some(Commands::Tui) => rt.block_on(cafe_tui::run_tui(&config)),
        Some(Commands::Ask { question, json }) => {
            let reply = rt.block_on(ask(&config, &question))?;
            print_reply(&reply, json)
        }
        Some(Commands::Analyze { path, json }) => {
            let result = rt.block_on(analyze(&config, &path))?;
            print_analysis(result.as_ref(), json)
        }
        Some(Commands::Config { json }) => cmd_config(&config, json),
        Some(Commands::Init) => Ok(()),
    }
}

/// Send logs to stderr, or to a file while the TUI owns the terminal.
fn init_logging(tui: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if tui {
        let path = std::env::temp_dir().join("cafe.log");
        match std::fs::File::create(&path) {
            Ok(file) => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init(),
            // Logging is best effort; the TUI still runs without it.
            Err(_) => registry.init(),
        }
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// File config, then environment, then command-line flags.
fn resolve_config(cli: &Cli, path: Option<&Path>) -> CliResult<Config> {
    let mut config = match path {
        Some(path) => Config::load_or_default(path)?,
        None => Config::default(),
    };
    config.apply_env();

    if let Some(url) = &cli.base_url {
        config.base_url.clone_from(url);
    }
    if cli.offline {
        config.chat_mode = ChatMode::Canned;
        config.upload_mode = UploadMode::Simulated;
    }
    tracing::debug!(
        base_url = %config.base_url,
        chat_mode = ?config.chat_mode,
        upload_mode = ?config.upload_mode,
        "resolved config"
    );
    Ok(config)
}

fn cmd_init(path: Option<&Path>) -> CliResult<()> {
    let Some(path) = path else {
        return Err("no config directory on this platform; pass --config".into());
    };
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    Config::default().save(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config(config: &Config, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("Chat endpoint:     {}", config.chat_url()?);
    println!("Analysis endpoint: {}", config.analysis_url()?);
    println!("User id:           {}", config.user_id);
    println!("Chat mode:         {:?}", config.chat_mode);
    println!("Upload mode:       {:?}", config.upload_mode);
    Ok(())
}

/// Run one question through the conversation and return the bot's reply.
async fn ask(config: &Config, question: &str) -> CliResult<Message> {
    let (dispatcher, mut completions) = Dispatcher::new(HttpClient::from_config(config)?);
    let mut conversation = Conversation::new(config.conversation_settings());
    let mut upload = UploadWidget::default();

    dispatcher.dispatch(conversation.submit(question)?);
    while conversation.is_sending() {
        let Some(completion) = completions.recv().await else {
            break;
        };
        completion.apply(&mut conversation, &mut upload);
    }

    conversation
        .messages()
        .last()
        .cloned()
        .ok_or_else(|| "no reply".into())
}

/// Upload one image and return the analysis, `None` when simulated.
async fn analyze(config: &Config, path: &Path) -> CliResult<Option<AnalysisResult>> {
    let file = SelectedFile::from_path(path)
        .map_err(|e| format!("could not read {}: {e}", path.display()))?;

    let (dispatcher, mut completions) = Dispatcher::new(HttpClient::from_config(config)?);
    let mut conversation = Conversation::new(config.conversation_settings());
    let mut upload = UploadWidget::new(config.upload_settings(), PreviewRegistry::new());

    upload.select_file(file)?;
    dispatcher.dispatch(upload.submit()?);
    while upload.is_submitting() {
        let Some(completion) = completions.recv().await else {
            break;
        };
        // The success reset is for interactive use only.
        completion.apply(&mut conversation, &mut upload);
    }

    if let Some(error) = upload.error() {
        return Err(error.into());
    }
    Ok(upload.result().cloned())
}

fn print_reply(reply: &Message, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reply)?);
    } else if reply.is_error {
        eprintln!("{}", reply.text);
    } else {
        println!("{}", reply.text);
    }
    Ok(())
}

fn print_analysis(result: Option<&AnalysisResult>, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    let Some(result) = result else {
        println!("Image uploaded (simulated, no analysis)");
        return Ok(());
    };

    let simulated = if result.is_simulated { " (simulated)" } else { "" };
    println!("Roast level: {}{simulated}", result.roast_level);
    println!("Confidence:  {}", result.confidence_percent());
    if let Some(brewing) = result.brewing_recommendation() {
        println!("Brewing:     {brewing}");
    }
    let probabilities: Vec<_> = result.class_probabilities().collect();
    if !probabilities.is_empty() {
        println!("\nClass probabilities");
        for (label, p) in probabilities {
            println!("  {label:<12} {:>5.1}%", p * 100.0);
        }
    }
    match result.chart() {
        Chart::Available(_) => println!("\nChart available (open it in the TUI)"),
        Chart::Insufficient => println!("\nChart: insufficient data"),
        Chart::Missing => {}
    }
    Ok(())
}
