//! CLI entry point for `mailorca`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::fmt::MakeWriter;

use mailorca::config::{self, Config, LoggingConfig};
use mailorca::ingest::Ingestor;
use mailorca::smtp::SmtpServer;
use mailorca::store::MailStore;
use mailorca::web::Pages;

#[derive(Parser)]
#[command(name = "mailorca", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: $MAILORCA_CONFIG or the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    gen_config: bool,

    /// Address the SMTP listener binds to
    #[arg(long, value_name = "HOST")]
    smtp_host: Option<String>,

    /// Port the SMTP listener binds to
    #[arg(long, value_name = "PORT")]
    smtp_port: Option<u16>,

    /// Address the HTTP API binds to
    #[arg(long, value_name = "HOST")]
    http_host: Option<String>,

    /// Port the HTTP API binds to
    #[arg(long, value_name = "PORT")]
    http_port: Option<u16>,

    /// Number of messages kept in memory
    #[arg(long, value_name = "N")]
    max_history: Option<usize>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded file.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.smtp_host {
            config.smtp.host = host.clone();
        }
        if let Some(port) = self.smtp_port {
            config.smtp.port = port;
        }
        if let Some(host) = &self.http_host {
            config.http.host = host.clone();
        }
        if let Some(port) = self.http_port {
            config.http.port = port;
        }
        if let Some(n) = self.max_history {
            config.max_history = n;
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Completions { shell }) => return cmd_completions(*shell),
        Some(Commands::Manpage) => return cmd_manpage(),
        None => {}
    }

    let mut config = load_config_logged(cli.config.as_deref(), cli.verbose, std::io::stderr);
    cli.apply_overrides(&mut config);

    if cli.gen_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let log_level = verbose_level(cli.verbose).unwrap_or(config.logging.level.as_str());
    setup_logging(log_level, &config.logging);

    serve(&config).await
}

/// Start the SMTP listener on its own thread and run the HTTP API.
async fn serve(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(MailStore::new(config.max_history()?));
    let pages = Pages::new(&config.ui, config.smtp.port)?;

    let smtp_addr = config.smtp_addr();
    let listener = SmtpServer::bind(&smtp_addr)?;
    let smtp = SmtpServer::new(
        &config.smtp.hostname,
        Ingestor::new(Arc::clone(&store)),
        config.smtp.max_message_size,
    );
    std::thread::Builder::new()
        .name("smtp-accept".to_string())
        .spawn(move || smtp.serve(listener))?;

    tracing::info!(
        smtp = %smtp_addr,
        http = %config.http_addr(),
        max_history = config.max_history,
        "mailorca started"
    );

    mailorca::web::run(&config.http_addr(), store, pages).await?;
    Ok(())
}

/// Level selected by repeated `-v`, if any.
fn verbose_level(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Load the config file while a temporary logger writes to `writer`.
///
/// The global subscriber depends on the loaded config, so warnings about a
/// missing or malformed file go through this one instead.
fn load_config_logged<W>(path: Option<&Path>, verbose: u8, writer: W) -> Config
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(verbose_level(verbose).unwrap_or("warn"))
    });
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(bootstrap, || config::load_config(path))
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, logging: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_file = logging.file.as_ref().and_then(|path| {
        let name = path.file_name()?.to_owned();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        std::fs::create_dir_all(&dir).ok()?;
        Some((dir, name))
    });

    if let Some((dir, name)) = log_file {
        let file_appender = tracing_appender::rolling::never(dir, name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailorca", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
