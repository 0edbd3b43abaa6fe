use std::io::{self, BufRead};
use std::path::PathBuf;

use eyre::{Result, bail};
use log::{LevelFilter, debug, info};

mod cli;

use cli::{Cli, Command, OutputFormat};
use ytscript::client::TranscriptClient;
use ytscript::config::{self, Config};
use ytscript::{ErrorKind, output};

fn setup_logging(verbose: bool) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();

    if verbose {
        builder.target(env_logger::Target::Stderr).init();
        return Ok(());
    }

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytscript.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytscript")
        .join("logs")
}

async fn fetch(
    config: &Config,
    input: Option<String>,
    format: OutputFormat,
    output_path: Option<PathBuf>,
) -> Result<()> {
    let inputs = if let Some(url) = input {
        vec![url]
    } else {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    };

    if inputs.iter().all(|i| i.trim().is_empty()) {
        bail!("no URL or video ID provided\n\nUsage: ytscript fetch <URL>\n       echo <URL> | ytscript fetch");
    }

    let client = TranscriptClient::new(reqwest::Client::new(), &config.server_url())
        .with_timeout(config.client_timeout());
    let mut rendered = Vec::new();

    for input in inputs.iter().map(|i| i.trim()).filter(|i| !i.is_empty()) {
        let Some(video_id) = ytscript::resolve(input) else {
            bail!(
                "{}\n\nSupported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID\n  <11-character video ID>",
                ErrorKind::InvalidInput.message()
            );
        };

        let result = client.fetch_transcript(&video_id).await;
        let Some(segments) = result.segments.filter(|_| result.success) else {
            let retry = if result.error_kind.is_some_and(ErrorKind::is_retryable) {
                " (retry possible)"
            } else {
                ""
            };
            bail!("{video_id}: {}{retry}", result.message);
        };
        debug!("{video_id}: {} segments", segments.len());

        rendered.push(match format {
            OutputFormat::Text => output::render_text(&segments),
            OutputFormat::Timestamped => output::render_timestamped(&segments),
            OutputFormat::Json => output::render_json(&segments),
        });
    }

    let rendered = rendered.join("\n\n");
    if let Some(path) = output_path {
        std::fs::write(&path, &rendered)?;
        eprintln!("Output written to: {}", path.display());
    } else {
        println!("{rendered}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = <Cli as clap::Parser>::parse();
    setup_logging(cli.verbose)?;

    // Load config file (non-fatal if missing/invalid)
    let mut config = Config::load().unwrap_or_default();
    if cli.verbose {
        let config_path = config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    match cli.command {
        Command::Serve {
            bind,
            relay_url,
            deadline,
        } => {
            // CLI flags take priority over the config file
            config.bind = bind.or(config.bind);
            config.relay_url = relay_url.or(config.relay_url);
            config.deadline_secs = deadline.or(config.deadline_secs);
            debug!("Deadline: {:?}", config.deadline());
            ytscript::server::serve(&config).await
        }
        Command::Fetch {
            url,
            server,
            format,
            output,
        } => {
            config.server_url = server.or(config.server_url);
            fetch(&config, url, format, output).await
        }
    }
}
