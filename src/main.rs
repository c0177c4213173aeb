use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use widgetfeed::clock::SystemClock;
use widgetfeed::config::{self, Config};
use widgetfeed::error::{Error, Result};
use widgetfeed::http::ReqwestHttp;
use widgetfeed::storage::FileStore;
use widgetfeed::{Params, Registry, Services};

#[derive(Parser)]
#[command(name = "widgetfeed", version, about = "Run media widget functions and print their JSON output")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the metadata of every registered widget
    List,
    /// Invoke a widget function, e.g. `call bangumi dailySchedule -p day=today`
    Call {
        /// Widget id (`forward.bangumi` or just `bangumi`)
        widget: String,
        /// Function name as listed in the widget's modules
        function: String,
        /// Host parameters as key=value
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", s))
}

fn setup_logging() -> Result<()> {
    let data_dir = config::data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    let file_appender = tracing_appender::rolling::daily(&data_dir, "widgetfeed.log");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("widgetfeed=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .init();

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries JSON output, so logs go to a file
    if let Err(e) = setup_logging() {
        eprintln!("Warning: Could not set up logging: {}", e);
    }

    let cli = Cli::parse();

    let config = Config::load()?;
    info!("Loaded config");

    let store = FileStore::open(config.storage_path()?)?;
    info!(path = %store.path().display(), "Opened storage");

    let services = Services {
        http: Arc::new(ReqwestHttp::new(&config.http)?),
        store: Arc::new(store),
        clock: Arc::new(SystemClock),
    };
    let registry = Registry::builtin(&config, services);

    match cli.command {
        Command::List => print_json(&registry.metadata()),
        Command::Call {
            widget,
            function,
            params,
        } => {
            let params: Params = params.into_iter().collect();
            match registry.invoke(&widget, &function, &params).await {
                Ok(output) => print_json(&output),
                Err(e @ (Error::UnknownWidget(_) | Error::UnknownFunction { .. })) => {
                    eprintln!("{}", e);
                    eprintln!("Run `widgetfeed list` to see available widgets");
                    Err(e)
                }
                Err(e) => Err(e),
            }
        }
    }
}
