mod app;
mod commands;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

use campus_admin::config::Config;
use campus_admin::logging;

#[derive(Parser, Debug)]
#[command(name = "campus-admin")]
#[command(about = "Command line admin client for the campus and price-bot backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/campus-admin/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend base URL, overriding the config file
  #[arg(long)]
  api_url: Option<String>,

  /// Keep the session in memory only
  #[arg(long)]
  ephemeral: bool,

  /// Mirror logs to stderr
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = logging::init(args.verbose)?;

  let config = Config::load(args.config.as_deref())?;

  // Override the URL if specified on command line
  let config = if let Some(url) = args.api_url {
    let mut config = config;
    config.api.url = url;
    config
  } else {
    config
  };

  let app = app::App::new(&config, args.ephemeral)?;
  app.run(args.command).await
}
