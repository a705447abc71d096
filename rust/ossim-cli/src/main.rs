//! OSSIM CLI: drive the simulated kernel from a terminal, a script, or a pipe.

use clap::{ArgAction, Parser as ClapParser, Subcommand};
use ossim_cli::colors::Palette;
use ossim_cli::config::{OssimConfig, CONFIG_FILE};
use ossim_cli::render::{OutputFormat, Renderer};
use ossim_cli::repl;
use ossim_cli::session::Session;
use std::io::{self, BufReader, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(
    name = "ossim",
    version,
    about = "A single-CPU kernel simulator: scheduling, messaging and semaphores"
)]
struct Cli {
    /// Read settings from this file instead of searching for ossim.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read commands from a file instead of the terminal
    #[arg(long)]
    script: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Log kernel activity to stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default ossim.toml to the current directory
    Init,
    /// Print the resolved configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let palette = if cli.no_color || !io::stdout().is_terminal() {
        Palette::plain()
    } else {
        Palette::from_env()
    };

    match cli.command {
        Some(Commands::Init) => cmd_init(palette),
        Some(Commands::Config) => cmd_config(cli.config.as_deref(), palette),
        None => cmd_run(&cli, palette),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn fail(palette: Palette, message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", palette.red("error:"), message);
    std::process::exit(1);
}

fn load_config(explicit: Option<&Path>, palette: Palette) -> (Option<PathBuf>, OssimConfig) {
    OssimConfig::resolve(explicit).unwrap_or_else(|e| fail(palette, e))
}

fn cmd_init(palette: Palette) {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() {
        fail(palette, format!("{} already exists, not overwriting", CONFIG_FILE));
    }
    if let Err(e) = std::fs::write(&path, OssimConfig::default_template()) {
        fail(palette, format!("writing {}: {}", CONFIG_FILE, e));
    }
    println!("{} {}", palette.status_label("Created"), CONFIG_FILE);
}

fn cmd_config(explicit: Option<&Path>, palette: Palette) {
    let (source, config) = load_config(explicit, palette);
    match &source {
        Some(path) => println!("{}", palette.gray(&format!("# from {}", path.display()))),
        None => println!("{}", palette.gray("# built-in defaults")),
    }
    match toml::to_string(&config) {
        Ok(text) => print!("{}", text),
        Err(e) => fail(palette, e),
    }
}

fn cmd_run(cli: &Cli, palette: Palette) {
    let (source, config) = load_config(cli.config.as_deref(), palette);
    if let Some(path) = &source {
        info!(path = %path.display(), "loaded configuration");
    }

    let renderer = Renderer::new(palette, cli.format);
    let (mut session, banner) =
        Session::boot(config.kernel, renderer).unwrap_or_else(|e| fail(palette, e));
    print!("{}", banner);

    let stdout = io::stdout();
    let result = match &cli.script {
        Some(path) => match std::fs::File::open(path) {
            Ok(file) => session.run(BufReader::new(file), &mut stdout.lock()),
            Err(e) => fail(palette, format!("cannot open '{}': {}", path.display(), e)),
        },
        None if io::stdin().is_terminal() => {
            repl::run_repl(&mut session).map_err(io::Error::other)
        }
        None => session.run(io::stdin().lock(), &mut stdout.lock()),
    };
    if let Err(e) = result {
        fail(palette, e);
    }
}
