use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use glyph_lang::config::Config;
use glyph_lang::driver;

/// Tree-walking interpreter for Glyph.
#[derive(Parser)]
#[command(name = "glyph", version, about)]
struct Cli {
    /// Script to run. Omit to start a REPL.
    script: Option<PathBuf>,

    /// Print the parsed AST in parenthesized-prefix form instead of running it.
    #[arg(long)]
    ast: bool,

    /// Path to a JSON config file (defaults to ./glyph.config.json if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v for info, -vv or more for debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(cli.verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            process::exit(driver::EX_USAGE);
        }
    };

    let exit_code = match cli.script {
        Some(path) => driver::run_file(&path, &config, cli.ast),
        None => {
            driver::run_repl(&config);
            0
        }
    };

    process::exit(exit_code);
}
