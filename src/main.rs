//! # BASIC
//!
//! Command line front end for the arena BASIC interpreter.
//!

use basic::mach::{Boolean, Config};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Parser)]
#[command(name = "basic", about = "A BASIC interpreter on one byte arena", version)]
struct Cli {
    /// Bytes of memory for program and variables, at most 65535
    #[arg(long, default_value_t = 32768)]
    memsize: usize,
    /// Log level on stderr: error, warn, info, debug or trace
    #[arg(long, default_value = "warn")]
    log: Level,
    /// True is 1 and NOT, AND, OR are logical instead of bitwise
    #[arg(long)]
    legacy_bool: bool,
    /// Keep lower case letters in keywords and names
    #[arg(long)]
    no_fold: bool,
    /// Program to load and run
    file: Option<PathBuf>,
}

fn init_logging(level: Level) {
    let targets = Targets::new()
        .with_default(Level::WARN)
        .with_target("basic::lex", level)
        .with_target("basic::program", level)
        .with_target("basic::heap", level)
        .with_target("basic::exec", level);
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(targets);
    tracing_subscriber::registry().with(layer).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log);
    let config = Config {
        memsize: cli.memsize,
        boolean: if cli.legacy_bool {
            Boolean::Legacy
        } else {
            Boolean::AllBits
        },
        case_fold: !cli.no_fold,
        ..Config::default()
    };
    basic::term::main(config, cli.file);
}
