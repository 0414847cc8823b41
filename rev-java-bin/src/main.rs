use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use rev_decompiler::{decompile, pretty, PrettyConfig};

#[derive(Debug, Parser)]
#[command(name = "rev", about = "Decompile a Java class file", version)]
struct Cli {
    /// The `.class` file to read.
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Show method bodies as bytecode instead of decompiling them.
    #[arg(short, long)]
    bytecode: bool,

    /// Spaces per indentation level.
    #[arg(long = "indent", value_name = "N", default_value_t = 4)]
    indentation: usize,

    /// Log more. Repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn setup_logger(verbose: u8) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
        })
        .level(level(verbose))
        .chain(std::io::stderr())
        .apply()
        .context("failed to install the logger")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logger(cli.verbose)?;

    let bytes = std::fs::read(&cli.input).with_context(|| format!("failed to read {:?}", cli.input))?;
    info!("read {} bytes from {:?}", bytes.len(), cli.input);

    let model = decompile(&bytes).with_context(|| format!("failed to decompile {:?}", cli.input))?;
    let view = model.render(cli.bytecode);
    let config = PrettyConfig { indentation: cli.indentation };
    println!("{}", pretty::source(&view, &config));
    Ok(())
}
