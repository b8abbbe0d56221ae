mod config;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use dtext_core::{ParseOptions, render};
use log::LevelFilter;

/// Render DText markup to HTML.
#[derive(Debug, Parser)]
#[command(name = "dtext", version, about = "Render DText markup to HTML")]
struct Cli {
    /// Input file (omit or use "-" for stdin).
    file: Option<PathBuf>,

    /// Render inline content only, without paragraphs or blocks.
    #[arg(long)]
    inline: bool,

    /// Prefix for site-relative links.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Host whose absolute links are treated as internal.
    #[arg(long, value_name = "HOST")]
    domain: Option<String>,

    /// Leave @mentions as plain text.
    #[arg(long)]
    disable_mentions: bool,

    /// TOML file with default options; flags take precedence.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self, defaults: ParseOptions) -> ParseOptions {
        ParseOptions {
            inline: self.inline || defaults.inline,
            base_url: self.base_url.clone().or(defaults.base_url),
            domain: self.domain.clone().or(defaults.domain),
            disable_mentions: self.disable_mentions || defaults.disable_mentions,
        }
    }

    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn input_path(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|path| *path != Path::new("-"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("render failed: {err:?}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let defaults = match &cli.config {
        Some(path) => config::load(path)?,
        None => ParseOptions::default(),
    };
    let options = cli.options(defaults);

    let (source, input) = read_input(cli.input_path())?;
    log::debug!("read {} bytes from {}", input.len(), source);
    log::debug!("options: {:?}", options);

    let started = Instant::now();
    let html = render(Some(input.as_slice()), &options)
        .with_context(|| format!("failed to render {}", source))?
        .unwrap_or_default();
    log::debug!("rendered {} bytes in {:?}", html.len(), started.elapsed());

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(html.as_bytes())
        .context("failed to write output")?;
    stdout.flush().context("failed to write output")?;
    Ok(())
}

/// Reads raw bytes so that encoding errors come from the renderer.
fn read_input(path: Option<&Path>) -> anyhow::Result<(String, Vec<u8>)> {
    match path {
        Some(path) => {
            let input =
                fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            Ok((path.display().to_string(), input))
        }
        None => {
            let mut input = Vec::new();
            io::stdin()
                .read_to_end(&mut input)
                .context("failed to read stdin")?;
            Ok(("stdin".to_string(), input))
        }
    }
}
