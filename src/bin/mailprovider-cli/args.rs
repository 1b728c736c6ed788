use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mailprovider_lib::{ResolveOptions, RunMode};

#[derive(Parser)]
#[command(name = "mailprovider-cli", version, about)]
pub struct Cli {
    /// adresse e-mail à résoudre (invite interactive si absente)
    pub email: Option<String>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long, conflicts_with = "email")]
    pub stdin: bool,

    /// write report to file (JSON/NDJSON/CSV selon --format)
    #[arg(long)]
    pub out: Option<String>,

    /// mode: fast|diagnostic
    #[arg(long, default_value = "fast")]
    pub mode: String,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human")]
    pub format: String,

    /// timeout DNS et par connexion SMTP (ms)
    #[arg(long = "timeout", default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// port SMTP des MX
    #[arg(long, default_value_t = mailprovider_lib::probe::DEFAULT_SMTP_PORT)]
    pub port: u16,

    /// nom annoncé dans EHLO (par défaut l'hôte MX lui-même)
    #[arg(long)]
    pub helo: Option<String>,

    /// sonde les MX en parallèle (mode diagnostic uniquement)
    #[arg(long)]
    pub parallel: bool,

    /// détaille chaque MX sondé dans la sortie human
    #[arg(long)]
    pub details: bool,

    /// logs de debug sur stderr (feature `with-tracing`, sinon RUST_LOG)
    #[cfg(feature = "with-tracing")]
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn parsed_mode(&self) -> Result<RunMode> {
        self.mode.parse().context("invalid --mode")
    }

    pub fn resolve_options(&self) -> Result<ResolveOptions> {
        Ok(ResolveOptions {
            mode: self.parsed_mode()?,
            port: self.port,
            helo_name: self.helo.clone(),
            parallel_probes: self.parallel,
            ..ResolveOptions::default()
        }
        .with_timeout(Duration::from_millis(self.timeout_ms)))
    }
}
