mod args;
mod output;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use mailprovider_lib::{ProviderCatalog, ProviderResolver, ResolutionResult};

use crate::args::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "with-tracing")]
    init_tracing(cli.verbose);

    let options = cli.resolve_options()?;
    let resolver = ProviderResolver::new(ProviderCatalog::default(), options);

    let rows: Vec<ResolutionResult> = read_addresses(&cli)?
        .iter()
        .map(|email| resolver.resolve(email))
        .collect();

    output::write_reports(&rows, &cli)?;

    // codes de sortie : 0 tout résolu, 2 au moins un échec, 1 fatal
    if output::any_unresolved(&rows) {
        std::process::exit(2);
    }
    Ok(())
}

fn read_addresses(cli: &Cli) -> Result<Vec<String>> {
    if cli.stdin {
        let mut emails = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            if !line.trim().is_empty() {
                emails.push(line);
            }
        }
        return Ok(emails);
    }

    if let Some(email) = cli.email.as_deref().filter(|email| !email.is_empty()) {
        return Ok(vec![email.to_string()]);
    }

    // pas d'argument : on demande l'adresse
    eprint!("Enter email address to test: ");
    io::stderr().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).context("read stdin")? == 0 {
        bail!("no email address given");
    }
    Ok(vec![line.trim_end_matches(['\r', '\n']).to_string()])
}

#[cfg(feature = "with-tracing")]
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let default = if verbose { "mailprovider_lib=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
