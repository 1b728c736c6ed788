use anyhow::{Context, Result, bail};

use crate::args::Cli;
use mailprovider_lib::{EhloTranscript, ResolutionResult};

pub fn write_reports(rows: &[ResolutionResult], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(rows, cli),
        "json" => write_json(rows, cli),
        "ndjson" => write_ndjson(rows, cli),
        "csv" => write_csv(rows, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

pub fn any_unresolved(rows: &[ResolutionResult]) -> bool {
    rows.iter().any(|row| !row.is_resolved())
}

fn write_human(rows: &[ResolutionResult], cli: &Cli) -> Result<()> {
    let report = human_report(rows, cli.details);
    if let Some(path) = &cli.out {
        write_all_atomically(path, report.as_bytes())?;
    } else {
        print!("{report}");
    }
    Ok(())
}

fn human_report(rows: &[ResolutionResult], details: bool) -> String {
    let mut out = String::new();
    for row in rows {
        match (&row.provider, &row.failure_reason) {
            (Some(provider), _) => {
                out.push_str(&format!("[FOUND]   {} :: {provider}\n", row.email_address));
                if let Some(clue) = &row.clue {
                    out.push_str(&format!("          clue: {clue}\n"));
                }
            }
            (None, reason) => out.push_str(&format!(
                "[UNKNOWN] {} :: {}\n",
                row.email_address,
                reason.as_deref().unwrap_or("no reason given")
            )),
        }

        if details {
            for transcript in &row.details {
                out.push_str(&format!("          mx: {}\n", transcript_summary(transcript)));
                for line in &transcript.response_lines {
                    out.push_str(&format!("              {line}\n"));
                }
            }
        }
    }
    out
}

fn transcript_summary(transcript: &EhloTranscript) -> String {
    let mut summary = format!("{}:{}", transcript.priority, transcript.exchange_host);
    if let Some(err) = &transcript.connect_error {
        summary.push_str(&format!(" (connect failed: {err})"));
    } else if transcript.cancelled {
        summary.push_str(" (cancelled)");
    } else if transcript.tls_advertised {
        summary.push_str(" (STARTTLS)");
    }
    summary
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[ResolutionResult], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[ResolutionResult], _: &Cli) -> Result<()> {
    bail!("format=json nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(rows: &[ResolutionResult], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut buf = Vec::new();
        for row in rows {
            let line = serde_json::to_string(row)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[ResolutionResult], _: &Cli) -> Result<()> {
    bail!("format=ndjson nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-csv")]
const CSV_HEADER: [&str; 6] = [
    "email_address",
    "provider",
    "clue",
    "failure_kind",
    "failure_reason",
    "mx",
];

#[cfg(feature = "with-csv")]
fn write_csv(rows: &[ResolutionResult], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[ResolutionResult], _: &Cli) -> Result<()> {
    bail!("format=csv nécessite la feature 'with-csv'")
}

#[cfg(feature = "with-csv")]
fn csv_record(row: &ResolutionResult) -> [String; 6] {
    let mx = row
        .details
        .iter()
        .map(|transcript| format!("{}:{}", transcript.priority, transcript.exchange_host))
        .collect::<Vec<_>>()
        .join(";");
    [
        row.email_address.clone(),
        row.provider.clone().unwrap_or_default(),
        row.clue.clone().unwrap_or_default(),
        row.failure
            .map(|kind| kind.as_str().to_string())
            .unwrap_or_default(),
        row.failure_reason.clone().unwrap_or_default(),
        mx,
    ]
}

fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {tmp}"))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
