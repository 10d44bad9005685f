use anyhow::{Result, bail};
use mailcheck_bulk::{Verdict, Verdicts};

use crate::args::Cli;

pub fn write_reports(verdicts: &Verdicts, cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(verdicts, cli),
        "json" => write_json(verdicts, cli),
        "ndjson" => write_ndjson(verdicts, cli),
        "csv" => write_csv(verdicts, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

/// At least one batch could not be probed.
pub fn any_failed(verdicts: &Verdicts) -> bool {
    verdicts
        .values()
        .any(|verdict| matches!(verdict, Verdict::Failed(_)))
}

pub fn render_human(verdicts: &Verdicts) -> String {
    verdicts
        .iter()
        .map(|(email, verdict)| match verdict {
            Verdict::Exists => format!("[EXISTS]   {email}"),
            Verdict::Rejected => format!("[REJECTED] {email}"),
            Verdict::Unknown => format!("[UNKNOWN]  {email}"),
            Verdict::Failed(err) => format!("[FAILED]   {email} :: {err}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_human(verdicts: &Verdicts, cli: &Cli) -> Result<()> {
    let text = render_human(verdicts);
    match &cli.out {
        Some(path) => write_all_atomically(path, format!("{text}\n").as_bytes()),
        None => {
            if !text.is_empty() {
                println!("{text}");
            }
            Ok(())
        }
    }
}

#[cfg(feature = "with-serde")]
#[derive(serde::Serialize)]
struct Row<'a> {
    email: &'a str,
    status: &'static str,
    exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[cfg(feature = "with-serde")]
impl<'a> Row<'a> {
    fn new(email: &'a str, verdict: &Verdict) -> Self {
        Self {
            email,
            status: verdict.label(),
            exists: verdict.as_bool(),
            error: verdict.error().map(ToString::to_string),
        }
    }
}

#[cfg(feature = "with-serde")]
fn write_json(verdicts: &Verdicts, cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(verdicts)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, format!("{s}\n").as_bytes())
    } else {
        println!("{s}");
        Ok(())
    }
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_verdicts: &Verdicts, _cli: &Cli) -> Result<()> {
    bail!("format=json nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(verdicts: &Verdicts, cli: &Cli) -> Result<()> {
    let mut buf = Vec::new();
    for (email, verdict) in verdicts {
        serde_json::to_writer(&mut buf, &Row::new(email, verdict))?;
        buf.push(b'\n');
    }
    match &cli.out {
        Some(path) => write_all_atomically(path, &buf),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&buf)?;
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_verdicts: &Verdicts, _cli: &Cli) -> Result<()> {
    bail!("format=ndjson nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-csv")]
fn write_csv(verdicts: &Verdicts, cli: &Cli) -> Result<()> {
    use anyhow::Context;

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["email", "status", "exists", "error"])?;
    for (email, verdict) in verdicts {
        let row = Row::new(email, verdict);
        let exists = match row.exists {
            Some(true) => "true",
            Some(false) => "false",
            None => "",
        };
        wtr.write_record([
            row.email,
            row.status,
            exists,
            row.error.as_deref().unwrap_or(""),
        ])?;
    }
    let data = wtr.into_inner().context("flush csv")?;
    match &cli.out {
        Some(path) => write_all_atomically(path, &data),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&data)?;
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_verdicts: &Verdicts, _cli: &Cli) -> Result<()> {
    bail!("format=csv nécessite la feature 'with-csv'")
}

fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use anyhow::Context;
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
