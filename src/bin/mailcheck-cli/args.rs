use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mailcheck_bulk::VerifyOptions;

#[derive(Parser, Debug)]
#[command(
    name = "mailcheck-cli",
    version,
    about = "Vérifie l'existence de boîtes mail par sondes SMTP RCPT TO"
)]
pub struct Cli {
    /// adresses à vérifier
    pub emails: Vec<String>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long)]
    pub stdin: bool,

    /// proxy HTTP CONNECT, répétable: http://[user:pass@]host:port
    #[arg(long = "proxy")]
    pub proxies: Vec<String>,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human")]
    pub format: String,

    /// write report to file (atomic replace)
    #[arg(long)]
    pub out: Option<String>,

    /// fichier JSON d'options (feature `with-serde`), champs absents = défauts
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// adresses par session SMTP
    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,

    /// timeout de connexion (ms), direct ou via proxy
    #[arg(long = "connect-timeout")]
    pub connect_timeout_ms: Option<u64>,

    /// serveurs MX sondés en parallèle
    #[arg(long = "max-sim-mx")]
    pub max_sim_mx: Option<usize>,

    /// nom annoncé dans HELO
    #[arg(long)]
    pub helo: Option<String>,

    /// enveloppe MAIL FROM
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// port SMTP des serveurs MX
    #[arg(long)]
    pub port: Option<u16>,

    /// affiche la progression sur stderr
    #[arg(long)]
    pub progress: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    /// Options file (if any) with the command-line overrides applied on top.
    pub fn verify_options(&self) -> Result<VerifyOptions> {
        let mut options = match &self.options {
            Some(path) => load_options(path)?,
            None => VerifyOptions::default(),
        };

        let smtp = &mut options.smtp;
        if let Some(size) = self.batch_size {
            smtp.max_emails_per_req = size.max(1);
        }
        if let Some(ms) = self.connect_timeout_ms {
            smtp.connect_timeout_ms = ms;
        }
        if let Some(count) = self.max_sim_mx {
            smtp.max_sim_mx = count;
        }
        if let Some(helo) = &self.helo {
            smtp.helo_domain = helo.clone();
        }
        if let Some(from) = &self.mail_from {
            smtp.mail_from = from.clone();
        }
        if let Some(port) = self.port {
            smtp.port = port;
        }
        Ok(options)
    }

    /// Positional addresses followed by stdin lines, blanks skipped.
    pub fn read_addresses(&self) -> Result<Vec<String>> {
        let mut addresses: Vec<String> = self
            .emails
            .iter()
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .collect();
        if self.stdin {
            for line in io::stdin().lock().lines() {
                let line = line.context("read stdin")?;
                let email = line.trim();
                if !email.is_empty() {
                    addresses.push(email.to_string());
                }
            }
        }
        Ok(addresses)
    }
}

#[cfg(feature = "with-serde")]
fn load_options(path: &PathBuf) -> Result<VerifyOptions> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read options file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse options file {}", path.display()))
}

#[cfg(not(feature = "with-serde"))]
fn load_options(_path: &PathBuf) -> Result<VerifyOptions> {
    anyhow::bail!("--options nécessite la feature 'with-serde'")
}
