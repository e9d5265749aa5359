use certpoller::config::Config;
use certpoller::report::{self, OutputFormat};
use certpoller::{check_certificate, CheckOptions, PeerVerification, Summary};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Polls TLS servers listed in a YAML file and reports certificate expiration.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "PATH", required_unless_present = "example_config")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Days before expiration to warn (default: 30)
    #[arg(short, long, value_name = "DAYS")]
    warning_days: Option<i64>,

    /// Connect and handshake timeout in seconds (default: 30)
    #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Print an example config file and exit
    #[arg(long)]
    example_config: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            println!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<u8, Box<dyn Error>> {
    if cli.example_config {
        print!("{}", Config::example_yaml());
        return Ok(0);
    }
    let path = cli.config.as_ref().ok_or("Config file is required")?;

    let config = Config::default()
        .merge_with(Config::from_file(path)?)
        .merge_with(Config::from_cli_args(cli.warning_days, cli.timeout));
    let targets = config.targets()?;

    // Inspect-only: the certificate is reported, never trusted.
    let mut options = CheckOptions::new(PeerVerification::InspectOnly);
    if let Some(days) = config.warning_days {
        options = options.with_warning_days(days);
    }
    if let Some(secs) = config.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let mut outcomes = Vec::with_capacity(targets.len());
    for target in &targets {
        if cli.format == OutputFormat::Text {
            println!("Checking {}...", target.name);
        }
        outcomes.push(check_certificate(target, &options));
    }

    println!("{}", report::render(&outcomes, cli.format)?);

    Ok(Summary::from_outcomes(&outcomes).exit_code())
}
