use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use aimark::{Config, Error};

#[derive(Parser)]
#[command(name = "aimark")]
#[command(about = "Render AI responses to safe HTML and pull structured data out of them")]
struct Cli {
    /// Log recovered markup issues and other debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to aimark.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a message to an HTML fragment
    Render {
        /// Input file, or stdin when absent or "-"
        input: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print recovered issues to stderr
        #[arg(long)]
        issues: bool,
    },
    /// Print sections and the first JSON object as JSON
    Extract {
        /// Input file, or stdin when absent or "-"
        input: Option<PathBuf>,

        #[arg(long)]
        pretty: bool,
    },
    /// Print only the first JSON object; exits with status 1 if none
    Json {
        /// Input file, or stdin when absent or "-"
        input: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the command produced what was asked for.
fn run(cli: Cli) -> Result<bool, Error> {
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from("aimark.toml"));
    let config = Config::load(&config_path)?;

    match cli.command {
        Command::Render {
            input,
            output,
            issues,
        } => {
            let raw = read_input(input.as_deref())?;
            let rendered = aimark::render_report(&raw, &config);
            if issues {
                for issue in &rendered.issues {
                    eprintln!("{}", issue);
                }
            }
            match output {
                Some(path) => fs::write(&path, rendered.html)?,
                None => writeln!(io::stdout(), "{}", rendered.html)?,
            }
            Ok(true)
        }
        Command::Extract { input, pretty } => {
            let raw = read_input(input.as_deref())?;
            let result = aimark::extract(&raw, &config);
            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            writeln!(io::stdout(), "{}", json)?;
            Ok(true)
        }
        Command::Json { input } => {
            let raw = read_input(input.as_deref())?;
            match aimark::extract_json(&raw) {
                Some(object) => {
                    writeln!(io::stdout(), "{}", serde_json::to_string(&object)?)?;
                    Ok(true)
                }
                None => {
                    tracing::warn!("no JSON object found in input");
                    Ok(false)
                }
            }
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String, Error> {
    match path {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).map_err(|source| Error::Read {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .map_err(|source| Error::Read {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
            Ok(raw)
        }
    }
}
