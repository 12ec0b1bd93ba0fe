//! ttyprompt - ask for a line on the controlling terminal
//!
//! Prints the prompt to the terminal (not stdout), reads the answer there and
//! writes it to stdout. Works as an `SSH_ASKPASS`/`GIT_ASKPASS` helper, which
//! call it with the prompt as the only argument.
//!
//! # Quick Start
//!
//! ```text
//! ttyprompt                      # "Password: ", echo off
//! ttyprompt -e -p "Username: "   # echo on
//! ttyprompt "Passphrase: "       # askpass style
//! ```

use std::env;
use std::io::Write;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ttyprompt::config::Config;

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options given on the command line
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    prompt: Option<String>,
    echo: Option<bool>,
}

fn print_version() {
    eprintln!("ttyprompt {}", VERSION);
}

fn print_help() {
    eprintln!("ttyprompt {} - read a line from the controlling terminal", VERSION);
    eprintln!();
    eprintln!("Usage: ttyprompt [OPTIONS] [PROMPT]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --prompt <TEXT>   Prompt text (default: \"Password: \")");
    eprintln!("  -e, --echo            Show typed characters");
    eprintln!("  -s, --silent          Hide typed characters (default)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("The answer is written to stdout followed by a newline.");
    eprintln!("Exit status is 1 when no line could be read.");
    eprintln!();
    eprintln!("Configuration: ~/.ttyprompt/config.toml");
}

fn parse_args<I>(args: I) -> Result<Args, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-p" | "--prompt" => {
                let text = args.next().ok_or("Missing prompt argument")?;
                parsed.prompt = Some(text);
            }
            "-e" | "--echo" => {
                parsed.echo = Some(true);
            }
            "-s" | "--silent" => {
                parsed.echo = Some(false);
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("Unknown argument: {}. Use -h for help.", flag));
            }
            text => {
                if parsed.prompt.is_some() {
                    return Err(format!("Unexpected argument: {}", text));
                }
                parsed.prompt = Some(text.to_string());
            }
        }
    }

    Ok(parsed)
}

/// Log to the file under `~/.ttyprompt` when possible, else to stderr.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_file = if config.log_file {
        Config::log_path().and_then(|path| {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        })
    } else {
        None
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(false);

    let _ = match log_file {
        Some(file) => tracing::subscriber::set_global_default(
            builder.with_writer(std::sync::Mutex::new(file)).finish(),
        ),
        None => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stderr).finish(),
        ),
    };
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(2);
        }
    };

    let (config, config_error) = Config::load();
    init_logging(&config);
    if let Some(e) = config_error {
        warn!("{}; using defaults", e);
    }

    let prompt = args.prompt.unwrap_or_else(|| config.prompt.clone());
    let echo = args.echo.unwrap_or(config.echo);
    info!(echo, "prompting on the controlling terminal");

    let line = match ttyprompt::prompt_line(&prompt, echo) {
        Ok(line) => line,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line).context("Failed to write answer to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_no_args() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn test_prompt_and_echo() {
        let args = parse(&["-e", "--prompt", "Name: "]).unwrap();
        assert_eq!(args.prompt.as_deref(), Some("Name: "));
        assert_eq!(args.echo, Some(true));
    }

    #[test]
    fn test_askpass_positional() {
        let args = parse(&["Password for 'https://host': "]).unwrap();
        assert_eq!(args.prompt.as_deref(), Some("Password for 'https://host': "));
        assert_eq!(args.echo, None);
    }

    #[test]
    fn test_last_echo_flag_wins() {
        assert_eq!(parse(&["-e", "-s"]).unwrap().echo, Some(false));
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["-p"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["one", "two"]).is_err());
    }
}
