use signed_request::{Interval, SignedRequest, SignedRequestConfig, SystemClock, Timestamp};
use std::{env, process::ExitCode};
use tracing::error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: signed-request <command> [args]

Commands:
  sign key=value...        Sign parameters and print the query string
  validate <query>         Validate a signed query string
  now                      Print the current time with milliseconds
  diff <from> <to>         Print the interval between two ISO-8601 timestamps
  add <timestamp> <spec>   Add an interval such as PT1.5S to a timestamp
  version                  Print version and build information

sign and validate read SIGNED_REQUEST_APP_ID, SIGNED_REQUEST_APP_SECRET and
SIGNED_REQUEST_WINDOW from the environment. Set RUST_LOG to control logging
and LOG_FORMAT=json for JSON log lines.";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn signer() -> Result<SignedRequest, String> {
    let config = SignedRequestConfig::from_env().map_err(|e| e.to_string())?;
    Ok(SignedRequest::from_config(&config))
}

fn run(args: &[String]) -> Result<String, String> {
    let (command, rest) = args.split_first().ok_or_else(|| USAGE.to_string())?;

    match (command.as_str(), rest) {
        ("sign", pairs) if !pairs.is_empty() => {
            let params = pairs
                .iter()
                .map(|pair| {
                    pair.split_once('=')
                        .ok_or_else(|| format!("expected key=value, got '{pair}'"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(signer()?.sign_to_query_string(params))
        }
        ("validate", [query]) => {
            let payload = signer()?
                .validate_query_string(query)
                .map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&payload).map_err(|e| e.to_string())
        }
        ("now", []) => Ok(Timestamp::now(&SystemClock).to_iso8601()),
        ("diff", [from, to]) => {
            let from = Timestamp::parse(from).map_err(|e| e.to_string())?;
            let to = Timestamp::parse(to).map_err(|e| e.to_string())?;
            let interval = from.diff(&to, false).map_err(|e| e.to_string())?;
            Ok(format!(
                "{interval}\n{}",
                interval.format("%R %yy %mm %dd %hh %im %ss (%a days)")
            ))
        }
        ("add", [timestamp, spec]) => {
            let mut timestamp = Timestamp::parse(timestamp).map_err(|e| e.to_string())?;
            let interval = Interval::parse(spec).map_err(|e| e.to_string())?;
            timestamp.add(&interval).map_err(|e| e.to_string())?;
            timestamp
                .format("%Y-%m-%dT%H:%M:%S.{us}%z")
                .map_err(|e| e.to_string())
        }
        ("version", []) => Ok(format!(
            "{} {} (commit {}, built {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
            option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        )),
        _ => Err(USAGE.to_string()),
    }
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!(%message, "command failed");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_usage_on_unknown_command() {
        let err = run(&args(&["launch"])).unwrap_err();
        assert!(err.starts_with("Usage:"));
        assert!(run(&[]).is_err());
    }

    #[test]
    fn test_diff_command() {
        let output = run(&args(&[
            "diff",
            "2020-01-01T00:00:00.900+0000",
            "2020-01-01T00:00:02.100+0000",
        ]))
        .unwrap();
        assert!(output.starts_with("PT1S200F"));
        assert!(output.contains("+ 0y 0m 0d 0h 0m 1.2s (0 days)"));
    }

    #[test]
    fn test_add_command() {
        let output = run(&args(&["add", "2020-01-01T00:00:00.900+0000", "PT0.2S"])).unwrap();
        assert_eq!(output, "2020-01-01T00:00:01.100000+0000");
    }

    #[test]
    fn test_add_command_reports_out_of_range() {
        let err = run(&args(&["add", "2020-01-01T00:00:00.5Z", "PT99999999999999999999F"]))
            .unwrap_err();
        assert_eq!(err, "timestamp out of range");
    }

    #[test]
    fn test_version_command() {
        let output = run(&args(&["version"])).unwrap();
        assert!(output.contains(env!("CARGO_PKG_VERSION")));
    }
}
