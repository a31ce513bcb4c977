//! Swasya Query
//!
//! Answers one question and prints a single JSON envelope on stdout.
//! Logging is off unless `--verbose`, which sends it to stderr.
//! Only the first positional word is the question; further words are ignored.

use clap::{error::ErrorKind, Parser};
use std::process::ExitCode;
use swasya_common::{
    config::{AppConfig, ObservabilityConfig},
    telemetry::{self, LogSink},
    AppError, ConsultationQueryEngine,
};
use swasya_query::{run_single_shot, Envelope};

#[derive(Parser, Debug)]
#[command(name = "query", about = "Answer a question about indexed consultations", version)]
struct Cli {
    /// Write logs to stderr
    #[arg(long, short)]
    verbose: bool,

    /// Question to answer
    #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<String>,
}

impl Cli {
    fn question(&self) -> Option<String> {
        self.words.first().cloned()
    }
}

/// Failure envelope for a rejected command line, `None` for help and version requests
fn rejection(err: &clap::Error) -> Option<Envelope> {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => None,
        _ => {
            let rendered = err.to_string();
            let message = rendered.lines().next().unwrap_or_default().trim();
            Some(Envelope::failed(message))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match rejection(&err) {
            Some(envelope) => {
                println!("{}", envelope.to_line());
                return ExitCode::from(envelope.exit_code());
            }
            None => err.exit(),
        },
    };
    let config = AppConfig::load().map_err(AppError::from);

    let sink = if cli.verbose { LogSink::Stderr } else { LogSink::Off };
    let observability = config
        .as_ref()
        .map(|c| c.observability.clone())
        .unwrap_or_else(|_| ObservabilityConfig::default());
    telemetry::init_tracing(&observability, sink);

    let envelope = run_single_shot(cli.question(), move || {
        let config = config?;
        ConsultationQueryEngine::from_config(&config)
    })
    .await;

    println!("{}", envelope.to_line());
    ExitCode::from(envelope.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_question_is_optional() {
        let cli = Cli::try_parse_from(["query"]).unwrap();
        assert!(cli.question().is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_question_and_verbose() {
        let cli =
            Cli::try_parse_from(["query", "--verbose", "List all patients with fever"]).unwrap();
        assert_eq!(cli.question().as_deref(), Some("List all patients with fever"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_dash_leading_question_is_a_question() {
        let cli = Cli::try_parse_from(["query", "-5 days of fever, who?"]).unwrap();
        assert_eq!(cli.question().as_deref(), Some("-5 days of fever, who?"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_unquoted_words_keep_the_first() {
        let cli = Cli::try_parse_from(["query", "What", "symptoms"]).unwrap();
        assert_eq!(cli.question().as_deref(), Some("What"));
    }

    #[test]
    fn test_help_is_not_rejected() {
        let err = Cli::try_parse_from(["query", "--help"]).unwrap_err();
        assert!(rejection(&err).is_none());
    }

    #[test]
    fn test_parse_error_becomes_failure_envelope() {
        let err = Cli::command().error(ErrorKind::InvalidValue, "bad flag");
        let envelope = rejection(&err).unwrap();
        assert_eq!(envelope.success, Some(false));
        assert_eq!(envelope.exit_code(), 1);
        assert!(envelope.error.unwrap().contains("bad flag"));
        assert!(envelope.to_line().starts_with(r#"{"success":false"#));
    }
}
