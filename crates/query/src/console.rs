//! Interactive question loop

use std::io::Write;
use swasya_common::{ConsultationQueryEngine, EXAMPLE_QUESTIONS};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const RULE_WIDTH: usize = 60;

/// Whether `line` ends the session
pub fn is_exit_command(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "quit" | "exit" | "q")
}

pub fn print_banner<W: Write>(
    out: &mut W,
    engine: &ConsultationQueryEngine,
) -> std::io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "{}", rule)?;
    writeln!(out, "Consultation Query Engine Ready ({} answers)", engine.backend_kind().as_str())?;
    writeln!(out, "Try asking:")?;
    for example in EXAMPLE_QUESTIONS {
        writeln!(out, "  - {}", example)?;
    }
    writeln!(out, "{}", rule)?;
    out.flush()
}

/// Read questions until end of input or an exit command. Returns the
/// number of questions asked. Failed questions are reported and the loop
/// continues.
pub async fn run_console<R, W>(
    engine: &ConsultationQueryEngine,
    input: R,
    out: &mut W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut asked = 0;

    loop {
        write!(out, "\nAsk a question (or 'quit' to exit): ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();

        if is_exit_command(question) {
            break;
        }
        if question.is_empty() {
            continue;
        }

        asked += 1;
        let rule = "-".repeat(RULE_WIDTH);
        writeln!(out, "\nAnswer:")?;
        writeln!(out, "{}", rule)?;
        match engine.query(question).await {
            Ok(answer) => writeln!(out, "{}", answer)?,
            Err(e) => {
                tracing::error!(error = %e, "Query failed");
                writeln!(out, "Error: {}", e)?;
            }
        }
        writeln!(out, "{}", rule)?;
    }

    Ok(asked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use swasya_common::db::InMemoryRecordSource;
    use swasya_common::AppConfig;

    fn engine(dir: &std::path::Path) -> ConsultationQueryEngine {
        let mut config = AppConfig::default();
        config.index.persist_dir = dir.join("llama_index_storage");
        ConsultationQueryEngine::new(&config, Arc::new(InMemoryRecordSource::default())).unwrap()
    }

    #[test]
    fn test_exit_commands() {
        for line in ["quit", "EXIT", " q ", "Quit"] {
            assert!(is_exit_command(line), "{line}");
        }
        assert!(!is_exit_command("quite"));
        assert!(!is_exit_command(""));
    }

    #[tokio::test]
    async fn test_loop_skips_blanks_and_stops_on_quit() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let input: &[u8] = b"\n   \nSummarize recent consultations\nq\nnever asked\n";
        let mut out = Vec::new();

        let asked = run_console(&engine, input, &mut out).await.unwrap();
        assert_eq!(asked, 1);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Found 0 relevant consultation(s). Summary:"));
        assert!(!printed.contains("never asked"));
    }

    #[tokio::test]
    async fn test_loop_ends_at_eof() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let input: &[u8] = b"What medications were prescribed?";
        let mut out = Vec::new();

        assert_eq!(run_console(&engine, input, &mut out).await.unwrap(), 1);
        let printed = String::from_utf8(out).unwrap();
        assert!(
            printed.contains("Found 0 consultation(s). Check prescriptions in the context above.")
        );
    }

    #[test]
    fn test_banner_lists_examples() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        print_banner(&mut out, &engine(dir.path())).unwrap();

        let printed = String::from_utf8(out).unwrap();
        for example in EXAMPLE_QUESTIONS {
            assert!(printed.contains(example));
        }
        assert!(printed.contains("heuristic"));
    }
}
