//! Interactive question session.

use std::path::PathBuf;

use anyhow::Result;
use docqa_rag::{RagContext, SessionState};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::{ingest, report_batch};

const HELP: &str = "\
Type a question, or one of:
  /load <files...>  replace the indexed documents
  /history          show recent questions
  /stats            show indexed documents
  /health           check the index
  /clear            forget the question history
  /quit             exit";

/// Read questions until EOF or `/quit`.
pub async fn run(context: &RagContext, collection: &str, session: &mut SessionState) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("{HELP}\n");

    loop {
        let line = match editor.readline("docqa> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(line) {
            debug!(error = %e, "failed to add line to editor history");
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some("/quit" | "/exit") => break,
            Some("/help") => println!("{HELP}"),
            Some("/history") => print_history(session),
            Some("/stats") => print_stats(session),
            Some("/clear") => {
                session.clear_history();
                println!("History cleared.");
            }
            Some("/health") => {
                let issues = context.health_check(collection, session).await;
                if issues.is_empty() {
                    println!("OK");
                }
                for issue in issues {
                    println!("- {issue}");
                }
            }
            Some("/load") => {
                let paths: Vec<PathBuf> = words.map(PathBuf::from).collect();
                match ingest(context, collection, &paths).await {
                    Ok(batch) => {
                        report_batch(&batch);
                        session.set_documents(&batch);
                    }
                    Err(e) => eprintln!("error: {e:#}"),
                }
            }
            Some(command) if command.starts_with('/') => {
                println!("Unknown command {command}. Type /help for commands.");
            }
            _ => match context.ask(collection, line, session).await {
                Ok(answer) => println!("{}\n  (source: {})\n", answer.text, answer.source),
                Err(e) => {
                    warn!(error = %e, "question failed");
                    eprintln!("error: {e}");
                }
            },
        }
    }
    Ok(())
}

fn print_history(session: &SessionState) {
    if session.history_len() == 0 {
        println!("No questions yet.");
        return;
    }
    for entry in session.history() {
        println!(
            "[{}] Q: {}\n    A: {} ({})",
            entry.timestamp.format("%H:%M:%S"),
            entry.question,
            entry.answer,
            entry.source
        );
    }
}

fn print_stats(session: &SessionState) {
    let documents = session.documents();
    if documents.is_empty() {
        println!("No documents indexed.");
        return;
    }
    for doc in documents {
        let note = if doc.placeholder { " (placeholder)" } else { "" };
        println!(
            "{}: {} chunks, {} words, {} bytes{note}",
            doc.filename, doc.chunk_count, doc.word_count, doc.byte_size
        );
    }
    let chunks: usize = documents.iter().map(|d| d.chunk_count).sum();
    let words: usize = documents.iter().map(|d| d.word_count).sum();
    println!("Total: {} documents, {chunks} chunks, {words} words", documents.len());
}
