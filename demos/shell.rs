// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A tiny REPL that exercises the whole surface: prompting, history recall
//! and persistence, tab completion, reverse-i-search (Ctrl-R), the password
//! prompt, and out-of-band prompt control from a spawned task.
//!
//! Run it with: `cargo run --example shell`

use miette::IntoDiagnostic as _;
use promptline::{HistoryMode, PromptError, Session};
use std::time::Duration;

const COMMANDS: &[&str] = &["help", "history", "nag", "secret", "substring", "exit"];

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let mut session = Session::new();
    session.set_line_completer(|left: &str| {
        COMMANDS
            .iter()
            .filter(|command| command.starts_with(left))
            .map(ToString::to_string)
            .collect()
    });

    println!("type `help` for commands; Tab completes, Ctrl-R searches history");

    loop {
        let line = match session.prompt("shell> ").await {
            Ok(line) => line,
            Err(PromptError::Aborted) => continue,
            Err(PromptError::Eof) => break,
            Err(err) => return Err(err).into_diagnostic(),
        };
        if !line.is_empty() {
            session.append_history(&line).await;
        }

        match line.trim() {
            "" => {}
            "help" => {
                for command in COMMANDS {
                    println!("  {command}");
                }
            }
            "history" => {
                let mut out: Vec<u8> = Vec::new();
                session.write_history(&mut out).await.into_diagnostic()?;
                print!("{}", String::from_utf8_lossy(&out));
            }
            "substring" => {
                session.set_history_mode(HistoryMode::Pattern).await;
                println!("history recall now matches substrings");
            }
            "nag" => {
                // Change the prompt out-of-band while the next line is
                // being edited.
                let controller = session.controller();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    controller.change_prompt("shell(!)> ").await;
                });
                println!("the prompt will change in two seconds");
            }
            "secret" => match session.password_prompt("secret> ").await {
                Ok(secret) => println!("{} bytes well hidden", secret.len()),
                Err(PromptError::Aborted | PromptError::Eof) => {}
                Err(err) => return Err(err).into_diagnostic(),
            },
            "exit" => break,
            other => println!("unknown command: {other:?}"),
        }
    }

    session.close();
    Ok(())
}
