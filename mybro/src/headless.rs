//! Headless mode: a plain line-oriented chat on stdin/stdout.
//!
//! Each input line is either a command (see [`Command`]) or a message.
//! Replies are printed as `Bro: ...`; bookkeeping lines are tagged in
//! brackets (`[PROCESSING]`, `[SUGGESTION]`, `[WARNING]`, ...) so scripts can
//! filter them.

use std::io::{self, BufRead, Write};

use mybro_core::ChatSession;
use tracing::info;

use crate::commands::{Command, HELP_TEXT};
use crate::worker::apply_profile_command;

/// Run the REPL until `quit` or end of input, then save.
pub async fn run<R, W>(mut session: ChatSession, input: R, mut out: W) -> io::Result<()>
where
    R: BufRead,
    W: Write + Send,
{
    writeln!(out, "=== MyBro ===")?;
    writeln!(
        out,
        "Hey {}, I'm here to listen. Type 'help' for commands, 'quit' to leave.",
        session.profile().display_name()
    )?;
    for warning in session.take_warnings() {
        writeln!(out, "[WARNING] {warning}")?;
    }
    if let Some(check_in) = session.daily_check_in().await {
        writeln!(out, "Bro: {check_in}")?;
    }
    writeln!(out)?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Some(Ok(Command::Quit)) => break,
            Some(Ok(command)) => run_command(&mut session, command, &mut out).await?,
            Some(Err(usage)) => writeln!(out, "[ERROR] {}", usage.0)?,
            None => send(&mut session, line, &mut out).await?,
        }
        out.flush()?;
    }

    for warning in session.end().await {
        writeln!(out, "[WARNING] {warning}")?;
    }
    writeln!(out, "Take care of yourself. Goodbye!")?;
    info!("Headless session finished");
    out.flush()
}

async fn send<W: Write + Send>(session: &mut ChatSession, text: &str, out: &mut W) -> io::Result<()> {
    writeln!(out, "[PROCESSING]")?;
    write!(out, "Bro: ")?;

    let mut streamed = String::new();
    let reply = session
        .send_streaming(text, |delta| {
            streamed.push_str(delta);
            let _ = write!(out, "{delta}");
            let _ = out.flush();
        })
        .await;

    // Refusals, fallbacks and crisis resources never arrive as deltas, and
    // the final text is trimmed.
    match reply.text.strip_prefix(streamed.trim()) {
        Some(rest) => writeln!(out, "{rest}")?,
        None => writeln!(out, "\n{}", reply.text)?,
    }
    for suggestion in &reply.suggestions {
        writeln!(out, "[SUGGESTION] {suggestion}")?;
    }
    for question in &reply.follow_up_questions {
        writeln!(out, "[QUESTION] {question}")?;
    }
    writeln!(out)
}

async fn run_command<W: Write>(
    session: &mut ChatSession,
    command: Command,
    out: &mut W,
) -> io::Result<()> {
    match command {
        Command::Help => writeln!(out, "{HELP_TEXT}"),
        Command::CheckIn => match session.daily_check_in().await {
            Some(text) => writeln!(out, "Bro: {text}"),
            None => writeln!(out, "[STATUS] Already checked in today"),
        },
        Command::Clear => {
            session.clear_history();
            writeln!(out, "[STATUS] Conversation cleared")
        }
        Command::Profile(profile) => {
            let text = apply_profile_command(session, profile);
            writeln!(out, "[PROFILE]\n{text}")
        }
        // Handled by the caller.
        Command::Quit => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mybro_core::{CompanionConfig, MockModel, REFUSAL_MESSAGE};
    use std::io::Cursor;
    use std::sync::Arc;

    async fn run_script(dir: &std::path::Path, model: MockModel, script: &str) -> String {
        let config = CompanionConfig::default().with_data_dir(dir);
        let session = ChatSession::open(config, Arc::new(model), "headless_user")
            .await
            .unwrap();
        let mut out = Vec::new();
        run(session, Cursor::new(script.to_string()), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_chat_and_quit() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockModel::with_replies(["Hi! How are you?", "That sounds hard."]);
        let output = run_script(
            dir.path(),
            model,
            "profile name Alex\nwork has me stressed out\nquit\nnever sent\n",
        )
        .await;

        assert!(output.contains("Hey friend"));
        assert!(output.contains("Bro: Hi! How are you?"));
        assert!(output.contains("I'll call you Alex"));
        assert!(output.contains("[PROCESSING]"));
        assert!(output.contains("Bro: That sounds hard."));
        assert!(output.contains("[SUGGESTION] Pick the one task that matters most today"));
        assert!(output.contains("[QUESTION] "));
        assert!(output.contains("Goodbye!"));
        assert!(!output.contains("never sent"));
        assert!(dir.path().join("profiles").join("headless_user.json").exists());
    }

    #[tokio::test]
    async fn test_refusal_and_crisis_printed_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockModel::with_replies(["check-in", "I'm really glad you told me."]);
        let output = run_script(
            dir.path(),
            model,
            "what's a good lasagna recipe\nI'm planning to kill myself tonight\n",
        )
        .await;

        assert!(output.contains(REFUSAL_MESSAGE));
        assert!(output.contains("I'm really glad you told me."));
        assert!(output.contains("988"));
        assert!(output.contains("[QUESTION] Are you safe right now?"));
    }

    #[tokio::test]
    async fn test_trailing_newline_not_printed_twice() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockModel::with_replies(["check-in", "That sounds hard.\n"]);
        let output = run_script(dir.path(), model, "work is stressing me out\n").await;
        assert_eq!(output.matches("That sounds hard.").count(), 1);
    }

    #[tokio::test]
    async fn test_usage_error_reported() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_script(dir.path(), MockModel::new(), "profile pref nope\n").await;
        assert!(output.contains("[ERROR] Usage: profile pref <key>=<value>"));
    }
}
