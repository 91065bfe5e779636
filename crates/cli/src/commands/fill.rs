//! `docfill fill`: upload a document and fill it interactively.
//!
//! Reads prompt lines, remote completions and notifications concurrently, so
//! an agent reply can land while the user is typing.

use std::io::Write;
use std::path::PathBuf;

use docfill_client::Workspace;
use docfill_config::AppConfig;
use docfill_core::message::ChatRole;
use docfill_engine::ValueSource;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use super::{build_workspace, describe, load_config, upload_name};
use crate::repl::{self, HELP, ReplCommand};

enum Flow {
    Continue,
    Quit,
}

pub async fn run(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let (mut workspace, mut completions) = build_workspace(&config)?;
    let mut events = workspace.subscribe();

    let bytes = std::fs::read(&file).map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let filename = upload_name(&file)?;

    println!();
    println!("  📄 docfill — {filename}");
    println!("  Service: {}", config.service.base_url);
    println!("  Type `help` for commands, `quit` to leave.");
    println!();

    if let Err(e) = workspace.upload(filename.as_str(), bytes) {
        // A Blocked notification explains missing credentials.
        while let Ok(n) = events.try_recv() {
            eprintln!("{}", describe(&n));
        }
        return Err(e.into());
    }
    println!("  Uploading {filename}...");

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match repl::parse(&line) {
                    Ok(Some(command)) => {
                        if let Flow::Quit = execute(&mut workspace, &config, command) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => eprintln!("  {message}"),
                }
                prompt()?;
            }
            Some(completion) = completions.recv() => {
                workspace.handle(completion);
            }
            Ok(notification) = events.recv() => {
                println!("\n{}", describe(&notification));
                prompt()?;
            }
        }
    }

    if workspace.session().is_some_and(|s| !s.dirty_names().is_empty()) {
        println!("  Unsaved edits were discarded.");
    }
    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  docfill > ");
    std::io::stdout().flush()
}

fn execute(workspace: &mut Workspace, config: &AppConfig, command: ReplCommand) -> Flow {
    let outcome = match command {
        ReplCommand::Quit => return Flow::Quit,
        ReplCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ReplCommand::List => {
            list(workspace);
            Ok(())
        }
        ReplCommand::History => {
            history(workspace);
            Ok(())
        }
        ReplCommand::Edit { name, text } => workspace
            .edit(&name, &text)
            .map(|known| report_unknown(known, &name)),
        ReplCommand::Apply(name) => workspace
            .apply(&name)
            .map(|applied| report_unknown(applied.is_some(), &name)),
        ReplCommand::Set { name, text } => workspace
            .set(&name, &text)
            .map(|applied| report_unknown(applied.is_some(), &name)),
        ReplCommand::ApplyAll => workspace.apply_all().map(|applied| {
            if applied.is_empty() {
                println!("  Nothing to apply.");
            }
        }),
        ReplCommand::Discard(name) => workspace
            .discard(&name)
            .map(|known| report_unknown(known, &name)),
        ReplCommand::Chat(message) => workspace.send_message(&message).map(|()| {
            println!("  ...");
        }),
        ReplCommand::Preview { live } => preview(workspace, live),
        ReplCommand::Export(path) => export(workspace, config, path),
    };

    if let Err(e) = outcome {
        eprintln!("  [Error] {e}");
    }
    Flow::Continue
}

fn report_unknown(known: bool, name: &str) {
    if !known {
        eprintln!("  No placeholder named '{name}'. Type `list` to see them.");
    }
}

fn list(workspace: &Workspace) {
    let Some(session) = workspace.session() else {
        println!("  No document yet.");
        return;
    };

    println!(
        "  {} ({} of {} filled)",
        session.filename(),
        session.store().filled_count(),
        session.store().len()
    );
    for placeholder in session.store().iter() {
        let dirty = session.is_dirty(&placeholder.name);
        let value = if placeholder.value.is_empty() {
            "(empty)"
        } else {
            placeholder.value.as_str()
        };
        println!(
            "  {} {:<24} {}",
            if dirty { "*" } else { " " },
            placeholder.name,
            value
        );
        if dirty {
            println!("      draft: {}", session.draft(&placeholder.name).unwrap_or_default());
        }
        if !placeholder.description.is_empty() {
            println!("      {}", placeholder.description);
        }
    }
}

fn history(workspace: &Workspace) {
    let Some(session) = workspace.session() else {
        println!("  No document yet.");
        return;
    };
    let log = session.history();
    if log.evicted() > 0 {
        println!("  ({} older message(s) dropped)", log.evicted());
    }
    for message in log.messages() {
        let who = match message.role {
            ChatRole::User => "You",
            ChatRole::Assistant => "Assistant",
        };
        println!("  [{}] {who} > {}", message.timestamp.format("%H:%M:%S"), message.content);
    }
}

fn preview(workspace: &mut Workspace, live: bool) -> docfill_core::Result<()> {
    let source = if live {
        ValueSource::Drafts
    } else {
        ValueSource::Committed
    };
    match workspace.preview(source) {
        Ok(bytes) => {
            println!("{}", String::from_utf8_lossy(&bytes));
            Ok(())
        }
        Err(e) => {
            if let Some(previous) = workspace.session().and_then(|s| s.last_preview()) {
                println!("  (showing the last preview that rendered)");
                println!("{}", String::from_utf8_lossy(&previous));
            }
            Err(e)
        }
    }
}

fn export(
    workspace: &Workspace,
    config: &AppConfig,
    path: Option<PathBuf>,
) -> docfill_core::Result<()> {
    let (filename, bytes) = workspace.export()?;
    let target = path.unwrap_or_else(|| config.export_path(&filename));
    std::fs::write(&target, bytes)
        .map_err(|e| docfill_core::Error::Internal(format!("Failed to write {}: {e}", target.display())))?;
    println!("  ✅ Wrote {}", target.display());
    Ok(())
}
