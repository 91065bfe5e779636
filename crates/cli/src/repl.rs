//! Interactive command parsing for `docfill fill`.

use std::path::PathBuf;

/// One line typed at the `fill` prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    List,
    Edit { name: String, text: String },
    Apply(String),
    ApplyAll,
    Discard(String),
    Set { name: String, text: String },
    Chat(String),
    Preview { live: bool },
    Export(Option<PathBuf>),
    History,
    Help,
    Quit,
}

pub const HELP: &str = "\
  list                    Show placeholders (* = unsaved edit)
  edit <name> = <text>    Change a draft without applying it
  apply <name>            Apply a draft and sync it
  apply-all               Apply every unsaved edit
  discard <name>          Throw away an unsaved edit
  set <name> = <text>     Edit and apply in one step
  chat <message>          Ask the agent to fill fields
  preview [live]          Render the document (live = include unsaved edits)
  export [path]           Write the filled document
  history                 Show the chat history
  help                    Show this help
  quit                    Leave";

/// Parse one prompt line. Empty lines are `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "list" | "ls" => ReplCommand::List,
        "edit" => {
            let (name, text) = split_assignment(rest)?;
            ReplCommand::Edit { name, text }
        }
        "set" => {
            let (name, text) = split_assignment(rest)?;
            ReplCommand::Set { name, text }
        }
        "apply" => ReplCommand::Apply(required(rest, "apply <name>")?),
        "apply-all" => ReplCommand::ApplyAll,
        "discard" => ReplCommand::Discard(required(rest, "discard <name>")?),
        "chat" => ReplCommand::Chat(required(rest, "chat <message>")?),
        "preview" => match rest {
            "" => ReplCommand::Preview { live: false },
            "live" => ReplCommand::Preview { live: true },
            other => return Err(format!("unknown preview mode '{other}'; try `preview live`")),
        },
        "export" => ReplCommand::Export((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "history" => ReplCommand::History,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | ":q" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{other}'; type `help`")),
    };
    Ok(Some(command))
}

/// Parse a `--set name=value` argument.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    split_assignment(raw)
}

/// Split at the first `=`; the value may contain more.
fn split_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `name = value`, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("placeholder name must not be empty".into());
    }
    Ok((name.to_string(), text.trim().to_string()))
}

fn required(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}
