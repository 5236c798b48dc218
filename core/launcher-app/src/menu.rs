//! Privileged menu console. Lines on the launcher's stdin play the role of
//! the application menu: the only place theme and locale can change.
//!
//! ```text
//! theme dark
//! locale zh-cn
//! menu
//! sessions
//! quit
//! ```

use launcher_core::{build_menu_model, MenuModel, Origin, RuntimeHandle};
use lazy_launcher_protocol::{CommandName, Request, Response, UiState};
use serde_json::json;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    SetTheme(String),
    SetLocale(String),
    Menu,
    Sessions,
    Help,
    Quit,
    Unknown(String),
}

/// How the console loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    Quit,
    EndOfInput,
}

pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let argument = words.next().map(str::to_string);

    let command = match (verb, argument) {
        ("theme", Some(value)) => ConsoleCommand::SetTheme(value),
        ("locale", Some(value)) => ConsoleCommand::SetLocale(value),
        ("menu", None) => ConsoleCommand::Menu,
        ("sessions", None) => ConsoleCommand::Sessions,
        ("help", None) => ConsoleCommand::Help,
        ("quit" | "exit", None) => ConsoleCommand::Quit,
        _ => ConsoleCommand::Unknown(line.trim().to_string()),
    };
    Some(command)
}

/// Reads commands until `quit` or end of input.
pub fn run(input: impl BufRead, mut output: impl Write, handle: &RuntimeHandle) -> io::Result<ConsoleExit> {
    writeln!(output, "Type `help` for commands.")?;

    for line in input.lines() {
        let Some(command) = parse_line(&line?) else {
            continue;
        };

        match command {
            ConsoleCommand::SetTheme(theme) => {
                let response = privileged(handle, CommandName::SetTheme, json!({ "theme": theme }));
                print_state(&mut output, &response)?;
            }
            ConsoleCommand::SetLocale(locale) => {
                let response = privileged(handle, CommandName::SetLocale, json!({ "locale": locale }));
                print_state(&mut output, &response)?;
            }
            ConsoleCommand::Menu => {
                let response = privileged(handle, CommandName::GetUiState, json!({}));
                print_state(&mut output, &response)?;
            }
            ConsoleCommand::Sessions => {
                let response = privileged(handle, CommandName::ListSessions, json!({}));
                print_sessions(&mut output, &response)?;
            }
            ConsoleCommand::Help => print_help(&mut output)?,
            ConsoleCommand::Quit => return Ok(ConsoleExit::Quit),
            ConsoleCommand::Unknown(text) => {
                writeln!(output, "Unrecognized: {text} (try `help`)")?;
            }
        }
    }

    Ok(ConsoleExit::EndOfInput)
}

fn privileged(handle: &RuntimeHandle, command: CommandName, payload: serde_json::Value) -> Response {
    handle.dispatch(Origin::Privileged, Request::new(command, Some(payload)))
}

fn print_state(output: &mut impl Write, response: &Response) -> io::Result<()> {
    let state = response
        .data
        .clone()
        .and_then(|data| serde_json::from_value::<UiState>(data).ok());
    match state {
        Some(state) => print_menu(output, &build_menu_model(&state)),
        None => print_failure(output, response),
    }
}

fn print_menu(output: &mut impl Write, menu: &MenuModel) -> io::Result<()> {
    for group in &menu.groups {
        writeln!(output, "{}", group.label)?;
        for item in &group.items {
            let mark = if item.checked { "(*)" } else { "( )" };
            writeln!(output, "  {mark} {}", item.label)?;
        }
    }
    Ok(())
}

fn print_sessions(output: &mut impl Write, response: &Response) -> io::Result<()> {
    let Some(sessions) = response.data.as_ref().and_then(|data| data.as_array()) else {
        return print_failure(output, response);
    };
    if sessions.is_empty() {
        return writeln!(output, "No tracked projects");
    }
    for session in sessions {
        writeln!(
            output,
            "{}  pid {}  {}  [{}]",
            session["projectId"].as_str().unwrap_or("?"),
            session["processId"],
            session["commandSequence"].as_str().unwrap_or(""),
            if session["alive"].as_bool().unwrap_or(false) {
                "alive"
            } else {
                "gone"
            },
        )?;
    }
    Ok(())
}

fn print_failure(output: &mut impl Write, response: &Response) -> io::Result<()> {
    writeln!(
        output,
        "Failed: {} {}",
        response.error.as_deref().unwrap_or("unknown"),
        response.message.as_deref().unwrap_or("")
    )
}

fn print_help(output: &mut impl Write) -> io::Result<()> {
    writeln!(output, "theme <system|light|dark>   change the theme")?;
    writeln!(output, "locale <en|zh-cn|zh-tw>     change the language")?;
    writeln!(output, "menu                        show current selections")?;
    writeln!(output, "sessions                    list tracked projects")?;
    writeln!(output, "quit                        stop the launcher")
}
