//! Operator commands read line by line from stdin.

use shared::domain::Gate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Stop,
    SetGate(Gate),
    Clear,
    Status,
    Records,
    Qr(String),
    Help,
    Quit,
}

pub const HELP: &str = "commands: scan | toggle | stop | gate entry|exit | clear | status | records | qr <raw> | help | quit";

/// Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "scan" | "toggle" => Command::Toggle,
        "stop" => Command::Stop,
        "gate" => Command::SetGate(rest.parse().map_err(|err| format!("{err}"))?),
        "clear" => Command::Clear,
        "status" => Command::Status,
        "records" | "log" => Command::Records,
        "qr" => {
            if rest.is_empty() {
                return Err("usage: qr <raw payload>".to_string());
            }
            Command::Qr(rest.to_string())
        }
        "help" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
