//! Interactive REPL for the Sasya Arogya tool server.
//!
//! Launch with `sasya-arogya-mcp repl`. Type `/help` for available commands,
//! Tab for completion. Calls go through the same dispatcher the transports use.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use serde_json::{Map, Value};
use tokio::runtime::Handle;

use crate::protocol::Dispatcher;
use crate::types::{ToolInvocation, ToolOutcome};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/tools", "List available tools"),
    ("/describe", "Show a tool's input schema"),
    ("/call", "Call a tool: /call <tool> <json>"),
    ("/stream", "Stream a tool: /stream <tool> <json>"),
    ("/info", "Show server name, version and tools"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// Commands whose first argument is a tool name.
const TOOL_COMMANDS: &[&str] = &["/describe", "/call", "/stream"];

/// Strings longer than this are elided when printing payloads.
const MAX_PRINTED_STRING: usize = 120;

/// REPL helper for tab completion of commands and tool names.
struct ToolHelper {
    tool_names: Vec<String>,
}

impl Completer for ToolHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        let (cmd, rest) = input.split_once(' ').unwrap_or((input, ""));
        if TOOL_COMMANDS.contains(&cmd) && !rest.trim_start().contains(' ') {
            let prefix = rest.trim_start();
            let prefix_start = input.len() - prefix.len();
            let matches: Vec<Pair> = self
                .tool_names
                .iter()
                .filter(|name| name.starts_with(prefix))
                .map(|name| Pair {
                    display: name.clone(),
                    replacement: format!("{name} "),
                })
                .collect();
            return Ok((prefix_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for ToolHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for ToolHelper {}
impl Validator for ToolHelper {}
impl Helper for ToolHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the interactive REPL. Must be called off the async runtime's worker
/// threads (e.g. from `spawn_blocking`); `handle` drives the dispatcher.
pub fn run(dispatcher: Dispatcher, handle: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1msasya-arogya-mcp v{}\x1b[0m \x1b[90m- crop insurance tools\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<ToolHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(ToolHelper {
        tool_names: dispatcher.registry().names().map(str::to_string).collect(),
    }));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".sasya_arogya_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36msasya>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
                let args = args.trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => cmd_info(&dispatcher),
                    "tools" => cmd_tools(&dispatcher),
                    "describe" => cmd_describe(&dispatcher, args),
                    "call" => cmd_call(&dispatcher, &handle, args),
                    "stream" => cmd_stream(&dispatcher, &handle, args),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completes commands and tool names.");
    eprintln!();
}

fn cmd_info(dispatcher: &Dispatcher) {
    let registry = dispatcher.registry();
    eprintln!();
    eprintln!(
        "  Server:   {} v{}",
        crate::SERVER_NAME,
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("  Tools:    {}", registry.len());
    eprintln!();
}

fn cmd_tools(dispatcher: &Dispatcher) {
    let registry = dispatcher.registry();
    eprintln!();
    eprintln!("  {} tools available:", registry.len());
    eprintln!();
    for tool in registry.list() {
        eprintln!("    {:<32} {}", tool.name(), tool.summary());
    }
    eprintln!();
}

fn cmd_describe(dispatcher: &Dispatcher, args: &str) {
    if args.is_empty() {
        eprintln!("  Usage: /describe <tool>");
        return;
    }
    match dispatcher.registry().resolve(args) {
        Some(tool) => {
            eprintln!();
            eprintln!("  {} - {}", tool.name(), tool.summary());
            eprintln!();
            for field in tool.schema().fields() {
                eprintln!(
                    "    {:<26} {:<8} {:<9} {}",
                    field.name,
                    field.field_type.as_str(),
                    if field.required { "required" } else { "optional" },
                    field.description.as_deref().unwrap_or("")
                );
            }
            eprintln!();
        }
        None => eprintln!("  Unknown tool '{args}'. Type /tools to list tools."),
    }
}

/// Split `<tool> <json>` into an invocation.
fn parse_invocation(args: &str) -> Result<ToolInvocation, String> {
    let (name, raw) = args.split_once(' ').unwrap_or((args, ""));
    if name.is_empty() {
        return Err("expected <tool> <json>".to_string());
    }
    let arguments = if raw.trim().is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err("arguments must be a JSON object".to_string()),
            Err(e) => return Err(format!("invalid JSON: {e}")),
        }
    };
    Ok(ToolInvocation::new(name, arguments))
}

fn cmd_call(dispatcher: &Dispatcher, handle: &Handle, args: &str) {
    let invocation = match parse_invocation(args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("  Usage: /call <tool> <json> ({e})");
            return;
        }
    };

    match handle.block_on(dispatcher.call(invocation)) {
        ToolOutcome::Failure(failure) => eprintln!("  \x1b[31m{failure}\x1b[0m"),
        outcome => print_value(&serde_json::to_value(&outcome).unwrap_or_default()),
    }
}

fn cmd_stream(dispatcher: &Dispatcher, handle: &Handle, args: &str) {
    let invocation = match parse_invocation(args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("  Usage: /stream <tool> <json> ({e})");
            return;
        }
    };

    handle.block_on(async {
        let mut events = dispatcher.stream(invocation);
        while let Some(event) = events.recv().await {
            let marker = if event.done { "done" } else { "    " };
            eprint!("  \x1b[90m#{:<3} {marker}\x1b[0m", event.sequence);
            match &event.failure {
                Some(failure) => eprintln!(" \x1b[31m{failure}\x1b[0m"),
                None => {
                    eprintln!();
                    print_value(&event.partial);
                }
            }
        }
    });
}

fn print_value(value: &Value) {
    let shown = elide_long_strings(value);
    let text = serde_json::to_string_pretty(&shown).unwrap_or_default();
    for line in text.lines() {
        eprintln!("    {line}");
    }
}

fn elide_long_strings(value: &Value) -> Value {
    match value {
        Value::String(s) if s.len() > MAX_PRINTED_STRING => {
            Value::String(format!("<{} chars>", s.len()))
        }
        Value::Array(items) => Value::Array(items.iter().map(elide_long_strings).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), elide_long_strings(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
