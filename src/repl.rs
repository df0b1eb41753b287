// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL for the Spacey object shell.
//!
//! Lines starting with a dot are REPL commands; everything else goes to the
//! [`Shell`]. Completion knows the command table, the standard classes and
//! the names bound in the running session.

use crate::shell::{COMMANDS, Shell, ShellError, help_text, is_incomplete};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use spacey_object::RuntimeOptions;
use std::borrow::Cow;
use std::cell::RefCell;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

const HISTORY_FILE: &str = "shell_history";
const HISTORY_LIMIT: usize = 1000;

/// Standard class names accepted by `construct`.
const CLASS_NAMES: &[&str] = &["Object", "Function", "Array", "Date", "RegExp"];

const LITERALS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity"];

/// Commands handled by the REPL itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
    Reset,
}

impl DotCommand {
    /// Every dot command with its usage and description.
    pub const TABLE: &'static [(DotCommand, &'static str, &'static str)] = &[
        (DotCommand::Help, ".help", "List REPL and shell commands"),
        (DotCommand::Exit, ".exit", "Leave the shell"),
        (DotCommand::Clear, ".clear", "Clear the screen"),
        (DotCommand::Version, ".version", "Print the version"),
        (DotCommand::Load, ".load FILE", "Run every line of FILE"),
        (DotCommand::Reset, ".reset", "Drop all bindings and start a fresh runtime"),
    ];

    /// Split `.name [arg]`. Unknown names return `None` and reach the shell.
    pub fn parse(line: &str) -> Option<(Self, Option<&str>)> {
        let rest = line.trim().strip_prefix('.')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };
        let cmd = match name {
            "help" | "h" => DotCommand::Help,
            "exit" | "quit" | "q" => DotCommand::Exit,
            "clear" => DotCommand::Clear,
            "version" => DotCommand::Version,
            "load" => DotCommand::Load,
            "reset" => DotCommand::Reset,
            _ => return None,
        };
        Some((cmd, arg))
    }
}

fn command_words() -> impl Iterator<Item = &'static str> {
    let shell = COMMANDS.iter().filter_map(|c| c.usage.split_whitespace().next());
    let dot = DotCommand::TABLE
        .iter()
        .filter_map(|(_, usage, _)| usage.split_whitespace().next());
    shell.chain(dot)
}

/// rustyline helper. `names` mirrors the shell's bindings after every line.
struct ShellHelper {
    names: Rc<RefCell<Vec<String>>>,
}

impl ShellHelper {
    /// Candidates for word `index` of a line whose first word is `command`.
    fn candidates(&self, command: &str, index: usize) -> Vec<String> {
        if index == 0 {
            return command_words().map(String::from).collect();
        }
        if command == "construct" && index == 2 {
            return CLASS_NAMES.iter().map(|s| s.to_string()).collect();
        }
        let mut names = self.names.borrow().clone();
        if matches!(command, "new" | "proto") && index == 2 {
            names.push("null".to_string());
        }
        names
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        let start = head.rfind(char::is_whitespace).map_or(0, |i| i + 1);
        let word = &head[start..];
        let index = head[..start].split_whitespace().count();
        let command = head.split_whitespace().next().unwrap_or_default();

        let pairs = self
            .candidates(command, index)
            .into_iter()
            .filter(|c| c.starts_with(word))
            .map(|c| Pair {
                display: c.clone(),
                replacement: c,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    /// Finishes a command name, then shows the arguments still to type.
    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let first = *words.first()?;

        if !line.ends_with(char::is_whitespace) {
            if words.len() != 1 || first.len() < 2 {
                return None;
            }
            let info = COMMANDS.iter().find(|c| c.usage.starts_with(first))?;
            return Some((&info.usage[first.len()..]).dimmed().to_string());
        }

        let info = COMMANDS
            .iter()
            .find(|c| c.usage.split_whitespace().next() == Some(first))?;
        let rest: Vec<&str> = info.usage.split_whitespace().skip(words.len()).collect();
        if rest.is_empty() {
            None
        } else {
            Some(rest.join(" ").dimmed().to_string())
        }
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let names = self.names.borrow();
        let mut out = String::with_capacity(line.len() * 2);
        let mut index = 0;
        for piece in pieces(line) {
            if piece.starts_with(char::is_whitespace) {
                out.push_str(piece);
            } else {
                out.push_str(&paint(piece, index, &names));
                index += 1;
            }
        }
        Cow::Owned(out)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// Split `line` into runs of whitespace and words. Quoted whitespace stays
/// inside its word, and joining the pieces gives back `line`.
fn pieces(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut quote = None;
    let mut escaped = false;
    let mut prev_space = None;

    for (i, c) in line.char_indices() {
        let space = quote.is_none() && c.is_whitespace();
        if prev_space.is_some_and(|p| p != space) {
            out.push(&line[start..i]);
            start = i;
        }
        prev_space = Some(space);

        if escaped {
            escaped = false;
        } else if quote.is_some() && c == '\\' {
            escaped = true;
        } else if quote == Some(c) {
            quote = None;
        } else if quote.is_none() && (c == '"' || c == '\'') {
            quote = Some(c);
        }
    }
    if start < line.len() {
        out.push(&line[start..]);
    }
    out
}

fn paint(word: &str, index: usize, names: &[String]) -> String {
    if index == 0 {
        let known = DotCommand::parse(word).is_some() || command_words().any(|c| c == word);
        return if !known {
            word.red().to_string()
        } else if word.starts_with('.') {
            word.magenta().to_string()
        } else {
            word.magenta().bold().to_string()
        };
    }
    let bare = word.strip_prefix('@').unwrap_or(word);
    if word.starts_with(['"', '\'']) {
        word.green().to_string()
    } else if names.iter().any(|n| n == bare) {
        word.cyan().to_string()
    } else if CLASS_NAMES.contains(&word) {
        word.cyan().bold().to_string()
    } else if LITERALS.contains(&word) {
        word.blue().to_string()
    } else if word.parse::<f64>().is_ok() {
        word.yellow().to_string()
    } else {
        word.to_string()
    }
}

impl Validator for ShellHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        // an open quote continues on the next line
        if is_incomplete(ctx.input()) {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

impl Helper for ShellHelper {}

fn history_path() -> Option<PathBuf> {
    let dir = dirs::data_local_dir()?.join("spacey");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(HISTORY_FILE))
}

/// The interactive REPL
pub struct Repl {
    shell: Shell,
    options: RuntimeOptions,
    editor: Editor<ShellHelper, DefaultHistory>,
    names: Rc<RefCell<Vec<String>>>,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a REPL over a fresh runtime built from `options`.
    pub fn new(options: RuntimeOptions) -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(HISTORY_LIMIT)?
            .auto_add_history(true)
            .build();

        let names = Rc::new(RefCell::new(Vec::new()));
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ShellHelper {
            names: Rc::clone(&names),
        }));

        let history_path = history_path();
        if let Some(path) = &history_path {
            if let Err(e) = editor.load_history(path) {
                debug!(path = %path.display(), error = %e, "no history loaded");
            }
        }

        let repl = Self {
            shell: Shell::new(options.clone()),
            options,
            editor,
            names,
            history_path,
        };
        repl.refresh_names();
        Ok(repl)
    }

    /// Read and run lines until `.exit` or end of input.
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();
        let prompt = format!("{} ", "spacey>".bright_green().bold());

        loop {
            let line = match self.editor.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    self.save_history();
                    return Err(err);
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((cmd, arg)) = DotCommand::parse(line) {
                if self.dot_command(cmd, arg).is_break() {
                    break;
                }
            } else {
                self.execute_and_print(line);
            }
            self.refresh_names();
        }

        self.save_history();
        Ok(())
    }

    fn refresh_names(&self) {
        *self.names.borrow_mut() = self.shell.names().map(String::from).collect();
    }

    fn save_history(&mut self) {
        if let Some(path) = &self.history_path {
            if let Err(e) = self.editor.save_history(path) {
                debug!(path = %path.display(), error = %e, "history not saved");
            }
        }
    }

    fn print_banner(&self) {
        println!(
            "{} {} {}",
            "Spacey Object Shell".bright_cyan().bold(),
            "v".dimmed(),
            env!("CARGO_PKG_VERSION").bright_yellow()
        );
        println!(
            "{} {} {} {} {}",
            "Type".dimmed(),
            "help".cyan(),
            "for shell commands or".dimmed(),
            ".help".cyan(),
            "for everything".dimmed()
        );
        if self.options.strict {
            println!("{}", "strict mode: rejected writes raise TypeError".yellow());
        }
        println!();
    }

    fn dot_command(&mut self, cmd: DotCommand, arg: Option<&str>) -> ControlFlow<()> {
        match cmd {
            DotCommand::Exit => return ControlFlow::Break(()),
            DotCommand::Help => self.print_help(),
            DotCommand::Clear => print!("\x1B[2J\x1B[H"),
            DotCommand::Version => println!("spacey {}", env!("CARGO_PKG_VERSION").yellow()),
            DotCommand::Load => match arg {
                Some(path) => {
                    let ran = self.load_file(Path::new(path));
                    println!("{}", format!("ran {} lines", ran).dimmed());
                }
                None => eprintln!("{}: .load FILE", "usage".red().bold()),
            },
            DotCommand::Reset => {
                self.shell = Shell::new(self.options.clone());
                println!("{}", "fresh runtime".dimmed());
            }
        }
        ControlFlow::Continue(())
    }

    fn print_help(&self) {
        println!("{}", "REPL commands:".white().bold());
        for (_, usage, help) in DotCommand::TABLE {
            println!("  {:36} {}", usage.cyan(), help.dimmed());
        }
        println!();
        println!("{}", "Shell commands:".white().bold());
        println!("{}", help_text());
        println!();
        println!(
            "{} {}",
            "Objects bound with new/array/construct/let/with are named by NAME or @NAME.".dimmed(),
            "Tab completes commands, names and classes.".dimmed()
        );
    }

    /// Run every line of `path`, stopping at the first error.
    /// Returns the number of lines that ran.
    fn load_file(&mut self, path: &Path) -> usize {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("{}: {}: {}", "error".red().bold(), path.display(), e);
                return 0;
            }
        };
        for (n, line) in source.lines().enumerate() {
            if !self.execute_and_print(line) {
                eprintln!("  {} {}:{}", "at".dimmed(), path.display(), n + 1);
                return n;
            }
        }
        source.lines().count()
    }

    /// Run one shell line, printing its output. Returns false on error.
    fn execute_and_print(&mut self, line: &str) -> bool {
        match self.shell.execute(line) {
            Ok(Some(out)) => {
                println!("{}", out);
                true
            }
            Ok(None) => true,
            Err(e) => {
                print_error(&e);
                false
            }
        }
    }
}

/// Engine errors carry their ECMAScript label; shell errors get a plain one.
fn print_error(error: &ShellError) {
    match error {
        ShellError::Engine(e) => {
            let text = e.to_string();
            match text.split_once(": ") {
                Some((label, message)) => eprintln!("{}: {}", label.red().bold(), message),
                None => eprintln!("{}", text.red().bold()),
            }
            if e.is_fatal() {
                eprintln!("{}", "the runtime may be unusable, .reset starts over".yellow());
            }
        }
        other => eprintln!("{}: {}", "error".red().bold(), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper(names: &[&str]) -> ShellHelper {
        ShellHelper {
            names: Rc::new(RefCell::new(names.iter().map(|s| s.to_string()).collect())),
        }
    }

    #[test]
    fn test_dot_command_parse() {
        assert_eq!(DotCommand::parse(".help"), Some((DotCommand::Help, None)));
        assert_eq!(DotCommand::parse("  .q"), Some((DotCommand::Exit, None)));
        assert_eq!(
            DotCommand::parse(".load  setup.txt "),
            Some((DotCommand::Load, Some("setup.txt")))
        );
        assert_eq!(DotCommand::parse(".reset"), Some((DotCommand::Reset, None)));
        assert_eq!(DotCommand::parse(".shapes"), None);
        assert_eq!(DotCommand::parse("new o"), None);
    }

    #[test]
    fn test_candidates_by_position() {
        let h = helper(&["global", "point"]);
        let first = h.candidates("", 0);
        assert!(first.iter().any(|c| c == "accessor"));
        assert!(first.iter().any(|c| c == ".load"));

        assert_eq!(h.candidates("construct", 2), CLASS_NAMES);
        assert_eq!(h.candidates("get", 1), ["global", "point"]);
        assert!(h.candidates("proto", 2).iter().any(|c| c == "null"));
        assert!(!h.candidates("get", 2).iter().any(|c| c == "null"));
    }

    #[test]
    fn test_pieces_keep_quoted_spaces() {
        let line = "set  o s 'a b'";
        let parts = pieces(line);
        assert_eq!(parts, ["set", "  ", "o", " ", "s", " ", "'a b'"]);
        assert_eq!(parts.concat(), line);
        assert_eq!(pieces(r"set o s 'it\'s x'").last(), Some(&r"'it\'s x'"));
    }

    #[test]
    fn test_paint_marks_unknown_commands() {
        let names = vec!["o".to_string()];
        assert_eq!(paint("bogus", 0, &names), "bogus".red().to_string());
        assert_eq!(paint("o", 1, &names), "o".cyan().to_string());
        assert_eq!(paint("@o", 1, &names), "@o".cyan().to_string());
        assert_eq!(paint("plain", 2, &names), "plain");
    }
}
