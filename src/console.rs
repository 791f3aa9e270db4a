//! Line-oriented console for looking at an opened file's objects.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::debug;

use crate::error::ConsoleError;

pub const BANNER_HEADER: &str = "Populated variables";

const HELP: &str = "\
Type a variable name to print it.
  vars, whos    list the populated variables
  help          show this message
  exit, quit    leave the console (Ctrl-D works too)";

/// A value bound to a console variable.
#[derive(Clone, Copy)]
pub enum Value<'a> {
    Path(&'a Path),
    Object(&'a dyn fmt::Display),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Path(path) => write!(f, "{}", path.display()),
            Value::Object(obj) => fmt::Display::fmt(obj, f),
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Value::Object(obj) => f.debug_tuple("Object").field(&obj.to_string()).finish(),
        }
    }
}

/// Named variables handed to a console, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Namespace<'a> {
    vars: Vec<(&'static str, Value<'a>)>,
}

impl<'a> Namespace<'a> {
    pub fn new() -> Self {
        Namespace { vars: Vec::new() }
    }

    /// Binds `name`, replacing an earlier binding of the same name.
    pub fn with(mut self, name: &'static str, value: Value<'a>) -> Self {
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.vars.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Value<'a>> {
        self.vars.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.vars.iter().map(|(n, _)| *n).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Value<'a>)> + '_ {
        self.vars.iter().copied()
    }

    /// Header listing every variable with its value.
    pub fn banner(&self) -> String {
        let mut lines = vec![BANNER_HEADER.to_string(), "-".repeat(BANNER_HEADER.len())];
        for (name, value) in self.iter() {
            lines.push(format!("{:10}:    {}", name, value));
        }
        lines.join("\n")
    }
}

/// Something that can run an interactive session over a namespace.
pub trait Console {
    fn embed(&mut self, ns: &Namespace<'_>) -> Result<(), ConsoleError>;
}

/// Console reading commands from `input` and answering on `output`.
pub struct StdConsole<R, W> {
    input: R,
    output: W,
    prompt: String,
}

impl<R: BufRead, W: Write> StdConsole<R, W> {
    pub fn new(input: R, output: W, prompt: impl Into<String>) -> Self {
        StdConsole {
            input,
            output,
            prompt: prompt.into(),
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Console for StdConsole<R, W> {
    fn embed(&mut self, ns: &Namespace<'_>) -> Result<(), ConsoleError> {
        debug!(vars = ?ns.names(), "starting console");
        writeln!(self.output, "{}", ns.banner())?;
        let mut line = String::new();
        loop {
            write!(self.output, "{}", self.prompt)?;
            self.output.flush()?;
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                break;
            }
            match line.trim() {
                "" => {}
                "exit" | "quit" => break,
                "vars" | "whos" => writeln!(self.output, "{}", ns.banner())?,
                "help" => writeln!(self.output, "{}", HELP)?,
                name => match ns.get(name) {
                    Some(value) => writeln!(self.output, "{}", value)?,
                    None => writeln!(self.output, "NameError: name '{}' is not defined", name)?,
                },
            }
        }
        Ok(())
    }
}
