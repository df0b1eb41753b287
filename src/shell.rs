// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Line-oriented commands over the object model.
//!
//! Objects are bound to names; a bound name keeps its object rooted. Values
//! are written as numbers, quoted strings, `true`, `false`, `null`,
//! `undefined`, or `@name` for a bound object.

use spacey_object::builtins::array::new_array;
use spacey_object::builtins::object::to_display_string;
use spacey_object::{
    Attrs, Context, Deletion, EnumerateMode, OBJECT_CLASS, ObjectRef, PropDesc, PropertyId, PropertyOp, Runtime,
    RuntimeOptions, Value,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors reported for one command line.
#[derive(Debug, Error)]
pub enum ShellError {
    /// No such command.
    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),

    /// Wrong arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Name not bound to an object.
    #[error("'{0}' is not bound")]
    Unbound(String),

    /// A value was expected to be an object.
    #[error("{0} is not an object")]
    NotAnObject(String),

    /// Unparsable value literal.
    #[error("invalid value '{0}'")]
    BadValue(String),

    /// Unterminated quote.
    #[error("unterminated string")]
    Unterminated,

    /// The object model raised an error.
    #[error(transparent)]
    Engine(#[from] spacey_object::Error),
}

type Result<T> = std::result::Result<T, ShellError>;

/// A command and its help line.
pub struct CommandInfo {
    /// Usage pattern.
    pub usage: &'static str,
    /// One-line description.
    pub help: &'static str,
}

/// Every shell command.
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo { usage: "new NAME [PROTO|null]", help: "Create a plain object" },
    CommandInfo { usage: "array NAME [VALUE...]", help: "Create an array" },
    CommandInfo { usage: "construct NAME CLASS [VALUE...]", help: "Construct a standard class instance" },
    CommandInfo { usage: "let NAME OBJ KEY", help: "Bind an object-valued property" },
    CommandInfo { usage: "set OBJ KEY VALUE", help: "Assign a property" },
    CommandInfo { usage: "get OBJ KEY", help: "Read a property" },
    CommandInfo { usage: "define OBJ KEY VALUE [erp]", help: "Define a data property (enumerable, readonly, permanent)" },
    CommandInfo { usage: "accessor OBJ KEY GETTER [SETTER]", help: "Define an accessor property" },
    CommandInfo { usage: "delete OBJ KEY", help: "Delete an own property" },
    CommandInfo { usage: "has OBJ KEY", help: "Test for a property, own or inherited" },
    CommandInfo { usage: "own OBJ KEY", help: "Test for an own property" },
    CommandInfo { usage: "desc OBJ KEY", help: "Show an own property descriptor" },
    CommandInfo { usage: "keys OBJ [all]", help: "List own property names" },
    CommandInfo { usage: "proto OBJ [PROTO|null]", help: "Show or change the prototype" },
    CommandInfo { usage: "freeze OBJ", help: "Freeze an object" },
    CommandInfo { usage: "seal OBJ", help: "Seal an object" },
    CommandInfo { usage: "call OBJ KEY [VALUE...]", help: "Call a method with OBJ as this" },
    CommandInfo { usage: "with NAME TARGET", help: "Put TARGET on a scope chain above the global" },
    CommandInfo { usage: "name SCOPE KEY", help: "Resolve a name along a scope chain" },
    CommandInfo { usage: "shape OBJ", help: "Show the shape of an object" },
    CommandInfo { usage: "strict [on|off]", help: "Show or switch strict mode" },
    CommandInfo { usage: "bindings", help: "List bound names" },
    CommandInfo { usage: "gc", help: "Run a collection" },
    CommandInfo { usage: "stats", help: "Show shape, heap and cache counters" },
];

#[derive(Debug, Clone, PartialEq)]
enum Word {
    Bare(String),
    Quoted(String),
}

impl Word {
    fn text(&self) -> &str {
        match self {
            Word::Bare(s) | Word::Quoted(s) => s,
        }
    }
}

/// Split a line into words. Quotes group words and make them strings.
fn split_words(line: &str) -> Result<Vec<Word>> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' || c == '\'' {
            chars.next();
            let mut s = String::new();
            loop {
                match chars.next() {
                    Some(ch) if ch == c => break,
                    Some('\\') => match chars.next() {
                        Some('n') => s.push('\n'),
                        Some(other) => s.push(other),
                        None => return Err(ShellError::Unterminated),
                    },
                    Some(ch) => s.push(ch),
                    None => return Err(ShellError::Unterminated),
                }
            }
            words.push(Word::Quoted(s));
        } else {
            let mut s = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                s.push(ch);
                chars.next();
            }
            words.push(Word::Bare(s));
        }
    }
    Ok(words)
}

/// An interactive session: one context and its named objects.
pub struct Shell {
    cx: Context,
    bindings: BTreeMap<String, ObjectRef>,
}

impl Shell {
    /// A shell over a fresh runtime.
    pub fn new(options: RuntimeOptions) -> Self {
        let rt = Runtime::new(options);
        Self::with_runtime(&rt)
    }

    /// A shell with its own context on `rt`.
    pub fn with_runtime(rt: &Arc<Runtime>) -> Self {
        let cx = rt.new_context();
        let mut bindings = BTreeMap::new();
        bindings.insert("global".to_string(), cx.global());
        Self { cx, bindings }
    }

    /// Run one command line. Blank lines and `#` comments print nothing.
    pub fn execute(&mut self, line: &str) -> Result<Option<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let words = split_words(line)?;
        let Some((cmd, args)) = words.split_first() else {
            return Ok(None);
        };
        debug!(command = cmd.text(), "shell command");
        let out = match cmd.text() {
            "new" => self.cmd_new(args)?,
            "array" => self.cmd_array(args)?,
            "construct" => self.cmd_construct(args)?,
            "let" => self.cmd_let(args)?,
            "set" => self.cmd_set(args)?,
            "get" => self.cmd_get(args)?,
            "define" => self.cmd_define(args)?,
            "accessor" => self.cmd_accessor(args)?,
            "delete" => self.cmd_delete(args)?,
            "has" => {
                let (obj, id) = self.target(args, "has OBJ KEY")?;
                self.cx.has_property(obj, &id)?.to_string()
            }
            "own" => {
                let (obj, id) = self.target(args, "own OBJ KEY")?;
                self.cx.has_own_property(obj, &id)?.to_string()
            }
            "desc" => self.cmd_desc(args)?,
            "keys" => self.cmd_keys(args)?,
            "proto" => self.cmd_proto(args)?,
            "freeze" => {
                let obj = self.object_arg(args, 0, "freeze OBJ")?;
                self.cx.freeze(obj)?;
                "frozen".to_string()
            }
            "seal" => {
                let obj = self.object_arg(args, 0, "seal OBJ")?;
                self.cx.seal(obj)?;
                "sealed".to_string()
            }
            "call" => self.cmd_call(args)?,
            "with" => self.cmd_with(args)?,
            "name" => {
                let (scope, id) = self.target(args, "name SCOPE KEY")?;
                let value = self.cx.get_name(scope, &id)?;
                self.display(&value)?
            }
            "shape" => self.cmd_shape(args)?,
            "strict" => self.cmd_strict(args)?,
            "bindings" => self.bindings.keys().cloned().collect::<Vec<_>>().join(" "),
            "gc" => {
                let stats = self.cx.gc()?;
                format!(
                    "marked {} swept {} shrunk {} live {}",
                    stats.marked, stats.swept, stats.shrunk, stats.live
                )
            }
            "stats" => self.cmd_stats(),
            "help" => help_text(),
            other => return Err(ShellError::UnknownCommand(other.to_string())),
        };
        Ok(Some(out))
    }

    /// Names currently bound to objects, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    fn bind(&mut self, name: &str, obj: ObjectRef) {
        self.cx.add_root(obj);
        if let Some(old) = self.bindings.insert(name.to_string(), obj) {
            self.cx.remove_root(old);
        }
    }

    fn lookup(&self, name: &str) -> Result<ObjectRef> {
        self.bindings
            .get(name.strip_prefix('@').unwrap_or(name))
            .copied()
            .ok_or_else(|| ShellError::Unbound(name.to_string()))
    }

    fn object_arg(&self, args: &[Word], i: usize, usage: &'static str) -> Result<ObjectRef> {
        let word = args.get(i).ok_or(ShellError::Usage(usage))?;
        self.lookup(word.text())
    }

    fn name_arg<'a>(&self, args: &'a [Word], i: usize, usage: &'static str) -> Result<&'a str> {
        args.get(i).map(Word::text).ok_or(ShellError::Usage(usage))
    }

    fn target(&self, args: &[Word], usage: &'static str) -> Result<(ObjectRef, PropertyId)> {
        let obj = self.object_arg(args, 0, usage)?;
        let key = self.name_arg(args, 1, usage)?;
        Ok((obj, PropertyId::from(key)))
    }

    fn proto_arg(&self, word: Option<&Word>) -> Result<Option<ObjectRef>> {
        match word {
            None => Ok(None),
            Some(Word::Bare(s)) if s == "null" => Ok(None),
            Some(w) => Ok(Some(self.lookup(w.text())?)),
        }
    }

    fn value(&self, word: &Word) -> Result<Value> {
        let s = match word {
            Word::Quoted(s) => return Ok(Value::string(s)),
            Word::Bare(s) => s.as_str(),
        };
        Ok(match s {
            "undefined" => Value::Undefined,
            "null" => Value::Null,
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            "NaN" => Value::Number(f64::NAN),
            "Infinity" => Value::Number(f64::INFINITY),
            "-Infinity" => Value::Number(f64::NEG_INFINITY),
            _ if s.starts_with('@') => Value::Object(self.lookup(s)?),
            _ => Value::Number(s.parse().map_err(|_| ShellError::BadValue(s.to_string()))?),
        })
    }

    fn values(&self, words: &[Word]) -> Result<Vec<Value>> {
        words.iter().map(|w| self.value(w)).collect()
    }

    fn display(&mut self, value: &Value) -> Result<String> {
        Ok(match value {
            Value::String(s) => format!("'{}'", s),
            other => to_display_string(&mut self.cx, other)?,
        })
    }

    fn cmd_new(&mut self, args: &[Word]) -> Result<String> {
        const USAGE: &str = "new NAME [PROTO|null]";
        let name = self.name_arg(args, 0, USAGE)?;
        let obj = match args.get(1) {
            None => self.cx.new_object(&OBJECT_CLASS, None, None)?,
            Some(_) => {
                let proto = self.proto_arg(args.get(1))?;
                self.cx.new_object_with_given_proto(&OBJECT_CLASS, proto, None)?
            }
        };
        self.bind(name, obj);
        Ok(name.to_string())
    }

    fn cmd_array(&mut self, args: &[Word]) -> Result<String> {
        let name = self.name_arg(args, 0, "array NAME [VALUE...]")?;
        let elements = self.values(&args[1..])?;
        let arr = new_array(&mut self.cx, elements)?;
        self.bind(name, arr);
        Ok(name.to_string())
    }

    fn cmd_construct(&mut self, args: &[Word]) -> Result<String> {
        const USAGE: &str = "construct NAME CLASS [VALUE...]";
        let name = self.name_arg(args, 0, USAGE)?;
        let class = self.name_arg(args, 1, USAGE)?;
        let ctor = self.cx.find_class_object(class)?;
        if ctor.is_undefined() {
            return Err(ShellError::Unbound(class.to_string()));
        }
        let call_args = self.values(&args[2..])?;
        let result = self.cx.construct(&ctor, &call_args)?;
        let obj = result.as_object().ok_or_else(|| ShellError::NotAnObject(result.to_string()))?;
        self.bind(name, obj);
        Ok(name.to_string())
    }

    fn cmd_let(&mut self, args: &[Word]) -> Result<String> {
        const USAGE: &str = "let NAME OBJ KEY";
        let name = self.name_arg(args, 0, USAGE)?;
        let (obj, id) = self.target(&args[1.min(args.len())..], USAGE)?;
        let value = self.cx.get_property(obj, &id)?;
        let found = value.as_object().ok_or_else(|| ShellError::NotAnObject(id.to_string()))?;
        self.bind(name, found);
        Ok(name.to_string())
    }

    fn cmd_set(&mut self, args: &[Word]) -> Result<String> {
        const USAGE: &str = "set OBJ KEY VALUE";
        let (obj, id) = self.target(args, USAGE)?;
        let value = self.value(args.get(2).ok_or(ShellError::Usage(USAGE))?)?;
        Ok(self.cx.set_property(obj, &id, value)?.to_string())
    }

    fn cmd_get(&mut self, args: &[Word]) -> Result<String> {
        let (obj, id) = self.target(args, "get OBJ KEY")?;
        let value = self.cx.get_property(obj, &id)?;
        self.display(&value)
    }

    fn cmd_define(&mut self, args: &[Word]) -> Result<String> {
        const USAGE: &str = "define OBJ KEY VALUE [erp]";
        let (obj, id) = self.target(args, USAGE)?;
        let value = self.value(args.get(2).ok_or(ShellError::Usage(USAGE))?)?;
        let mut attrs = Attrs::empty();
        for flag in args.get(3).map(Word::text).unwrap_or("e").chars() {
            attrs |= match flag {
                'e' => Attrs::ENUMERATE,
                'r' => Attrs::READONLY,
                'p' => Attrs::PERMANENT,
                _ => return Err(ShellError::Usage(USAGE)),
            };
        }
        let sid = self.cx.define_property(obj, &id, value, PropertyOp::Stub, PropertyOp::Stub, attrs)?;
        Ok(sid.to_string())
    }

    fn cmd_accessor(&mut self, args: &[Word]) -> Result<String> {
        const USAGE: &str = "accessor OBJ KEY GETTER [SETTER]";
        let (obj, id) = self.target(args, USAGE)?;
        let getter = self.value(args.get(2).ok_or(ShellError::Usage(USAGE))?)?;
        let setter = args.get(3).map(|w| self.value(w)).transpose()?;
        let desc = PropDesc::accessor(Some(getter), setter)
            .with_enumerable(true)
            .with_configurable(true);
        Ok(self.cx.define_own_property(obj, &id, &desc, true)?.to_string())
    }

    fn cmd_delete(&mut self, args: &[Word]) -> Result<String> {
        let (obj, id) = self.target(args, "delete OBJ KEY")?;
        Ok(match self.cx.delete_property(obj, &id)? {
            Deletion::Removed => "removed",
            Deletion::NotFound => "not found",
            Deletion::Refused => "refused",
        }
        .to_string())
    }

    fn cmd_desc(&mut self, args: &[Word]) -> Result<String> {
        let (obj, id) = self.target(args, "desc OBJ KEY")?;
        let Some(desc) = self.cx.get_own_property_descriptor(obj, &id)? else {
            return Ok("undefined".to_string());
        };
        let mut fields = Vec::new();
        for (name, value) in [("value", &desc.value), ("get", &desc.get), ("set", &desc.set)] {
            if let Some(v) = value {
                fields.push(format!("{}: {}", name, self.display(v)?));
            }
        }
        for (name, flag) in [
            ("writable", desc.writable),
            ("enumerable", desc.enumerable),
            ("configurable", desc.configurable),
        ] {
            if let Some(b) = flag {
                fields.push(format!("{}: {}", name, b));
            }
        }
        Ok(format!("{{ {} }}", fields.join(", ")))
    }

    fn cmd_keys(&mut self, args: &[Word]) -> Result<String> {
        let obj = self.object_arg(args, 0, "keys OBJ [all]")?;
        let mode = match args.get(1).map(Word::text) {
            Some("all") => EnumerateMode::OwnAll,
            _ => EnumerateMode::OwnEnumerable,
        };
        let ids = self.cx.enumerate(obj, mode)?;
        Ok(ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" "))
    }

    fn cmd_proto(&mut self, args: &[Word]) -> Result<String> {
        let obj = self.object_arg(args, 0, "proto OBJ [PROTO|null]")?;
        if args.len() > 1 {
            let proto = self.proto_arg(args.get(1))?;
            self.cx.set_proto(obj, proto)?;
        }
        Ok(match self.cx.get_proto(obj)? {
            None => "null".to_string(),
            Some(p) => self.name_of(p),
        })
    }

    fn cmd_call(&mut self, args: &[Word]) -> Result<String> {
        let (obj, id) = self.target(args, "call OBJ KEY [VALUE...]")?;
        let callee = self.cx.get_property(obj, &id)?;
        let call_args = self.values(&args[2.min(args.len())..])?;
        let result = self.cx.call_function(&callee, &Value::Object(obj), &call_args)?;
        self.display(&result)
    }

    fn cmd_with(&mut self, args: &[Word]) -> Result<String> {
        const USAGE: &str = "with NAME TARGET";
        let name = self.name_arg(args, 0, USAGE)?;
        let target = self.object_arg(args, 1, USAGE)?;
        let global = self.cx.global();
        let with = self.cx.new_with_object(target, Some(global), 0)?;
        self.bind(name, with);
        Ok(name.to_string())
    }

    fn cmd_shape(&mut self, args: &[Word]) -> Result<String> {
        let obj = self.object_arg(args, 0, "shape OBJ")?;
        let last = self.cx.last_shape(obj)?;
        let shared = self.cx.has_shared_scope(obj)?;
        let class = self.cx.class_of(obj)?.name();
        let depth = self.cx.runtime().tree().depth(last);
        Ok(format!("{} {} depth {}{}", class, last, depth, if shared { " shared" } else { "" }))
    }

    fn cmd_strict(&mut self, args: &[Word]) -> Result<String> {
        match args.first().map(Word::text) {
            None => {}
            Some("on") => self.cx.set_strict(true),
            Some("off") => self.cx.set_strict(false),
            Some(_) => return Err(ShellError::Usage("strict [on|off]")),
        }
        Ok(if self.cx.is_strict() { "on" } else { "off" }.to_string())
    }

    fn cmd_stats(&mut self) -> String {
        let shapes = self.cx.runtime().shape_stats();
        let cache = self.cx.cache_stats();
        format!(
            "shapes live {} created {} freed {} hits {}\nobjects live {}\ncache hits {} misses {} flushes {}",
            shapes.live,
            shapes.created,
            shapes.freed,
            shapes.hits,
            self.cx.heap().live(),
            cache.hits,
            cache.misses,
            cache.flushes
        )
    }

    fn name_of(&self, obj: ObjectRef) -> String {
        self.bindings
            .iter()
            .find(|(_, o)| **o == obj)
            .map(|(name, _)| format!("@{}", name))
            .unwrap_or_else(|| format!("{:?}", obj))
    }
}

/// True when `line` ends inside an open quote.
pub fn is_incomplete(line: &str) -> bool {
    matches!(split_words(line), Err(ShellError::Unterminated))
}

/// The `help` listing.
pub fn help_text() -> String {
    COMMANDS
        .iter()
        .map(|c| format!("  {:36} {}", c.usage, c.help))
        .collect::<Vec<_>>()
        .join("\n")
}
