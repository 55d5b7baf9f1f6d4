// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The panel command bytecode: a compact run-length binary instruction
//! stream representing a timed sequence of panel bus commands and delays.
//!
//! In the binary form, the top bit of each instruction byte is the
//! "extended" flag and the low 7 bits are a length. A zero length is one
//! sleep tick (10 ms plain, 100 ms extended; consecutive ticks accumulate
//! into a single delay); a nonzero length without the extended flag
//! introduces that many raw argument bytes of one bus command. A sequence
//! can equally be constructed from a textual block (one command per line)
//! or from heterogeneous entry lists, and re-serialized in any of the
//! [`SequenceFormat`] forms without mutating the parsed commands.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter, Write};

use serde::Deserialize;

use crate::error::Error;
use crate::reader::ByteReader;

/// Granularity of an encoded sleep, in milliseconds.
const SLEEP_TICK_MS: u32 = 10;
/// Longest encodable sleep (1000 ticks), in milliseconds.
const SLEEP_MAX_MS: u32 = 10_000;
/// The instruction byte length field is 7 bits wide.
const MAX_COMMAND_ARGS: usize = 127;
/// The "extended" instruction flag.
const EXTENDED: u8 = 0x80;

/// The payload of one parsed panel command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// A bus command with 1 to 127 argument bytes.
    Run(Vec<u8>),
    /// A delay in milliseconds; always a multiple of 10 and at most
    /// 10 000 after normalization.
    Sleep(u32),
    /// No operation; encodes to nothing.
    Nop,
}

/// One parsed panel command, optionally carrying the textual source line
/// it was parsed from (used to preserve comments and formatting on
/// round-trip serialization when normalization is not requested).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: CommandKind,
    line: Option<String>,
}

impl Command {
    /// Creates a bus command from its argument bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommand`] for an empty argument list and
    /// [`Error::CommandTooLong`] for more than 127 arguments.
    pub fn run(args: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let args = args.into();
        if args.is_empty() {
            return Err(Error::InvalidCommand(
                "command requires at least one argument".to_string(),
            ));
        }
        if args.len() > MAX_COMMAND_ARGS {
            return Err(Error::CommandTooLong(args.len()));
        }
        Ok(Self {
            kind: CommandKind::Run(args),
            line: None,
        })
    }

    /// Creates a sleep command, rounding the duration up to the next
    /// multiple of 10 ms. A zero duration means the default 10 ms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SleepTooLong`] for durations over 10 000 ms.
    pub fn sleep(ms: u32) -> Result<Self, Error> {
        let duration = if ms == 0 {
            SLEEP_TICK_MS
        } else {
            ms.div_ceil(SLEEP_TICK_MS)
                .checked_mul(SLEEP_TICK_MS)
                .ok_or(Error::SleepTooLong(ms))?
        };
        if duration > SLEEP_MAX_MS {
            return Err(Error::SleepTooLong(ms));
        }
        Ok(Self {
            kind: CommandKind::Sleep(duration),
            line: None,
        })
    }

    /// Creates a no-op command.
    #[must_use]
    pub fn nop() -> Self {
        Self {
            kind: CommandKind::Nop,
            line: None,
        }
    }

    /// Attaches the original source line to this command.
    #[must_use]
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }

    /// Returns the payload of this command.
    #[must_use]
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Returns the original source line, if the command was parsed from
    /// text.
    #[must_use]
    pub fn line(&self) -> Option<&str> {
        self.line.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        let (_, comment) = split_comment(self.line()?);
        comment.filter(|c| !c.is_empty())
    }
}

/// The kind tag of a [`CommandDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    /// A bus command; requires at least one argument.
    Command,
    /// A delay; takes an optional duration argument (default 10 ms).
    Sleep,
    /// No operation.
    Nop,
}

/// A tagged command descriptor, the object-style input shape
/// (`{"type": "sleep", "args": [50]}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandDescriptor {
    /// The command kind.
    #[serde(rename = "type")]
    pub kind: DescriptorKind,
    /// Positional arguments; byte values for `command`, an optional
    /// duration for `sleep`.
    #[serde(default)]
    pub args: Vec<u32>,
    /// An optional original source line.
    #[serde(default)]
    pub line: Option<String>,
}

impl CommandDescriptor {
    fn into_command(self) -> Result<Command, Error> {
        let command = match self.kind {
            DescriptorKind::Command => {
                let mut args = Vec::with_capacity(self.args.len());
                for arg in &self.args {
                    args.push(
                        u8::try_from(*arg)
                            .map_err(|_| Error::InvalidCommand(format!("argument {arg} out of range")))?,
                    );
                }
                Command::run(args)?
            }
            DescriptorKind::Sleep => Command::sleep(self.args.first().copied().unwrap_or(0))?,
            DescriptorKind::Nop => Command::nop(),
        };
        Ok(match self.line {
            Some(line) => command.with_line(line),
            None => command,
        })
    }
}

/// One entry of the heterogeneous list input shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SequenceEntry {
    /// A textual command line.
    Line(String),
    /// The argument bytes of one bus command.
    Args(Vec<u8>),
    /// A tagged command descriptor.
    Descriptor(CommandDescriptor),
}

/// Any of the accepted input shapes for constructing a
/// [`CommandSequence`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SequenceSource {
    /// A newline-delimited text block.
    Text(String),
    /// A raw bytecode buffer (equivalently, an all-numeric array).
    Bytes(Vec<u8>),
    /// A heterogeneous list of lines, argument arrays and descriptors.
    Entries(Vec<SequenceEntry>),
    /// No init sequence.
    #[default]
    Empty,
}

impl From<&str> for SequenceSource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for SequenceSource {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&[u8]> for SequenceSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for SequenceSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<SequenceEntry>> for SequenceSource {
    fn from(entries: Vec<SequenceEntry>) -> Self {
        Self::Entries(entries)
    }
}

/// A serialization form for a [`CommandSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    /// One line per command, emitting the original source line verbatim
    /// where available.
    Text,
    /// One line per command, always reconstructed from the parsed form.
    TextNormalized,
    /// Device-tree-source style hex cells, one command per line.
    Dts,
    /// The packed byte stream as hex pairs, 16 bytes per line. Comments
    /// and structure are lost in this form.
    DtsCompact,
}

/// An ordered, immutable sequence of panel commands.
///
/// # Examples
///
/// ```
/// use panelkit::{CommandSequence, SequenceFormat};
///
/// let seq = CommandSequence::parse("command 0x11\nsleep 120ms")?;
/// assert_eq!(seq.pack(), [0x01, 0x11, 0x80, 0x00, 0x00]);
/// assert_eq!(
///     seq.serialize(SequenceFormat::TextNormalized),
///     ["command 0x11", "sleep 120ms"]
/// );
/// # Ok::<(), panelkit::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSequence {
    commands: Vec<Command>,
}

impl CommandSequence {
    /// Constructs a sequence from any accepted input shape.
    ///
    /// # Errors
    ///
    /// Propagates the decode or parse error of the underlying shape.
    pub fn parse(source: impl Into<SequenceSource>) -> Result<Self, Error> {
        match source.into() {
            SequenceSource::Empty => Ok(Self::default()),
            SequenceSource::Bytes(bytes) => Self::from_bytes(&bytes),
            SequenceSource::Text(text) => Self::from_text(&text),
            SequenceSource::Entries(entries) => Self::from_entries(entries),
        }
    }

    /// Decodes a raw bytecode buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommandSequence`] if an instruction byte
    /// combines the extended flag with a nonzero length,
    /// [`Error::UnexpectedEof`] if the stream is truncated inside an
    /// argument list, or [`Error::SleepTooLong`] if accumulated sleep
    /// ticks exceed 10 seconds.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let mut commands = Vec::new();
        let mut pending_sleep: u32 = 0;
        let mut r = ByteReader::new(data);

        while !r.eof() {
            let byte = r.read_u8()?;
            let extended = byte & EXTENDED != 0;
            let len = usize::from(byte & !EXTENDED);

            if len == 0 {
                pending_sleep += if extended { 100 } else { SLEEP_TICK_MS };
                // Checked per tick: the accumulator never exceeds
                // SLEEP_MAX_MS + 100, so it cannot wrap.
                if pending_sleep > SLEEP_MAX_MS {
                    return Err(Error::SleepTooLong(pending_sleep));
                }
                continue;
            }

            if pending_sleep != 0 {
                commands.push(Command::sleep(pending_sleep)?);
                pending_sleep = 0;
            }

            if extended {
                return Err(Error::InvalidCommandSequence);
            }

            commands.push(Command::run(r.read_bytes(len)?.to_vec())?);
        }

        if pending_sleep != 0 {
            commands.push(Command::sleep(pending_sleep)?);
        }

        Ok(Self { commands })
    }

    /// Parses a newline-delimited text block, one command per line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommand`] naming the offending line.
    pub fn from_text(text: &str) -> Result<Self, Error> {
        let commands = text
            .split('\n')
            .map(parse_line)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { commands })
    }

    /// Constructs a sequence from a heterogeneous entry list.
    ///
    /// # Errors
    ///
    /// Propagates the parse error of the offending entry.
    pub fn from_entries(entries: Vec<SequenceEntry>) -> Result<Self, Error> {
        let mut commands = Vec::with_capacity(entries.len());
        for entry in entries {
            commands.push(match entry {
                SequenceEntry::Line(line) => parse_line(&line)?,
                SequenceEntry::Args(args) => Command::run(args)?,
                SequenceEntry::Descriptor(descriptor) => descriptor.into_command()?,
            });
        }
        Ok(Self { commands })
    }

    /// Constructs a sequence directly from parsed commands.
    #[must_use]
    pub fn from_commands(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Returns the parsed commands in order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the number of commands in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns whether the sequence contains no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Encodes the sequence to its binary bytecode form.
    ///
    /// The length and duration limits are enforced when commands are
    /// constructed, so packing cannot fail.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for command in &self.commands {
            match &command.kind {
                CommandKind::Run(args) => {
                    // 1..=127 by construction
                    #[expect(clippy::cast_possible_truncation)]
                    out.push(args.len() as u8);
                    out.extend_from_slice(args);
                }
                CommandKind::Sleep(ms) => {
                    let mut ticks = ms.div_ceil(SLEEP_TICK_MS);
                    while ticks >= 10 {
                        out.push(EXTENDED);
                        ticks -= 10;
                    }
                    for _ in 0..ticks {
                        out.push(0);
                    }
                }
                CommandKind::Nop => {}
            }
        }
        out
    }

    /// Renders the sequence in the requested format, one string per
    /// output line. The parsed sequence is never mutated.
    #[must_use]
    pub fn serialize(&self, format: SequenceFormat) -> Vec<String> {
        match format {
            SequenceFormat::Text => self
                .commands
                .iter()
                .map(|c| serialize_text(c, false))
                .collect(),
            SequenceFormat::TextNormalized => self
                .commands
                .iter()
                .map(|c| serialize_text(c, true))
                .collect(),
            SequenceFormat::Dts => self.commands.iter().map(serialize_dts).collect(),
            SequenceFormat::DtsCompact => self
                .pack()
                .chunks(16)
                .map(|chunk| {
                    let mut line = String::new();
                    for (i, byte) in chunk.iter().enumerate() {
                        if i > 0 {
                            line.push(' ');
                        }
                        let _ = write!(line, "{byte:02x}");
                    }
                    line
                })
                .collect(),
        }
    }
}

impl Display for CommandSequence {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (i, line) in self.serialize(SequenceFormat::Text).iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Splits a line into its code part and the body of a trailing `;`, `#`
/// or `//` comment.
fn split_comment(line: &str) -> (&str, Option<&str>) {
    let marker = line.char_indices().find_map(|(i, c)| match c {
        ';' | '#' => Some((i, i + c.len_utf8())),
        '/' if line[i..].starts_with("//") => Some((i, i + 2)),
        _ => None,
    });
    match marker {
        Some((start, body)) => (&line[..start], Some(line[body..].trim())),
        None => (line, None),
    }
}

fn parse_line(line: &str) -> Result<Command, Error> {
    let (code, _) = split_comment(line);
    let tokens: Vec<&str> = code
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return Ok(Command::nop().with_line(line));
    }

    if tokens[0] == "sleep" {
        let arg = tokens[1..].join(" ");
        let ms = if arg.is_empty() {
            0
        } else {
            parse_sleep_arg(&arg).ok_or_else(|| Error::InvalidCommand(line.to_string()))?
        };
        return Ok(Command::sleep(ms)?.with_line(line));
    }

    let arg_tokens = if tokens[0] == "command" {
        &tokens[1..]
    } else {
        &tokens[..]
    };

    let mut args = Vec::with_capacity(arg_tokens.len());
    for token in arg_tokens {
        // legacy filler token emitted by some generators
        if *token == "arguments" {
            continue;
        }
        args.push(parse_hex_byte(token).ok_or_else(|| Error::InvalidCommand(line.to_string()))?);
    }
    if args.is_empty() {
        return Err(Error::InvalidCommand(line.to_string()));
    }
    Ok(Command::run(args)?.with_line(line))
}

/// Parses a sleep duration argument: `<digits>`, `<digits>ms` or
/// `<digits>s` (the latter scaled by 1000).
fn parse_sleep_arg(arg: &str) -> Option<u32> {
    let (digits, scale) = if let Some(d) = arg.strip_suffix("ms") {
        (d, 1)
    } else if let Some(d) = arg.strip_suffix('s') {
        (d, 1000)
    } else {
        (arg, 1)
    };
    let digits = digits.trim_end();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok()?.checked_mul(scale)
}

/// Parses a 1-3 hex-digit byte literal, optionally `0x`-prefixed.
fn parse_hex_byte(token: &str) -> Option<u8> {
    let digits = token.strip_prefix("0x").unwrap_or(token);
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u16::from_str_radix(digits, 16).ok()?;
    u8::try_from(value).ok()
}

fn serialize_text(command: &Command, normalized: bool) -> String {
    if !normalized
        && let Some(line) = command.line()
    {
        return line.to_string();
    }

    let comment = command
        .comment()
        .map(|c| format!(" ; {c}"))
        .unwrap_or_default();

    match &command.kind {
        CommandKind::Run(args) => {
            let mut out = String::from("command");
            for arg in args {
                let _ = write!(out, " 0x{arg:02x}");
            }
            out.push_str(&comment);
            out
        }
        CommandKind::Sleep(ms) => format!("sleep {ms}ms{comment}"),
        CommandKind::Nop => comment.trim().to_string(),
    }
}

fn serialize_dts(command: &Command) -> String {
    let comment = command
        .comment()
        .map(|c| format!(" // {c}"))
        .unwrap_or_default();

    match &command.kind {
        CommandKind::Run(args) => {
            let mut out = format!("{:02x}", args.len());
            for arg in args {
                let _ = write!(out, " {arg:02x}");
            }
            out.push_str(&comment);
            out
        }
        CommandKind::Sleep(ms) => {
            let ticks = ms.div_ceil(SLEEP_TICK_MS);
            let mut out = String::new();
            for _ in 0..ticks / 10 {
                out.push_str("80 ");
            }
            for _ in 0..ticks % 10 {
                out.push_str("00 ");
            }
            out.trim_end().to_string()
        }
        CommandKind::Nop => comment.trim().to_string(),
    }
}
