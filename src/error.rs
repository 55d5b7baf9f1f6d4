// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the `panelkit` crate.

use alloc::string::String;

use thiserror::Error;

/// An error that can occur while decoding or encoding panel data.
///
/// All failures are synchronous and non-recoverable at the point raised;
/// there is no partial or best-effort result.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A read past the end of the input buffer was attempted.
    #[error("unexpected end of data at offset {0}")]
    UnexpectedEof(usize),
    /// A string was not terminated with a null byte before the buffer end.
    #[error("unterminated string at offset {0}")]
    UnterminatedString(usize),
    /// String data was not valid UTF-8.
    #[error("invalid string data at offset {0}")]
    InvalidString(usize),

    /// The magic number of the device tree is invalid.
    #[error("invalid FDT magic number")]
    InvalidFdtMagic,
    /// An invalid token was encountered in the FDT structure block.
    #[error("unknown FDT token: 0x{0:x}")]
    BadToken(u32),
    /// An `END_NODE` token was encountered with no open node.
    #[error("unbalanced FDT node nesting")]
    UnbalancedNesting,
    /// A property name offset did not resolve within the strings block.
    #[error("unresolved property name at strings offset {0}")]
    BadNameOffset(u32),

    /// The firmware blob magic is invalid.
    #[error("invalid firmware magic")]
    InvalidMagic,
    /// The firmware blob version is not supported.
    #[error("unsupported firmware version {0}")]
    InvalidVersion(u8),
    /// The rotation field is not one of 0, 90, 180 or 270.
    #[error("invalid rotation {0}")]
    InvalidRotation(u16),

    /// A bytecode instruction combined the extended bit with a nonzero
    /// length.
    #[error("invalid command sequence")]
    InvalidCommandSequence,
    /// A sleep duration exceeded the encodable maximum of 10 seconds.
    #[error("too long sleep duration: {0} ms")]
    SleepTooLong(u32),
    /// A command carried more arguments than the encoding allows.
    #[error("command too long: {0} arguments")]
    CommandTooLong(usize),
    /// A textual command line or descriptor could not be parsed.
    #[error("invalid command or parameters: {0}")]
    InvalidCommand(String),

    /// A flag name was not recognized in its flag vocabulary.
    #[error("invalid {set} flag: {name}")]
    UnknownFlag {
        /// The flag vocabulary the name was looked up in.
        set: &'static str,
        /// The unrecognized name.
        name: String,
    },
}
