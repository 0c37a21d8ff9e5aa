// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! The diagnostics log of the terrain core. Startup summaries (quadtree and
//! range tables, loaded assets) and per-frame degradations (selection
//! overflow) go through here, mirrored to the console and the `relief.log`
//! file next to the executable.

use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::{
    fs::File,
    io::{self, Write},
};

/// Severity of a log message. Kinds are ordered, so a verbosity threshold can
/// compare against them directly.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageKind {
    /// Some useful information.
    Information,
    /// A warning.
    Warning,
    /// An error of some kind.
    Error,
}

impl MessageKind {
    fn prefix(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]: ",
            MessageKind::Warning => "[WARNING]: ",
            MessageKind::Error => "[ERROR]: ",
        }
    }
}

struct LogState {
    file: Option<File>,
    verbosity: MessageKind,
}

lazy_static! {
    static ref STATE: Mutex<LogState> = Mutex::new(LogState {
        file: File::create("relief.log").ok(),
        verbosity: MessageKind::Information,
    });
}

/// See module docs.
pub struct Log;

impl Log {
    /// Writes a line of the given severity, unless it falls below the current
    /// verbosity threshold.
    pub fn writeln<S>(kind: MessageKind, message: S)
    where
        S: AsRef<str>,
    {
        let mut state = STATE.lock();
        if kind < state.verbosity {
            return;
        }
        let line = format!("{}{}\n", kind.prefix(), message.as_ref());
        let _ = io::stdout().write_all(line.as_bytes());
        if let Some(file) = state.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
    }

    /// Writes an information line.
    pub fn info<S>(message: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Information, message)
    }

    /// Writes a warning line.
    pub fn warn<S>(message: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Warning, message)
    }

    /// Writes an error line.
    pub fn err<S>(message: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Error, message)
    }

    /// Suppresses every message below the given severity.
    pub fn set_verbosity(kind: MessageKind) {
        STATE.lock().verbosity = kind;
    }
}
