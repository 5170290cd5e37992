// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Splits raw container output into printable lines.
//!
//! With a TTY attached, progress bars redraw themselves with bare `\r`,
//! so both `\r` and `\n` end a line. Bytes are buffered until a line
//! ends, which keeps multi-byte UTF-8 sequences split across chunks
//! intact.

/// Incremental line splitter over raw output chunks.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                lines.extend(self.take_line());
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flushes the unterminated tail, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.take_line()
    }

    /// Decodes and trims the buffered line; blank lines are dropped.
    fn take_line(&mut self) -> Option<String> {
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!line.is_empty()).then_some(line)
    }
}
