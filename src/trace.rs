//! Bounded retention of engine traces for post-mortem dumps.
//!
//! The engine reports its diagnostics through [`TraceSink`]. Every line is
//! kept in a fixed-capacity [`TraceRingBuffer`] (oldest lines are overwritten)
//! so that when a packet fails, the session can print what the engine was
//! doing just before. Independently, warnings and errors, or every line in
//! verbose mode, are echoed to stdout as they arrive.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use crate::constants::{MAX_LAST_TRACES, MAX_TRACE_LEN};
use crate::engine::RohcProfile;

/// Severity of an engine trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TraceLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TraceLevel::Debug => "DEBUG",
            TraceLevel::Info => "INFO",
            TraceLevel::Warning => "WARNING",
            TraceLevel::Error => "ERROR",
        })
    }
}

/// Which half of the engine emitted a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEntity {
    Compressor,
    Decompressor,
}

impl fmt::Display for TraceEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TraceEntity::Compressor => "comp",
            TraceEntity::Decompressor => "decomp",
        })
    }
}

/// Fixed-capacity circular log of the most recent trace lines.
///
/// Never grows past its capacity and never blocks: when full, recording a
/// line discards the oldest one.
#[derive(Debug)]
pub struct TraceRingBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    max_line_len: usize,
}

impl TraceRingBuffer {
    /// Creates a buffer holding up to `capacity` lines of at most
    /// `max_line_len` characters each.
    pub fn new(capacity: usize, max_line_len: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            max_line_len,
        }
    }

    /// Appends a line, truncating it to the line capacity and evicting the
    /// oldest line when the buffer is full.
    pub fn record(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        let truncated = match line.char_indices().nth(self.max_line_len) {
            Some((byte_offset, _)) => &line[..byte_offset],
            None => line,
        };
        self.lines.push_back(truncated.to_owned());
    }

    /// Returns the retained lines from oldest to newest, or `None` when
    /// nothing has been recorded yet.
    ///
    /// Does not consume the lines; draining twice yields the same result.
    pub fn drain(&self) -> Option<impl ExactSizeIterator<Item = &str> + '_> {
        if self.lines.is_empty() {
            None
        } else {
            Some(self.lines.iter().map(String::as_str))
        }
    }

    /// Number of lines currently retained.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no line has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of retained lines.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Writes the drain to `out` in the post-mortem format.
    pub fn write_drain(&self, out: &mut impl Write) -> io::Result<()> {
        match self.drain() {
            None => writeln!(out, "no trace to display"),
            Some(lines) => {
                writeln!(out, "print the last {} traces...", lines.len())?;
                for line in lines {
                    writeln!(out, "{line}")?;
                }
                Ok(())
            }
        }
    }
}

impl Default for TraceRingBuffer {
    fn default() -> Self {
        Self::new(MAX_LAST_TRACES, MAX_TRACE_LEN)
    }
}

/// Shared handle through which engine traces are recorded and echoed.
///
/// Cloning the sink shares the underlying ring buffer and echo writer: the
/// engine callbacks hold one clone, the session another for the post-mortem
/// drain.
#[derive(Clone)]
pub struct TraceSink {
    buffer: Rc<RefCell<TraceRingBuffer>>,
    echo: Rc<RefCell<Box<dyn Write>>>,
    verbose: bool,
}

impl fmt::Debug for TraceSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSink")
            .field("buffer", &self.buffer)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl TraceSink {
    /// Creates a sink over a fresh buffer with the default capacity, echoing
    /// to stdout.
    pub fn new(verbose: bool) -> Self {
        Self::with_buffer(TraceRingBuffer::default(), verbose)
    }

    /// Creates a sink over the given buffer, echoing to stdout.
    pub fn with_buffer(buffer: TraceRingBuffer, verbose: bool) -> Self {
        Self::with_echo(buffer, verbose, io::stdout())
    }

    /// Creates a sink over the given buffer, echoing to `echo`.
    pub fn with_echo(buffer: TraceRingBuffer, verbose: bool, echo: impl Write + 'static) -> Self {
        Self {
            buffer: Rc::new(RefCell::new(buffer)),
            echo: Rc::new(RefCell::new(Box::new(echo))),
            verbose,
        }
    }

    /// Whether every trace is echoed live, not just warnings and errors.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Whether a trace of `level` is echoed as it is recorded.
    pub fn should_echo(&self, level: TraceLevel) -> bool {
        level >= TraceLevel::Warning || self.verbose
    }

    /// Records one trace line and echoes it when its level calls for it.
    pub fn record(
        &self,
        level: TraceLevel,
        entity: TraceEntity,
        profile: Option<RohcProfile>,
        message: fmt::Arguments<'_>,
    ) {
        let line = match profile {
            Some(profile) => format!("[{level}] [{entity}] [{profile}] {message}"),
            None => format!("[{level}] [{entity}] {message}"),
        };
        if self.should_echo(level) {
            // Echo is best effort; a closed stdout must not stop the engine.
            let mut echo = self.echo.borrow_mut();
            let _ = writeln!(echo, "{line}").and_then(|()| echo.flush());
        }
        self.buffer.borrow_mut().record(&line);
    }

    /// Writes the retained traces to `out`.
    pub fn write_drain(&self, out: &mut impl Write) -> io::Result<()> {
        self.buffer.borrow().write_drain(out)
    }

    /// Copies the retained traces, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.buffer
            .borrow()
            .drain()
            .map(|lines| lines.map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Number of retained traces.
    pub fn len(&self) -> usize {
        self.buffer.borrow().len()
    }

    /// Whether no trace has been recorded.
    pub fn is_empty(&self) -> bool {
        self.buffer.borrow().is_empty()
    }
}
