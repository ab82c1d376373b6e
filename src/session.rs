//! The capture loop.
//!
//! A [`Session`] owns everything one run needs: the capture source, the
//! pipeline and its engines, the dump table, the statistics, the trace sink
//! and the stop flag. [`Session::run`] pulls frames until the source is
//! exhausted, a stop is requested or a frame fails. A failure ends the run
//! with [`SessionEnd::Halted`]; the caller decides whether to abort.

use std::io::{self, Write};
use std::rc::Rc;

use tracing::{error, info, warn};

use crate::callbacks::SnifferCallbacks;
use crate::capture::{CaptureSource, StopFlag};
use crate::config::SessionConfig;
use crate::dumps::DumpTable;
use crate::engine::{EngineCallbacks, EnginePair};
use crate::error::{CaptureError, SnifferError};
use crate::pipeline::{PacketOutcome, Pipeline};
use crate::stats::RunStatistics;
use crate::trace::TraceSink;
use crate::types::ContextId;

/// How a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// Every frame went through; the stream ended or a stop was requested.
    Completed(SessionSummary),
    /// A frame failed and the session stopped on it.
    Halted(HaltReport),
}

/// Result of a session that processed every frame successfully.
#[derive(Debug)]
pub struct SessionSummary {
    pub stats: RunStatistics,
    /// Contexts that had a dump file when the session closed them.
    pub used_contexts: Vec<ContextId>,
    /// Whether the stop flag ended the session.
    pub stopped_by_signal: bool,
    /// Read error that ended the capture, if any.
    pub capture_error: Option<CaptureError>,
}

/// Details of the frame that halted a session.
#[derive(Debug)]
pub struct HaltReport {
    /// 1-based number of the failing frame.
    pub packet_number: u64,
    pub outcome: PacketOutcome,
    pub stats: RunStatistics,
}

/// One sniffer run.
pub struct Session<S: CaptureSource> {
    source: S,
    pipeline: Pipeline,
    dumps: DumpTable,
    stats: RunStatistics,
    traces: TraceSink,
    stop: StopFlag,
    progress: bool,
}

impl<S: CaptureSource> Session<S> {
    /// Assembles a session from an already configured engine pair.
    ///
    /// `traces` must be the sink the engine callbacks write to, so that the
    /// post-mortem drain shows the engine's traces.
    pub fn new(
        config: &SessionConfig,
        source: S,
        engines: EnginePair,
        traces: TraceSink,
        stop: StopFlag,
    ) -> Self {
        let link_layer = source.link_layer();
        let dumps = DumpTable::new(
            config.dump_dir(),
            link_layer,
            config.max_cid().index() + 1,
        );
        Self {
            pipeline: Pipeline::new(link_layer, engines, config.max_cid()),
            source,
            dumps,
            stats: RunStatistics::new(),
            traces,
            stop,
            progress: config.shows_progress(),
        }
    }

    /// Assembles a session driving the built-in Uncompressed-profile engine.
    ///
    /// # Errors
    /// - [`SnifferError::Engine`] if the engine rejects the configuration.
    pub fn with_uncompressed_engine(
        config: &SessionConfig,
        source: S,
        stop: StopFlag,
    ) -> Result<Self, SnifferError> {
        let traces = TraceSink::new(config.is_verbose());
        let callbacks: Rc<dyn EngineCallbacks> = Rc::new(SnifferCallbacks::new(traces.clone()));
        let engines = EnginePair::uncompressed(&config.engine_config()?, callbacks)?;
        Ok(Self::new(config, source, engines, traces, stop))
    }

    /// Trace sink shared with the engine.
    pub fn traces(&self) -> &TraceSink {
        &self.traces
    }

    /// Runs the capture loop, writing halt diagnostics to stderr.
    pub fn run(self) -> SessionEnd {
        let stderr = io::stderr();
        self.run_with_diagnostics(&mut stderr.lock())
    }

    /// Runs the capture loop, writing halt diagnostics to `diagnostics`.
    pub fn run_with_diagnostics(mut self, diagnostics: &mut impl Write) -> SessionEnd {
        let mut capture_error = None;
        loop {
            if self.stop.is_stop_requested() {
                break;
            }
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "capture failed, ending session");
                    capture_error = Some(e);
                    break;
                }
            };

            let outcome = self.pipeline.process(&frame, &mut self.dumps);
            self.stats.record(&outcome);
            if self.progress {
                self.print_progress();
            }

            if !outcome.is_success() {
                if self.progress {
                    println!();
                }
                error!(packet = self.stats.packets, "{outcome}");
                if let Err(e) = self.write_halt_diagnostics(&outcome, diagnostics) {
                    warn!(error = %e, "failed to write halt diagnostics");
                }
                return SessionEnd::Halted(HaltReport {
                    packet_number: self.stats.packets,
                    outcome,
                    stats: self.stats,
                });
            }
        }

        if self.progress && self.stats.packets > 0 {
            println!();
        }
        let stopped_by_signal = self.stop.is_stop_requested();
        if stopped_by_signal {
            info!("program stopped by signal");
        }
        let used_contexts = self.dumps.close_all();
        for cid in &used_contexts {
            info!(%cid, "closed dump file");
        }
        SessionEnd::Completed(SessionSummary {
            stats: self.stats,
            used_contexts,
            stopped_by_signal,
            capture_error,
        })
    }

    fn print_progress(&self) {
        let mut stdout = io::stdout().lock();
        let prefix = if self.stats.packets > 1 { "\r" } else { "" };
        // Progress is best effort.
        let _ = write!(stdout, "{prefix}packet #{}", self.stats.packets);
        let _ = stdout.flush();
    }

    fn write_halt_diagnostics(
        &self,
        outcome: &PacketOutcome,
        out: &mut impl Write,
    ) -> io::Result<()> {
        writeln!(out, "{outcome}")?;
        if let PacketOutcome::Mismatch { report, .. } = outcome {
            write!(out, "{report}")?;
        }
        writeln!(out, "{}", self.stats.halt_line(outcome.cid()))?;
        self.traces.write_drain(out)?;
        out.flush()
    }
}
