//! Opt-in diagnostic tracing for Web API calls.
//!
//! `DebugTracer` is owned by a session rather than living in a global. The
//! enabled flag is atomic and the sink is a single-assignment cell, so the
//! tracer can be toggled while other tasks are tracing through it and a
//! concurrent first enable still builds exactly one default sink.

use std::fmt;
use std::io;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;

/// Target label attached to every line written by the default sink.
pub const DEBUG_TARGET: &str = "slack_sdk::debug";

/// Destination for debug traces.
///
/// Implementations must be cheap to call concurrently; the tracer never
/// serializes calls into the sink.
pub trait DebugSink: Send + Sync {
    /// Writes one trace line originating at `call_site`.
    fn write(&self, call_site: &'static Location<'static>, message: fmt::Arguments<'_>);
}

/// Sink backed by a private `tracing_subscriber::fmt` subscriber.
///
/// The subscriber is held in its own [`Dispatch`] and is never installed as
/// the global default, so applications keep full control over their own
/// logging setup.
pub struct FmtSink {
    dispatch: Dispatch,
}

impl FmtSink {
    /// Writes timestamped lines to standard error.
    pub fn stderr() -> Self {
        Self::with_writer(io::stderr)
    }

    pub fn with_writer<W>(writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .finish();

        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }
}

impl DebugSink for FmtSink {
    fn write(&self, call_site: &'static Location<'static>, message: fmt::Arguments<'_>) {
        tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::debug!(target: DEBUG_TARGET, call_site = %call_site, "{message}");
        });
    }
}

impl fmt::Debug for FmtSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmtSink").finish_non_exhaustive()
    }
}

type SinkFactory = Box<dyn Fn() -> Arc<dyn DebugSink> + Send + Sync>;

/// Debug toggle plus its lazily created sink.
pub struct DebugTracer {
    enabled: AtomicBool,
    sink: OnceLock<Arc<dyn DebugSink>>,
    default_sink: SinkFactory,
}

impl DebugTracer {
    /// Creates a disabled tracer whose default sink writes to standard error.
    pub fn new() -> Self {
        Self::with_writer(io::stderr)
    }

    /// Creates a disabled tracer whose default sink writes to `writer`.
    ///
    /// The sink itself is only built on the first call to
    /// [`set_debug(true)`](Self::set_debug).
    pub fn with_writer<W>(writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Clone + Send + Sync + 'static,
    {
        Self::with_default_sink(move || {
            Arc::new(FmtSink::with_writer(writer.clone())) as Arc<dyn DebugSink>
        })
    }

    /// Creates a disabled tracer that forwards to an externally supplied sink.
    ///
    /// No default sink is ever built for this tracer.
    pub fn with_sink(sink: Arc<dyn DebugSink>) -> Self {
        let tracer = Self::new();
        let _ = tracer.sink.set(sink);
        tracer
    }

    fn with_default_sink<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn DebugSink> + Send + Sync + 'static,
    {
        Self {
            enabled: AtomicBool::new(false),
            sink: OnceLock::new(),
            default_sink: Box::new(factory),
        }
    }

    /// Supplies an external sink.
    ///
    /// Fails and hands the sink back when a sink is already in place, either
    /// from an earlier call or because debugging was already enabled with
    /// the default sink.
    pub fn set_sink(&self, sink: Arc<dyn DebugSink>) -> Result<(), Arc<dyn DebugSink>> {
        self.sink.set(sink)
    }

    /// Switches tracing on or off.
    pub fn set_debug(&self, enabled: bool) {
        if enabled {
            self.sink.get_or_init(|| (self.default_sink)());
        }
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Forwards pre-formatted arguments, e.g. `tracer.debugf(format_args!("x={x}"))`.
    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.emit(Location::caller(), args);
    }

    /// Forwards a single displayable value.
    #[track_caller]
    pub fn debugln(&self, message: impl fmt::Display) {
        if !self.is_enabled() {
            return;
        }
        self.emit(Location::caller(), format_args!("{message}"));
    }

    fn emit(&self, call_site: &'static Location<'static>, args: fmt::Arguments<'_>) {
        if !self.is_enabled() {
            return;
        }
        if let Some(sink) = self.sink.get() {
            sink.write(call_site, args);
        }
    }
}

impl Default for DebugTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DebugTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugTracer")
            .field("enabled", &self.is_enabled())
            .field("sink_initialized", &self.sink.get().is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io;
    use std::panic::Location;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    use super::{DebugSink, DebugTracer, FmtSink, DEBUG_TARGET};

    /// Writer that counts `write` calls and keeps the bytes for inspection.
    #[derive(Clone, Default)]
    pub(crate) struct CountingWriter {
        pub(crate) writes: Arc<AtomicUsize>,
        pub(crate) bytes: Arc<Mutex<Vec<u8>>>,
    }

    impl CountingWriter {
        pub(crate) fn output(&self) -> String {
            String::from_utf8_lossy(&self.bytes.lock().expect("writer lock")).into_owned()
        }
    }

    impl io::Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.bytes
                .lock()
                .expect("writer lock")
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl DebugSink for RecordingSink {
        fn write(&self, _call_site: &'static Location<'static>, message: std::fmt::Arguments<'_>) {
            self.lines
                .lock()
                .expect("sink lock")
                .push(message.to_string());
        }
    }

    #[test]
    fn enabling_builds_default_sink_and_writes_once() {
        let writer = CountingWriter::default();
        let tracer = DebugTracer::with_writer({
            let writer = writer.clone();
            move || writer.clone()
        });

        tracer.set_debug(true);
        tracer.debugf(format_args!("calling {}", "auth.test"));

        assert_eq!(writer.writes.load(Ordering::SeqCst), 1);
        let output = writer.output();
        assert!(output.contains("calling auth.test"));
        assert!(output.contains(DEBUG_TARGET));
        assert!(output.contains("debug.rs"), "call site missing: {output}");
    }

    #[test]
    fn disabling_stops_all_writes() {
        let writer = CountingWriter::default();
        let tracer = DebugTracer::with_writer({
            let writer = writer.clone();
            move || writer.clone()
        });

        tracer.set_debug(true);
        tracer.debugln("first");
        tracer.set_debug(false);
        tracer.debugln("second");
        tracer.debugf(format_args!("third"));

        assert_eq!(writer.writes.load(Ordering::SeqCst), 1);
        assert!(!writer.output().contains("second"));
    }

    #[test]
    fn disabled_tracer_never_builds_a_sink() {
        let built = Arc::new(AtomicUsize::new(0));
        let tracer = DebugTracer::with_default_sink({
            let built = Arc::clone(&built);
            move || {
                built.fetch_add(1, Ordering::SeqCst);
                Arc::new(FmtSink::with_writer(io::sink)) as Arc<dyn DebugSink>
            }
        });

        tracer.debugln("ignored");
        tracer.set_debug(false);

        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert!(!tracer.is_enabled());
    }

    #[test]
    fn concurrent_first_enable_builds_one_sink() {
        let built = Arc::new(AtomicUsize::new(0));
        let tracer = Arc::new(DebugTracer::with_default_sink({
            let built = Arc::clone(&built);
            move || {
                built.fetch_add(1, Ordering::SeqCst);
                Arc::new(FmtSink::with_writer(io::sink)) as Arc<dyn DebugSink>
            }
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracer = Arc::clone(&tracer);
                thread::spawn(move || {
                    tracer.set_debug(true);
                    tracer.debugln("racing");
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("tracer thread");
        }

        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn external_sink_replaces_default() {
        let sink = Arc::new(RecordingSink::default());
        let tracer = DebugTracer::with_sink(sink.clone());

        tracer.debugln("before enable");
        tracer.set_debug(true);
        tracer.debugln("after enable");

        let lines = sink.lines.lock().expect("sink lock");
        assert_eq!(lines.as_slice(), ["after enable".to_string()]);
    }

    #[test]
    fn set_sink_rejected_once_default_sink_exists() {
        let tracer = DebugTracer::with_writer(io::sink);
        tracer.set_debug(true);
        assert!(tracer
            .set_sink(Arc::new(RecordingSink::default()))
            .is_err());
    }
}
