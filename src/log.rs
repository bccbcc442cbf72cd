//! Process-wide diagnostic log sink.
//!
//! The sink is a truncate-opened text file shared by two channels: the
//! [`tracing`] subscriber installed by [`init`] (every library diagnostic
//! goes through it) and the raw [`append`] line writer. [`shutdown`]
//! flushes and closes the file; a SIGINT/SIGTERM handler does the same
//! before terminating the process.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriter;

use crate::Error;

/// Shared handle to the sink file. Writes while the sink is closed are
/// dropped silently so the subscriber never panics mid-teardown.
#[derive(Clone, Default)]
struct SinkWriter {
    file: Arc<Mutex<Option<File>>>,
}

impl SinkWriter {
    fn guard(&self) -> MutexGuard<'_, Option<File>> {
        match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl io::Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.guard().as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.guard().as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SinkWriter {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

static SINK: OnceLock<SinkWriter> = OnceLock::new();

fn sink() -> &'static SinkWriter {
    SINK.get_or_init(SinkWriter::default)
}

/// Opens (truncating) the log file and routes diagnostics into it.
///
/// The first call installs the `tracing` subscriber (filterable through the
/// standard env variable, `info` by default) and the signal handler that
/// tears the sink down on SIGINT/SIGTERM. Later calls swap the backing
/// file, closing the previous one.
pub fn init(path: &Path) -> Result<(), Error> {
    let file = File::create(path).map_err(|_| Error::OpenLog)?;
    *sink().guard() = Some(file);

    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(sink().clone())
            .with_ansi(false)
            .try_init();
        let _ = ctrlc::set_handler(|| {
            shutdown();
            std::process::exit(130);
        });
    });
    Ok(())
}

/// Appends one diagnostic line to the sink, bypassing the subscriber.
pub fn append(line: &str) -> Result<(), Error> {
    match sink().guard().as_mut() {
        Some(file) => writeln!(file, "{line}").map_err(|_| Error::WriteToLog),
        None => Err(Error::WriteToLog),
    }
}

/// Flushes and closes the sink. Diagnostics emitted afterwards are dropped
/// until [`init`] runs again.
pub fn shutdown() {
    if let Some(sink) = SINK.get() {
        if let Some(mut file) = sink.guard().take() {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The sink is process-global, so the whole lifecycle lives in one test.
    #[test]
    fn sink_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.log");

        assert_eq!(append("before init").unwrap_err(), Error::WriteToLog);

        init(&path).unwrap();
        append("first line").unwrap();
        tracing::info!("subscriber line");
        shutdown();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("first line"));

        assert_eq!(append("after shutdown").unwrap_err(), Error::WriteToLog);

        // Re-initializing truncates and writes again.
        init(&path).unwrap();
        append("second run").unwrap();
        shutdown();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("second run"));
        assert!(!contents.contains("first line"));

        assert_eq!(
            init(Path::new("/nonexistent-dir/solver.log")).unwrap_err(),
            Error::OpenLog
        );
    }
}
