//! Dual-sink logger.
//!
//! Every message is written to a persistent log file and to the console. Both
//! sinks sit behind one mutex, so a message is never interleaved with another
//! one in either sink and both sinks observe the same order.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::LoggerError;
use crate::paths;

/// Name of the log file created inside the log directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "torrent-downloader.log";

/// Mode for the log file (owner rw, group/other r).
pub const LOG_FILE_PERMISSIONS: u32 = 0o644;

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Writes a formatted line through a [`Logger`].
///
/// A failed write is reported on stderr; logging never aborts the caller.
#[macro_export]
macro_rules! logf {
    ($logger:expr, $($arg:tt)*) => {
        if let Err(err) = $logger.printf(format_args!($($arg)*)) {
            eprintln!("log write failed: {err}");
        }
    };
}

type Sink = Box<dyn Write + Send>;

struct Sinks {
    file: Sink,
    console: Sink,
}

impl Sinks {
    /// Persistent sink first; a failure there skips the console.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)?;
        self.file.flush()?;
        self.console.write_all(buf)?;
        self.console.flush()
    }
}

/// Thread-safe logger mirroring each message to a file and the console.
///
/// Cloning is cheap; all clones share the same sinks and lock.
#[derive(Clone)]
pub struct Logger {
    sinks: Arc<Mutex<Sinks>>,
}

impl Logger {
    /// Opens `path` in append mode, creating its parent directory if needed.
    /// The console sink is stdout.
    ///
    /// # Arguments
    ///
    /// * `path` - The log file. It is created with mode 0644 when missing.
    ///
    /// # Returns
    ///
    /// * `Result<Self, LoggerError>` - The logger, or the directory or file
    ///   that could not be opened.
    ///
    /// # Examples
    ///
    /// ```
    /// use tdl_core::{Logger, logf};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let path = dir.path().join("logs").join("torrent-downloader.log");
    /// let logger = Logger::open(&path).unwrap();
    ///
    /// logf!(logger, "Starting torrent client...");
    /// let text = std::fs::read_to_string(&path).unwrap();
    /// assert!(text.ends_with("Starting torrent client...\n"));
    /// ```
    pub fn open(path: &Path) -> Result<Self, LoggerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            paths::create_dir_all(parent).map_err(|source| LoggerError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(LOG_FILE_PERMISSIONS);
        }
        let file = options.open(path).map_err(|source| LoggerError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::with_sinks(file, io::stdout()))
    }

    /// Builds a logger over arbitrary sinks.
    pub fn with_sinks<F, C>(file: F, console: C) -> Self
    where
        F: Write + Send + 'static,
        C: Write + Send + 'static,
    {
        Self {
            sinks: Arc::new(Mutex::new(Sinks {
                file: Box::new(file),
                console: Box::new(console),
            })),
        }
    }

    /// Writes one timestamped line built from `args`.
    ///
    /// A trailing newline is appended unless the message already ends with one.
    pub fn printf(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        let mut line = format!("{} {}", chrono::Local::now().format(TIMESTAMP_FORMAT), args);
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.sinks.lock().write_all(line.as_bytes())
    }

    /// Writes one timestamped line containing `msg`.
    pub fn println(&self, msg: impl fmt::Display) -> io::Result<()> {
        self.printf(format_args!("{msg}"))
    }

    /// Returns a raw byte writer over both sinks.
    pub fn writer(&self) -> LogWriter {
        LogWriter {
            logger: self.clone(),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

/// Raw writer handed out by [`Logger::writer`].
///
/// Each `write` call passes the bytes unchanged to both sinks under the
/// logger's lock.
pub struct LogWriter {
    logger: Logger,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.logger.sinks.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut sinks = self.logger.sinks.lock();
        sinks.file.flush()?;
        sinks.console.flush()
    }
}

impl<'a> MakeWriter<'a> for Logger {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer()
    }
}
