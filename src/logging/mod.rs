use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use env_logger::{Env, Target};
use jiff::Zoned;
use log::{Record, SetLoggerError};
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error(transparent)]
    AlreadyInitialized(#[from] SetLoggerError),
}

/// Logs `[timestamp] [LEVEL] message` lines to stderr and, if given, appends them to `log_file`.
///
/// The filter defaults to `info` and can be changed through `RUST_LOG`.
pub fn init(log_file: Option<&Path>) -> Result<(), LoggingError> {
    let file = log_file
        .map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::Open {
                    path: path.to_path_buf(),
                    source,
                })
        })
        .transpose()?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| write_record(buf, &Zoned::now(), record))
        .target(Target::Pipe(Box::new(Tee { file })))
        .try_init()?;

    Ok(())
}

fn write_record(out: &mut impl Write, now: &Zoned, record: &Record) -> io::Result<()> {
    writeln!(
        out,
        "[{}] [{}] {}",
        now.strftime(TIMESTAMP_FORMAT),
        record.level(),
        record.args()
    )
}

/// Copies every write to stderr and the optional log file.
struct Tee {
    file: Option<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = &mut self.file {
            file.write_all(buf)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = &mut self.file {
            file.flush()?;
        }

        Ok(())
    }
}
