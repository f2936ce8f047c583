mod eml;
mod html;
mod log_only;

use std::{
    fmt::{Display, Formatter},
    fs, io,
    path::PathBuf,
    str::FromStr,
};

use enumflags2::{BitFlags, bitflags};
use thiserror::Error;

use crate::{
    layout::ArchiveLayout,
    message::{Message, derive_filename},
    source::FolderCounts,
};
pub use eml::EmlSink;
pub use html::HtmlSink;
pub use log_only::LogSink;

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCapability {
    /// Raw sources may be kept next to the rendered output.
    RetainSource,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("unknown sink adapter \"{0}\", expected one of: {names}", names = SinkKind::names())]
    Unknown(String),
}

impl SinkError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// What every sink gets to know about the export it writes into.
#[derive(Debug, Clone)]
pub struct SinkContext {
    layout: ArchiveLayout,
    self_address: String,
}

impl SinkContext {
    pub fn new(layout: ArchiveLayout, self_address: &str) -> Self {
        Self {
            layout,
            self_address: self_address.to_string(),
        }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    pub fn filename(&self, message: &Message) -> String {
        derive_filename(message, &self.self_address)
    }
}

/// Destination format of an export.
///
/// Calls are strictly sequential. Sinks write below the archive root of their [`SinkContext`].
pub trait Sink {
    fn context(&self) -> &SinkContext;

    /// Creates the output location of every folder, existing ones are left alone.
    fn prepare_folders(&mut self, folders: &FolderCounts) -> Result<(), SinkError> {
        let layout = self.context().layout();
        for folder in folders.keys() {
            let dir = layout.folder_dir(folder);
            fs::create_dir_all(&dir).map_err(SinkError::io(dir))?;
        }

        Ok(())
    }

    fn persist(&mut self, message: &Message) -> Result<(), SinkError>;

    /// Secondary attempt after [`Sink::persist`] failed: stores the raw source instead.
    fn persist_fallback(&mut self, message: &Message) -> Result<PathBuf, SinkError> {
        let context = self.context();
        let filename = context.filename(message);
        let layout = context.layout();

        layout
            .write_raw_source(message, &filename)
            .map_err(SinkError::io(layout.raw_source_path(message, &filename)))
    }

    fn capabilities(&self) -> BitFlags<SinkCapability> {
        BitFlags::empty()
    }

    /// Option keys that must not be enabled together with this sink.
    fn disallowed_options(&self) -> &'static [&'static str] {
        &[]
    }

    fn pre_hook(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn post_hook(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Eml,
    Html,
    Log,
}

impl SinkKind {
    pub const ALL: [Self; 3] = [Self::Eml, Self::Html, Self::Log];

    pub fn names() -> String {
        Self::ALL.map(Self::name).join(", ")
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Eml => "eml",
            Self::Html => "html",
            Self::Log => "test",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Self::Eml => "stores every message as its original .eml source",
            Self::Html => "renders every message as a standalone HTML page",
            Self::Log => "only logs what would be written",
        }
    }

    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            Self::Eml | Self::Html => &["address"],
            Self::Log => &[],
        }
    }

    pub fn optional_keys(self) -> &'static [&'static str] {
        match self {
            Self::Html => &["archives_dir", "tmp_dir", "options.keep_source"],
            Self::Eml => &["archives_dir", "tmp_dir"],
            Self::Log => &["address"],
        }
    }

    pub fn build(self, context: SinkContext) -> AnySink {
        match self {
            Self::Eml => AnySink::Eml(EmlSink::new(context)),
            Self::Html => AnySink::Html(HtmlSink::new(context)),
            Self::Log => AnySink::Log(LogSink::new(context)),
        }
    }
}

impl Display for SinkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SinkKind {
    type Err = SinkError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SinkError::Unknown(name.to_string()))
    }
}

/// Any registered sink, selected by name at startup.
#[derive(Debug)]
pub enum AnySink {
    Eml(EmlSink),
    Html(HtmlSink),
    Log(LogSink),
}

impl Sink for AnySink {
    fn context(&self) -> &SinkContext {
        match self {
            Self::Eml(sink) => sink.context(),
            Self::Html(sink) => sink.context(),
            Self::Log(sink) => sink.context(),
        }
    }

    fn prepare_folders(&mut self, folders: &FolderCounts) -> Result<(), SinkError> {
        match self {
            Self::Eml(sink) => sink.prepare_folders(folders),
            Self::Html(sink) => sink.prepare_folders(folders),
            Self::Log(sink) => sink.prepare_folders(folders),
        }
    }

    fn persist(&mut self, message: &Message) -> Result<(), SinkError> {
        match self {
            Self::Eml(sink) => sink.persist(message),
            Self::Html(sink) => sink.persist(message),
            Self::Log(sink) => sink.persist(message),
        }
    }

    fn persist_fallback(&mut self, message: &Message) -> Result<PathBuf, SinkError> {
        match self {
            Self::Eml(sink) => sink.persist_fallback(message),
            Self::Html(sink) => sink.persist_fallback(message),
            Self::Log(sink) => sink.persist_fallback(message),
        }
    }

    fn capabilities(&self) -> BitFlags<SinkCapability> {
        match self {
            Self::Eml(sink) => sink.capabilities(),
            Self::Html(sink) => sink.capabilities(),
            Self::Log(sink) => sink.capabilities(),
        }
    }

    fn disallowed_options(&self) -> &'static [&'static str] {
        match self {
            Self::Eml(sink) => sink.disallowed_options(),
            Self::Html(sink) => sink.disallowed_options(),
            Self::Log(sink) => sink.disallowed_options(),
        }
    }

    fn pre_hook(&mut self) -> Result<(), SinkError> {
        match self {
            Self::Eml(sink) => sink.pre_hook(),
            Self::Html(sink) => sink.pre_hook(),
            Self::Log(sink) => sink.pre_hook(),
        }
    }

    fn post_hook(&mut self) -> Result<(), SinkError> {
        match self {
            Self::Eml(sink) => sink.post_hook(),
            Self::Html(sink) => sink.post_hook(),
            Self::Log(sink) => sink.post_hook(),
        }
    }
}
