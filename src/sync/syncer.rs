use std::{io, path::PathBuf, time::Duration};

use jiff::Timestamp;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    archive::{self, ArchiveError},
    config::{ConfigError, ConfigFile, SyncState},
    layout::ArchiveLayout,
    ledger::{Ledger, LedgerError},
    message::{FolderName, Message, MessageId},
    progress,
    sink::{Sink, SinkCapability, SinkError},
    source::{MessageListing, Source, SourceError},
};

pub const KEEP_SOURCE_OPTION: &str = "keep_source";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("option `{option}` cannot be used with {adapter}")]
    DisallowedOption { option: String, adapter: String },
    #[error("cannot create {path}: {source}")]
    Layout { path: PathBuf, source: io::Error },
}

/// Counters of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub total: usize,
    pub exported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub interrupted: bool,
    pub package: Option<PathBuf>,
}

enum Outcome {
    Exported,
    Failed,
}

/// Drives one export from enumeration to the final package.
///
/// Progress is durable after every message: the ledger names every persisted message and the
/// account file holds the lifecycle state, so a run stopped at any point resumes where it left off.
pub struct Syncer<S: Source, K: Sink> {
    config: ConfigFile,
    layout: ArchiveLayout,
    source: S,
    sink: K,
    ledger: Ledger,
    cancel: CancellationToken,
    retain_source: bool,
}

impl<S: Source, K: Sink> Syncer<S, K> {
    /// Validates the adapter combination against the account options. Nothing in the run state
    /// changes when this fails.
    pub fn new(
        config: ConfigFile,
        source: S,
        sink: K,
        cancel: CancellationToken,
    ) -> Result<Self, SyncError> {
        let account = config.account();
        for (kind, name, options) in [
            ("source", account.source(), source.disallowed_options()),
            ("sink", account.sink(), sink.disallowed_options()),
        ] {
            if let Some(option) = options.iter().find(|option| account.option_enabled(option)) {
                return Err(SyncError::DisallowedOption {
                    option: (*option).to_string(),
                    adapter: format!("{kind} {name}"),
                });
            }
        }

        let keep_source = account.option_enabled(KEEP_SOURCE_OPTION);
        let retain_source =
            keep_source && sink.capabilities().contains(SinkCapability::RetainSource);
        if keep_source && !retain_source {
            warn!(
                "sink {} cannot keep e-mail sources, ignoring {KEEP_SOURCE_OPTION}",
                account.sink()
            );
        }

        let layout = ArchiveLayout::from_config(&config);
        layout
            .create_dirs()
            .map_err(|source| SyncError::Layout {
                path: layout.root().clone(),
                source,
            })?;
        let ledger = Ledger::load(layout.ledger_path());
        debug!(
            "{} e-mail(s) recorded in {}",
            ledger.len(),
            ledger.path().display()
        );

        Ok(Self {
            config,
            layout,
            source,
            sink,
            ledger,
            cancel,
            retain_source,
        })
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs the export. Fatal errors are recorded as `failed` before they are returned.
    pub async fn start(&mut self) -> Result<SyncSummary, SyncError> {
        let started = Timestamp::now();
        let result = self.run(started).await;
        if let Err(error) = &result {
            error!("export failed: {error}");
            if let Err(state_error) = self.transition(SyncState::Failed) {
                error!("cannot record failed state: {state_error}");
            }
        }

        result
    }

    async fn run(&mut self, started: Timestamp) -> Result<SyncSummary, SyncError> {
        let previous = self.config.run().state;
        self.config.update_run(|run| {
            run.start_time = Some(started.as_second());
            run.end_time = None;
        })?;
        match previous {
            None => {
                self.transition(SyncState::Started)?;
                self.source.pre_hook().await?;
                self.sink.pre_hook()?;
            }
            Some(state) => info!("resuming export, last state was {state}"),
        }

        self.transition(SyncState::Enumerating)?;
        let folders = self.source.list_folders().await?;
        let reported: u64 = folders.values().map(|count| u64::from(*count)).sum();
        info!(
            "{} folder(s) with {reported} e-mail(s) reported",
            folders.len()
        );
        self.config.update_run(|run| run.total = Some(reported))?;
        self.sink.prepare_folders(&folders)?;
        let listing = self.source.list_message_ids().await?;

        self.transition(SyncState::Processing)?;
        let mut summary = self.process(&listing).await?;
        if summary.interrupted {
            summary.elapsed = elapsed_since(started, Timestamp::now());
            self.transition(SyncState::Interrupted)?;
            warn!(
                "export interrupted after {} new e-mail(s), run again to resume",
                summary.exported
            );
            return Ok(summary);
        }
        info!(
            "Total emails imported: {} ({} new, {} already saved, {} failed)",
            summary.exported + summary.skipped + summary.failed,
            summary.exported,
            summary.skipped,
            summary.failed
        );

        self.transition(SyncState::Finalizing)?;
        self.source.post_hook().await?;
        self.sink.post_hook()?;
        let package = self.layout.package_path();
        info!(
            "packaging {} into {}",
            self.layout.root().display(),
            package.display()
        );
        archive::package(self.layout.root(), &package, self.layout.tmp_dir())?;

        let ended = Timestamp::now();
        self.config
            .update_run(|run| run.end_time = Some(ended.as_second()))?;
        summary.elapsed = elapsed_since(started, ended);
        info!(
            "Total export duration: {}",
            progress::format_duration(summary.elapsed)
        );
        self.transition(SyncState::Completed)?;
        summary.package = Some(package);

        Ok(summary)
    }

    async fn process(&mut self, listing: &MessageListing) -> Result<SyncSummary, SyncError> {
        let total: usize = listing.values().map(Vec::len).sum();
        let pending: usize = listing
            .iter()
            .map(|(folder, ids)| {
                ids.iter()
                    .filter(|id| !self.ledger.is_saved(folder, id))
                    .count()
            })
            .sum();
        info!("Total emails to save: {total} ({pending} not saved yet)");

        let mut summary = SyncSummary {
            total,
            ..SyncSummary::default()
        };
        let mut processed = 0;
        let mut attempted = 0;
        for (folder, ids) in listing {
            info!("saving folder {folder}: {} e-mail(s)", ids.len());
            for (index, id) in ids.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    summary.interrupted = true;
                    return Ok(summary);
                }
                if self.ledger.is_saved(folder, id) {
                    info!("e-mail ({id}) already saved in folder {folder}, skipping");
                    summary.skipped += 1;
                } else {
                    let remaining = progress::estimate_remaining(
                        &mut self.config,
                        attempted,
                        pending,
                        Timestamp::now(),
                    )?;
                    info!(
                        "saving e-mail ({id}) {}/{} [{:.1}%] - Estimated remaining time: {remaining}",
                        index + 1,
                        ids.len(),
                        progress::percentage(processed, total)
                    );
                    match self.export(folder, id).await? {
                        Outcome::Exported => summary.exported += 1,
                        Outcome::Failed => summary.failed += 1,
                    }
                    attempted += 1;
                }
                processed += 1;
                progress::update_progress(&mut self.config, processed, total)?;
            }
        }

        Ok(summary)
    }

    async fn export(&mut self, folder: &FolderName, id: &MessageId) -> Result<Outcome, SyncError> {
        let message = match self.source.fetch_message(id, folder).await {
            Ok(message) => message,
            Err(error) if error.is_message_scoped() => {
                error!("cannot fetch e-mail ({id}) in folder {folder}: {error}");
                return Ok(Outcome::Failed);
            }
            Err(error) => return Err(error.into()),
        };

        if let Err(error) = self.persist(&message) {
            error!("cannot save e-mail ({id}) in folder {folder}: {error}");
            match self.sink.persist_fallback(&message) {
                Ok(path) => warn!("kept raw e-mail ({id}) at {}", path.display()),
                Err(error) => error!("cannot keep raw e-mail ({id}) either: {error}"),
            }
            return Ok(Outcome::Failed);
        }
        self.ledger.mark_saved(folder, id)?;

        Ok(Outcome::Exported)
    }

    fn persist(&mut self, message: &Message) -> Result<(), SinkError> {
        self.sink.persist(message)?;
        if self.retain_source {
            let filename = self.sink.context().filename(message);
            let path = self.layout.raw_source_path(message, &filename);
            self.layout
                .write_raw_source(message, &filename)
                .map_err(SinkError::io(path))?;
        }

        Ok(())
    }

    fn transition(&mut self, state: SyncState) -> Result<(), ConfigError> {
        debug!("export state: {state}");
        self.config.update_run(|run| run.state = Some(state))
    }
}

fn elapsed_since(started: Timestamp, now: Timestamp) -> Duration {
    Duration::from_secs(u64::try_from(now.as_second() - started.as_second()).unwrap_or_default())
}
