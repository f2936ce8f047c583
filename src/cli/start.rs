use anyhow::{Context as _, Result};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ConfigFile,
    layout::ArchiveLayout,
    logging,
    sink::{SinkContext, SinkKind},
    source::SourceKind,
    sync::Syncer,
};

pub fn start(config: ConfigFile) -> Result<()> {
    let account = config.account();
    let source_kind: SourceKind = account.source().parse()?;
    let sink_kind: SinkKind = account.sink().parse()?;

    let layout = ArchiveLayout::from_config(&config);
    layout
        .create_dirs()
        .with_context(|| format!("cannot create {}", layout.root().display()))?;
    logging::init(Some(&layout.log_path()))?;
    info!(
        "exporting {} from {source_kind} to {sink_kind} as configured in {}",
        account.address(),
        config.path().display()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    let summary = runtime.block_on(async move {
        let source = source_kind
            .connect(config.account())
            .await
            .with_context(|| format!("cannot connect to source {source_kind}"))?;
        let sink = sink_kind.build(SinkContext::new(layout, config.account().address()));
        let cancel = CancellationToken::new();
        let mut syncer = Syncer::new(config, source, sink, cancel.clone())?;

        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current e-mail");
                cancel.cancel();
            }
        });
        let summary = syncer.start().await;
        watcher.abort();

        anyhow::Ok(summary?)
    })?;

    match summary.package {
        Some(package) => println!("{}", package.display()),
        None => println!("export interrupted, run start again to resume"),
    }

    Ok(())
}
