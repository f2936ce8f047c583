use std::fs::{remove_dir_all, remove_file};

use anyhow::{Context as _, Result};
use log::info;

use crate::{
    config::{ConfigFile, RunState},
    layout::ArchiveLayout,
};

pub fn nuke(mut config: ConfigFile) -> Result<()> {
    let layout = ArchiveLayout::from_config(&config);

    let root = layout.root();
    if root
        .try_exists()
        .with_context(|| format!("cannot read {}", root.display()))?
    {
        info!("removing {}", root.display());
        remove_dir_all(root).with_context(|| format!("cannot remove {}", root.display()))?;
    }
    let package = layout.package_path();
    if package
        .try_exists()
        .with_context(|| format!("cannot read {}", package.display()))?
    {
        info!("removing {}", package.display());
        remove_file(&package).with_context(|| format!("cannot remove {}", package.display()))?;
    }
    config.update_run(|run| *run = RunState::default())?;

    Ok(())
}
