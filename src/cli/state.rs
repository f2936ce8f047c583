use std::io::{self, Write};

use anyhow::Result;
use jiff::Timestamp;

use crate::{config::ConfigFile, layout::ArchiveLayout, ledger::Ledger};

pub fn print(config: &ConfigFile) -> Result<()> {
    render(config, &mut io::stdout().lock())
}

fn render(config: &ConfigFile, out: &mut impl Write) -> Result<()> {
    let run = config.run();
    let layout = ArchiveLayout::from_config(config);

    writeln!(out, "account:   {}", config.account().address())?;
    match run.state {
        Some(state) => writeln!(out, "state:     {state}")?,
        None => writeln!(out, "state:     not started")?,
    }
    if let Some(total) = run.total {
        writeln!(out, "e-mails:   {total}")?;
    }
    writeln!(out, "progress:  {:.1}%", run.progress)?;
    if let Some(remaining) = &run.remaining {
        writeln!(out, "remaining: {remaining}")?;
    }
    for (label, second) in [("started", run.start_time), ("ended", run.end_time)] {
        if let Some(second) = second {
            writeln!(out, "{label:<10} {}", Timestamp::from_second(second)?)?;
        }
    }

    let ledger = Ledger::load(layout.ledger_path());
    writeln!(out, "saved:     {} e-mail(s)", ledger.len())?;
    for (folder, count) in ledger.folders() {
        writeln!(out, "  {folder}: {count}")?;
    }
    let package = layout.package_path();
    if package.is_file() {
        writeln!(out, "archive:   {}", package.display())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::config::SyncState;

    #[test]
    fn test_render_run_state_and_ledger() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("work.toml");
        fs::write(
            &path,
            format!(
                "address = \"me@example.com\"\nsource = \"test\"\nsink = \"eml\"\n\
                 archives_dir = \"{}\"\ntmp_dir = \"{}\"\n",
                dir.path().join("archives").display(),
                dir.path().join("tmp").display(),
            ),
        )
        .unwrap();
        let mut config = ConfigFile::load(&path).unwrap();
        config
            .update_run(|run| {
                run.state = Some(SyncState::Processing);
                run.total = Some(3);
                run.progress = 33.3;
                run.start_time = Some(1_704_701_703);
            })
            .unwrap();
        let layout = ArchiveLayout::from_config(&config);
        layout.create_dirs().unwrap();
        let mut ledger = Ledger::load(layout.ledger_path());
        ledger.mark_saved(&"Inbox".into(), &1.into()).unwrap();
        let mut out = Vec::new();

        render(&config, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("state:     processing"));
        assert!(out.contains("e-mails:   3\nprogress:  33.3%"));
        assert!(out.contains("started    2024-01-08T08:15:03Z"));
        assert!(!out.contains("ended"));
        assert!(out.contains("saved:     1 e-mail(s)\n  Inbox: 1\n"));
        assert!(!out.contains("archive:"));
    }
}
