use std::io::{self, Write};

use crate::{sink::SinkKind, source::SourceKind};

pub fn print() -> io::Result<()> {
    render(&mut io::stdout().lock())
}

fn render(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "sources:")?;
    for kind in SourceKind::ALL {
        describe(
            out,
            kind.name(),
            kind.help(),
            kind.required_keys(),
            kind.optional_keys(),
        )?;
    }
    writeln!(out, "sinks:")?;
    for kind in SinkKind::ALL {
        describe(
            out,
            kind.name(),
            kind.help(),
            kind.required_keys(),
            kind.optional_keys(),
        )?;
    }

    Ok(())
}

fn describe(
    out: &mut impl Write,
    name: &str,
    help: &str,
    required: &[&str],
    optional: &[&str],
) -> io::Result<()> {
    writeln!(out, "  {name}: {help}")?;
    if !required.is_empty() {
        writeln!(out, "    required: {}", required.join(", "))?;
    }
    if !optional.is_empty() {
        writeln!(out, "    optional: {}", optional.join(", "))?;
    }

    Ok(())
}
