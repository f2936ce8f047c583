mod nuke;
mod options;
mod start;
mod state;

use anyhow::{Context as _, Result};

use crate::{
    Args, Command,
    config::{self, ConfigFile},
    logging,
};

pub fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Start { account } => start::start(load(args, account)?),
        Command::State { account } => {
            logging::init(None)?;
            state::print(&load(args, account)?)
        }
        Command::Options => Ok(options::print()?),
        Command::Nuke { account } => {
            logging::init(None)?;
            nuke::nuke(load(args, account)?)
        }
    }
}

fn load(args: &Args, account: &str) -> Result<ConfigFile> {
    let path = config::account_file(args.config_dir.as_deref(), account)?;

    ConfigFile::load(&path).with_context(|| format!("cannot load account {account}"))
}
