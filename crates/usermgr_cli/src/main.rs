//! `usermgr` console entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the store once.
//! - Run the interactive menu on stdin/stdout.
//! - Close the store explicitly before exiting.

mod menu;

use anyhow::{Context, Result};
use log::info;
use menu::UserMenu;
use std::io;
use usermgr_core::{init_logging, AppConfig, ConnectionFactory, SqliteUserRepository, UserService};

fn main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to resolve configuration")?;

    // Console output stays usable without file logs.
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("usermgr: file logging disabled: {err}");
    }
    info!(
        "event=cli_start module=cli status=ok version={} email_policy={}",
        usermgr_core::core_version(),
        config.validation.email.as_str()
    );

    let factory = ConnectionFactory::open(&config.db).context("failed to open user store")?;
    {
        let repo = SqliteUserRepository::try_new(&factory).context("user store is not usable")?;
        let service = UserService::with_policy(repo, config.validation);
        let mut menu = UserMenu::new(io::stdin().lock(), io::stdout().lock(), service);
        menu.run().context("console I/O failed")?;
    }
    factory.close().context("failed to close user store")?;

    Ok(())
}
