use clap::Parser;

use galaxy_ie_helpers::{Cli, config, logging};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(config::log_level(|key| dotenvy::var(key).ok()));
    galaxy_ie_helpers::run(cli)
}
