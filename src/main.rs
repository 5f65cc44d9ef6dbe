mod command_line;

use anyhow::Result;
use clap::Parser;

use command_line::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    dynamodb_copy::logging::init_logging(cli.debug)?;

    match cli.command {
        Command::CopyTable(args) => command_line::copy_table(args).await,
    }
}
