use clap::Parser;
use vidrecall_cli::{Cli, init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    cli.run().await
}
