use clap::Parser;
use transfer_ingest::server::{self, Params};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let params = Params::parse();
    server::start(params).await
}
