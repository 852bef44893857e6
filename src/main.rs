//! Proclusive workflow server entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    proclusive_workflow::server::run().await
}
