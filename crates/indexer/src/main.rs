use clap::Parser;

#[tokio::main]
async fn main() {
    let args = indexer::arguments::Arguments::parse();
    observe::tracing::initialize(
        "warn,indexer=debug,database=debug,node_client=debug",
        tracing::Level::ERROR.into(),
    );
    tracing::info!("running indexer with validated arguments:\n{}", args);
    indexer::main(args).await;
}
