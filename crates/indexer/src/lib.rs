pub mod arguments;
pub mod engine;
pub mod store;

use engine::{Config, Indexer};
use node_client::HttpNodeClient;
use sqlx::PgPool;

pub async fn main(args: arguments::Arguments) {
    let pg_pool =
        PgPool::connect_lazy(args.db_url.as_str()).expect("failed to create database pool");
    let client = reqwest::ClientBuilder::new()
        .timeout(args.node_timeout)
        .build()
        .expect("failed to create http client");
    let node = HttpNodeClient::new(client, args.node_url.clone(), args.node_api_key.clone());
    let config = Config {
        confirmation_depth: args.confirmation_depth,
        start_height: args.start_height(),
    };
    let indexer = Indexer::new(node, store::Postgres::new(pg_pool), config);

    loop {
        match indexer.index_chain().await {
            Ok(()) => tracing::info!("chain indexed up to confirmation depth"),
            Err(err) => tracing::error!(?err, "indexing aborted, resuming next run"),
        }
        if args.run_once {
            break;
        }
        tokio::time::sleep(args.loop_interval).await;
    }
}
