use clap::Parser;
use std::time::Duration;
use url::Url;

/// Height below which no auction locking output can exist on the production
/// network. Purely an optimization for fresh deployments; resuming from a
/// committed watermark above it takes precedence.
const MAINNET_START_HEIGHT: u64 = 56_000;

#[derive(Parser)]
pub struct Arguments {
    /// Url of the Postgres database. By default connects to locally running
    /// postgres.
    #[clap(long, env, default_value = "postgresql://")]
    pub db_url: Url,

    /// The full node's JSON-RPC endpoint.
    #[clap(long, env, default_value = "http://localhost:12037")]
    pub node_url: Url,

    /// API key for the full node, sent via basic auth.
    #[clap(long, env)]
    pub node_api_key: Option<String>,

    /// Timeout for node RPC calls. A slow node fails the current run instead
    /// of hanging the loop.
    #[clap(long, env, default_value = "30s", value_parser = humantime::parse_duration)]
    pub node_timeout: Duration,

    /// Name of the network the node is on.
    #[clap(long, env, default_value = "regtest")]
    pub network: String,

    /// Number of most recent blocks that are never indexed, as a guard
    /// against shallow reorgs.
    #[clap(long, env, default_value = "1")]
    pub confirmation_depth: u64,

    /// Do not index blocks below this height. Defaults to the first block
    /// that can contain auctions on the production network, 0 elsewhere.
    #[clap(long, env)]
    pub start_height: Option<u64>,

    /// How long to sleep between indexing runs.
    #[clap(long, env, default_value = "30s", value_parser = humantime::parse_duration)]
    pub loop_interval: Duration,

    /// Run a single indexing pass and exit instead of looping. Useful when
    /// scheduled externally.
    #[clap(long, env)]
    pub run_once: bool,
}

impl Arguments {
    pub fn start_height(&self) -> u64 {
        match self.start_height {
            Some(height) => height,
            None if self.network == "main" => MAINNET_START_HEIGHT,
            None => 0,
        }
    }
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "db_url: SECRET")?;
        writeln!(f, "node_url: {}", self.node_url)?;
        writeln!(f, "node_api_key: SECRET")?;
        writeln!(f, "node_timeout: {:?}", self.node_timeout)?;
        writeln!(f, "network: {}", self.network)?;
        writeln!(f, "confirmation_depth: {}", self.confirmation_depth)?;
        writeln!(f, "start_height: {}", self.start_height())?;
        writeln!(f, "loop_interval: {:?}", self.loop_interval)?;
        writeln!(f, "run_once: {}", self.run_once)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_floor_applies_only_without_explicit_start() {
        let args = Arguments::parse_from(["indexer", "--network", "main"]);
        assert_eq!(args.start_height(), MAINNET_START_HEIGHT);

        let args = Arguments::parse_from(["indexer", "--network", "main", "--start-height", "7"]);
        assert_eq!(args.start_height(), 7);

        let args = Arguments::parse_from(["indexer"]);
        assert_eq!(args.start_height(), 0);
    }
}
