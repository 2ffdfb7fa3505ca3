//! The chain reconciliation engine. Walks blocks in height order, detects
//! spends of auction locking outpoints, classifies them as completed or
//! cancelled and commits each block's outcomes atomically together with the
//! watermark advance.

use crate::store::{AuctionStoring, Outcome};
use anyhow::{Context, Result};
use database::{auctions::AuctionId, bids::BidId, chain_index::SpendingStatus};
use node_client::{types::Transaction, NodeApi};

#[derive(Clone, Debug)]
pub struct Config {
    /// Number of most recent blocks that are never indexed. Blocks closer to
    /// the tip than this can still be reorged away; anything deeper is an
    /// accepted risk.
    pub confirmation_depth: u64,
    /// Clamp for the resume height. Blocks at or below this height are never
    /// indexed because no auction can exist in them.
    pub start_height: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confirmation_depth: 1,
            start_height: 0,
        }
    }
}

pub struct Indexer<N, S> {
    node: N,
    store: S,
    config: Config,
}

impl<N, S> Indexer<N, S>
where
    N: NodeApi,
    S: AuctionStoring,
{
    pub fn new(node: N, store: S, config: Config) -> Self {
        Self {
            node,
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Catches the watermark up to the chain tip minus the confirmation
    /// depth, one block at a time in ascending order. Safe to invoke
    /// repeatedly; a failed height aborts the run and the next invocation
    /// resumes from the last committed watermark.
    pub async fn index_chain(&self) -> Result<()> {
        let chain_height = self
            .node
            .current_height()
            .await
            .context("failed to get chain tip height")?;
        let indexed_height = self
            .store
            .indexed_height()
            .await?
            .max(self.config.start_height);

        let end = chain_height.saturating_sub(self.config.confirmation_depth + 1);
        for height in indexed_height + 1..=end {
            self.index_block(height)
                .await
                .with_context(|| format!("failed to index block {height}"))?;
        }
        Ok(())
    }

    /// Scans one block and commits its outcome batch plus the watermark
    /// advance as a single atomic unit.
    pub async fn index_block(&self, height: u64) -> Result<()> {
        tracing::info!(height, "indexing block");
        let block = self
            .node
            .block_by_height(height)
            .await
            .context("failed to fetch block")?;

        let mut outcomes = Vec::new();
        for tx in &block.tx {
            let Some(auction_id) = self.match_auction(tx).await? else {
                continue;
            };
            let (status, completed_bid_id) = self.classify_spend(auction_id, tx).await?;
            tracing::info!(
                height,
                auction_id,
                tx_hash = %tx.txid,
                status = status.as_str(),
                "discovered spent auction"
            );
            outcomes.push(Outcome {
                auction_id,
                spending_tx_hash: tx.txid,
                status,
                completed_bid_id,
            });
        }

        let spent_auctions = outcomes.len();
        self.store.apply_block_outcomes(height, outcomes).await?;
        tracing::info!(height, spent_auctions, "indexed block");
        Ok(())
    }

    /// The first input spending an undecided auction's locking outpoint
    /// decides which auction this transaction resolves; a transaction can
    /// resolve at most one auction even if it references several locked
    /// outpoints. Coinbase inputs reference the null outpoint and never
    /// match.
    async fn match_auction(&self, tx: &Transaction) -> Result<Option<AuctionId>> {
        for input in &tx.vin {
            if input.is_coinbase() {
                continue;
            }
            if let Some(auction_id) = self
                .store
                .find_auction_by_outpoint(&input.txid, input.vout)
                .await?
            {
                return Ok(Some(auction_id));
            }
        }
        Ok(None)
    }

    /// The first output whose payment value equals one of the auction's
    /// committed bid prices completes the auction with that bid. A spend
    /// paying no committed price is a cancellation.
    async fn classify_spend(
        &self,
        auction_id: AuctionId,
        tx: &Transaction,
    ) -> Result<(SpendingStatus, Option<BidId>)> {
        for output in &tx.vout {
            if let Some(bid_id) = self
                .store
                .find_bid_by_price(auction_id, output.value_in_base_units())
                .await?
            {
                return Ok((SpendingStatus::Completed, Some(bid_id)));
            }
        }
        Ok((SpendingStatus::Cancelled, None))
    }
}
