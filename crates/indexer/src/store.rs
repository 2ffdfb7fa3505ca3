use anyhow::{Context, Result};
use database::{
    auctions::AuctionId,
    bids::BidId,
    chain_index::{self, SpendingStatus},
};
use node_client::types::TxHash;
use sqlx::PgPool;

/// An auction outcome discovered while scanning a block, in engine terms.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub auction_id: AuctionId,
    /// Hash of the transaction that spent the auction's locking outpoint.
    pub spending_tx_hash: TxHash,
    pub status: SpendingStatus,
    /// Set iff `status` is `Completed`.
    pub completed_bid_id: Option<BidId>,
}

/// `AuctionStoring` is the engine's view of the persistence layer. Lookup
/// misses are `Ok(None)`, not errors; only actual store failures are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AuctionStoring: Send + Sync {
    /// Height of the last block whose outcomes were durably committed.
    async fn indexed_height(&self) -> Result<u64>;

    /// Id of the auction whose locking outpoint matches and whose outcome is
    /// still undecided.
    async fn find_auction_by_outpoint(
        &self,
        tx_hash: &TxHash,
        output_idx: u32,
    ) -> Result<Option<AuctionId>>;

    /// Id of the given auction's bid committed to exactly this price in base
    /// units.
    async fn find_bid_by_price(&self, auction_id: AuctionId, price: i64)
        -> Result<Option<BidId>>;

    /// Records all outcomes of one block together with the watermark advance
    /// to `height` as a single atomic unit. Implementations must guarantee
    /// that a failure leaves neither outcomes nor watermark changed.
    async fn apply_block_outcomes(&self, height: u64, outcomes: Vec<Outcome>) -> Result<()>;
}

pub struct Postgres {
    pool: PgPool,
}

impl Postgres {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuctionStoring for Postgres {
    async fn indexed_height(&self) -> Result<u64> {
        let mut ex = self.pool.acquire().await?;
        let height = chain_index::indexed_height(&mut ex)
            .await
            .context("failed to read indexed height")?;
        u64::try_from(height).context("negative indexed height")
    }

    async fn find_auction_by_outpoint(
        &self,
        tx_hash: &TxHash,
        output_idx: u32,
    ) -> Result<Option<AuctionId>> {
        // Output indices beyond i32 cannot exist in the store.
        let Ok(output_idx) = i32::try_from(output_idx) else {
            return Ok(None);
        };
        let mut ex = self.pool.acquire().await?;
        database::auctions::find_active_by_outpoint(&mut ex, &tx_hash.to_hex(), output_idx)
            .await
            .context("failed to look up auction by outpoint")
    }

    async fn find_bid_by_price(
        &self,
        auction_id: AuctionId,
        price: i64,
    ) -> Result<Option<BidId>> {
        let mut ex = self.pool.acquire().await?;
        database::bids::find_by_auction_and_price(&mut ex, auction_id, price)
            .await
            .context("failed to look up bid by price")
    }

    async fn apply_block_outcomes(&self, height: u64, outcomes: Vec<Outcome>) -> Result<()> {
        let height = i64::try_from(height).context("block height exceeds i64")?;
        let outcomes: Vec<_> = outcomes
            .into_iter()
            .map(|outcome| chain_index::BlockOutcome {
                auction_id: outcome.auction_id,
                spending_tx_hash: outcome.spending_tx_hash.to_hex(),
                status: outcome.status,
                completed_bid_id: outcome.completed_bid_id,
            })
            .collect();
        let mut transaction = self.pool.begin().await?;
        chain_index::apply_block_outcomes(&mut transaction, height, &outcomes)
            .await
            .context("failed to apply block outcomes")?;
        transaction
            .commit()
            .await
            .context("failed to commit block outcomes")
    }
}
