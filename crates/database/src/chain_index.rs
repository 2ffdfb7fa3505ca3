use crate::{
    auctions::AuctionId,
    bids::BidId,
    PgTransaction,
};
use sqlx::PgConnection;

/// Terminal classification of an auction's locking outpoint once spent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpendingStatus {
    /// The locking outpoint was spent without paying any committed bid price.
    Cancelled,
    /// The locking outpoint was spent for a payment matching a committed bid.
    Completed,
}

impl SpendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }
}

/// One auction outcome discovered while scanning a block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockOutcome {
    pub auction_id: AuctionId,
    /// Hex encoded hash of the transaction spending the locking outpoint.
    pub spending_tx_hash: String,
    pub status: SpendingStatus,
    /// Set iff `status` is `Completed`.
    pub completed_bid_id: Option<BidId>,
}

/// The height of the last block whose outcomes were durably committed.
pub async fn indexed_height(ex: &mut PgConnection) -> Result<i64, sqlx::Error> {
    const QUERY: &str = "SELECT indexed_height FROM chain_index_state;";
    let (height,): (i64,) = sqlx::query_as(QUERY).fetch_one(ex).await?;
    Ok(height)
}

/// Creates the singleton watermark row at height 0. The schema seeds this row
/// too; this exists for tests that truncate tables.
pub async fn initialize(ex: &mut PgConnection) -> Result<(), sqlx::Error> {
    const QUERY: &str = "INSERT INTO chain_index_state (indexed_height) VALUES (0);";
    sqlx::query(QUERY).execute(ex).await?;
    Ok(())
}

/// Records every outcome discovered in one block and advances the watermark
/// to that block's height. Runs inside the caller's transaction so either all
/// of it becomes durable or none of it does; a crash can never leave outcomes
/// without the matching watermark advance or vice versa.
///
/// Outcomes only ever transition an undecided auction to a terminal status.
/// Reapplying the same block after a crash before the commit went through is
/// therefore harmless.
pub async fn apply_block_outcomes(
    ex: &mut PgTransaction<'_>,
    height: i64,
    outcomes: &[BlockOutcome],
) -> Result<(), sqlx::Error> {
    const OUTCOME_QUERY: &str = r#"
UPDATE auctions
SET spending_tx_hash = $2,
    spending_status = $3,
    completed_bid_id = $4,
    updated_at = NOW()
WHERE id = $1 AND spending_status IS NULL;
    "#;
    for outcome in outcomes {
        sqlx::query(OUTCOME_QUERY)
            .bind(outcome.auction_id)
            .bind(&outcome.spending_tx_hash)
            .bind(outcome.status.as_str())
            .bind(outcome.completed_bid_id)
            .execute(&mut **ex)
            .await?;
    }

    // The watermark is monotonic. Refusing to move it backwards turns a
    // misbehaving caller into an error instead of silent corruption.
    const WATERMARK_QUERY: &str = r#"
UPDATE chain_index_state
SET indexed_height = $1,
    indexed_at = NOW()
WHERE indexed_height <= $1;
    "#;
    let updated = sqlx::query(WATERMARK_QUERY)
        .bind(height)
        .execute(&mut **ex)
        .await?;
    if updated.rows_affected() != 1 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}
