use crate::PgTransaction;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

pub type AuctionId = i64;

/// An auction as submitted by a seller. The locking outpoint identifies the
/// coin that must be spent to settle or cancel the auction and is unique
/// across all auctions.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Auction {
    pub name: String,
    pub public_key: String,
    pub payment_addr: String,
    /// Hex encoded transaction hash of the locking output.
    pub locking_tx_hash: String,
    pub locking_output_idx: i32,
}

/// A single entry of an auction's descending price schedule. The set of bids
/// is fixed at auction creation time and never mutated afterwards.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Bid {
    /// Price in base currency units.
    pub price: i64,
    /// Opaque presign, verified by the submission flow.
    pub signature: String,
    pub lock_time: DateTime<Utc>,
}

#[derive(Clone, Debug, Eq, PartialEq, sqlx::FromRow)]
pub struct AuctionRow {
    pub id: AuctionId,
    pub name: String,
    pub public_key: String,
    pub payment_addr: String,
    pub locking_tx_hash: String,
    pub locking_output_idx: i32,
    pub spending_tx_hash: Option<String>,
    pub spending_status: Option<String>,
    pub completed_bid_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inserts an auction together with its full bid schedule. Uses a transaction
/// so that an auction can never be observed without its bids.
pub async fn insert(
    ex: &mut PgTransaction<'_>,
    auction: &Auction,
    bids: &[Bid],
) -> Result<AuctionId, sqlx::Error> {
    const QUERY: &str = r#"
INSERT INTO auctions (
    name,
    public_key,
    payment_addr,
    locking_tx_hash,
    locking_output_idx,
    created_at,
    updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $6)
RETURNING id;
    "#;
    let now = Utc::now();
    let (id,): (AuctionId,) = sqlx::query_as(QUERY)
        .bind(&auction.name)
        .bind(&auction.public_key)
        .bind(&auction.payment_addr)
        .bind(&auction.locking_tx_hash)
        .bind(auction.locking_output_idx)
        .bind(now)
        .fetch_one(&mut **ex)
        .await?;

    const BID_QUERY: &str = r#"
INSERT INTO bids (auction_id, price, signature, lock_time)
VALUES ($1, $2, $3, $4);
    "#;
    for bid in bids {
        sqlx::query(BID_QUERY)
            .bind(id)
            .bind(bid.price)
            .bind(&bid.signature)
            .bind(bid.lock_time)
            .execute(&mut **ex)
            .await?;
    }

    Ok(id)
}

/// Used by the submission flow to enforce locking outpoint uniqueness before
/// attempting an insert. The unique index is the actual guarantee.
pub async fn exists_by_outpoint(
    ex: &mut PgConnection,
    locking_tx_hash: &str,
    locking_output_idx: i32,
) -> Result<bool, sqlx::Error> {
    const QUERY: &str = r#"
SELECT COUNT(*) > 0
FROM auctions
WHERE locking_tx_hash = $1 AND locking_output_idx = $2;
    "#;
    let (exists,): (bool,) = sqlx::query_as(QUERY)
        .bind(locking_tx_hash)
        .bind(locking_output_idx)
        .fetch_one(ex)
        .await?;
    Ok(exists)
}

/// Looks up the auction whose locking outpoint matches and whose outcome has
/// not been decided yet. Auctions with a recorded outcome are terminal and
/// never match again.
pub async fn find_active_by_outpoint(
    ex: &mut PgConnection,
    locking_tx_hash: &str,
    locking_output_idx: i32,
) -> Result<Option<AuctionId>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT id
FROM auctions
WHERE locking_tx_hash = $1
  AND locking_output_idx = $2
  AND spending_status IS NULL;
    "#;
    let id: Option<(AuctionId,)> = sqlx::query_as(QUERY)
        .bind(locking_tx_hash)
        .bind(locking_output_idx)
        .fetch_optional(ex)
        .await?;
    Ok(id.map(|(id,)| id))
}

pub async fn load(
    ex: &mut PgConnection,
    id: AuctionId,
) -> Result<Option<AuctionRow>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT
    id,
    name,
    public_key,
    payment_addr,
    locking_tx_hash,
    locking_output_idx,
    spending_tx_hash,
    spending_status,
    completed_bid_id,
    created_at,
    updated_at
FROM auctions
WHERE id = $1;
    "#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

#[cfg(test)]
mod tests {
    use {super::*, sqlx::Connection};

    #[tokio::test]
    #[ignore]
    async fn postgres_insert_roundtrip() {
        let mut db = PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();

        let auction = Auction {
            name: "examplename".to_string(),
            locking_tx_hash: "ab".repeat(32),
            locking_output_idx: 0,
            ..Default::default()
        };
        let bids = vec![
            Bid {
                price: 5_000_000,
                signature: "sig-0".to_string(),
                lock_time: Utc::now(),
            },
            Bid {
                price: 4_000_000,
                signature: "sig-1".to_string(),
                lock_time: Utc::now(),
            },
        ];
        let id = insert(&mut db, &auction, &bids).await.unwrap();

        let row = load(&mut db, id).await.unwrap().unwrap();
        assert_eq!(row.name, auction.name);
        assert_eq!(row.locking_tx_hash, auction.locking_tx_hash);
        assert_eq!(row.spending_status, None);
        assert_eq!(row.spending_tx_hash, None);
        assert_eq!(row.completed_bid_id, None);

        assert!(
            exists_by_outpoint(&mut db, &auction.locking_tx_hash, 0)
                .await
                .unwrap()
        );
        assert!(!exists_by_outpoint(&mut db, &auction.locking_tx_hash, 1)
            .await
            .unwrap());
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_outpoint_lookup_ignores_decided_auctions() {
        let mut db = PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();

        let auction = Auction {
            locking_tx_hash: "cd".repeat(32),
            locking_output_idx: 1,
            ..Default::default()
        };
        let id = insert(&mut db, &auction, &[]).await.unwrap();
        assert_eq!(
            find_active_by_outpoint(&mut db, &auction.locking_tx_hash, 1)
                .await
                .unwrap(),
            Some(id)
        );

        crate::chain_index::apply_block_outcomes(
            &mut db,
            100,
            &[crate::chain_index::BlockOutcome {
                auction_id: id,
                spending_tx_hash: "ef".repeat(32),
                status: crate::chain_index::SpendingStatus::Cancelled,
                completed_bid_id: None,
            }],
        )
        .await
        .unwrap();

        assert_eq!(
            find_active_by_outpoint(&mut db, &auction.locking_tx_hash, 1)
                .await
                .unwrap(),
            None
        );
    }
}
