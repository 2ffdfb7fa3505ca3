use crate::auctions::AuctionId;
use sqlx::PgConnection;

pub type BidId = i64;

/// Looks up the bid of the given auction whose committed price equals the
/// given value exactly. Prices are compared in base currency units; the
/// caller is responsible for converting payment outputs with the same
/// canonical conversion that was used when the bids were stored.
pub async fn find_by_auction_and_price(
    ex: &mut PgConnection,
    auction_id: AuctionId,
    price: i64,
) -> Result<Option<BidId>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT id
FROM bids
WHERE auction_id = $1 AND price = $2;
    "#;
    let id: Option<(BidId,)> = sqlx::query_as(QUERY)
        .bind(auction_id)
        .bind(price)
        .fetch_optional(ex)
        .await?;
    Ok(id.map(|(id,)| id))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::auctions::{self, Auction, Bid},
        chrono::Utc,
        sqlx::Connection,
    };

    #[tokio::test]
    #[ignore]
    async fn postgres_price_lookup() {
        let mut db = PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();

        let auction = Auction {
            locking_tx_hash: "12".repeat(32),
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
        let auction_id = auctions::insert(&mut db, &auction, &bids).await.unwrap();

        let bid = find_by_auction_and_price(&mut db, auction_id, 5_000_000)
            .await
            .unwrap();
        assert!(bid.is_some());

        // No bid committed to this price.
        let no_bid = find_by_auction_and_price(&mut db, auction_id, 4_500_000)
            .await
            .unwrap();
        assert_eq!(no_bid, None);

        // Same price on a different auction does not match.
        let no_bid = find_by_auction_and_price(&mut db, auction_id + 1, 5_000_000)
            .await
            .unwrap();
        assert_eq!(no_bid, None);
    }
}
