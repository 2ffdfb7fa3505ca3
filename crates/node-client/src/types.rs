//! Wire types for the subset of the node's verbose block JSON the indexer
//! consumes. Unknown fields are ignored on purpose; the node emits far more
//! than we need.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Base currency units per whole coin. Bid prices are stored in base units;
/// the node reports output values in fractional coins.
pub const BASE_UNITS_PER_COIN: f64 = 1_000_000.0;

/// The canonical conversion from a node-reported coin amount to integer base
/// units. Rounds to the nearest unit: the JSON amount is an IEEE double, and
/// truncation would turn e.g. 12.345678 coins (which parses as
/// 12345677.999...) into a value that no longer equals the committed price.
/// Everything comparing payment values to bid prices must go through this.
pub fn coins_to_base_units(coins: f64) -> i64 {
    (coins * BASE_UNITS_PER_COIN).round() as i64
}

/// A transaction hash. Parsed from the node's hex encoding; the all-zero
/// hash is the null outpoint sentinel used by coinbase inputs.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub const NULL: TxHash = TxHash([0; 32]);

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TxHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(bytes))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Block {
    pub height: u64,
    pub tx: Vec<Transaction>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Transaction {
    pub txid: TxHash,
    pub vin: Vec<TxInput>,
    pub vout: Vec<TxOutput>,
}

/// A transaction input referencing the output it spends.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct TxInput {
    /// Hash of the transaction holding the spent output. The null hash for
    /// coinbase inputs.
    pub txid: TxHash,
    /// Index of the spent output within that transaction.
    pub vout: u32,
}

impl TxInput {
    pub fn is_coinbase(&self) -> bool {
        self.txid.is_null()
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct TxOutput {
    /// Payment value in fractional coins as reported by the node.
    pub value: f64,
}

impl TxOutput {
    pub fn value_in_base_units(&self) -> i64 {
        coins_to_base_units(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbose_block_json() {
        // Trimmed from real `getblockbyheight <height> true true` output.
        let json = r#"{
            "hash": "0000000000000287ae9a194c165b83ecb686ce48a7b0cca43ec6e56b7b0a2d6a",
            "height": 56230,
            "tx": [
                {
                    "txid": "3e4f3e6d29c1b1e6a0ad4ff8a45d964ce1ebe3ed97d2ef3f85dbd04c15b1f85b",
                    "vin": [
                        {
                            "coinbase": true,
                            "txid": "0000000000000000000000000000000000000000000000000000000000000000",
                            "vout": 4294967295
                        }
                    ],
                    "vout": [
                        {"value": 2000.0, "n": 0}
                    ]
                },
                {
                    "txid": "8c2f6b1f38f95e8a0fca3a9b0ec1a2c9a8740e38fa49e83ad21f6a88a41f2f07",
                    "vin": [
                        {
                            "coinbase": false,
                            "txid": "e56b8c6a3e1ab52e4e2a3ff90be7bb47dd62e1d3a23f6f4b9c2bb4e26b4050b3",
                            "vout": 1
                        }
                    ],
                    "vout": [
                        {"value": 5.0, "n": 0},
                        {"value": 0.5, "n": 1}
                    ]
                }
            ]
        }"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.height, 56230);
        assert_eq!(block.tx.len(), 2);
        assert!(block.tx[0].vin[0].is_coinbase());
        assert!(!block.tx[1].vin[0].is_coinbase());
        assert_eq!(block.tx[1].vin[0].vout, 1);
        assert_eq!(block.tx[1].vout[0].value_in_base_units(), 5_000_000);
        assert_eq!(block.tx[1].vout[1].value_in_base_units(), 500_000);
    }

    #[test]
    fn null_hash_round_trip() {
        let null: TxHash = "0".repeat(64).parse().unwrap();
        assert!(null.is_null());
        assert_eq!(null, TxHash::NULL);

        let hash: TxHash = "e56b8c6a3e1ab52e4e2a3ff90be7bb47dd62e1d3a23f6f4b9c2bb4e26b4050b3"
            .parse()
            .unwrap();
        assert!(!hash.is_null());
        assert_eq!(
            hash.to_hex(),
            "e56b8c6a3e1ab52e4e2a3ff90be7bb47dd62e1d3a23f6f4b9c2bb4e26b4050b3"
        );

        assert!("abcd".parse::<TxHash>().is_err());
        assert!("zz".repeat(32).parse::<TxHash>().is_err());
    }

    #[test]
    fn base_unit_conversion_is_exact_for_price_grids() {
        assert_eq!(coins_to_base_units(0.0), 0);
        assert_eq!(coins_to_base_units(0.1), 100_000);
        assert_eq!(coins_to_base_units(5.0), 5_000_000);
        // 12.345678 * 1e6 is 12345677.999... as a double; rounding keeps the
        // economically equal amount equal.
        assert_eq!(coins_to_base_units(12.345678), 12_345_678);
        assert_eq!(coins_to_base_units(2000.0), 2_000_000_000);
    }
}
