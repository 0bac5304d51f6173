//! Order Types
//!
//! In-memory representation of a signed 0x order and its content-addressed key.
//!
//! The hash itself is computed by an external collaborator (see
//! [`crate::application::ports::OrderHasher`]); this module only carries it.

use std::fmt;

use ethers::types::U256;

// =============================================================================
// Order Hash
// =============================================================================

/// Content-addressed order key.
///
/// Two orders with identical fields always map to the same hash. Once obtained
/// the value is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderHash(String);

impl OrderHash {
    /// Wrap a hash string produced by the hashing collaborator.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Get the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderHash {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OrderHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// =============================================================================
// Signed Order
// =============================================================================

/// A signed 0x order.
///
/// Addresses, asset data and the signature are kept as the hex strings they
/// arrive as. Amounts, fees, salt and expiration are 256-bit integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignedOrder {
    /// Address allowed to submit the fill transaction (zero address for anyone).
    pub sender_address: String,
    /// Order creator.
    pub maker_address: String,
    /// Address allowed to fill the order (zero address for anyone).
    pub taker_address: String,
    /// Fee paid by the maker.
    pub maker_fee: U256,
    /// Fee paid by the taker.
    pub taker_fee: U256,
    /// Amount of maker asset offered.
    pub maker_asset_amount: U256,
    /// Amount of taker asset requested.
    pub taker_asset_amount: U256,
    /// ABI-encoded maker asset proxy data.
    pub maker_asset_data: String,
    /// ABI-encoded taker asset proxy data.
    pub taker_asset_data: String,
    /// Arbitrary number used to make otherwise identical orders unique.
    pub salt: U256,
    /// Exchange contract the order is valid for.
    pub exchange_address: String,
    /// Address receiving fees.
    pub fee_recipient_address: String,
    /// Unix timestamp after which the order is expired.
    pub expiration_time_seconds: U256,
    /// Maker signature over the order hash.
    pub signature: String,
}
