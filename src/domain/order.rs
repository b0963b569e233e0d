//! Sell orders read from producer blocks, and the fixed-point price type.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Number of fractional bits in a [`Price`].
pub const PRICE_RADIX: u32 = 24;

/// Ratios below this are logged as anomalous; they are still used.
pub const ANOMALOUS_RATIO_THRESHOLD: f64 = 0.00001;

pub type AssetId = u32;

/// Fixed-point price with scale 2^24.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub u64);

impl Price {
    pub fn from_f64(value: f64) -> Self {
        Price((value * (1u64 << PRICE_RADIX) as f64).round() as u64)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / (1u64 << PRICE_RADIX) as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub sell_asset: AssetId,
    pub buy_asset: AssetId,
    pub min_price: Price,
    pub amount: u64,
}

impl Order {
    /// Minimum acceptable price as a real number.
    pub fn ratio(&self) -> f64 {
        self.min_price.to_f64()
    }

    pub fn is_anomalous(&self) -> bool {
        self.ratio() < ANOMALOUS_RATIO_THRESHOLD
    }
}

/// Logs every order whose price ratio is suspiciously close to zero.
/// Returns how many were found.
pub fn flag_anomalous_orders(orders: &[Order]) -> usize {
    let mut count = 0;
    for (index, order) in orders.iter().enumerate() {
        if order.is_anomalous() {
            warn!(
                index,
                ratio = order.ratio(),
                "near-zero minimum price ratio"
            );
            count += 1;
        }
    }
    count
}

/// Total offered sell amount per asset, widened so a block of `u64`
/// amounts cannot overflow.
pub fn sell_volumes(orders: &[Order], num_assets: usize) -> Vec<u128> {
    let mut volumes = vec![0u128; num_assets];
    for order in orders {
        if let Some(slot) = volumes.get_mut(order.sell_asset as usize) {
            *slot += u128::from(order.amount);
        } else {
            warn!(
                asset = order.sell_asset,
                num_assets, "order sells an asset outside the index, ignored"
            );
        }
    }
    volumes
}
