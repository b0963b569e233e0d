//! Convex market-clearing program built from a block of sell orders.
//!
//! Variables: per-asset price `p` (n), executed sell volume `y` (m) and
//! executed buy value `beta` (m). Constraints:
//!
//! ```text
//! y >= 0, beta >= 0, p >= 1
//! y_i            <= endowment_i * p[sell_i]
//! ratio_i*beta_i <= p[buy_i]
//! beta_i         <= p[sell_i]
//! for each asset a: sum(y_i : buy_i = a) == sum(y_i : sell_i = a)
//! ```
//!
//! Objective:
//! `sum endowment_i * KL(p[sell_i], beta_i) - sum y_i * ln(ratio_i)`
//! with `KL(x, y) = x ln(x / y) + y - x`.

use crate::domain::error::ClearbenchError;
use crate::domain::order::{flag_anomalous_orders, Order};
use serde::{Deserialize, Serialize};

/// Row-major `rows x cols` matrix.
pub type Matrix = Vec<Vec<f64>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingProblem {
    pub num_assets: usize,
    pub sell_asset: Vec<usize>,
    pub buy_asset: Vec<usize>,
    pub ratios: Vec<f64>,
    pub endowments: Vec<f64>,
}

/// A candidate solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub prices: Vec<f64>,
    pub sell_volumes: Vec<f64>,
    pub buy_values: Vec<f64>,
}

/// First constraint a candidate breaks.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    Shape,
    PriceFloor { asset: usize },
    NegativeVolume { order: usize },
    Endowment { order: usize },
    Budget { order: usize },
    SellValue { order: usize },
    Clearing { asset: usize },
}

/// Generalized KL divergence term.
pub fn kl(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        return y;
    }
    x * (x / y).ln() + y - x
}

impl ClearingProblem {
    /// Builds the program from the first `orders.len()` orders of a block.
    pub fn from_orders(num_assets: usize, orders: &[Order]) -> Result<Self, ClearbenchError> {
        let mut problem = ClearingProblem {
            num_assets,
            sell_asset: Vec::with_capacity(orders.len()),
            buy_asset: Vec::with_capacity(orders.len()),
            ratios: Vec::with_capacity(orders.len()),
            endowments: Vec::with_capacity(orders.len()),
        };

        for (index, order) in orders.iter().enumerate() {
            let sell = order.sell_asset as usize;
            let buy = order.buy_asset as usize;
            if sell >= num_assets || buy >= num_assets {
                return Err(ClearbenchError::InvalidOrder {
                    index,
                    reason: format!(
                        "asset pair ({}, {}) outside {} assets",
                        sell, buy, num_assets
                    ),
                });
            }
            problem.sell_asset.push(sell);
            problem.buy_asset.push(buy);
            problem.ratios.push(order.ratio());
            problem.endowments.push(order.amount as f64);
        }

        flag_anomalous_orders(orders);
        Ok(problem)
    }

    pub fn num_orders(&self) -> usize {
        self.sell_asset.len()
    }

    fn selector(&self, assets: &[usize], weights: Option<&[f64]>) -> Matrix {
        assets
            .iter()
            .enumerate()
            .map(|(i, &asset)| {
                let mut row = vec![0.0; self.num_assets];
                row[asset] = weights.map_or(1.0, |w| w[i]);
                row
            })
            .collect()
    }

    /// Row `i` has a one in the column of the asset order `i` sells.
    pub fn sell_selector(&self) -> Matrix {
        self.selector(&self.sell_asset, None)
    }

    pub fn buy_selector(&self) -> Matrix {
        self.selector(&self.buy_asset, None)
    }

    /// Sell selector scaled by each order's endowment.
    pub fn endowment_selector(&self) -> Matrix {
        self.selector(&self.sell_asset, Some(&self.endowments))
    }

    pub fn objective(&self, alloc: &Allocation) -> f64 {
        let divergence: f64 = (0..self.num_orders())
            .map(|i| {
                self.endowments[i] * kl(alloc.prices[self.sell_asset[i]], alloc.buy_values[i])
            })
            .sum();
        let gain: f64 = (0..self.num_orders())
            .map(|i| alloc.sell_volumes[i] * self.ratios[i].ln())
            .sum();
        divergence - gain
    }

    /// Checks every constraint within `tol`.
    pub fn check(&self, alloc: &Allocation, tol: f64) -> Result<(), Violation> {
        let m = self.num_orders();
        if alloc.prices.len() != self.num_assets
            || alloc.sell_volumes.len() != m
            || alloc.buy_values.len() != m
        {
            return Err(Violation::Shape);
        }

        if let Some(asset) = alloc.prices.iter().position(|&p| p < 1.0 - tol) {
            return Err(Violation::PriceFloor { asset });
        }

        for i in 0..m {
            let y = alloc.sell_volumes[i];
            let beta = alloc.buy_values[i];
            let p_sell = alloc.prices[self.sell_asset[i]];
            let p_buy = alloc.prices[self.buy_asset[i]];

            if y < -tol || beta < -tol {
                return Err(Violation::NegativeVolume { order: i });
            }
            if y > self.endowments[i] * p_sell + tol {
                return Err(Violation::Endowment { order: i });
            }
            if self.ratios[i] * beta > p_buy + tol {
                return Err(Violation::Budget { order: i });
            }
            if beta > p_sell + tol {
                return Err(Violation::SellValue { order: i });
            }
        }

        let mut bought = vec![0.0; self.num_assets];
        let mut sold = vec![0.0; self.num_assets];
        for i in 0..m {
            bought[self.buy_asset[i]] += alloc.sell_volumes[i];
            sold[self.sell_asset[i]] += alloc.sell_volumes[i];
        }
        if let Some(asset) = (0..self.num_assets).find(|&a| (bought[a] - sold[a]).abs() > tol) {
            return Err(Violation::Clearing { asset });
        }

        Ok(())
    }
}
