//! Gas figures as shown to the user: the raw network estimate and the
//! buffered values that are actually submitted.

use serde::{Deserialize, Serialize};
use wallet_core::clamp_gas_buffer;

const WEI_PER_GWEI: f64 = 1e9;
const WEI_PER_ETHER: f64 = 1e18;

/// Gas limit with the fixed 10% safety margin applied.
pub fn buffered_gas_limit(gas_limit: u64) -> u64 {
    gas_limit.saturating_mul(11) / 10
}

/// Gas price (wei) scaled by the clamped buffer multiplier.
pub fn buffered_gas_price(gas_price_wei: u128, multiplier: f64) -> u128 {
    (gas_price_wei as f64 * clamp_gas_buffer(multiplier)).round() as u128
}

fn fee_in_native(gas_limit: u64, gas_price_wei: u128) -> f64 {
    (gas_limit as u128).saturating_mul(gas_price_wei) as f64 / WEI_PER_ETHER
}

/// The figures after buffering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferedGas {
    pub gas_limit: u64,
    pub gas_price_wei: u128,
    /// Gwei.
    pub gas_price: f64,
    /// Native currency units.
    pub estimated_fee: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub gas_limit: u64,
    pub gas_price_wei: u128,
    /// Gwei.
    pub gas_price: f64,
    /// Native currency units.
    pub estimated_fee: f64,
    pub actual: BufferedGas,
}

impl GasEstimate {
    pub fn new(gas_limit: u64, gas_price_wei: u128, multiplier: f64) -> Self {
        let multiplier = clamp_gas_buffer(multiplier);
        let actual_limit = buffered_gas_limit(gas_limit);
        let actual_price = buffered_gas_price(gas_price_wei, multiplier);
        Self {
            gas_limit,
            gas_price_wei,
            gas_price: gas_price_wei as f64 / WEI_PER_GWEI,
            estimated_fee: fee_in_native(gas_limit, gas_price_wei),
            actual: BufferedGas {
                gas_limit: actual_limit,
                gas_price_wei: actual_price,
                gas_price: actual_price as f64 / WEI_PER_GWEI,
                estimated_fee: fee_in_native(actual_limit, actual_price),
                multiplier,
            },
        }
    }
}
