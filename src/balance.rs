//! USDC balance queries and formatting
//!
//! Adapters report balances as raw integer strings at 6 decimal places.
//! Query failures degrade to "0" with a warning rather than failing the
//! caller.

use eyre::{eyre, Result};
use std::sync::Arc;

use crate::engine::ChainAdapter;

/// Fetch the USDC balance for a chain via its resolved adapter.
///
/// Returns the balance as a decimal string ("12.5"). A missing adapter,
/// missing address, or query failure yields "0".
pub async fn fetch_balance(adapter: Option<&Arc<dyn ChainAdapter>>, chain: &str) -> String {
    let Some(adapter) = adapter else {
        return "0".to_string();
    };
    let Some(address) = adapter.address() else {
        return "0".to_string();
    };

    match adapter.usdc_balance(chain, &address).await {
        Ok(raw) => match format_units(&raw) {
            Ok(formatted) => formatted,
            Err(e) => {
                tracing::warn!(%chain, error = %e, "Unparseable balance from adapter");
                "0".to_string()
            }
        },
        Err(e) => {
            tracing::warn!(%chain, error = %e, "Balance query failed");
            "0".to_string()
        }
    }
}

/// Convert a raw 6-decimal integer string into a decimal string.
pub fn format_units(raw: &str) -> Result<String> {
    let value: u128 = raw
        .trim()
        .parse()
        .map_err(|_| eyre!("not an integer balance: {:?}", raw))?;
    let whole = value / 1_000_000;
    let frac = value % 1_000_000;
    if frac == 0 {
        return Ok(whole.to_string());
    }
    let frac = format!("{:06}", frac);
    Ok(format!("{}.{}", whole, frac.trim_end_matches('0')))
}

/// Render a balance for display, grouping to at most 2 fractional digits.
pub fn format_balance(balance: &str) -> String {
    match balance.parse::<f64>() {
        Ok(v) => format!("{:.2}", v),
        Err(_) => "0.00".to_string(),
    }
}
