// src/utils.rs
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Format large numbers in a human-readable way
pub fn format_number(num: f64) -> String {
    if num >= 1_000_000_000.0 {
        format!("{:.2}B", num / 1_000_000_000.0)
    } else if num >= 1_000_000.0 {
        format!("{:.2}M", num / 1_000_000.0)
    } else if num >= 1_000.0 {
        format!("{:.2}K", num / 1_000.0)
    } else {
        format!("{:.2}", num)
    }
}

/// Dollar amount in K/M/B notation, "N/A" when unknown.
pub fn format_usd(amount: Option<Decimal>) -> String {
    match amount.and_then(|d| d.to_f64()) {
        Some(n) => format!("${}", format_number(n)),
        None => "N/A".to_string(),
    }
}

/// Format a price with appropriate decimal places
pub fn format_price(price: Decimal) -> String {
    let price_f64 = price.to_f64().unwrap_or(0.0);

    if price_f64 >= 1.0 {
        format!("${:.4}", price_f64)
    } else if price_f64 >= 0.01 {
        format!("${:.6}", price_f64)
    } else {
        format!("${:.8}", price_f64)
    }
}

/// "+12.50%" / "-3.10%"
pub fn format_change(change: Decimal) -> String {
    let sign = if change.is_sign_negative() { "" } else { "+" };
    format!("{}{:.2}%", sign, change)
}

/// Validate Solana address format
pub fn is_valid_solana_address(address: &str) -> bool {
    // Basic validation - Solana addresses are base58 encoded and 32-44 characters
    address.len() >= 32 && address.len() <= 44 && address.chars().all(|c| {
        c.is_ascii_alphanumeric() && !"0OIl".contains(c)
    })
}
