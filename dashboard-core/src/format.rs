//! Presentation formatting for prices and changes

use serde::{Deserialize, Serialize};

use crate::asset::AssetType;

/// Color class of a change value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTone {
    Positive,
    Negative,
}

impl ChangeTone {
    /// Positive only for strictly positive changes
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            ChangeTone::Positive
        } else {
            ChangeTone::Negative
        }
    }

    /// Stocks count an unchanged price as positive; cryptos do not
    pub fn for_asset(asset_type: AssetType, change: f64) -> Self {
        match asset_type {
            AssetType::Stock if change >= 0.0 => ChangeTone::Positive,
            AssetType::Stock => ChangeTone::Negative,
            AssetType::Crypto => Self::from_change(change),
        }
    }
}

/// Format a USD amount with thousands separators and two decimals ("$50,000.00")
pub fn format_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return "N/A".to_string();
    }

    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };

    format!("{}${}.{}", sign, group_thousands(int_part), frac_part)
}

/// Format a percent change with an explicit plus sign ("+2.50%")
pub fn format_percent_change(percent: f64) -> String {
    if !percent.is_finite() {
        return "N/A".to_string();
    }

    if percent > 0.0 {
        format!("+{:.2}%", percent)
    } else {
        format!("{:.2}%", percent)
    }
}

/// Percent change signed the way `ChangeTone::for_asset` colors it
/// (a flat stock is "+0.00%", a flat crypto "0.00%")
pub fn format_asset_change(asset_type: AssetType, percent: f64) -> String {
    match asset_type {
        AssetType::Stock if percent.is_finite() && percent >= 0.0 => format!("+{:.2}%", percent.abs()),
        _ => format_percent_change(percent),
    }
}

/// Compact USD notation for large figures ("$1.23B")
pub fn format_compact_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return "N/A".to_string();
    }

    let abs = amount.abs();
    let sign = if amount < 0.0 { "-" } else { "" };
    let (value, suffix) = if abs >= 1e12 {
        (abs / 1e12, "T")
    } else if abs >= 1e9 {
        (abs / 1e9, "B")
    } else if abs >= 1e6 {
        (abs / 1e6, "M")
    } else if abs >= 1e3 {
        (abs / 1e3, "K")
    } else {
        return format_usd(amount);
    };

    format!("{}${:.2}{}", sign, value, suffix)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
