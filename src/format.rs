//! Display helpers for money and quantities.

pub const CURRENCY_SYMBOL: &str = "₹";

/// `₹1,234.50`; negatives render as `-₹1,234.50`.
pub fn format_currency(amount: f64) -> String {
    let grouped = group_thousands(amount.abs(), 2);
    if amount < 0.0 && grouped.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        format!("-{CURRENCY_SYMBOL}{grouped}")
    } else {
        format!("{CURRENCY_SYMBOL}{grouped}")
    }
}

/// Formats a non-negative number with `,` every three integer digits.
pub fn group_thousands(num: f64, decimals: usize) -> String {
    let formatted = format!("{num:.decimals$}");
    let (integer, fraction) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match fraction {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

/// Whole quantities print without a fractional part (`2`, `2.5`).
pub fn format_quantity(quantity: f64) -> String {
    format!("{quantity}")
}
