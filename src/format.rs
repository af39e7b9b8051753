//! Formatting amounts for display.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};

/// Format `number` as dollars with two decimal places, e.g. `$1,234.50` or `-$3.00`.
pub fn format_currency(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();
    static NEGATIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    let (prefix, formatter) = if number < 0.0 {
        ("-$", NEGATIVE_FMT.get_or_init(|| currency_formatter("-$")))
    } else if number > 0.0 {
        ("$", POSITIVE_FMT.get_or_init(|| currency_formatter("$")))
    } else {
        // numfmt renders zero as "0"
        return "$0.00".to_owned();
    };

    match formatter {
        Some(formatter) => pad_cents(formatter.fmt_string(number.abs())),
        None => format!("{prefix}{:.2}", number.abs()),
    }
}

fn currency_formatter(prefix: &str) -> Option<Formatter> {
    Formatter::currency(prefix)
        .inspect_err(|error| tracing::warn!("Could not create currency formatter: {error:?}"))
        .ok()
        .map(|formatter| formatter.precision(Precision::Decimals(2)))
}

/// numfmt drops trailing zeros, e.g. "12.30" is rendered as "12.3".
fn pad_cents(mut formatted: String) -> String {
    let decimals = formatted
        .rfind('.')
        .map(|point| formatted.len() - point - 1);

    match decimals {
        Some(0) => formatted.push_str("00"),
        Some(1) => formatted.push('0'),
        Some(_) => {}
        None => formatted.push_str(".00"),
    }

    formatted
}
