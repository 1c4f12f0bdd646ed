use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use super::lenient::{decimal_from_value, parse_date, parse_decimal};

/// Shown wherever a date is missing or unreadable
pub const NOT_AVAILABLE: &str = "N/A";

/// Anything that may hold a monetary amount.
pub trait Amount {
    fn to_amount(&self) -> Option<Decimal>;
}

impl Amount for Decimal {
    fn to_amount(&self) -> Option<Decimal> {
        Some(*self)
    }
}

impl Amount for f64 {
    fn to_amount(&self) -> Option<Decimal> {
        if self.is_finite() {
            Decimal::from_f64(*self)
        } else {
            None
        }
    }
}

impl Amount for str {
    fn to_amount(&self) -> Option<Decimal> {
        parse_decimal(self)
    }
}

impl Amount for String {
    fn to_amount(&self) -> Option<Decimal> {
        parse_decimal(self)
    }
}

impl Amount for Value {
    fn to_amount(&self) -> Option<Decimal> {
        decimal_from_value(self)
    }
}

impl<T: Amount> Amount for Option<T> {
    fn to_amount(&self) -> Option<Decimal> {
        self.as_ref().and_then(Amount::to_amount)
    }
}

impl<T: Amount + ?Sized> Amount for &T {
    fn to_amount(&self) -> Option<Decimal> {
        (**self).to_amount()
    }
}

/// Format as AUD with two decimals (`$1,234.50`). Unreadable input is `$0.00`.
pub fn format_amount<A: Amount>(value: A) -> String {
    format_money(value.to_amount().unwrap_or(Decimal::ZERO))
}

fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let sign = if negative { "-" } else { "" };
    format!("{}${}.{}", sign, group_thousands(whole), frac)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

/// Short Australian date form, e.g. `5 Mar 2024`
pub fn format_date(value: Option<NaiveDate>) -> String {
    match value {
        Some(date) => date.format("%-d %b %Y").to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_date_str(value: Option<&str>) -> String {
    format_date(value.and_then(parse_date))
}
