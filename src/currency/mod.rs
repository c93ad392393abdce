use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CampaignError;
use crate::ledger::PayoutMonth;

const CENTS_PER_UNIT: i64 = 100;
/// Largest magnitude accepted from floating point input; keeps the cents within `i64`.
const MAX_DECIMAL: f64 = 90_000_000_000_000.0;

/// Fixed-point currency amount stored as integer minor units (cents).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Converts a decimal amount, rounding half-up to two fraction digits.
    pub fn from_decimal(value: f64) -> Result<Self, CampaignError> {
        if !value.is_finite() || value.abs() > MAX_DECIMAL {
            return Err(CampaignError::InvalidAmount(value.to_string()));
        }
        // The shortest round-trip decimal of `value` rounds the way the user typed it,
        // so 1.005 stays 1.005 instead of its binary neighbour 1.00499999...
        format!("{}", value).parse()
    }

    /// Like [`Money::from_decimal`] but rejects zero and negative amounts.
    pub fn positive(value: f64) -> Result<Self, CampaignError> {
        Self::from_decimal(value)?.ensure_positive()
    }

    pub fn ensure_positive(self) -> Result<Self, CampaignError> {
        if self.cents <= 0 {
            Err(CampaignError::InvalidAmount(self.to_string()))
        } else {
            Ok(self)
        }
    }

    pub fn cents(self) -> i64 {
        self.cents
    }

    pub fn to_decimal(self) -> f64 {
        self.cents as f64 / CENTS_PER_UNIT as f64
    }

    pub fn is_positive(self) -> bool {
        self.cents > 0
    }

    pub fn is_zero(self) -> bool {
        self.cents == 0
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.cents.checked_sub(other.cents).map(Money::from_cents)
    }

    pub fn sum<I>(amounts: I) -> Money
    where
        I: IntoIterator<Item = Money>,
    {
        amounts.into_iter().fold(Money::ZERO, |acc, amount| acc + amount)
    }

    /// Divides `total` into `parts` equal shares, rounding half-up to the cent.
    ///
    /// Repeating the share `parts` times may drift from `total` by at most
    /// `parts` cents; use [`Money::split`] when the shares must add up exactly.
    pub fn divide(total: Money, parts: u32) -> Result<Money, CampaignError> {
        if parts == 0 {
            return Err(CampaignError::InvalidMemberCount(parts));
        }
        let divisor = parts as i128;
        let magnitude = (total.cents.unsigned_abs() as i128 * 2 + divisor) / (2 * divisor);
        let signed = if total.cents < 0 { -magnitude } else { magnitude };
        Ok(Money::from_cents(signed as i64))
    }

    /// Splits `total` into `parts` shares that add up to it exactly.
    ///
    /// Shares differ by at most one cent; the larger ones come first.
    pub fn split(total: Money, parts: u32) -> Result<Vec<Money>, CampaignError> {
        if parts == 0 {
            return Err(CampaignError::InvalidMemberCount(parts));
        }
        let divisor = parts as i64;
        let sign = total.cents.signum();
        let magnitude = total.cents.abs();
        let (base, remainder) = (magnitude / divisor, magnitude % divisor);
        Ok((0..divisor)
            .map(|idx| {
                let extra = if idx < remainder { 1 } else { 0 };
                Money::from_cents(sign * (base + extra))
            })
            .collect())
    }

    pub fn format(self, locale: &LocaleConfig, code: &CurrencyCode) -> String {
        format_currency_value(self, code, locale, &FormatOptions::default())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::from_cents(self.cents.saturating_add(rhs.cents))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money::sum(iter)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        Money::sum(iter.copied())
    }
}

impl TryFrom<f64> for Money {
    type Error = CampaignError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Money::from_decimal(value)
    }
}

impl From<Money> for f64 {
    fn from(value: Money) -> Self {
        value.to_decimal()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let magnitude = self.cents.unsigned_abs();
        write!(
            f,
            "{}{}.{:02}",
            sign,
            magnitude / CENTS_PER_UNIT as u64,
            magnitude % CENTS_PER_UNIT as u64
        )
    }
}

impl FromStr for Money {
    type Err = CampaignError;

    /// Parses user input such as `"1200"`, `"99.5"` or `"-3.455"` without going through `f64`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || CampaignError::InvalidAmount(raw.to_string());
        let trimmed = raw.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let digits: Vec<i64> = fraction
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(i64::from)
            .collect();
        let mut cents = digits.first().copied().unwrap_or(0) * 10 + digits.get(1).copied().unwrap_or(0);
        if digits.get(2).copied().unwrap_or(0) >= 5 {
            cents += 1;
        }
        let total = whole_value
            .checked_mul(CENTS_PER_UNIT)
            .and_then(|value| value.checked_add(cents))
            .ok_or_else(invalid)?;
        Ok(Money::from_cents(if negative { -total } else { total }))
    }
}

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

/// Locale-aware formatting preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl LocaleConfig {
    /// Resolves separators for the handful of locales the client ships; unknown tags fall back to en-US.
    pub fn for_tag(tag: &str) -> Self {
        let (decimal_separator, grouping_separator) = match tag {
            "en-US" | "en-GB" => ('.', ','),
            "de-DE" | "es-ES" => (',', '.'),
            "fr-FR" => (',', ' '),
            _ => return Self::default(),
        };
        Self {
            language_tag: tag.to_string(),
            decimal_separator,
            grouping_separator,
        }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-US".into(),
            decimal_separator: '.',
            grouping_separator: ',',
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatOptions {
    pub currency_display: CurrencyDisplay,
    pub negative_style: NegativeStyle,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            currency_display: CurrencyDisplay::Symbol,
            negative_style: NegativeStyle::Sign,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NegativeStyle {
    Sign,
    Parentheses,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CurrencyDisplay {
    Symbol,
    Code,
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "NGN" => "₦".into(),
        "KES" => "KSh".into(),
        "GHS" => "GH₵".into(),
        _ => code.into(),
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

/// Renders the absolute value of `amount` with locale separators, e.g. `1,234.50`.
pub fn format_number(locale: &LocaleConfig, amount: Money) -> String {
    let magnitude = amount.cents().unsigned_abs();
    let whole = (magnitude / CENTS_PER_UNIT as u64).to_string();
    format!(
        "{}{}{:02}",
        group_digits(&whole, locale.grouping_separator),
        locale.decimal_separator,
        magnitude % CENTS_PER_UNIT as u64
    )
}

pub fn format_currency_value(
    amount: Money,
    code: &CurrencyCode,
    locale: &LocaleConfig,
    options: &FormatOptions,
) -> String {
    let number = format_number(locale, amount);
    let prefix = match options.currency_display {
        CurrencyDisplay::Symbol => {
            let symbol = symbol_for(code.as_str());
            if symbol.chars().all(|c| c.is_ascii_alphabetic()) {
                format!("{} ", symbol)
            } else {
                symbol
            }
        }
        CurrencyDisplay::Code => format!("{} ", code.as_str()),
    };
    match (amount.cents() < 0, options.negative_style) {
        (false, _) => format!("{}{}", prefix, number),
        (true, NegativeStyle::Sign) => format!("-{}{}", prefix, number),
        (true, NegativeStyle::Parentheses) => format!("({}{})", prefix, number),
    }
}

/// Long month label used by payout schedules, e.g. `March 2025`.
pub fn format_month(month: PayoutMonth) -> String {
    format!("{} {}", month_label(month.month()), month.year())
}

fn month_label(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "",
    }
}
