//! Cash handling rules

use super::errors::{AccountError, AccountResult};

/// Currency symbol used in audit descriptions and messages
pub const CURRENCY: &str = "₹";

/// Formats an amount as `₹12,345.67`: currency symbol, thousands grouping,
/// two decimals. Negative amounts get a leading `-`.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}{}.{}", sign, CURRENCY, grouped, cents)
}

/// Relative slack when checking that an amount is a whole multiple.
const MULTIPLE_TOLERANCE: f64 = 1e-9;

fn is_multiple_of(amount: f64, multiple: f64) -> bool {
    let nearest = (amount / multiple).round() * multiple;
    (nearest - amount).abs() <= MULTIPLE_TOLERANCE * amount.abs().max(multiple)
}

/// Limits applied to deposits and withdrawals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashPolicy {
    /// Smallest accepted deposit or withdrawal
    pub minimum: f64,
    /// Withdrawals must be whole multiples of this
    pub multiple: f64,
}

impl Default for CashPolicy {
    fn default() -> Self {
        Self {
            minimum: 100.0,
            multiple: 100.0,
        }
    }
}

impl CashPolicy {
    pub fn check_deposit(&self, amount: f64) -> AccountResult<()> {
        self.check_common(amount, "deposit")
    }

    pub fn check_withdrawal(&self, amount: f64) -> AccountResult<()> {
        self.check_common(amount, "withdrawal")?;
        if self.multiple > 0.0 && !is_multiple_of(amount, self.multiple) {
            return Err(AccountError::InvalidAmount(format!(
                "amount must be in multiples of {}",
                format_amount(self.multiple)
            )));
        }
        Ok(())
    }

    fn check_common(&self, amount: f64, what: &str) -> AccountResult<()> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AccountError::InvalidAmount(
                "amount must be positive".to_string(),
            ));
        }
        if amount < self.minimum {
            return Err(AccountError::InvalidAmount(format!(
                "minimum {} amount is {}",
                what,
                format_amount(self.minimum)
            )));
        }
        Ok(())
    }
}
