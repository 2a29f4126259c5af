use chrono::Datelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Other,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "visa",
            CardBrand::Mastercard => "mastercard",
            CardBrand::Amex => "amex",
            CardBrand::Other => "other",
        }
    }

    pub fn detect(digits: &str) -> Self {
        let prefix2: u32 = digits.get(..2).and_then(|p| p.parse().ok()).unwrap_or(0);
        let prefix4: u32 = digits.get(..4).and_then(|p| p.parse().ok()).unwrap_or(0);
        if digits.starts_with('4') {
            CardBrand::Visa
        } else if (51..=55).contains(&prefix2) || (2221..=2720).contains(&prefix4) {
            CardBrand::Mastercard
        } else if prefix2 == 34 || prefix2 == 37 {
            CardBrand::Amex
        } else {
            CardBrand::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentMethodError {
    #[error("card number must contain 12 to 19 digits")]
    InvalidLength,
    #[error("card number failed checksum")]
    InvalidChecksum,
    #[error("card has expired")]
    Expired,
    #[error("expiry month must be between 1 and 12")]
    InvalidMonth,
}

/// What is kept of a card after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSummary {
    pub brand: CardBrand,
    pub last4: String,
}

fn luhn_valid(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

pub fn check_card(
    number: &str,
    exp_month: i32,
    exp_year: i32,
    today: chrono::NaiveDate,
) -> Result<CardSummary, PaymentMethodError> {
    let cleaned: String = number
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    let digits: Vec<u32> = cleaned
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<_>>()
        .ok_or(PaymentMethodError::InvalidLength)?;
    if !(12..=19).contains(&digits.len()) {
        return Err(PaymentMethodError::InvalidLength);
    }
    if !luhn_valid(&digits) {
        return Err(PaymentMethodError::InvalidChecksum);
    }
    if !(1..=12).contains(&exp_month) {
        return Err(PaymentMethodError::InvalidMonth);
    }
    let (year, month) = (today.year(), today.month() as i32);
    if exp_year < year || (exp_year == year && exp_month < month) {
        return Err(PaymentMethodError::Expired);
    }

    Ok(CardSummary {
        brand: CardBrand::detect(&cleaned),
        last4: cleaned[cleaned.len() - 4..].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn accepts_valid_visa_with_separators() {
        let card = check_card("4111 1111-1111 1111", 12, 2027, today()).unwrap();
        assert_eq!(card.brand, CardBrand::Visa);
        assert_eq!(card.last4, "1111");
    }

    #[test]
    fn detects_brands() {
        assert_eq!(CardBrand::detect("5555555555554444"), CardBrand::Mastercard);
        assert_eq!(CardBrand::detect("2221000000000009"), CardBrand::Mastercard);
        assert_eq!(CardBrand::detect("378282246310005"), CardBrand::Amex);
        assert_eq!(CardBrand::detect("6011111111111117"), CardBrand::Other);
    }

    #[test]
    fn rejects_bad_checksum_and_length() {
        assert_eq!(
            check_card("4111111111111112", 1, 2030, today()),
            Err(PaymentMethodError::InvalidChecksum)
        );
        assert_eq!(
            check_card("4111", 1, 2030, today()),
            Err(PaymentMethodError::InvalidLength)
        );
        assert_eq!(
            check_card("4111abcd11111111", 1, 2030, today()),
            Err(PaymentMethodError::InvalidLength)
        );
    }

    #[test]
    fn current_month_is_still_valid() {
        assert!(check_card("4111111111111111", 10, 2026, today()).is_ok());
        assert_eq!(
            check_card("4111111111111111", 9, 2026, today()),
            Err(PaymentMethodError::Expired)
        );
        assert_eq!(
            check_card("4111111111111111", 13, 2030, today()),
            Err(PaymentMethodError::InvalidMonth)
        );
    }
}
