//! Phone-number handling for DRC mobile-money numbers.

use crate::payments::types::MobileMoneyOperator;

/// DRC international dialling code
pub const COUNTRY_CODE: &str = "243";

/// Operator assigned when a prefix is not in the table
pub const DEFAULT_OPERATOR: MobileMoneyOperator = MobileMoneyOperator::Mpesa;

const PREFIX_TABLE: &[(&str, MobileMoneyOperator)] = &[
    ("81", MobileMoneyOperator::Mpesa),
    ("82", MobileMoneyOperator::Mpesa),
    ("83", MobileMoneyOperator::Mpesa),
    ("84", MobileMoneyOperator::Airtel),
    ("85", MobileMoneyOperator::Airtel),
    ("86", MobileMoneyOperator::Airtel),
    ("89", MobileMoneyOperator::Airtel),
    ("90", MobileMoneyOperator::Airtel),
    ("91", MobileMoneyOperator::Airtel),
    ("97", MobileMoneyOperator::Airtel),
    ("99", MobileMoneyOperator::Airtel),
    ("80", MobileMoneyOperator::Orange),
    ("98", MobileMoneyOperator::Afrimoney),
];

fn strip_country_code(phone_number: &str) -> &str {
    let trimmed = phone_number.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    trimmed.strip_prefix(COUNTRY_CODE).unwrap_or(trimmed)
}

/// Classify a phone number by its two-digit operator prefix.
///
/// The prefix is read right after the country code, so a local number
/// written with its trunk zero (`08...`) falls through to the default.
pub fn detect_operator(phone_number: &str) -> MobileMoneyOperator {
    let local = strip_country_code(phone_number);
    let prefix = local.get(..2).unwrap_or(local);

    PREFIX_TABLE
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, operator)| *operator)
        .unwrap_or(DEFAULT_OPERATOR)
}

/// Local-format number expected by the aggregator: country code removed,
/// exactly one leading zero.
pub fn normalize_customer_number(phone_number: &str) -> String {
    let local = strip_country_code(phone_number);
    if local.starts_with('0') {
        local.to_string()
    } else {
        format!("0{}", local)
    }
}

/// Mask all but the last four digits for logging
pub fn mask_phone_number(phone_number: &str) -> String {
    let digits: Vec<char> = phone_number.trim().chars().collect();
    if digits.len() <= 4 {
        return "*".repeat(digits.len());
    }
    let visible: String = digits[digits.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(digits.len() - 4), visible)
}
