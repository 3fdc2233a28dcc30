use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::Payment;

pub const MIN_DIVISIONS: u32 = 2;
pub const MAX_DIVISIONS: u32 = 10;

/// One person's share of a split order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubOrder {
    pub person_id: String,
    pub display_name: String,
    pub amount: Decimal,
    pub paid: bool,
    pub payment: Option<Payment>,
    pub payment_link: String,
}

/// An order split into payment shares. At most one exists per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupOrder {
    pub id: String,
    pub order_id: String,
    pub total: Decimal,
    pub divisions: u32,
    pub shares: Vec<SubOrder>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupOrder {
    pub fn share(&self, person_id: &str) -> Option<&SubOrder> {
        self.shares.iter().find(|s| s.person_id == person_id)
    }

    pub fn all_paid(&self) -> bool {
        self.shares.iter().all(|s| s.paid)
    }
}

/// Payload for creating a group order from an existing order's total.
#[derive(Debug, Clone)]
pub struct GroupOrderCreate {
    pub order_id: String,
    pub total: Decimal,
    pub divisions: u32,
    pub names: Vec<String>,
}

/// Splits `total` into `divisions` amounts rounded down to cents.
///
/// The last amount takes the remainder, so the amounts always sum to `total`.
pub fn split_amounts(total: Decimal, divisions: u32) -> Vec<Decimal> {
    if divisions == 0 {
        return Vec::new();
    }
    let per_share = (total / Decimal::from(divisions)).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let last = total - per_share * Decimal::from(divisions - 1);

    let mut amounts = vec![per_share; divisions as usize - 1];
    amounts.push(last);
    amounts
}

pub fn payment_link(order_id: &str, person_id: &str) -> String {
    format!("/pay/{}/{}", order_id, person_id)
}

/// Display name for the share at `index`, falling back to `Person N`.
pub fn display_name(names: &[String], index: usize) -> String {
    names
        .get(index)
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Person {}", index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_split_keeps_remainder_on_last_share() {
        let amounts = split_amounts(dec("100.00"), 3);
        assert_eq!(amounts, vec![dec("33.33"), dec("33.33"), dec("33.34")]);
        assert_eq!(amounts.iter().copied().sum::<Decimal>(), dec("100.00"));
    }

    #[test]
    fn test_split_sums_exactly_for_every_division() {
        for divisions in MIN_DIVISIONS..=MAX_DIVISIONS {
            for total in ["59.00", "0.01", "1234.57", "10.00"] {
                let amounts = split_amounts(dec(total), divisions);
                assert_eq!(amounts.len(), divisions as usize);
                assert_eq!(amounts.iter().copied().sum::<Decimal>(), dec(total));
            }
        }
    }

    #[test]
    fn test_display_name_fallback() {
        let names = vec!["Ana".to_string(), "  ".to_string()];
        assert_eq!(display_name(&names, 0), "Ana");
        assert_eq!(display_name(&names, 1), "Person 2");
        assert_eq!(display_name(&names, 2), "Person 3");
    }
}
