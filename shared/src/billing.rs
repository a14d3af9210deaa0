//! Coin pricing: what a response costs and what a user can buy.

use serde::{Deserialize, Serialize};

/// Coins charged for a model response of the given text.
///
/// Length is counted in UTF-16 code units, so a character outside the
/// Basic Multilingual Plane (most emoji) counts as two.
pub fn message_cost(response: &str) -> u32 {
    match response.encode_utf16().count() {
        0..=250 => 1,
        251..=750 => 3,
        751..=1500 => 5,
        _ => 10,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchasePlan {
    pub coins: u32,
    pub price: f64,
    #[serde(default)]
    pub popular: bool,
}

pub const PURCHASE_PLANS: [PurchasePlan; 4] = [
    PurchasePlan { coins: 50, price: 4.99, popular: false },
    PurchasePlan { coins: 120, price: 9.99, popular: false },
    PurchasePlan { coins: 300, price: 19.99, popular: true },
    PurchasePlan { coins: 1000, price: 49.99, popular: false },
];

/// Purchases are completed by hand through `contact_url`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOffer {
    pub plans: Vec<PurchasePlan>,
    pub contact_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_cost_bands() {
        let cases = [
            (0, 1),
            (250, 1),
            (251, 3),
            (750, 3),
            (751, 5),
            (1500, 5),
            (1501, 10),
            (5000, 10),
        ];
        for (len, cost) in cases {
            assert_eq!(message_cost(&"a".repeat(len)), cost, "length {len}");
        }
    }

    #[test]
    fn test_message_cost_counts_chars_not_bytes() {
        // 250 Persian letters are 500 bytes but still one band.
        assert_eq!(message_cost(&"س".repeat(250)), 1);
    }

    #[test]
    fn test_message_cost_counts_emoji_as_two_units() {
        let reply = format!("{}🙂", "a".repeat(249));
        assert_eq!(reply.chars().count(), 250);
        assert_eq!(message_cost(&reply), 3);
        assert_eq!(message_cost(&format!("{}🙂", "a".repeat(248))), 1);
    }

    #[test]
    fn test_exactly_one_popular_plan() {
        assert_eq!(PURCHASE_PLANS.iter().filter(|p| p.popular).count(), 1);
    }
}
