use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STARTING_BALANCE: f64 = 15.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Stored as entered. There is no hashing in this design.
    pub password: String,
    pub balance: f64,
}

impl User {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password: password.into(),
            balance: STARTING_BALANCE,
        }
    }

    pub fn can_afford_turn(&self) -> bool {
        self.balance > 0.0
    }

    /// Subtracts `amount`, never going below zero.
    pub fn debit(&mut self, amount: f64) {
        self.balance = (self.balance - amount).max(0.0);
    }

    pub fn credit(&mut self, amount: f64) {
        self.balance += amount;
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            balance: self.balance,
        }
    }
}

/// User as returned over the wire, without the password.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub balance: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AdminElevationRequest {
    pub passphrase: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BalanceOperation {
    Add,
    Subtract,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BalanceAdjustment {
    pub amount: f64,
    pub operation: BalanceOperation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_gets_starting_balance() {
        let user = User::new("a@b.c", "pw");
        assert_eq!(user.balance, STARTING_BALANCE);
        assert!(user.can_afford_turn());
    }

    #[test]
    fn test_debit_floors_at_zero() {
        let mut user = User::new("a@b.c", "pw");
        user.balance = 2.0;
        user.debit(5.0);
        assert_eq!(user.balance, 0.0);
        assert!(!user.can_afford_turn());
    }
}
