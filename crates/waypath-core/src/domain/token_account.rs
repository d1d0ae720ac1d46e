use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::graph::PrincipalId;
use crate::CoreError;

/// Aggregate: token balance of one principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAccount {
    /// Owner of the balance
    pub principal: PrincipalId,

    /// Never negative
    pub balance: f64,

    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

fn validate_amount(amount: f64) -> Result<f64, CoreError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(CoreError::InvalidAmount(format!(
            "amount must be a finite number >= 0, got {}",
            amount
        )))
    }
}

impl TokenAccount {
    /// Account with a zero balance
    pub fn empty(principal: PrincipalId) -> Self {
        Self {
            principal,
            balance: 0.0,
            updated_at: Utc::now(),
        }
    }

    /// Remove `amount`, leaving the account untouched when it does not fit
    pub fn debit(&mut self, amount: f64) -> Result<(), CoreError> {
        let amount = validate_amount(amount)?;
        if self.balance < amount {
            return Err(CoreError::InsufficientTokens {
                principal: self.principal.0.clone(),
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Add `amount`
    pub fn credit(&mut self, amount: f64) -> Result<(), CoreError> {
        let amount = validate_amount(amount)?;
        self.balance += amount;
        self.updated_at = Utc::now();
        Ok(())
    }
}
