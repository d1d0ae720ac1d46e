use std::sync::Arc;

use crate::{
    domain::graph::PrincipalId,
    domain::repository::TokenAccountRepository,
    domain::token_account::TokenAccount,
    CoreError,
};

/// Service owning every principal's token balance
///
/// Debits and credits are single atomic updates on the account repository, so
/// concurrent charges against one principal can never overdraw it.
pub struct TokenLedger {
    /// Repository for token accounts
    accounts: Arc<dyn TokenAccountRepository>,
}

impl TokenLedger {
    /// Create a new token ledger
    pub fn new(accounts: Arc<dyn TokenAccountRepository>) -> Self {
        Self { accounts }
    }

    /// Charge `amount`, returning the residual balance
    pub async fn debit(&self, principal: &PrincipalId, amount: f64) -> Result<f64, CoreError> {
        let result = self
            .accounts
            .update(principal, Box::new(move |account: &mut TokenAccount| account.debit(amount)))
            .await;

        match result {
            Ok(account) => {
                metrics::histogram!("waypath_tokens_debited", amount);
                tracing::debug!(
                    principal = %principal,
                    amount,
                    balance = account.balance,
                    "Tokens debited"
                );
                Ok(account.balance)
            }
            Err(e) => {
                if matches!(e, CoreError::InsufficientTokens { .. }) {
                    metrics::increment_counter!("waypath_debits_rejected_total");
                }
                tracing::info!(principal = %principal, amount, error = %e, "Debit refused");
                Err(e)
            }
        }
    }

    /// Add `amount`, returning the new balance
    pub async fn credit(&self, principal: &PrincipalId, amount: f64) -> Result<f64, CoreError> {
        let account = self
            .accounts
            .update(principal, Box::new(move |account: &mut TokenAccount| account.credit(amount)))
            .await?;

        metrics::histogram!("waypath_tokens_credited", amount);
        tracing::debug!(
            principal = %principal,
            amount,
            balance = account.balance,
            "Tokens credited"
        );
        Ok(account.balance)
    }

    /// Current balance; principals without an account hold zero tokens
    pub async fn balance(&self, principal: &PrincipalId) -> Result<f64, CoreError> {
        Ok(self
            .accounts
            .find(principal)
            .await?
            .map_or(0.0, |account| account.balance))
    }

    /// Every known account
    pub async fn accounts(&self) -> Result<Vec<TokenAccount>, CoreError> {
        self.accounts.list().await
    }
}
