/// Admission checks for transactions separated from type definitions
use crate::error::ChainError;
use crate::ledger::BalanceMap;
use crate::transaction::types::Transaction;

impl Transaction {
    /// Full admission check against a balance snapshot.
    ///
    /// `genesis` relaxes the balance-sufficiency rule for the one block that
    /// introduces money; the amount-sign and signature rules always apply.
    /// An absent map entry reads as a zero balance.
    pub fn validate_against(&self, balances: &BalanceMap, genesis: bool) -> Result<(), ChainError> {
        if self.amount < 0 {
            return Err(ChainError::TransactionInvalid(format!(
                "Amount must be non-negative, got {}",
                self.amount
            )));
        }

        if !genesis {
            let funds = balances.get(&self.sender).copied().unwrap_or(0);
            if funds < self.amount {
                return Err(ChainError::TransactionInvalid(format!(
                    "{} only has {} embers, but attempted to spend {}",
                    hex::encode(self.sender),
                    funds,
                    self.amount
                )));
            }
        }

        if let Some(signature) = &self.signature {
            crate::crypto::verify_signature(&self.sender, &self.signable_message(), signature)?;
        }

        Ok(())
    }
}
