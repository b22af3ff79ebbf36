use crate::error::{ErrorCode, VaultError};
use crate::params::SpvVaultParameters;
use crate::tx::Outpoint;

/// Mutable per-vault ledger. A zero parameters commitment means the
/// vault is unopened or closed; a closed vault's counters, UTXO and
/// balances are left behind as-is (meaningless once closed).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpvVaultState {
    pub params_commitment: [u8; 32],
    /// The single UTXO the vault expects the next qualifying Bitcoin
    /// transaction to spend as its input 0.
    pub utxo: Outpoint,
    pub open_blockheight: u64,
    pub deposit_count: u32,
    pub withdraw_count: u32,
    pub token0_amount: u128,
    pub token1_amount: u128,
}

impl SpvVaultState {
    pub fn unopened() -> Self {
        Self {
            params_commitment: [0u8; 32],
            utxo: Outpoint {
                txid: [0u8; 32],
                vout: 0,
            },
            open_blockheight: 0,
            deposit_count: 0,
            withdraw_count: 0,
            token0_amount: 0,
            token1_amount: 0,
        }
    }

    pub fn is_opened(&self) -> bool {
        self.params_commitment != [0u8; 32]
    }

    pub fn open(
        &mut self,
        params: &SpvVaultParameters,
        utxo: Outpoint,
        current_height: u64,
    ) -> Result<(), VaultError> {
        if self.is_opened() {
            return Err(VaultError::new(
                ErrorCode::VaultAlreadyOpened,
                "open: already opened",
            ));
        }
        self.params_commitment = params.commitment();
        self.utxo = utxo;
        self.open_blockheight = current_height;
        self.deposit_count = 0;
        self.withdraw_count = 0;
        self.token0_amount = 0;
        self.token1_amount = 0;
        Ok(())
    }

    /// Minimal-write termination: only the commitment is zeroed.
    pub fn close(&mut self) {
        self.params_commitment = [0u8; 32];
    }

    /// Guards gas-cheap calls that accept the parameters by value
    /// against stale or wrong structs.
    pub fn check_opened_and_params(&self, params: &SpvVaultParameters) -> Result<(), VaultError> {
        if !self.is_opened() {
            return Err(VaultError::new(ErrorCode::VaultClosed, "spvState: closed"));
        }
        if params.commitment() != self.params_commitment {
            return Err(VaultError::new(
                ErrorCode::VaultWrongParams,
                "spvState: wrong params",
            ));
        }
        Ok(())
    }

    /// Debits both balances and advances the watched UTXO. No mutation
    /// on failure. Returns the prior withdraw count, the anti-replay
    /// nonce fronting ids are derived against.
    pub fn withdraw(
        &mut self,
        new_utxo: Outpoint,
        amount0: u128,
        amount1: u128,
    ) -> Result<u32, VaultError> {
        let next0 = self.token0_amount.checked_sub(amount0).ok_or_else(|| {
            VaultError::new(ErrorCode::WithdrawUnderflow, "withdraw: amount 0")
        })?;
        let next1 = self.token1_amount.checked_sub(amount1).ok_or_else(|| {
            VaultError::new(ErrorCode::WithdrawUnderflow, "withdraw: amount 1")
        })?;
        let prior = self.withdraw_count;
        self.token0_amount = next0;
        self.token1_amount = next1;
        self.utxo = new_utxo;
        self.withdraw_count = prior + 1;
        Ok(prior)
    }

    /// Credits both balances. Overflow is fatal rather than graceful:
    /// deposits are not on the adversarial-input path.
    pub fn deposit(&mut self, amount0: u128, amount1: u128) -> Result<u32, VaultError> {
        let next0 = self
            .token0_amount
            .checked_add(amount0)
            .ok_or_else(|| VaultError::new(ErrorCode::DepositOverflow, "deposit: amount 0"))?;
        let next1 = self
            .token1_amount
            .checked_add(amount1)
            .ok_or_else(|| VaultError::new(ErrorCode::DepositOverflow, "deposit: amount 1"))?;
        let prior = self.deposit_count;
        self.token0_amount = next0;
        self.token1_amount = next1;
        self.deposit_count = prior + 1;
        Ok(prior)
    }
}
