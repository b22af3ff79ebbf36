//! The vault manager: open / deposit / front / claim / close over a
//! keyed map of per-(owner, vault id) ledgers.
//!
//! Each public operation models one atomic host-environment call: a
//! returned `Err` means the host discards the call's effects, including
//! any collaborator transfers already made, so checks only need to
//! precede the transfers whose outcome they decide. The only failures
//! surfaced as a successful return are the recoverable claim failures
//! that close the vault by design.

use std::collections::HashMap;

use caravel_core::{
    parse_btc_tx, sha256, verify_inclusion, Address, ErrorCode, Outpoint, Severity,
    SpvVaultParameters, SpvVaultState, VaultError, VaultTxData,
};

pub type VaultKey = (Address, u64);

/// Caller-supplied view of a Bitcoin block header the relay already
/// accepted: the engine only reads the embedded Merkle root and asks
/// the relay how deep the header is buried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderRef {
    pub hash: [u8; 32],
    pub merkle_root: [u8; 32],
}

/// External BTC relay: a chain of Bitcoin headers maintained elsewhere.
pub trait BtcRelay {
    /// Confirmation depth of `header` on the relay's best chain; zero
    /// for headers the relay does not know.
    fn verified_confirmations(&self, header: &HeaderRef) -> u32;
}

/// External token transfer helpers. Both directions are atomic and
/// exact: a partial transfer never succeeds.
pub trait TokenLedger {
    fn transfer_in(&mut self, token: Address, from: Address, amount: u128)
        -> Result<(), VaultError>;
    fn transfer_out(&mut self, token: Address, to: Address, amount: u128)
        -> Result<(), VaultError>;
}

/// External execution contract: the token0 leg is parked at
/// [`contract_address`](ExecutionScheduler::contract_address) and an
/// execution commitment is created with the exact tuple below.
pub trait ExecutionScheduler {
    fn contract_address(&self) -> Address;
    fn create_execution(
        &mut self,
        recipient: Address,
        token: Address,
        amount: u128,
        fee: u128,
        expiry: u64,
        action_hash: [u8; 32],
    );
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VaultEvent {
    Opened {
        owner: Address,
        vault_id: u64,
        utxo: Outpoint,
    },
    Deposited {
        owner: Address,
        vault_id: u64,
        caller: Address,
        amount0: u128,
        amount1: u128,
        deposit_count: u32,
    },
    Fronted {
        owner: Address,
        vault_id: u64,
        fronter: Address,
        recipient: Address,
        btc_txid: [u8; 32],
    },
    Claimed {
        owner: Address,
        vault_id: u64,
        caller: Address,
        recipient: Address,
        btc_txid: [u8; 32],
        fronter: Option<Address>,
        withdraw_count: u32,
    },
    /// Always carries the reason string from whichever check failed, so
    /// unrelated relayers can see why a vault self-terminated without
    /// replaying the call.
    Closed {
        owner: Address,
        vault_id: u64,
        reason: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    Settled {
        btc_txid: [u8; 32],
        prior_withdraw_count: u32,
        fronter: Option<Address>,
    },
    /// The supplied transaction was structurally invalid or could not
    /// be honored; the vault closed and refunded the owner.
    Closed { reason: &'static str },
}

/// Derives the fronting-record key from the vault identity and the
/// exact expected payload (which itself commits to the Bitcoin txid and
/// is derived against the vault's withdraw nonce).
pub fn fronting_id(owner: Address, vault_id: u64, payload_hash: [u8; 32]) -> [u8; 32] {
    let mut buf = [0u8; 20 + 8 + 32];
    buf[0..20].copy_from_slice(owner.as_bytes());
    buf[20..28].copy_from_slice(&vault_id.to_be_bytes());
    buf[28..60].copy_from_slice(&payload_hash);
    sha256(&buf)
}

#[derive(Clone, Debug, Default)]
pub struct VaultManager {
    vaults: HashMap<VaultKey, SpvVaultState>,
    fronting: HashMap<[u8; 32], Address>,
    events: Vec<VaultEvent>,
}

/// Everything the claim path pays out, pre-scaled to settlement-chain
/// units before any state is touched.
struct ScaledAmounts {
    amount0: u128,
    amount1: u128,
    caller0: u128,
    caller1: u128,
    fronting0: u128,
    fronting1: u128,
    execution0: u128,
    full0: u128,
    full1: u128,
}

impl ScaledAmounts {
    fn from_data(params: &SpvVaultParameters, data: &VaultTxData) -> Option<ScaledAmounts> {
        let (full0_raw, full1_raw) = data.full_amounts()?;
        // Each component is bounded by the full amount, so once the
        // full amount scales without overflow every component does too.
        let full0 = params.from_raw_token0(full0_raw)?;
        let full1 = params.from_raw_token1(full1_raw)?;
        Some(ScaledAmounts {
            amount0: params.from_raw_token0(data.amount0)?,
            amount1: params.from_raw_token1(data.amount1)?,
            caller0: params.from_raw_token0(data.caller_fee0)?,
            caller1: params.from_raw_token1(data.caller_fee1)?,
            fronting0: params.from_raw_token0(data.fronting_fee0)?,
            fronting1: params.from_raw_token1(data.fronting_fee1)?,
            execution0: params.from_raw_token0(data.execution_fee0)?,
            full0,
            full1,
        })
    }
}

fn transfer_out_nonzero(
    ledger: &mut impl TokenLedger,
    token: Address,
    to: Address,
    amount: u128,
) -> Result<(), VaultError> {
    if amount == 0 {
        return Ok(());
    }
    ledger.transfer_out(token, to, amount)
}

fn transfer_in_nonzero(
    ledger: &mut impl TokenLedger,
    token: Address,
    from: Address,
    amount: u128,
) -> Result<(), VaultError> {
    if amount == 0 {
        return Ok(());
    }
    ledger.transfer_in(token, from, amount)
}

impl VaultManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a manager from persisted parts (see `store`). The event
    /// log starts empty.
    pub fn from_parts(
        vaults: HashMap<VaultKey, SpvVaultState>,
        fronting: HashMap<[u8; 32], Address>,
    ) -> Self {
        Self {
            vaults,
            fronting,
            events: Vec::new(),
        }
    }

    pub fn vault(&self, owner: Address, vault_id: u64) -> Option<&SpvVaultState> {
        self.vaults.get(&(owner, vault_id))
    }

    pub fn vaults(&self) -> impl Iterator<Item = (&VaultKey, &SpvVaultState)> {
        self.vaults.iter()
    }

    pub fn fronting_records(&self) -> impl Iterator<Item = (&[u8; 32], &Address)> {
        self.fronting.iter()
    }

    pub fn fronter_of(&self, id: &[u8; 32]) -> Option<Address> {
        self.fronting.get(id).copied()
    }

    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    /// Binds a fresh vault id to its parameters and genesis UTXO. A
    /// vault id that ever existed, even a closed one, can never be
    /// reused: owners pick fresh ids to reopen.
    pub fn open(
        &mut self,
        owner: Address,
        vault_id: u64,
        params: &SpvVaultParameters,
        utxo: Outpoint,
        current_height: u64,
    ) -> Result<(), VaultError> {
        let key = (owner, vault_id);
        if self.vaults.contains_key(&key) {
            return Err(VaultError::new(
                ErrorCode::VaultAlreadyOpened,
                "open: already opened",
            ));
        }
        let mut state = SpvVaultState::unopened();
        state.open(params, utxo, current_height)?;
        self.vaults.insert(key, state);
        self.events.push(VaultEvent::Opened {
            owner,
            vault_id,
            utxo,
        });
        Ok(())
    }

    /// Funds a vault. Any caller may fund any owner's vault; amounts
    /// are raw BTC-denominated units, scaled by the vault multipliers
    /// before the pull.
    pub fn deposit(
        &mut self,
        ledger: &mut impl TokenLedger,
        caller: Address,
        owner: Address,
        vault_id: u64,
        params: &SpvVaultParameters,
        raw0: u64,
        raw1: u64,
    ) -> Result<u32, VaultError> {
        let key = (owner, vault_id);
        let state = self
            .vaults
            .get_mut(&key)
            .ok_or_else(|| VaultError::new(ErrorCode::VaultClosed, "spvState: closed"))?;
        state.check_opened_and_params(params)?;

        let amount0 = params
            .from_raw_token0(raw0)
            .ok_or_else(|| VaultError::new(ErrorCode::DepositOverflow, "deposit: amount 0"))?;
        let amount1 = params
            .from_raw_token1(raw1)
            .ok_or_else(|| VaultError::new(ErrorCode::DepositOverflow, "deposit: amount 1"))?;

        // Dry-run the credit before pulling tokens so a ledger overflow
        // cannot strand a completed transfer.
        state.token0_amount.checked_add(amount0).ok_or_else(|| {
            VaultError::new(ErrorCode::DepositOverflow, "deposit: amount 0")
        })?;
        state.token1_amount.checked_add(amount1).ok_or_else(|| {
            VaultError::new(ErrorCode::DepositOverflow, "deposit: amount 1")
        })?;

        transfer_in_nonzero(ledger, params.token0, caller, amount0)?;
        transfer_in_nonzero(ledger, params.token1, caller, amount1)?;

        let prior = state.deposit(amount0, amount1)?;
        self.events.push(VaultEvent::Deposited {
            owner,
            vault_id,
            caller,
            amount0,
            amount1,
            deposit_count: prior + 1,
        });
        Ok(prior)
    }

    /// Advances the payout to the recipient before the Bitcoin proof is
    /// deep enough, recording the fronter for reimbursement at claim
    /// time.
    #[allow(clippy::too_many_arguments)]
    pub fn front(
        &mut self,
        ledger: &mut impl TokenLedger,
        executions: &mut impl ExecutionScheduler,
        fronter: Address,
        owner: Address,
        vault_id: u64,
        params: &SpvVaultParameters,
        prior_withdraw_count: u32,
        btc_txid: [u8; 32],
        data: &VaultTxData,
    ) -> Result<(), VaultError> {
        let key = (owner, vault_id);
        let state = self
            .vaults
            .get(&key)
            .ok_or_else(|| VaultError::new(ErrorCode::VaultClosed, "spvState: closed"))?;
        state.check_opened_and_params(params)?;

        // A claim already consumed this slot: fronting now would pay a
        // settlement that can never reimburse it.
        if prior_withdraw_count != state.withdraw_count {
            return Err(VaultError::new(
                ErrorCode::FrontAlreadyProcessed,
                "front: already processed",
            ));
        }

        let id = fronting_id(owner, vault_id, data.hash_with_txid(&btc_txid));
        if self.fronting.contains_key(&id) {
            return Err(VaultError::new(
                ErrorCode::FrontAlreadyFronted,
                "front: already fronted",
            ));
        }

        let total0_raw = data
            .amount0
            .checked_add(data.execution_fee0)
            .ok_or_else(|| VaultError::new(ErrorCode::FrontAmountOverflow, "front: amount 0"))?;
        let total0 = params
            .from_raw_token0(total0_raw)
            .ok_or_else(|| VaultError::new(ErrorCode::FrontAmountOverflow, "front: amount 0"))?;
        let amount0 = params
            .from_raw_token0(data.amount0)
            .ok_or_else(|| VaultError::new(ErrorCode::FrontAmountOverflow, "front: amount 0"))?;
        let execution0 = params
            .from_raw_token0(data.execution_fee0)
            .ok_or_else(|| VaultError::new(ErrorCode::FrontAmountOverflow, "front: amount 0"))?;
        let amount1 = params
            .from_raw_token1(data.amount1)
            .ok_or_else(|| VaultError::new(ErrorCode::FrontAmountOverflow, "front: amount 1"))?;

        transfer_in_nonzero(ledger, params.token0, fronter, total0)?;
        transfer_in_nonzero(ledger, params.token1, fronter, amount1)?;

        if data.has_execution() {
            transfer_out_nonzero(ledger, params.token0, executions.contract_address(), total0)?;
            executions.create_execution(
                data.recipient,
                params.token0,
                amount0,
                execution0,
                data.execution_expiry,
                data.execution_hash,
            );
        } else {
            transfer_out_nonzero(ledger, params.token0, data.recipient, total0)?;
        }
        transfer_out_nonzero(ledger, params.token1, data.recipient, amount1)?;

        self.fronting.insert(id, fronter);
        self.events.push(VaultEvent::Fronted {
            owner,
            vault_id,
            fronter,
            recipient: data.recipient,
            btc_txid,
        });
        Ok(())
    }

    /// Settles a claim against a confirmed Bitcoin transaction.
    ///
    /// Gate failures (confirmations, Merkle proof, spent UTXO) are hard
    /// reverts: the vault stays valid and the caller can correct and
    /// retry. Every failure past the gates closes the vault and refunds
    /// the owner instead, per the recoverable half of
    /// [`caravel_core::Severity`].
    #[allow(clippy::too_many_arguments)]
    pub fn claim(
        &mut self,
        relay: &impl BtcRelay,
        ledger: &mut impl TokenLedger,
        executions: &mut impl ExecutionScheduler,
        caller: Address,
        owner: Address,
        vault_id: u64,
        params: &SpvVaultParameters,
        raw_tx: &[u8],
        header: &HeaderRef,
        siblings: &[[u8; 32]],
        position: u64,
    ) -> Result<ClaimOutcome, VaultError> {
        let key = (owner, vault_id);
        let state = self
            .vaults
            .get_mut(&key)
            .ok_or_else(|| VaultError::new(ErrorCode::VaultClosed, "spvState: closed"))?;
        state.check_opened_and_params(params)?;
        let expected_utxo = state.utxo;

        let (tx, btc_txid) = parse_btc_tx(raw_tx)?;

        if relay.verified_confirmations(header) < params.confirmations {
            return Err(VaultError::new(
                ErrorCode::ClaimConfirmations,
                "claim: confirmations",
            ));
        }
        if !verify_inclusion(&header.merkle_root, btc_txid, siblings, position) {
            return Err(VaultError::new(
                ErrorCode::ClaimMerkleInvalid,
                "merkleTree: verify failed",
            ));
        }
        if tx.input_utxo(0)? != expected_utxo {
            return Err(VaultError::new(
                ErrorCode::ClaimWrongUtxo,
                "claim: incorrect in_0 utxo",
            ));
        }

        // Past the gates: failures close the vault instead of reverting
        // so a malformed transaction cannot lock funds forever.
        let data = match VaultTxData::from_tx(&tx) {
            Ok(d) => d,
            Err(e) => {
                debug_assert_eq!(e.severity(), Severity::Recoverable);
                return self.close_vault(ledger, owner, vault_id, params, e.msg);
            }
        };
        let Some(scaled) = ScaledAmounts::from_data(params, &data) else {
            return self.close_vault(ledger, owner, vault_id, params, "claim: full amounts");
        };

        let new_utxo = Outpoint {
            txid: btc_txid,
            vout: 0,
        };
        let prior = match state.withdraw(new_utxo, scaled.full0, scaled.full1) {
            Ok(p) => p,
            Err(e) => {
                debug_assert_eq!(e.severity(), Severity::Recoverable);
                return self.close_vault(ledger, owner, vault_id, params, e.msg);
            }
        };

        let id = fronting_id(owner, vault_id, data.hash_with_txid(&btc_txid));
        let fronter = self.fronting.remove(&id);

        transfer_out_nonzero(ledger, params.token0, caller, scaled.caller0)?;
        transfer_out_nonzero(ledger, params.token1, caller, scaled.caller1)?;

        match fronter {
            Some(f) => {
                // The fronter already advanced the principal (and the
                // execution leg); everything but the caller fee is
                // their reimbursement.
                transfer_out_nonzero(
                    ledger,
                    params.token0,
                    f,
                    scaled.amount0 + scaled.fronting0 + scaled.execution0,
                )?;
                transfer_out_nonzero(ledger, params.token1, f, scaled.amount1 + scaled.fronting1)?;
            }
            None => {
                if data.has_execution() {
                    transfer_out_nonzero(
                        ledger,
                        params.token0,
                        executions.contract_address(),
                        scaled.amount0 + scaled.execution0,
                    )?;
                    executions.create_execution(
                        data.recipient,
                        params.token0,
                        scaled.amount0,
                        scaled.execution0,
                        data.execution_expiry,
                        data.execution_hash,
                    );
                } else {
                    transfer_out_nonzero(
                        ledger,
                        params.token0,
                        data.recipient,
                        scaled.amount0 + scaled.execution0,
                    )?;
                }
                transfer_out_nonzero(ledger, params.token1, data.recipient, scaled.amount1)?;
                transfer_out_nonzero(
                    ledger,
                    params.token0,
                    data.recipient,
                    scaled.fronting0,
                )?;
                transfer_out_nonzero(
                    ledger,
                    params.token1,
                    data.recipient,
                    scaled.fronting1,
                )?;
            }
        }

        self.events.push(VaultEvent::Claimed {
            owner,
            vault_id,
            caller,
            recipient: data.recipient,
            btc_txid,
            fronter,
            withdraw_count: prior + 1,
        });
        Ok(ClaimOutcome::Settled {
            btc_txid,
            prior_withdraw_count: prior,
            fronter,
        })
    }

    /// Explicit owner-initiated close: refunds the remaining balances
    /// and retires the vault id.
    pub fn close(
        &mut self,
        ledger: &mut impl TokenLedger,
        owner: Address,
        vault_id: u64,
        params: &SpvVaultParameters,
    ) -> Result<(), VaultError> {
        let state = self
            .vaults
            .get(&(owner, vault_id))
            .ok_or_else(|| VaultError::new(ErrorCode::VaultClosed, "spvState: closed"))?;
        state.check_opened_and_params(params)?;
        self.close_vault(ledger, owner, vault_id, params, "close: owner")
            .map(|_| ())
    }

    fn close_vault(
        &mut self,
        ledger: &mut impl TokenLedger,
        owner: Address,
        vault_id: u64,
        params: &SpvVaultParameters,
        reason: &'static str,
    ) -> Result<ClaimOutcome, VaultError> {
        let Some(state) = self.vaults.get_mut(&(owner, vault_id)) else {
            return Err(VaultError::new(ErrorCode::VaultClosed, "spvState: closed"));
        };
        let refund0 = state.token0_amount;
        let refund1 = state.token1_amount;
        state.close();

        transfer_out_nonzero(ledger, params.token0, owner, refund0)?;
        transfer_out_nonzero(ledger, params.token1, owner, refund1)?;

        self.events.push(VaultEvent::Closed {
            owner,
            vault_id,
            reason,
        });
        Ok(ClaimOutcome::Closed { reason })
    }
}
