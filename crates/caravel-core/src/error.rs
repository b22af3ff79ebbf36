use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    TxTooShort,
    TxNonMinimalVarint,
    TxWitnessNotStripped,
    TxTrailingData,
    TxInputNotFound,
    TxOutputNotFound,

    TxDataMalformed,
    TxDataFeeOverflow,

    VaultAlreadyOpened,
    VaultClosed,
    VaultWrongParams,
    DepositOverflow,
    WithdrawUnderflow,

    FrontAlreadyProcessed,
    FrontAlreadyFronted,
    FrontAmountOverflow,

    ClaimConfirmations,
    ClaimMerkleInvalid,
    ClaimWrongUtxo,
    ClaimFullAmounts,

    TransferFailed,
}

/// How a failed check is surfaced by the claim path: `Fatal` aborts the
/// whole call with no state change, `Recoverable` closes the vault and
/// reports the reason instead of reverting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Recoverable,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::TxTooShort => "TX_ERR_TOO_SHORT",
            ErrorCode::TxNonMinimalVarint => "TX_ERR_NONMINIMAL_VARINT",
            ErrorCode::TxWitnessNotStripped => "TX_ERR_WITNESS_NOT_STRIPPED",
            ErrorCode::TxTrailingData => "TX_ERR_TRAILING_DATA",
            ErrorCode::TxInputNotFound => "TX_ERR_INPUT_NOT_FOUND",
            ErrorCode::TxOutputNotFound => "TX_ERR_OUTPUT_NOT_FOUND",

            ErrorCode::TxDataMalformed => "TX_DATA_ERR_MALFORMED",
            ErrorCode::TxDataFeeOverflow => "TX_DATA_ERR_FEE_OVERFLOW",

            ErrorCode::VaultAlreadyOpened => "VAULT_ERR_ALREADY_OPENED",
            ErrorCode::VaultClosed => "VAULT_ERR_CLOSED",
            ErrorCode::VaultWrongParams => "VAULT_ERR_WRONG_PARAMS",
            ErrorCode::DepositOverflow => "VAULT_ERR_DEPOSIT_OVERFLOW",
            ErrorCode::WithdrawUnderflow => "VAULT_ERR_WITHDRAW_UNDERFLOW",

            ErrorCode::FrontAlreadyProcessed => "FRONT_ERR_ALREADY_PROCESSED",
            ErrorCode::FrontAlreadyFronted => "FRONT_ERR_ALREADY_FRONTED",
            ErrorCode::FrontAmountOverflow => "FRONT_ERR_AMOUNT_OVERFLOW",

            ErrorCode::ClaimConfirmations => "CLAIM_ERR_CONFIRMATIONS",
            ErrorCode::ClaimMerkleInvalid => "CLAIM_ERR_MERKLE_INVALID",
            ErrorCode::ClaimWrongUtxo => "CLAIM_ERR_WRONG_UTXO",
            ErrorCode::ClaimFullAmounts => "CLAIM_ERR_FULL_AMOUNTS",

            ErrorCode::TransferFailed => "TRANSFER_ERR_FAILED",
        }
    }

    /// The single fatal/recoverable table. Recoverable codes are exactly
    /// the ones reachable after the claim's relay, Merkle and UTXO gates
    /// have passed: the supplied Bitcoin transaction itself is bad (or
    /// cannot be honored against current balances), so the vault closes
    /// and refunds the owner rather than letting a retry loop strand
    /// funds behind a malformed proof.
    pub fn severity(self) -> Severity {
        match self {
            ErrorCode::TxDataMalformed
            | ErrorCode::TxDataFeeOverflow
            | ErrorCode::ClaimFullAmounts
            | ErrorCode::WithdrawUnderflow => Severity::Recoverable,
            _ => Severity::Fatal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultError {
    pub code: ErrorCode,
    pub msg: &'static str,
}

impl VaultError {
    pub fn new(code: ErrorCode, msg: &'static str) -> Self {
        Self { code, msg }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.msg.is_empty() {
            write!(f, "{}", self.code.as_str())
        } else {
            write!(f, "{}: {}", self.code.as_str(), self.msg)
        }
    }
}

impl std::error::Error for VaultError {}
