pub mod address;
pub mod compactsize;
pub mod encode;
pub mod endian;
pub mod error;
pub mod fees;
mod hash;
pub mod merkle;
pub mod params;
pub mod state;
pub mod tx;
pub mod txdata;
pub mod wire_read;

pub use address::Address;
pub use compactsize::{encode_compact_size, read_compact_size};
pub use encode::btc_tx_bytes;
pub use error::{ErrorCode, Severity, VaultError};
pub use fees::{calculate_fee, SequenceFields, FEE_SHARE_DENOMINATOR};
pub use hash::{sha256, sha256d};
pub use merkle::{build_proof, merkle_root_txids, verify_inclusion};
pub use params::SpvVaultParameters;
pub use state::SpvVaultState;
pub use tx::{parse_btc_tx, BtcTx, Outpoint, TxInput, TxOutput};
pub use txdata::{fee_share_sequences, op_return_script, VaultTxData, EXECUTION_EXPIRY_OFFSET};
pub use wire_read::Reader;

#[cfg(test)]
mod tests;
