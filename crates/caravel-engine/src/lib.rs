pub mod io_utils;
pub mod manager;
pub mod store;

pub use manager::{
    fronting_id, BtcRelay, ClaimOutcome, ExecutionScheduler, HeaderRef, TokenLedger, VaultEvent,
    VaultKey, VaultManager,
};
pub use store::{load_vaults, save_vaults, vault_store_path, VAULT_STORE_FILE_NAME};
