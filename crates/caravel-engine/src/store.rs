//! JSON snapshot persistence for the vault set and fronting records.
//!
//! Hashes and addresses go to disk hex-encoded; balances stay numeric
//! (serde_json handles u128 natively). Entries are written sorted so
//! the snapshot is byte-stable across runs.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use caravel_core::{Address, Outpoint, SpvVaultState};
use serde::{Deserialize, Serialize};

use crate::io_utils::{parse_hex20, parse_hex32, write_file_atomic};
use crate::manager::{VaultKey, VaultManager};

pub const VAULT_STORE_FILE_NAME: &str = "vaults.json";
const VAULT_STORE_DISK_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultStoreDisk {
    version: u32,
    vaults: Vec<VaultDiskEntry>,
    fronting: Vec<FrontingDiskEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultDiskEntry {
    owner: String,
    vault_id: u64,
    params_commitment: String,
    utxo_txid: String,
    utxo_vout: u32,
    open_blockheight: u64,
    deposit_count: u32,
    withdraw_count: u32,
    token0_amount: u128,
    token1_amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrontingDiskEntry {
    id: String,
    fronter: String,
}

pub fn vault_store_path<P: AsRef<Path>>(data_dir: P) -> PathBuf {
    data_dir.as_ref().join(VAULT_STORE_FILE_NAME)
}

pub fn save_vaults<P: AsRef<Path>>(manager: &VaultManager, path: P) -> Result<(), String> {
    let path = path.as_ref();
    let disk = manager_to_disk(manager);
    let mut raw =
        serde_json::to_vec_pretty(&disk).map_err(|e| format!("encode vault store: {e}"))?;
    raw.push(b'\n');
    write_file_atomic(path, &raw)
}

/// A missing file is an empty store, not an error.
pub fn load_vaults<P: AsRef<Path>>(path: P) -> Result<VaultManager, String> {
    let path = path.as_ref();
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(VaultManager::new()),
        Err(e) => return Err(format!("read vault store {}: {e}", path.display())),
    };
    let disk: VaultStoreDisk = serde_json::from_slice(&raw)
        .map_err(|e| format!("parse vault store {}: {e}", path.display()))?;
    manager_from_disk(disk)
}

fn manager_to_disk(manager: &VaultManager) -> VaultStoreDisk {
    let mut vaults: Vec<VaultDiskEntry> = manager
        .vaults()
        .map(|(&(owner, vault_id), state)| VaultDiskEntry {
            owner: hex::encode(owner.as_bytes()),
            vault_id,
            params_commitment: hex::encode(state.params_commitment),
            utxo_txid: hex::encode(state.utxo.txid),
            utxo_vout: state.utxo.vout,
            open_blockheight: state.open_blockheight,
            deposit_count: state.deposit_count,
            withdraw_count: state.withdraw_count,
            token0_amount: state.token0_amount,
            token1_amount: state.token1_amount,
        })
        .collect();
    vaults.sort_by(|a, b| match a.owner.cmp(&b.owner) {
        Ordering::Equal => a.vault_id.cmp(&b.vault_id),
        other => other,
    });

    let mut fronting: Vec<FrontingDiskEntry> = manager
        .fronting_records()
        .map(|(id, fronter)| FrontingDiskEntry {
            id: hex::encode(id),
            fronter: hex::encode(fronter.as_bytes()),
        })
        .collect();
    fronting.sort_by(|a, b| a.id.cmp(&b.id));

    VaultStoreDisk {
        version: VAULT_STORE_DISK_VERSION,
        vaults,
        fronting,
    }
}

fn manager_from_disk(disk: VaultStoreDisk) -> Result<VaultManager, String> {
    if disk.version != VAULT_STORE_DISK_VERSION {
        return Err(format!("unsupported vault store version: {}", disk.version));
    }

    let mut vaults: HashMap<VaultKey, SpvVaultState> = HashMap::with_capacity(disk.vaults.len());
    for item in disk.vaults {
        let owner = Address(parse_hex20("vault.owner", &item.owner)?);
        let key = (owner, item.vault_id);
        if vaults.contains_key(&key) {
            return Err(format!("duplicate vault: {}/{}", item.owner, item.vault_id));
        }
        vaults.insert(
            key,
            SpvVaultState {
                params_commitment: parse_hex32("vault.params_commitment", &item.params_commitment)?,
                utxo: Outpoint {
                    txid: parse_hex32("vault.utxo_txid", &item.utxo_txid)?,
                    vout: item.utxo_vout,
                },
                open_blockheight: item.open_blockheight,
                deposit_count: item.deposit_count,
                withdraw_count: item.withdraw_count,
                token0_amount: item.token0_amount,
                token1_amount: item.token1_amount,
            },
        );
    }

    let mut fronting: HashMap<[u8; 32], Address> = HashMap::with_capacity(disk.fronting.len());
    for item in disk.fronting {
        let id = parse_hex32("fronting.id", &item.id)?;
        if fronting.contains_key(&id) {
            return Err(format!("duplicate fronting record: {}", item.id));
        }
        fronting.insert(id, Address(parse_hex20("fronting.fronter", &item.fronter)?));
    }

    Ok(VaultManager::from_parts(vaults, fronting))
}
