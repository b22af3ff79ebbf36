//! One-shot JSON tool: reads a request object on stdin, writes a
//! response object on stdout. Used by cross-implementation test
//! harnesses to exercise the codec without linking the crate.

use caravel_core::{
    parse_btc_tx, verify_inclusion, Address, ErrorCode, SpvVaultParameters, VaultTxData,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct Request {
    op: String,

    #[serde(default)]
    tx_hex: String,

    #[serde(default)]
    root: String,

    #[serde(default)]
    leaf: String,

    #[serde(default)]
    siblings: Vec<String>,

    #[serde(default)]
    position: u64,

    #[serde(default)]
    btc_relay: String,

    #[serde(default)]
    token0: String,

    #[serde(default)]
    token1: String,

    #[serde(default)]
    token0_multiplier: u128,

    #[serde(default)]
    token1_multiplier: u128,

    #[serde(default)]
    confirmations: u32,
}

#[derive(Serialize)]
struct TxDataOut {
    recipient: String,
    amount0: u64,
    amount1: u64,
    caller_fee0: u64,
    caller_fee1: u64,
    fronting_fee0: u64,
    fronting_fee1: u64,
    execution_fee0: u64,
    execution_hash: String,
    execution_expiry: u64,
}

#[derive(Serialize)]
struct Response {
    ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    err: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    txid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<TxDataOut>,

    #[serde(skip_serializing_if = "Option::is_none")]
    valid: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    commitment: Option<String>,
}

impl Response {
    fn fail(err: String) -> Response {
        Response {
            ok: false,
            err: Some(err),
            txid: None,
            data: None,
            valid: None,
            commitment: None,
        }
    }
}

fn err_code(code: ErrorCode) -> String {
    code.as_str().to_string()
}

fn emit(resp: &Response) {
    let _ = serde_json::to_writer(std::io::stdout(), resp);
}

fn parse_hex32(name: &str, value: &str) -> Result<[u8; 32], Response> {
    let b = hex::decode(value).map_err(|_| Response::fail(format!("bad {name}")))?;
    if b.len() != 32 {
        return Err(Response::fail(format!("bad {name}")));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&b);
    Ok(out)
}

fn parse_address(name: &str, value: &str) -> Result<Address, Response> {
    let b = hex::decode(value).map_err(|_| Response::fail(format!("bad {name}")))?;
    if b.len() != 20 {
        return Err(Response::fail(format!("bad {name}")));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&b);
    Ok(Address(out))
}

fn run(req: Request) -> Response {
    match req.op.as_str() {
        "parse_tx" => {
            let tx_bytes = match hex::decode(req.tx_hex) {
                Ok(v) => v,
                Err(_) => return Response::fail("bad hex".to_string()),
            };
            match parse_btc_tx(&tx_bytes) {
                Ok((_tx, txid)) => Response {
                    ok: true,
                    err: None,
                    txid: Some(hex::encode(txid)),
                    data: None,
                    valid: None,
                    commitment: None,
                },
                Err(e) => Response::fail(err_code(e.code)),
            }
        }
        "tx_data" => {
            let tx_bytes = match hex::decode(req.tx_hex) {
                Ok(v) => v,
                Err(_) => return Response::fail("bad hex".to_string()),
            };
            let (tx, txid) = match parse_btc_tx(&tx_bytes) {
                Ok(v) => v,
                Err(e) => return Response::fail(err_code(e.code)),
            };
            match VaultTxData::from_tx(&tx) {
                Ok(d) => Response {
                    ok: true,
                    err: None,
                    txid: Some(hex::encode(txid)),
                    data: Some(TxDataOut {
                        recipient: d.recipient.to_string(),
                        amount0: d.amount0,
                        amount1: d.amount1,
                        caller_fee0: d.caller_fee0,
                        caller_fee1: d.caller_fee1,
                        fronting_fee0: d.fronting_fee0,
                        fronting_fee1: d.fronting_fee1,
                        execution_fee0: d.execution_fee0,
                        execution_hash: hex::encode(d.execution_hash),
                        execution_expiry: d.execution_expiry,
                    }),
                    valid: None,
                    commitment: None,
                },
                Err(e) => Response::fail(err_code(e.code)),
            }
        }
        "verify_merkle" => {
            let root = match parse_hex32("root", &req.root) {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let leaf = match parse_hex32("leaf", &req.leaf) {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let mut siblings: Vec<[u8; 32]> = Vec::with_capacity(req.siblings.len());
            for h in &req.siblings {
                match parse_hex32("sibling", h) {
                    Ok(v) => siblings.push(v),
                    Err(resp) => return resp,
                }
            }
            Response {
                ok: true,
                err: None,
                txid: None,
                data: None,
                valid: Some(verify_inclusion(&root, leaf, &siblings, req.position)),
                commitment: None,
            }
        }
        "params_commitment" => {
            let btc_relay = match parse_address("btc_relay", &req.btc_relay) {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let token0 = match parse_address("token0", &req.token0) {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let token1 = match parse_address("token1", &req.token1) {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let params = SpvVaultParameters {
                btc_relay,
                token0,
                token1,
                token0_multiplier: req.token0_multiplier,
                token1_multiplier: req.token1_multiplier,
                confirmations: req.confirmations,
            };
            Response {
                ok: true,
                err: None,
                txid: None,
                data: None,
                valid: None,
                commitment: Some(hex::encode(params.commitment())),
            }
        }
        other => Response::fail(format!("unknown op: {other}")),
    }
}

fn main() {
    let req: Request = match serde_json::from_reader(std::io::stdin()) {
        Ok(v) => v,
        Err(e) => {
            emit(&Response::fail(format!("bad request: {e}")));
            return;
        }
    };
    emit(&run(req));
}
