//! Checking P2PKH unlocking scripts against the outputs they spend.
//!
//! This is not a script interpreter. It recognises the single unlocking form
//! the signer produces, `<sig||sighash> <pubkey>`, checks that the public key
//! hashes to the one committed in the spent script and verifies the
//! signature over the legacy digest.

use crate::crypto::PublicKey;
use crate::digest::tx_sighash;
use crate::error::{CryptoError, SigilError};
use crate::script::{ScriptOutput, parse_p2pkh_unlocking_script};
use crate::signature::decode_canonical_sig;
use crate::types::{Transaction, TxOutput};

/// Verify the unlocking script of input `index` against `prev_script`.
pub fn verify_input(tx: &Transaction, index: usize, prev_script: &[u8]) -> Result<(), SigilError> {
    let input = tx.inputs.get(index).ok_or(CryptoError::InputIndexOutOfBounds {
        index,
        len: tx.inputs.len(),
    })?;

    let ScriptOutput::PayPkHash(expected_hash) = ScriptOutput::classify(prev_script) else {
        return Err(CryptoError::UnsupportedUnlockingScript(index).into());
    };
    let (sig_bytes, key_bytes) = parse_p2pkh_unlocking_script(&input.script_sig)
        .ok_or(CryptoError::UnsupportedUnlockingScript(index))?;

    let public_key = PublicKey::from_slice(key_bytes)?;
    if public_key.pubkey_hash() != expected_hash {
        return Err(CryptoError::PubkeyHashMismatch(index).into());
    }

    let sig = decode_canonical_sig(sig_bytes)?;
    let digest = tx_sighash(tx, prev_script, index, sig.sighash);
    public_key.verify_digest(&digest, &sig.signature)?;
    Ok(())
}

/// Verify every input. `prev_outputs[i]` is the output spent by input `i`.
pub fn verify_transaction(tx: &Transaction, prev_outputs: &[TxOutput]) -> Result<(), SigilError> {
    if prev_outputs.len() != tx.inputs.len() {
        return Err(CryptoError::InputIndexOutOfBounds {
            index: prev_outputs.len().min(tx.inputs.len()),
            len: tx.inputs.len().min(prev_outputs.len()),
        }
        .into());
    }
    for (index, prev) in prev_outputs.iter().enumerate() {
        verify_input(tx, index, &prev.script_pubkey)?;
    }
    Ok(())
}
