//! Legacy signature digest.
//!
//! Computes the value signed for one input: a transformed copy of the
//! transaction, selected by the SigHash descriptor, serialized and followed by
//! the 4-byte fork-augmented SigHash suffix, then double-hashed.

use crate::constants::SIGHASH_SINGLE_BLANK_VALUE;
use crate::crypto::sha256d;
use crate::encode::Writer;
use crate::sighash::{SigHash, SigHashType, encode_sighash_fork_id};
use crate::types::{Hash256, Transaction, TxInput, TxOutput};

/// Digest returned for `SINGLE` when the input has no matching output.
///
/// The value 1 as a little-endian 256-bit integer.
pub const SIGHASH_ONE: Hash256 = {
    let mut bytes = [0u8; 32];
    bytes[0] = 1;
    Hash256(bytes)
};

/// Compute the signature digest for `input_index` spending `spent_script`.
///
/// `input_index` is expected to be in range of `tx.inputs`; callers check it
/// before signing or verifying.
pub fn tx_sighash(
    tx: &Transaction,
    spent_script: &[u8],
    input_index: usize,
    sighash: SigHash,
) -> Hash256 {
    let outputs = match sighash.ty {
        SigHashType::All | SigHashType::Unknown(_) => tx.outputs.clone(),
        SigHashType::None => Vec::new(),
        SigHashType::Single => {
            let Some(own) = tx.outputs.get(input_index) else {
                return SIGHASH_ONE;
            };
            let mut outs = vec![blank_output(); input_index];
            outs.push(own.clone());
            outs
        }
    };

    let inputs = if sighash.anyone_can_pay {
        tx.inputs
            .get(input_index)
            .map(|input| vec![with_script(input, spent_script)])
            .unwrap_or_default()
    } else {
        let zero_sequences = matches!(sighash.ty, SigHashType::None | SigHashType::Single);
        tx.inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                if i == input_index {
                    with_script(input, spent_script)
                } else {
                    TxInput {
                        previous_output: input.previous_output,
                        script_sig: Vec::new(),
                        sequence: if zero_sequences { 0 } else { input.sequence },
                    }
                }
            })
            .collect()
    };

    let stripped = Transaction {
        version: tx.version,
        inputs,
        outputs,
        lock_time: tx.lock_time,
    };

    let mut w = Writer::with_capacity(stripped.size() + 4);
    stripped.write_to(&mut w);
    w.write_bytes(&encode_sighash_fork_id(&sighash));
    sha256d(w.as_bytes())
}

fn with_script(input: &TxInput, script: &[u8]) -> TxInput {
    TxInput {
        previous_output: input.previous_output,
        script_sig: script.to_vec(),
        sequence: input.sequence,
    }
}

fn blank_output() -> TxOutput {
    TxOutput::new(SIGHASH_SINGLE_BLANK_VALUE, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::p2pkh_script;
    use crate::types::OutPoint;

    fn sample_tx(n_in: usize, n_out: usize) -> Transaction {
        Transaction {
            version: 1,
            inputs: (0..n_in)
                .map(|i| TxInput {
                    previous_output: OutPoint::new(Hash256([i as u8 + 1; 32]), i as u32),
                    script_sig: vec![0xde, 0xad],
                    sequence: 0xffff_fffe - i as u32,
                })
                .collect(),
            outputs: (0..n_out)
                .map(|i| TxOutput::new(1000 * (i as u64 + 1), p2pkh_script(&[i as u8; 20])))
                .collect(),
            lock_time: 0,
        }
    }

    fn script() -> Vec<u8> {
        p2pkh_script(&[0xab; 20])
    }

    /// Preimage for SIGHASH_ALL built by hand.
    fn manual_all_digest(tx: &Transaction, index: usize, byte: u8) -> Hash256 {
        let mut copy = tx.clone();
        for (i, input) in copy.inputs.iter_mut().enumerate() {
            input.script_sig = if i == index { script() } else { Vec::new() };
        }
        let mut bytes = copy.to_bytes();
        bytes.extend_from_slice(&[byte, 0, 0, 0]);
        sha256d(&bytes)
    }

    #[test]
    fn single_out_of_range_is_one() {
        let tx = sample_tx(2, 1);
        let sh = SigHash::new(SigHashType::Single, false, false);
        let digest = tx_sighash(&tx, &script(), 1, sh);
        let mut expected = [0u8; 32];
        expected[0] = 1;
        assert_eq!(digest.0, expected);
        assert_eq!(digest, SIGHASH_ONE);
    }

    #[test]
    fn all_matches_manual_preimage() {
        let tx = sample_tx(3, 2);
        assert_eq!(
            tx_sighash(&tx, &script(), 1, SigHash::all()),
            manual_all_digest(&tx, 1, 0x01)
        );
    }

    #[test]
    fn unknown_commits_like_all_but_with_its_byte() {
        let tx = sample_tx(2, 2);
        let sh = SigHash::from_byte(0x05);
        assert_eq!(tx_sighash(&tx, &script(), 0, sh), manual_all_digest(&tx, 0, 0x05));
    }

    #[test]
    fn fork_id_changes_suffix_only() {
        let tx = sample_tx(2, 2);
        let forked = SigHash::all().with_fork_id(true);
        assert_eq!(tx_sighash(&tx, &script(), 0, forked), manual_all_digest(&tx, 0, 0x41));
        assert_ne!(
            tx_sighash(&tx, &script(), 0, forked),
            tx_sighash(&tx, &script(), 0, SigHash::all())
        );
    }

    #[test]
    fn none_drops_outputs_and_zeroes_sequences() {
        let tx = sample_tx(2, 3);
        let mut copy = tx.clone();
        copy.outputs.clear();
        copy.inputs[0].script_sig = script();
        copy.inputs[1].script_sig.clear();
        copy.inputs[1].sequence = 0;
        let mut bytes = copy.to_bytes();
        bytes.extend_from_slice(&[0x02, 0, 0, 0]);

        let sh = SigHash::new(SigHashType::None, false, false);
        assert_eq!(tx_sighash(&tx, &script(), 0, sh), sha256d(&bytes));
    }

    #[test]
    fn single_blanks_preceding_outputs() {
        let tx = sample_tx(3, 3);
        let mut copy = tx.clone();
        copy.outputs = vec![blank_output(), tx.outputs[1].clone()];
        for (i, input) in copy.inputs.iter_mut().enumerate() {
            if i == 1 {
                input.script_sig = script();
            } else {
                input.script_sig.clear();
                input.sequence = 0;
            }
        }
        let mut bytes = copy.to_bytes();
        bytes.extend_from_slice(&[0x03, 0, 0, 0]);

        let sh = SigHash::new(SigHashType::Single, false, false);
        assert_eq!(tx_sighash(&tx, &script(), 1, sh), sha256d(&bytes));
    }

    #[test]
    fn anyone_can_pay_keeps_single_input() {
        let tx = sample_tx(3, 2);
        let mut copy = tx.clone();
        let mut own = copy.inputs.remove(2);
        own.script_sig = script();
        copy.inputs = vec![own];
        let mut bytes = copy.to_bytes();
        bytes.extend_from_slice(&[0x81, 0, 0, 0]);

        let sh = SigHash::all().with_anyone_can_pay(true);
        assert_eq!(tx_sighash(&tx, &script(), 2, sh), sha256d(&bytes));
    }

    #[test]
    fn anyone_can_pay_ignores_other_inputs() {
        let tx = sample_tx(2, 2);
        let mut other = tx.clone();
        other.inputs[1].previous_output.index = 99;
        let sh = SigHash::all().with_anyone_can_pay(true);
        assert_eq!(
            tx_sighash(&tx, &script(), 0, sh),
            tx_sighash(&other, &script(), 0, sh)
        );
        assert_ne!(
            tx_sighash(&tx, &script(), 0, SigHash::all()),
            tx_sighash(&other, &script(), 0, SigHash::all())
        );
    }

    #[test]
    fn existing_unlocking_scripts_do_not_matter() {
        let tx = sample_tx(2, 1);
        let mut signed = tx.clone();
        signed.inputs[1].script_sig = vec![0x01; 100];
        assert_eq!(
            tx_sighash(&tx, &script(), 0, SigHash::all()),
            tx_sighash(&signed, &script(), 0, SigHash::all())
        );
    }

    #[test]
    fn deterministic() {
        let tx = sample_tx(2, 2);
        let a = tx_sighash(&tx, &script(), 1, SigHash::all());
        let b = tx_sighash(&tx.clone(), &script(), 1, SigHash::all());
        assert_eq!(a, b);
    }
}
