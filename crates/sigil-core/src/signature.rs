//! Signature blobs as they appear in unlocking scripts.
//!
//! A blob is a DER-encoded ECDSA signature followed by exactly one SigHash
//! byte. [`decode_sig`] accepts anything a lax DER parser understands;
//! [`decode_canonical_sig`] additionally enforces strict DER, a low S value
//! and a known type code, so that signatures from untrusted co-signers cannot
//! be malleated.

use secp256k1::ecdsa::Signature;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SignatureError;
use crate::sighash::{SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_FORKID, SIGHASH_SINGLE, SigHash};

/// A signature together with the SigHash it was produced under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxSignature {
    pub signature: Signature,
    pub sighash: SigHash,
}

impl TxSignature {
    pub fn new(signature: Signature, sighash: SigHash) -> Self {
        Self { signature, sighash }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_sig(self)
    }
}

/// DER signature bytes followed by the SigHash byte.
pub fn encode_sig(sig: &TxSignature) -> Vec<u8> {
    let der = sig.signature.serialize_der();
    let mut out = Vec::with_capacity(der.len() + 1);
    out.extend_from_slice(&der);
    out.push(sig.sighash.to_byte());
    out
}

/// Split off the trailing SigHash byte and parse both parts.
pub fn decode_sig(bytes: &[u8]) -> Result<TxSignature, SignatureError> {
    let (&last, der) = bytes.split_last().ok_or(SignatureError::Empty)?;
    let signature =
        Signature::from_der_lax(der).map_err(|e| SignatureError::Malformed(e.to_string()))?;
    Ok(TxSignature::new(signature, SigHash::from_byte(last)))
}

/// Decode a signature blob, rejecting anything malleable.
pub fn decode_canonical_sig(bytes: &[u8]) -> Result<TxSignature, SignatureError> {
    let (&last, der) = bytes.split_last().ok_or(SignatureError::Empty)?;

    // Both flag bits are stripped, so forkId and anyoneCanPay variants of
    // ALL, NONE and SINGLE are accepted.
    let code = last & !(SIGHASH_FORKID | SIGHASH_ANYONECANPAY);
    if !(SIGHASH_ALL..=SIGHASH_SINGLE).contains(&code) {
        return Err(non_canonical("unknown hashtype"));
    }

    let signature = Signature::from_der(der).map_err(|_| non_canonical("could not parse signature"))?;
    let mut normalized = signature;
    normalized.normalize_s();
    if normalized != signature {
        return Err(non_canonical("could not parse signature"));
    }

    Ok(TxSignature::new(signature, SigHash::from_byte(last)))
}

fn non_canonical(reason: &str) -> SignatureError {
    SignatureError::NonCanonical {
        reason: reason.to_string(),
    }
}

impl Serialize for TxSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(encode_sig(self)))
    }
}

impl<'de> Deserialize<'de> for TxSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        decode_sig(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, sha256d};
    use crate::sighash::SigHashType;

    fn sample() -> TxSignature {
        let kp = KeyPair::from_secret_bytes(&[0x11; 32]).unwrap();
        TxSignature::new(kp.sign_digest(&sha256d(b"msg")), SigHash::all())
    }

    fn with_byte(byte: u8) -> Vec<u8> {
        let mut bytes = encode_sig(&sample());
        *bytes.last_mut().unwrap() = byte;
        bytes
    }

    #[test]
    fn encoding_appends_sighash_byte() {
        let sig = sample();
        let bytes = encode_sig(&sig);
        assert_eq!(bytes[0], 0x30);
        assert_eq!(*bytes.last().unwrap(), 0x01);
        assert_eq!(&bytes[..bytes.len() - 1], &*sig.signature.serialize_der());
    }

    #[test]
    fn decode_inverts_encode() {
        let sig = TxSignature {
            sighash: SigHash::new(SigHashType::Single, true, true),
            ..sample()
        };
        assert_eq!(decode_sig(&encode_sig(&sig)).unwrap(), sig);
        assert_eq!(decode_canonical_sig(&encode_sig(&sig)).unwrap(), sig);
    }

    #[test]
    fn empty_rejected() {
        assert_eq!(decode_sig(&[]), Err(SignatureError::Empty));
        assert_eq!(decode_canonical_sig(&[]), Err(SignatureError::Empty));
    }

    #[test]
    fn garbage_der_rejected() {
        assert!(matches!(
            decode_sig(&[0x30, 0x01, 0x01]),
            Err(SignatureError::Malformed(_))
        ));
        assert_eq!(
            decode_canonical_sig(&[0x30, 0x01, 0x01]).unwrap_err().to_string(),
            "Non-canonical signature: could not parse signature"
        );
    }

    #[test]
    fn lax_decode_accepts_unknown_hashtype() {
        let sig = decode_sig(&with_byte(0x04)).unwrap();
        assert_eq!(sig.sighash.ty, SigHashType::Unknown(4));
    }

    #[test]
    fn canonical_rejects_unknown_hashtypes() {
        for byte in [0x00, 0x04, 0x80, 0xc4, 0x3f, 0xff] {
            assert_eq!(
                decode_canonical_sig(&with_byte(byte)).unwrap_err(),
                SignatureError::NonCanonical {
                    reason: "unknown hashtype".into()
                },
                "byte {byte:#04x}"
            );
        }
    }

    #[test]
    fn canonical_accepts_flagged_named_types() {
        for code in 1..=3u8 {
            for flags in [0x00, 0x40, 0x80, 0xc0] {
                let byte = code | flags;
                let sig = decode_canonical_sig(&with_byte(byte)).unwrap();
                assert_eq!(sig.sighash.to_byte(), byte);
            }
        }
    }

    #[test]
    fn canonical_rejects_high_s() {
        let sig = sample();
        // Negate s by rebuilding the compact form with s' = n - s.
        let compact = sig.signature.serialize_compact();
        let order: [u8; 32] = secp256k1::constants::CURVE_ORDER;
        let mut high = compact;
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let diff = order[i] as i16 - compact[32 + i] as i16 - borrow;
            borrow = i16::from(diff < 0);
            high[32 + i] = diff.rem_euclid(256) as u8;
        }
        let high_sig = Signature::from_compact(&high).unwrap();
        let mut blob = high_sig.serialize_der().to_vec();
        blob.push(0x01);

        assert!(decode_sig(&blob).is_ok());
        assert_eq!(
            decode_canonical_sig(&blob).unwrap_err().to_string(),
            "Non-canonical signature: could not parse signature"
        );
    }

    #[test]
    fn serde_as_hex() {
        let sig = sample();
        let json = serde_json::to_string(&sig).unwrap();
        assert!(json.starts_with("\"30"));
        let back: TxSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
