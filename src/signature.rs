// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Checking the signature an invoice carries.

use bech32::Fe32;

use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1;
use bitcoin::secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use bitcoin::secp256k1::{Message, PublicKey, Secp256k1};

use core::str::FromStr;

use crate::de::decode_wrapper;
use crate::prelude::*;
use crate::util::bech32::pack_symbols;
use crate::{Bolt11Invoice, Bolt11ParseError, InvoiceSignature, SIGNATURE_LEN};

/// Hashes the lowercase human readable part followed by the data part without its signature,
/// zero-padded to whole bytes.
pub(crate) fn signable_hash(hrp: &str, data_without_signature: &[Fe32]) -> [u8; 32] {
	let mut preimage = Vec::<u8>::from(hrp.as_bytes());
	preimage.extend_from_slice(&pack_symbols(data_without_signature, false));
	sha256::Hash::hash(&preimage).to_byte_array()
}

impl InvoiceSignature {
	pub(crate) fn from_symbols(signature: &[Fe32]) -> Result<Self, Bolt11ParseError> {
		if signature.len() != SIGNATURE_LEN {
			return Err(Bolt11ParseError::TooShortDataPart);
		}
		// 104 symbols are exactly 65 bytes
		let mut raw = [0u8; 65];
		raw.copy_from_slice(&pack_symbols(signature, true));
		Ok(InvoiceSignature(raw))
	}

	/// The recovery id byte following the compact signature.
	pub fn recovery_id(&self) -> u8 {
		self.0[64]
	}

	/// Checks the compact part of the signature over `hash` against `pub_key`. High-S signatures
	/// are normalized first. Returns false rather than an error if the signature doesn't parse.
	pub fn verify(&self, hash: &[u8; 32], pub_key: &PublicKey) -> bool {
		let mut signature = match Signature::from_compact(&self.0[..64]) {
			Ok(signature) => signature,
			Err(_) => return false,
		};
		signature.normalize_s();

		let secp_context = Secp256k1::verification_only();
		let verification_result =
			secp_context.verify_ecdsa(&Message::from_digest(*hash), &signature, pub_key);

		match verification_result {
			Ok(()) => true,
			Err(_) => false,
		}
	}

	/// Recovers the public key that produced this signature over `hash`.
	pub fn recover(&self, hash: &[u8; 32]) -> Result<PublicKey, secp256k1::Error> {
		let recovery_id = RecoveryId::from_i32(self.recovery_id() as i32)?;
		let signature = RecoverableSignature::from_compact(&self.0[..64], recovery_id)?;
		Secp256k1::verification_only().recover_ecdsa(&Message::from_digest(*hash), &signature)
	}
}

impl Bolt11Invoice {
	/// Recovers the public key used for signing the invoice from the recoverable signature.
	pub fn recover_payee_pub_key(&self) -> Result<PublicKey, secp256k1::Error> {
		self.signature.recover(&self.signable_hash)
	}

	/// Checks if the invoice was signed by `pub_key`.
	pub fn check_signature(&self, pub_key: &PublicKey) -> bool {
		self.signature.verify(&self.signable_hash, pub_key)
	}
}

/// Checks the signature of an encoded invoice against a hex encoded public key, without decoding
/// any of its fields.
///
/// Fails only if the bech32 wrapper can't be decoded or is too short to hold a signature. A
/// signature that doesn't match, or a key or signature that doesn't parse, gives `Ok(false)`.
///
/// ```
/// use lightning_bolt11_decoder::verify_signature;
///
/// let invoice = "lnbc2500u1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5q\
/// qqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdq5xysxxatsyp3k7enxv4jsxqzpu9qrsgquk0rl77nj\
/// 30yxdy8j9vdx85fkpmdla2087ne0xh8nhedh8w27kyke0lp53ut353s06fv3qfegext0eh0ymjpf39tuven09sam30g4vg\
/// pfna3rh";
/// let pub_key = "03e7156ae33b0a208d0744199163177e909e80176e55d97a2f221ede0f934dd9ad";
///
/// assert_eq!(verify_signature(invoice, pub_key), Ok(true));
/// ```
pub fn verify_signature(invoice: &str, pub_key_hex: &str) -> Result<bool, Bolt11ParseError> {
	let (hrp, data) = decode_wrapper(invoice)?;

	if data.len() < SIGNATURE_LEN {
		return Err(Bolt11ParseError::TooShortDataPart);
	}

	let (data_part, signature) = data.split_at(data.len() - SIGNATURE_LEN);
	let hash = signable_hash(&hrp, data_part);
	let signature = InvoiceSignature::from_symbols(signature)?;

	let pub_key = match PublicKey::from_str(pub_key_hex) {
		Ok(pub_key) => pub_key,
		Err(_) => return Ok(false),
	};

	Ok(signature.verify(&hash, &pub_key))
}
