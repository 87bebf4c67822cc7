// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

extern crate bech32;
extern crate lightning_bolt11_decoder;

use bech32::primitives::iter::Fe32IterExt;
use bech32::{Fe32, Hrp};
use lightning_bolt11_decoder::{verify_signature, Bolt11Bech32, Bolt11Invoice};

/// Any byte string is turned into a correctly checksummed invoice, so the fuzzer spends its time
/// in the field decoders rather than on the checksum.
fn do_test(data: &[u8]) {
	// Read a fake HRP length byte
	let (hrp_len, rest) = match data.split_first() {
		Some((len, rest)) => (core::cmp::min(*len as usize, rest.len()), rest),
		None => return,
	};
	let hrp = match core::str::from_utf8(&rest[..hrp_len]).ok().and_then(|s| Hrp::parse(s).ok()) {
		Some(hrp) => hrp,
		None => return,
	};
	let symbols = rest[hrp_len..]
		.iter()
		.map(|x| Fe32::try_from(x % 32).unwrap())
		.collect::<Vec<_>>();
	let encoded = symbols.iter().copied().with_checksum::<Bolt11Bech32>(&hrp).chars().collect::<String>();

	let invoice = encoded.parse::<Bolt11Invoice>();
	let verified = verify_signature(&encoded, "02eec7245d6b7d2ccb30380bfbe2a3648cd7a942653f5aa340edcea1f283686619");

	if let Ok(invoice) = invoice {
		// Anything that decodes has a signature that can at least be checked
		assert!(verified.is_ok());
		let _ = invoice.hrp_string();
		let _ = invoice.amount_milli_satoshis();
		let _ = invoice.expires_at();
		let _ = invoice.recover_payee_pub_key();
		for warning in invoice.warnings() {
			let _ = warning.to_string();
		}
	}
}

#[cfg(feature = "afl")]
#[macro_use]
extern crate afl;
#[cfg(feature = "afl")]
fn main() {
	fuzz!(|data| {
		do_test(&data);
	});
}

#[cfg(feature = "honggfuzz")]
#[macro_use]
extern crate honggfuzz;
#[cfg(feature = "honggfuzz")]
fn main() {
	loop {
		fuzz!(|data| {
			do_test(data);
		});
	}
}
