// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Conversion between 5-bit symbols and byte-aligned buffers.
//!
//! Invoice fields are measured in symbols while their contents are bytes, so every field decoder
//! goes through [`pack_symbols`]. The bech32 checksum itself is handled by the `bech32` crate.

use bech32::Fe32;

#[allow(unused_imports)]
use crate::prelude::*;

/// Iterator adaptor that packs 5-bit symbols to bytes, most significant bit first.
///
/// With `trim` set, a trailing partial byte (the padding bits left over when the total number of
/// bits is not a multiple of 8) is dropped. Otherwise it is emitted, zero-extended on the right.
#[derive(Clone, PartialEq, Eq)]
pub struct SymbolPacker<I: Iterator<Item = Fe32>> {
	remain_bits: u32,
	remain: u16,
	trim: bool,
	iter: I,
}

impl<I> SymbolPacker<I>
where
	I: Iterator<Item = Fe32>,
{
	/// Wraps an iterator of symbols.
	pub fn new(iter: I, trim: bool) -> Self {
		Self { remain_bits: 0, remain: 0, trim, iter }
	}
}

impl<I> Iterator for SymbolPacker<I>
where
	I: Iterator<Item = Fe32>,
{
	type Item = u8;

	fn next(&mut self) -> Option<u8> {
		// We may need to read two symbols to produce a byte
		loop {
			match self.iter.next() {
				Some(fe) => {
					// at most 7 carried bits plus 5 new ones, fits in 12 bits
					self.remain = (self.remain << 5) | fe.to_u8() as u16;
					self.remain_bits += 5;
					if self.remain_bits >= 8 {
						self.remain_bits -= 8;
						let out = (self.remain >> self.remain_bits) as u8;
						self.remain &= (1 << self.remain_bits) - 1;
						return Some(out);
					}
				},
				None => {
					if self.remain_bits == 0 || self.trim {
						return None;
					}
					let out = (self.remain << (8 - self.remain_bits)) as u8;
					self.remain_bits = 0;
					self.remain = 0;
					return Some(out);
				},
			}
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let carried = self.remain_bits as usize;
		let to_len = |n: usize| {
			let bits = carried + n * 5;
			if self.trim { bits / 8 } else { (bits + 7) / 8 }
		};
		let (min, max) = self.iter.size_hint();
		(to_len(min), max.map(to_len))
	}
}

/// Packs `symbols` into bytes. See [`SymbolPacker`] for the meaning of `trim`.
pub fn pack_symbols(symbols: &[Fe32], trim: bool) -> Vec<u8> {
	SymbolPacker::new(symbols.iter().copied(), trim).collect()
}

/// Unpacks bytes into 5-bit symbols. If the total number of bits is not a multiple of 5 the last
/// symbol is right-padded with zero bits.
pub fn unpack_bytes(bytes: &[u8]) -> Vec<Fe32> {
	let mut unpacked = Vec::with_capacity((bytes.len() * 8 + 4) / 5);
	let mut acc: u16 = 0;
	let mut acc_bits = 0u32;
	for byte in bytes {
		acc = (acc << 8) | *byte as u16;
		acc_bits += 8;
		while acc_bits >= 5 {
			acc_bits -= 5;
			unpacked.push(Fe32::try_from((acc >> acc_bits) as u8 & 0x1f).expect("masked to 5 bits"));
		}
		acc &= (1 << acc_bits) - 1;
	}
	if acc_bits > 0 {
		unpacked.push(Fe32::try_from((acc << (5 - acc_bits)) as u8 & 0x1f).expect("masked to 5 bits"));
	}
	unpacked
}

/// Reads `symbols` as one big-endian unsigned integer, five bits per symbol. Returns `None` if
/// the value does not fit in a `u64`.
pub(crate) fn parse_int_be(symbols: &[Fe32]) -> Option<u64> {
	symbols.iter().try_fold(0u64, |acc, fe| {
		acc.checked_mul(32).and_then(|x| x.checked_add(fe.to_u8() as u64))
	})
}
