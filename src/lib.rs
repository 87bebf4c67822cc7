// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(missing_docs)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

//! This crate decodes
//! [lightning BOLT11](https://github.com/lightning/bolts/blob/master/11-payment-encoding.md)
//! invoices into a typed [`Bolt11Invoice`] and checks the signatures they carry.
//!
//!   * For decoding use `str::parse::<Bolt11Invoice>(&self)` (see the docs of
//!     `impl FromStr for Bolt11Invoice`), or [`Bolt11Invoice::from_str_with_logger`] to also
//!     have skipped fields reported to a [`Logger`].
//!   * For checking an invoice against a known payee key use [`verify_signature`] or
//!     [`Bolt11Invoice::check_signature`].
//!
//! Encoding invoices is not supported.
//!
//! [`Logger`]: crate::util::logger::Logger

extern crate alloc;
extern crate bech32;
extern crate bitcoin;
#[cfg(any(test, feature = "std"))]
extern crate core;
#[cfg(feature = "serde")]
extern crate serde;

#[macro_use]
pub mod util;

mod de;
mod signature;

pub use crate::signature::verify_signature;

#[cfg(feature = "std")]
use std::time::SystemTime;

use bech32::primitives::decode::CheckedHrpstringError;
use bech32::{Checksum, Fe32};

use core::fmt::{self, Display, Formatter};
use core::num::ParseIntError;
use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{de::Error, Deserialize, Deserializer};

mod prelude {
	pub use alloc::{string::String, vec::Vec};

	pub use alloc::string::ToString;
}

use crate::prelude::*;

/// Errors that indicate what is wrong with the invoice. They have some granularity for debug
/// reasons, but should generally result in an "invalid BOLT11 invoice" message for the user.
///
/// Any of these aborts decoding as a whole. Fields which are merely not understood are reported
/// as [`DecodeWarning`]s on the decoded invoice instead.
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Bolt11ParseError {
	Bech32Error(CheckedHrpstringError),
	ParseAmountError(ParseIntError),
	MalformedHRP,
	UnknownCurrency,
	UnknownSiPrefix,
	TooShortDataPart,
	UnexpectedEndOfTaggedFields,
	IntegerOverflowError,
	InvalidRoutingHintLength,
}

/// The number of bits used to represent timestamps as defined in BOLT 11.
const TIMESTAMP_BITS: usize = 35;

/// The maximum timestamp as [`Duration::as_secs`] since the Unix epoch allowed by [`BOLT 11`].
///
/// [BOLT 11]: https://github.com/lightning/bolts/blob/master/11-payment-encoding.md
pub const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;

/// Number of 5-bit symbols the timestamp occupies at the start of the data part.
pub const TIMESTAMP_LEN: usize = 7;

/// Number of 5-bit symbols the recoverable signature occupies at the end of the data part.
pub const SIGNATURE_LEN: usize = 104;

/// Default expiry time as defined by [BOLT 11].
///
/// [BOLT 11]: https://github.com/lightning/bolts/blob/master/11-payment-encoding.md
pub const DEFAULT_EXPIRY_TIME: u64 = 3600;

/// Default minimum final CLTV expiry as defined by [BOLT 11].
///
/// [BOLT 11]: https://github.com/lightning/bolts/blob/master/11-payment-encoding.md
pub const DEFAULT_MIN_FINAL_CLTV_EXPIRY: u64 = 9;

/// Size in bytes of one encoded routing hint hop.
pub const ROUTING_HINT_LEN: usize = 51;

/// The amount encoded in the human readable part, before the multiplier is applied.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Amount {
	/// No digits were present, the payer chooses the amount.
	Unspecified,
	/// The raw number as written in the invoice.
	Specified(u64),
}

impl Amount {
	/// Returns the raw number, if one was present.
	pub fn value(&self) -> Option<u64> {
		match *self {
			Amount::Unspecified => None,
			Amount::Specified(v) => Some(v),
		}
	}
}

/// SI prefixes for the human readable part
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum SiPrefix {
	/// 10^-3
	Milli,
	/// 10^-6
	Micro,
	/// 10^-9
	Nano,
	/// 10^-12
	Pico,
}

impl SiPrefix {
	/// Returns the multiplier to go from a BTC value to picoBTC implied by this SiPrefix.
	/// This is effectively 10^12 * the prefix multiplier
	pub fn multiplier(&self) -> u64 {
		match *self {
			SiPrefix::Milli => 1_000_000_000,
			SiPrefix::Micro => 1_000_000,
			SiPrefix::Nano => 1_000,
			SiPrefix::Pico => 1,
		}
	}

	/// The suffix letter used in the human readable part.
	pub fn as_char(&self) -> char {
		match *self {
			SiPrefix::Milli => 'm',
			SiPrefix::Micro => 'u',
			SiPrefix::Nano => 'n',
			SiPrefix::Pico => 'p',
		}
	}
}

/// Enum representing the crypto currencies (or networks) supported by this library
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Currency {
	/// Bitcoin mainnet
	Bitcoin,

	/// Bitcoin testnet
	BitcoinTestnet,

	/// Bitcoin regtest
	Regtest,

	/// Bitcoin simnet
	Simnet,

	/// Bitcoin signet
	Signet,
}

impl Currency {
	/// Version byte prepended to a public key hash to form a legacy (P2PKH) address.
	pub fn pubkey_hash_version(&self) -> u8 {
		match *self {
			Currency::Bitcoin => 0x00,
			Currency::BitcoinTestnet | Currency::Regtest | Currency::Signet => 0x6f,
			Currency::Simnet => 0x3f,
		}
	}

	/// Version byte prepended to a script hash to form a P2SH address.
	pub fn script_hash_version(&self) -> u8 {
		match *self {
			Currency::Bitcoin => 0x05,
			Currency::BitcoinTestnet | Currency::Regtest | Currency::Signet => 0xc4,
			Currency::Simnet => 0x7b,
		}
	}
}

/// Tag constants as specified in BOLT11
#[allow(missing_docs)]
pub mod constants {
	pub const TAG_PAYMENT_HASH: u8 = 1;
	pub const TAG_DESCRIPTION: u8 = 13;
	pub const TAG_PAYEE_PUB_KEY: u8 = 19;
	pub const TAG_DESCRIPTION_HASH: u8 = 23;
	pub const TAG_EXPIRY_TIME: u8 = 6;
	pub const TAG_MIN_FINAL_CLTV_EXPIRY: u8 = 24;
	pub const TAG_FALLBACK: u8 = 9;
	pub const TAG_PRIVATE_ROUTE: u8 = 3;
	pub const TAG_PAYMENT_SECRET: u8 = 16;
}

/// Bech32 checksum with extended code length for BOLT11 invoices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bolt11Bech32 {}

impl Checksum for Bolt11Bech32 {
	/// Extend the max length from the 1023 bytes default.
	const CODE_LENGTH: usize = 7089;
	type MidstateRepr = u32;
	const CHECKSUM_LENGTH: usize = bech32::Bech32::CHECKSUM_LENGTH;
	const GENERATOR_SH: [u32; 5] = bech32::Bech32::GENERATOR_SH;
	const TARGET_RESIDUE: u32 = bech32::Bech32::TARGET_RESIDUE;
}

/// Recoverable signature in its raw encoded form: 64 bytes of compact signature (`r` followed by
/// `s`) and one byte of recovery id.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct InvoiceSignature(pub [u8; 65]);

/// One hop of a private route, pointing the payer at a channel it can't learn from gossip.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct RoutingHint {
	/// Compressed public key of the node at the start of the channel.
	pub src_node_id: [u8; 33],
	/// The short channel id of the channel.
	pub short_channel_id: u64,
	/// Flat routing fee in millisatoshis.
	pub fee_base_msat: u32,
	/// Liquidity-based routing fee in millionths of a routed amount.
	pub fee_proportional_millionths: u32,
	/// The difference in CLTV values between this node and the next node.
	pub cltv_expiry_delta: u16,
}

impl RoutingHint {
	/// Parses [`Self::src_node_id`] as a public key.
	pub fn node_id(&self) -> Result<bitcoin::secp256k1::PublicKey, bitcoin::secp256k1::Error> {
		bitcoin::secp256k1::PublicKey::from_slice(&self.src_node_id)
	}
}

/// Something the decoder skipped over without failing. The affected field is left unset.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum DecodeWarning {
	/// A tagged field with a type this library doesn't know about.
	UnknownTag {
		/// The type of the field.
		tag: u8,
		/// The field's raw data.
		data: Vec<Fe32>,
	},
	/// A field whose data is too short to hold its value, or too long in the case of the expiry.
	InvalidFieldLength {
		/// The type of the field.
		tag: u8,
		/// The declared length of the field, in 5-bit symbols.
		data_length: usize,
	},
	/// A description that is not valid UTF-8.
	InvalidDescription {
		/// Number of bytes that were valid before the first bad sequence.
		valid_up_to: usize,
	},
	/// A P2PKH or P2SH fallback address whose hash is not 20 bytes long.
	InvalidFallbackHashLength {
		/// The version symbol, 17 or 18.
		version: u8,
		/// The length of the hash, in bytes.
		hash_length: usize,
	},
	/// A fallback address given as a witness program, which can't be turned into an address here.
	SegWitFallback {
		/// The witness version.
		version: u8,
	},
	/// A fallback address with a version that is neither a witness version nor P2PKH/P2SH.
	UnsupportedFallbackVersion {
		/// The version symbol.
		version: u8,
	},
	/// A fallback address in an invoice whose prefix names no known network.
	UnknownNetwork {
		/// The prefix of the invoice.
		prefix: String,
	},
}

impl Display for DecodeWarning {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match *self {
			DecodeWarning::UnknownTag { tag, ref data } => {
				write!(f, "unknown tagged field {} with data [{}]", tag, log_symbols!(data[..]))
			},
			DecodeWarning::InvalidFieldLength { tag, data_length } => {
				write!(f, "tagged field {} has an invalid length ({} symbols)", tag, data_length)
			},
			DecodeWarning::InvalidDescription { valid_up_to } => {
				write!(f, "description is not valid utf-8 after byte {}", valid_up_to)
			},
			DecodeWarning::InvalidFallbackHashLength { version, hash_length } => {
				write!(f, "fallback address (version {}) has a {} byte hash, expected 20", version, hash_length)
			},
			DecodeWarning::SegWitFallback { version } => {
				write!(f, "segwit fallback address (version {}) is not supported", version)
			},
			DecodeWarning::UnsupportedFallbackVersion { version } => {
				write!(f, "unsupported fallback address version {}", version)
			},
			DecodeWarning::UnknownNetwork { ref prefix } => {
				write!(f, "no known network for prefix {}, fallback address skipped", prefix)
			},
		}
	}
}

/// Represents a decoded lightning BOLT11 invoice.
///
/// The signature is not checked while decoding; see [`Bolt11Invoice::check_signature`] and
/// [`verify_signature`].
///
/// Construct one with `str::parse::<Bolt11Invoice>(&str)` or
/// [`Bolt11Invoice::from_str_with_logger`].
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Bolt11Invoice {
	prefix: String,
	amount: Amount,
	multiplier: Option<SiPrefix>,
	timestamp: u64,
	signature: InvoiceSignature,
	/// SHA-256 over the human readable part and the signatureless data part, as encoded
	signable_hash: [u8; 32],

	payment_hash: Option<[u8; 32]>,
	description: Option<String>,
	description_hash: Option<[u8; 32]>,
	payment_secret: Option<[u8; 32]>,
	expiry: u64,
	min_final_cltv_expiry: u64,
	fallback_addr: Option<String>,
	routing_info: Vec<RoutingHint>,

	warnings: Vec<DecodeWarning>,
}

impl Bolt11Invoice {
	/// The letters of the human readable part, e.g. `lnbc`.
	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// The network derived from [`Self::prefix`], if it is a known one.
	pub fn currency(&self) -> Option<Currency> {
		de::currency_from_prefix(&self.prefix)
	}

	/// The amount as written, before applying [`Self::multiplier`].
	pub fn amount(&self) -> Amount {
		self.amount
	}

	/// The SI prefix applied to [`Self::amount`], `None` meaning whole bitcoin.
	pub fn multiplier(&self) -> Option<SiPrefix> {
		self.multiplier
	}

	/// Reassembles the human readable part from its decoded pieces.
	pub fn hrp_string(&self) -> String {
		let mut hrp = self.prefix.clone();
		if let Amount::Specified(amount) = self.amount {
			hrp.push_str(&amount.to_string());
		}
		if let Some(si) = self.multiplier {
			hrp.push(si.as_char());
		}
		hrp
	}

	/// Returns the amount in pico bitcoin, `None` if no amount was given or it doesn't fit.
	pub fn amount_pico_btc(&self) -> Option<u64> {
		let multiplier = self.multiplier.as_ref().map_or(1_000_000_000_000, |si| si.multiplier());
		self.amount.value().and_then(|v| v.checked_mul(multiplier))
	}

	/// Returns the amount in millisatoshis, rounding sub-millisatoshi amounts down.
	pub fn amount_milli_satoshis(&self) -> Option<u64> {
		self.amount_pico_btc().map(|v| v / 10)
	}

	/// Returns the Unix timestamp of the invoice's creation.
	pub fn timestamp(&self) -> u64 {
		self.timestamp
	}

	/// Returns the invoice's creation time as a duration since the Unix epoch.
	pub fn duration_since_epoch(&self) -> Duration {
		Duration::from_secs(self.timestamp)
	}

	/// Returns the invoice's creation time as a [`SystemTime`].
	#[cfg(feature = "std")]
	pub fn timestamp_as_system_time(&self) -> SystemTime {
		SystemTime::UNIX_EPOCH + self.duration_since_epoch()
	}

	/// The raw signature of the invoice.
	pub fn signature(&self) -> &InvoiceSignature {
		&self.signature
	}

	/// The hash the signature commits to.
	pub fn signable_hash(&self) -> &[u8; 32] {
		&self.signable_hash
	}

	/// The hash of the payment preimage.
	pub fn payment_hash(&self) -> Option<&[u8; 32]> {
		self.payment_hash.as_ref()
	}

	/// The payment's description, if given in full.
	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	/// The SHA-256 of a description given out of band.
	pub fn description_hash(&self) -> Option<&[u8; 32]> {
		self.description_hash.as_ref()
	}

	/// The secret the payer has to forward to the payee.
	pub fn payment_secret(&self) -> Option<&[u8; 32]> {
		self.payment_secret.as_ref()
	}

	/// Seconds after [`Self::timestamp`] at which the invoice expires.
	pub fn expiry(&self) -> u64 {
		self.expiry
	}

	/// Returns the invoice's expiry time as a [`Duration`].
	pub fn expiry_time(&self) -> Duration {
		Duration::from_secs(self.expiry)
	}

	/// Returns the duration since the Unix epoch at which the invoice expires, `None` on overflow.
	pub fn expires_at(&self) -> Option<Duration> {
		self.duration_since_epoch().checked_add(self.expiry_time())
	}

	/// Returns whether the invoice has expired.
	#[cfg(feature = "std")]
	pub fn is_expired(&self) -> bool {
		match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
			Ok(now) => self.would_expire(now),
			Err(_) => false,
		}
	}

	/// Returns whether the expiry time would pass at the given point in time.
	/// `at_time` is the timestamp as a duration since the Unix epoch.
	pub fn would_expire(&self, at_time: Duration) -> bool {
		self.expires_at().map_or(false, |expires_at| at_time > expires_at)
	}

	/// The minimum CLTV delta for the last hop. Always [`DEFAULT_MIN_FINAL_CLTV_EXPIRY`]: the
	/// field carrying it is recognised but not decoded.
	pub fn min_final_cltv_expiry(&self) -> u64 {
		self.min_final_cltv_expiry
	}

	/// The on-chain fallback address, if a legacy one was given.
	pub fn fallback_addr(&self) -> Option<&str> {
		self.fallback_addr.as_deref()
	}

	/// Private route hints, in the order they appear in the invoice.
	pub fn routing_info(&self) -> &[RoutingHint] {
		&self.routing_info
	}

	/// Fields that were skipped while decoding.
	pub fn warnings(&self) -> &[DecodeWarning] {
		&self.warnings
	}
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Bolt11Invoice {
	fn deserialize<D>(deserializer: D) -> Result<Bolt11Invoice, D::Error>
	where
		D: Deserializer<'de>,
	{
		let bolt11 = String::deserialize(deserializer)?
			.parse::<Bolt11Invoice>()
			.map_err(|e| D::Error::custom(format_args!("{:?}", e)))?;

		Ok(bolt11)
	}
}
