// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

#[cfg(feature = "std")]
use std::error;
use core::fmt;
use core::fmt::{Display, Formatter};
use core::num::ParseIntError;
use core::ops::Deref;
use core::str;
use core::str::FromStr;

use bech32::primitives::decode::{CheckedHrpstring, CheckedHrpstringError};
use bech32::Fe32;

use crate::prelude::*;
use crate::signature::signable_hash;
use crate::util::bech32::{pack_symbols, parse_int_be};
use crate::util::logger::{Logger, Record};

use super::{constants, Amount, Bolt11Bech32, Bolt11Invoice, Bolt11ParseError, Currency,
	DecodeWarning, InvoiceSignature, RoutingHint, SiPrefix, DEFAULT_EXPIRY_TIME,
	DEFAULT_MIN_FINAL_CLTV_EXPIRY, ROUTING_HINT_LEN, SIGNATURE_LEN, TIMESTAMP_LEN};

use self::hrp_sm::parse_hrp;

/// State machine to parse the hrp
mod hrp_sm {
	use core::ops::Range;

	#[derive(PartialEq, Eq, Debug)]
	enum States {
		Start,
		ParsePrefix,
		ParseAmountNumber,
		ParseAmountSiPrefix,
	}

	impl States {
		fn next_state(&self, read_symbol: char) -> Result<States, super::Bolt11ParseError> {
			match *self {
				States::Start => {
					if read_symbol.is_ascii_alphabetic() {
						Ok(States::ParsePrefix)
					} else {
						Err(super::Bolt11ParseError::MalformedHRP)
					}
				},
				States::ParsePrefix => {
					if read_symbol.is_ascii_alphabetic() {
						Ok(States::ParsePrefix)
					} else if read_symbol.is_ascii_digit() {
						Ok(States::ParseAmountNumber)
					} else {
						Err(super::Bolt11ParseError::MalformedHRP)
					}
				},
				States::ParseAmountNumber => {
					if read_symbol.is_ascii_digit() {
						Ok(States::ParseAmountNumber)
					} else if ['m', 'u', 'n', 'p'].contains(&read_symbol) {
						Ok(States::ParseAmountSiPrefix)
					} else if read_symbol.is_ascii_alphabetic() {
						Err(super::Bolt11ParseError::UnknownSiPrefix)
					} else {
						Err(super::Bolt11ParseError::MalformedHRP)
					}
				},
				States::ParseAmountSiPrefix => Err(super::Bolt11ParseError::MalformedHRP),
			}
		}

		fn is_final(&self) -> bool {
			*self != States::Start
		}
	}

	struct StateMachine {
		state: States,
		position: usize,
		prefix: Option<Range<usize>>,
		amount_number: Option<Range<usize>>,
		amount_si_prefix: Option<Range<usize>>,
	}

	impl StateMachine {
		fn new() -> StateMachine {
			StateMachine {
				state: States::Start,
				position: 0,
				prefix: None,
				amount_number: None,
				amount_si_prefix: None,
			}
		}

		fn update_range(range: &mut Option<Range<usize>>, position: usize) {
			let new_range = match *range {
				None => Range { start: position, end: position + 1 },
				Some(ref r) => Range { start: r.start, end: r.end + 1 },
			};
			*range = Some(new_range);
		}

		fn step(&mut self, c: char) -> Result<(), super::Bolt11ParseError> {
			let next_state = self.state.next_state(c)?;
			match next_state {
				States::ParsePrefix => StateMachine::update_range(&mut self.prefix, self.position),
				States::ParseAmountNumber => {
					StateMachine::update_range(&mut self.amount_number, self.position)
				},
				States::ParseAmountSiPrefix => {
					StateMachine::update_range(&mut self.amount_si_prefix, self.position)
				},
				States::Start => {},
			}

			// only ASCII moves the machine forward, so chars and bytes line up
			self.position += 1;
			self.state = next_state;
			Ok(())
		}
	}

	/// Splits the human readable part into prefix letters, amount digits and SI prefix.
	pub fn parse_hrp(input: &str) -> Result<(&str, &str, &str), super::Bolt11ParseError> {
		let mut sm = StateMachine::new();
		for c in input.chars() {
			sm.step(c)?;
		}

		if !sm.state.is_final() {
			return Err(super::Bolt11ParseError::MalformedHRP);
		}

		let prefix = sm.prefix.clone().map(|r| &input[r]).unwrap_or("");
		let amount = sm.amount_number.clone().map(|r| &input[r]).unwrap_or("");
		let si = sm.amount_si_prefix.clone().map(|r| &input[r]).unwrap_or("");

		Ok((prefix, amount, si))
	}
}

impl FromStr for super::Currency {
	type Err = Bolt11ParseError;

	fn from_str(currency_prefix: &str) -> Result<Self, Bolt11ParseError> {
		match currency_prefix {
			"bc" => Ok(Currency::Bitcoin),
			"tb" => Ok(Currency::BitcoinTestnet),
			"bcrt" => Ok(Currency::Regtest),
			"sb" => Ok(Currency::Simnet),
			"tbs" => Ok(Currency::Signet),
			_ => Err(Bolt11ParseError::UnknownCurrency),
		}
	}
}

impl FromStr for SiPrefix {
	type Err = Bolt11ParseError;

	fn from_str(currency_prefix: &str) -> Result<Self, Bolt11ParseError> {
		use crate::SiPrefix::*;
		match currency_prefix {
			"m" => Ok(Milli),
			"u" => Ok(Micro),
			"n" => Ok(Nano),
			"p" => Ok(Pico),
			_ => Err(Bolt11ParseError::UnknownSiPrefix),
		}
	}
}

/// Maps an invoice prefix such as `lntb` to its network.
pub(crate) fn currency_from_prefix(prefix: &str) -> Option<Currency> {
	prefix.strip_prefix("ln").and_then(|c| c.parse().ok())
}

/// The decoded human readable part.
#[derive(Eq, PartialEq, Debug, Clone)]
struct RawHrp {
	prefix: String,
	amount: Amount,
	si_prefix: Option<SiPrefix>,
}

impl FromStr for RawHrp {
	type Err = Bolt11ParseError;

	fn from_str(hrp: &str) -> Result<Self, <Self as FromStr>::Err> {
		let parts = parse_hrp(hrp)?;

		let amount = if !parts.1.is_empty() {
			Amount::Specified(parts.1.parse::<u64>()?)
		} else {
			Amount::Unspecified
		};

		let si_prefix: Option<SiPrefix> = if parts.2.is_empty() {
			None
		} else {
			Some(parts.2.parse()?)
		};

		Ok(RawHrp { prefix: parts.0.to_string(), amount, si_prefix })
	}
}

/// Checks the bech32 wrapper and returns the lowercase human readable part along with all data
/// symbols, signature included.
pub(crate) fn decode_wrapper(s: &str) -> Result<(String, Vec<Fe32>), Bolt11ParseError> {
	let parsed = CheckedHrpstring::new::<Bolt11Bech32>(s)?;
	let hrp = parsed.hrp().to_lowercase();
	let data = parsed.fe32_iter::<&mut dyn Iterator<Item = u8>>().collect::<Vec<Fe32>>();
	Ok((hrp, data))
}

/// Reads the 35 bit creation timestamp from its seven symbols.
fn parse_timestamp(symbols: &[Fe32]) -> Result<u64, Bolt11ParseError> {
	if symbols.len() != TIMESTAMP_LEN {
		return Err(Bolt11ParseError::TooShortDataPart);
	}
	parse_int_be(symbols).ok_or(Bolt11ParseError::IntegerOverflowError)
}

/// A tagged field as found in the data part, before its tag is interpreted.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct RawTaggedField<'a> {
	tag: u8,
	data: &'a [Fe32],
}

fn parse_tagged_parts(data: &[Fe32]) -> Result<Vec<RawTaggedField<'_>>, Bolt11ParseError> {
	let mut parts = Vec::<RawTaggedField>::new();
	let mut data = data;

	while !data.is_empty() {
		if data.len() < 3 {
			return Err(Bolt11ParseError::UnexpectedEndOfTaggedFields);
		}

		// Two symbols hold the data length, measured in symbols
		let len = ((data[1].to_u8() as usize) << 5) | data[2].to_u8() as usize;
		let last_element = 3 + len;

		if data.len() < last_element {
			return Err(Bolt11ParseError::UnexpectedEndOfTaggedFields);
		}

		parts.push(RawTaggedField { tag: data[0].to_u8(), data: &data[3..last_element] });

		// Set data slice to remaining data
		data = &data[last_element..];
	}
	Ok(parts)
}

/// Fields this library decodes. Tags without a variant are reported as
/// [`DecodeWarning::UnknownTag`].
#[derive(Eq, PartialEq, Debug, Clone)]
enum TaggedField {
	PaymentHash([u8; 32]),
	Description(String),
	DescriptionHash([u8; 32]),
	ExpiryTime(u64),
	Fallback(String),
	PrivateRoute(Vec<RoutingHint>),
	PaymentSecret([u8; 32]),
	/// Payee public key and minimum final CLTV expiry, recognised but not decoded.
	Reserved(u8),
}

/// Why a tagged field could not be used.
#[derive(Eq, PartialEq, Debug, Clone)]
enum FieldError {
	/// Leave the field unset and carry on with the next one.
	Skip(DecodeWarning),
	/// Abort decoding the invoice.
	Fatal(Bolt11ParseError),
}

impl From<Bolt11ParseError> for FieldError {
	fn from(e: Bolt11ParseError) -> Self {
		FieldError::Fatal(e)
	}
}

impl TaggedField {
	fn decode(field: RawTaggedField, prefix: &str) -> Result<TaggedField, FieldError> {
		let RawTaggedField { tag, data } = field;
		match tag {
			constants::TAG_PAYMENT_HASH => Ok(TaggedField::PaymentHash(parse_hash(tag, data)?)),
			constants::TAG_DESCRIPTION => Ok(TaggedField::Description(parse_description(data)?)),
			constants::TAG_DESCRIPTION_HASH => {
				Ok(TaggedField::DescriptionHash(parse_hash(tag, data)?))
			},
			constants::TAG_EXPIRY_TIME => Ok(TaggedField::ExpiryTime(parse_expiry_time(data)?)),
			constants::TAG_FALLBACK => Ok(TaggedField::Fallback(parse_fallback(data, prefix)?)),
			constants::TAG_PRIVATE_ROUTE => {
				Ok(TaggedField::PrivateRoute(parse_routing_hints(&pack_symbols(data, true))?))
			},
			constants::TAG_PAYMENT_SECRET => Ok(TaggedField::PaymentSecret(parse_hash(tag, data)?)),
			constants::TAG_PAYEE_PUB_KEY | constants::TAG_MIN_FINAL_CLTV_EXPIRY => {
				Ok(TaggedField::Reserved(tag))
			},
			_ => {
				// "A reader MUST skip over unknown fields"
				Err(FieldError::Skip(DecodeWarning::UnknownTag { tag, data: data.to_vec() }))
			},
		}
	}
}

/// Reads a 32 byte hash. Anything past the first 32 bytes is ignored.
fn parse_hash(tag: u8, field_data: &[Fe32]) -> Result<[u8; 32], FieldError> {
	let bytes = pack_symbols(field_data, true);
	if bytes.len() < 32 {
		return Err(FieldError::Skip(DecodeWarning::InvalidFieldLength {
			tag,
			data_length: field_data.len(),
		}));
	}
	let mut hash = [0u8; 32];
	hash.copy_from_slice(&bytes[..32]);
	Ok(hash)
}

fn parse_description(field_data: &[Fe32]) -> Result<String, FieldError> {
	let bytes = pack_symbols(field_data, true);
	match str::from_utf8(&bytes) {
		Ok(description) => Ok(String::from(description)),
		Err(e) => Err(FieldError::Skip(DecodeWarning::InvalidDescription {
			valid_up_to: e.valid_up_to(),
		})),
	}
}

fn parse_expiry_time(field_data: &[Fe32]) -> Result<u64, FieldError> {
	parse_int_be(field_data).ok_or(FieldError::Skip(DecodeWarning::InvalidFieldLength {
		tag: constants::TAG_EXPIRY_TIME,
		data_length: field_data.len(),
	}))
}

/// Turns a fallback field into a base58check address for the network named by `prefix`.
fn parse_fallback(field_data: &[Fe32], prefix: &str) -> Result<String, FieldError> {
	let (version, program) = match field_data.split_first() {
		Some((version, program)) => (version.to_u8(), program),
		None => {
			return Err(FieldError::Skip(DecodeWarning::InvalidFieldLength {
				tag: constants::TAG_FALLBACK,
				data_length: 0,
			}))
		},
	};
	let hash = pack_symbols(program, true);

	let currency = currency_from_prefix(prefix);
	let version_byte = match version {
		0..=16 => return Err(FieldError::Skip(DecodeWarning::SegWitFallback { version })),
		17 | 18 if hash.len() != 20 => {
			return Err(FieldError::Skip(DecodeWarning::InvalidFallbackHashLength {
				version,
				hash_length: hash.len(),
			}))
		},
		17 => currency.map(|c| c.pubkey_hash_version()),
		18 => currency.map(|c| c.script_hash_version()),
		_ => return Err(FieldError::Skip(DecodeWarning::UnsupportedFallbackVersion { version })),
	};
	let version_byte = match version_byte {
		Some(v) => v,
		None => {
			return Err(FieldError::Skip(DecodeWarning::UnknownNetwork {
				prefix: prefix.to_string(),
			}))
		},
	};

	let mut payload = Vec::with_capacity(1 + hash.len());
	payload.push(version_byte);
	payload.extend_from_slice(&hash);
	Ok(bitcoin::base58::encode_check(&payload))
}

fn parse_routing_hints(bytes: &[u8]) -> Result<Vec<RoutingHint>, Bolt11ParseError> {
	if bytes.len() % ROUTING_HINT_LEN != 0 {
		return Err(Bolt11ParseError::InvalidRoutingHintLength);
	}

	let mut route_hops = Vec::<RoutingHint>::with_capacity(bytes.len() / ROUTING_HINT_LEN);
	for hop_bytes in bytes.chunks_exact(ROUTING_HINT_LEN) {
		let mut src_node_id = [0u8; 33];
		src_node_id.copy_from_slice(&hop_bytes[0..33]);

		let mut channel_id: [u8; 8] = Default::default();
		channel_id.copy_from_slice(&hop_bytes[33..41]);

		route_hops.push(RoutingHint {
			src_node_id,
			short_channel_id: u64::from_be_bytes(channel_id),
			fee_base_msat: u32::from_be_bytes(hop_bytes[41..45].try_into().expect("slice too big?")),
			fee_proportional_millionths: u32::from_be_bytes(
				hop_bytes[45..49].try_into().expect("slice too big?"),
			),
			cltv_expiry_delta: u16::from_be_bytes(hop_bytes[49..51].try_into().expect("slice too big?")),
		});
	}

	Ok(route_hops)
}

impl Bolt11Invoice {
	fn apply_field(&mut self, field: TaggedField) {
		match field {
			TaggedField::PaymentHash(hash) => self.payment_hash = Some(hash),
			TaggedField::Description(description) => self.description = Some(description),
			TaggedField::DescriptionHash(hash) => self.description_hash = Some(hash),
			TaggedField::ExpiryTime(expiry) => self.expiry = expiry,
			TaggedField::Fallback(address) => self.fallback_addr = Some(address),
			TaggedField::PrivateRoute(mut hops) => self.routing_info.append(&mut hops),
			TaggedField::PaymentSecret(secret) => self.payment_secret = Some(secret),
			TaggedField::Reserved(_) => {},
		}
	}

	/// Decodes an invoice like `str::parse` does, additionally reporting every field that gets
	/// skipped to `logger`.
	///
	/// ```
	/// use lightning_bolt11_decoder::Bolt11Invoice;
	/// use lightning_bolt11_decoder::util::logger::{Logger, Record};
	///
	/// struct StdoutLogger;
	/// impl Logger for StdoutLogger {
	/// 	fn log(&self, record: Record) {
	/// 		println!("{}", record);
	/// 	}
	/// }
	///
	/// let invoice = "lnbc20m1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygshp58yjmdan\
	/// 79s6qqdhdzgynm4zwqd5d7xmw5fk98klysy043l2ahrqspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rq\
	/// wzqfqypqfppqw508d6qejxtdg4y5r3zarvary0c5xw7k9qrsgqt29a0wturnys2hhxpner2e3plp6jyj8qx7548zr2z7\
	/// ptgjjc7hljm98xhjym0dg52sdrvqamxdezkmqg4gdrvwwnf0kv2jdfnl4xatsqmrnsse";
	///
	/// let invoice = Bolt11Invoice::from_str_with_logger(invoice, &StdoutLogger).unwrap();
	/// // The witness program fallback is not turned into an address
	/// assert!(invoice.fallback_addr().is_none());
	/// assert!(!invoice.warnings().is_empty());
	/// ```
	pub fn from_str_with_logger<L: Deref>(s: &str, logger: L) -> Result<Self, Bolt11ParseError>
	where
		L::Target: Logger,
	{
		let (hrp, data) = decode_wrapper(s)?;

		if data.len() < SIGNATURE_LEN {
			return Err(Bolt11ParseError::TooShortDataPart);
		}

		let raw_hrp: RawHrp = hrp.parse()?;
		let (data_part, signature) = data.split_at(data.len() - SIGNATURE_LEN);

		if data_part.len() < TIMESTAMP_LEN {
			return Err(Bolt11ParseError::TooShortDataPart);
		}

		let timestamp = parse_timestamp(&data_part[..TIMESTAMP_LEN])?;
		let tagged = parse_tagged_parts(&data_part[TIMESTAMP_LEN..])?;
		log_trace!(logger, "Decoding {} tagged fields of {} invoice", tagged.len(), hrp);

		let mut invoice = Bolt11Invoice {
			prefix: raw_hrp.prefix,
			amount: raw_hrp.amount,
			multiplier: raw_hrp.si_prefix,
			timestamp,
			signature: InvoiceSignature::from_symbols(signature)?,
			signable_hash: signable_hash(&hrp, data_part),
			payment_hash: None,
			description: None,
			description_hash: None,
			payment_secret: None,
			expiry: DEFAULT_EXPIRY_TIME,
			min_final_cltv_expiry: DEFAULT_MIN_FINAL_CLTV_EXPIRY,
			fallback_addr: None,
			routing_info: Vec::new(),
			warnings: Vec::new(),
		};

		for field in tagged {
			match TaggedField::decode(field, &invoice.prefix) {
				Ok(TaggedField::Reserved(tag)) => {
					log_trace!(logger, "Ignoring tagged field {} with {} symbols", tag, field.data.len());
				},
				Ok(decoded) => invoice.apply_field(decoded),
				Err(FieldError::Skip(warning)) => {
					log_debug!(logger, "Skipping tagged field: {}", warning);
					invoice.warnings.push(warning);
				},
				Err(FieldError::Fatal(e)) => {
					log_debug!(logger, "Failed to decode tagged field {}: {}", field.tag, e);
					return Err(e);
				},
			}
		}

		Ok(invoice)
	}
}

/// Logger used when decoding through `FromStr`, which has no way to take one.
struct IgnoringLogger;

impl Logger for IgnoringLogger {
	fn log(&self, _record: Record) {}
}

/// ```
/// use lightning_bolt11_decoder::Bolt11Invoice;
///
///
/// let invoice = "lnbc1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsy\
/// qcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdpl2pkx2ctnv5sxxmmwwd5kgetjypeh2ursdae8g6twvus\
/// 8g6rfwvs8qun0dfjkxaq9qrsgq357wnc5r2ueh7ck6q93dj32dlqnls087fxdwk8qakdyafkq3yap9us6v52vjjsrvywa\
/// 6rt52cm9r9zqt8r2t7mlcwspyetp5h2tztugp9lfyql";
///
/// let invoice = invoice.parse::<Bolt11Invoice>().unwrap();
/// assert_eq!(invoice.description(), Some("Please consider supporting this project"));
/// ```
impl FromStr for Bolt11Invoice {
	type Err = Bolt11ParseError;

	fn from_str(s: &str) -> Result<Self, <Self as FromStr>::Err> {
		Bolt11Invoice::from_str_with_logger(s, &IgnoringLogger)
	}
}

impl Display for Bolt11ParseError {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match *self {
			Bolt11ParseError::Bech32Error(ref e) => {
				write!(f, "Invalid bech32: {}", e)
			},
			Bolt11ParseError::ParseAmountError(ref e) => {
				write!(f, "Invalid amount in hrp ({})", e)
			},
			Bolt11ParseError::UnknownCurrency => f.write_str("currency code unknown"),
			Bolt11ParseError::UnknownSiPrefix => f.write_str("unknown SI prefix"),
			Bolt11ParseError::MalformedHRP => f.write_str("malformed human readable part"),
			Bolt11ParseError::TooShortDataPart => {
				f.write_str("data part too short (should be at least 111 bech32 chars long)")
			},
			Bolt11ParseError::UnexpectedEndOfTaggedFields => {
				f.write_str("tagged fields part ended unexpectedly")
			},
			Bolt11ParseError::IntegerOverflowError => {
				f.write_str("parsed integer doesn't fit into receiving type")
			},
			Bolt11ParseError::InvalidRoutingHintLength => {
				f.write_str("routing hint data is not a whole number of 51 byte hops")
			},
		}
	}
}

#[cfg(feature = "std")]
impl error::Error for Bolt11ParseError {}

macro_rules! from_error {
	($my_error:expr, $extern_error:ty) => {
		impl From<$extern_error> for Bolt11ParseError {
			fn from(e: $extern_error) -> Self {
				$my_error(e)
			}
		}
	};
}

from_error!(Bolt11ParseError::Bech32Error, CheckedHrpstringError);
from_error!(Bolt11ParseError::ParseAmountError, ParseIntError);
