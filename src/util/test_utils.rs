// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

use crate::util::logger::{Level, Logger, Record};

use std::collections::HashMap;
use std::sync::Mutex;

use bech32::primitives::iter::Fe32IterExt;
use bech32::{Bech32, Fe32, Hrp};

pub struct TestLogger {
	pub lines: Mutex<HashMap<(String, String), usize>>,
}

impl TestLogger {
	pub fn new() -> TestLogger {
		TestLogger { lines: Mutex::new(HashMap::new()) }
	}
	pub fn assert_log(&self, module: &str, line: String, count: usize) {
		let log_entries = self.lines.lock().unwrap();
		assert_eq!(log_entries.get(&(module.to_string(), line)), Some(&count));
	}

	/// Search for the number of occurrence of the logged lines which
	/// 1. belongs to the specified module and
	/// 2. contains `line` in it.
	/// And asserts if the number of occurrences is the same with the given `count`
	pub fn assert_log_contains(&self, module: &str, line: &str, count: usize) {
		let log_entries = self.lines.lock().unwrap();
		let l: usize = log_entries
			.iter()
			.filter(|&(&(ref m, ref l), _c)| m == module && l.contains(line))
			.map(|(_, c)| c)
			.sum();
		assert_eq!(l, count)
	}
}

impl Logger for TestLogger {
	fn log(&self, record: Record) {
		*self
			.lines
			.lock()
			.unwrap()
			.entry((record.module_path.to_string(), format!("{}", record.args)))
			.or_insert(0) += 1;
		if record.level >= Level::Debug {
			println!("{}", record);
		}
	}
}

/// Parses a string of bech32 characters into symbols.
pub fn symbols(s: &str) -> Vec<Fe32> {
	s.chars().map(|c| Fe32::from_char(c).unwrap()).collect()
}

/// Builds a checksummed bech32 string from an HRP and raw symbols, without any of the length or
/// content checks the decoder applies.
pub fn encode_raw(hrp: &str, data: &[Fe32]) -> String {
	let hrp = Hrp::parse(hrp).unwrap();
	data.iter().copied().with_checksum::<Bech32>(&hrp).chars().collect()
}

/// Prefixes `data` with the tag and the two symbol length header of a tagged field.
pub fn tagged_field(tag: u8, data: &[Fe32]) -> Vec<Fe32> {
	let len = data.len();
	assert!(len < 1024);
	let mut field = vec![
		Fe32::try_from(tag).unwrap(),
		Fe32::try_from((len >> 5) as u8).unwrap(),
		Fe32::try_from((len & 0x1f) as u8).unwrap(),
	];
	field.extend_from_slice(data);
	field
}
