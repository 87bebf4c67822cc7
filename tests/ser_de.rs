extern crate bech32;
extern crate bitcoin;
extern crate lightning_bolt11_decoder;

use bitcoin::hashes::{sha256, Hash};
use bitcoin::hex::FromHex;
use bitcoin::secp256k1::PublicKey;
use lightning_bolt11_decoder::*;
use std::str::FromStr;
use std::time::Duration;

const PAYEE: &str = "03e7156ae33b0a208d0744199163177e909e80176e55d97a2f221ede0f934dd9ad";

const PAYMENT_HASH: &str = "0001020304050607080900010203040506070809000102030405060708090102";

const CAKE: &[u8] = b"One piece of chocolate cake, one icecream cone, one pickle, one slice of swiss cheese, one slice of salami, one lollypop, one piece of cherry pie, one sausage, one cupcake, and one slice of watermelon";

/// Fields of a test vector that differ between vectors. Anything not listed takes its default.
struct Expected {
	hrp: &'static str,
	amount_msat: Option<u64>,
	timestamp: u64,
	payment_hash: &'static str,
	description: Option<&'static str>,
	description_hash: Option<[u8; 32]>,
	expiry: u64,
	fallback_addr: Option<&'static str>,
	routing_info: Vec<RoutingHint>,
	signature: &'static str,
	recovery_id: u8,
}

impl Default for Expected {
	fn default() -> Self {
		Expected {
			hrp: "lnbc",
			amount_msat: None,
			timestamp: 1496314658,
			payment_hash: PAYMENT_HASH,
			description: None,
			description_hash: None,
			expiry: DEFAULT_EXPIRY_TIME,
			fallback_addr: None,
			routing_info: Vec::new(),
			signature: "",
			recovery_id: 1,
		}
	}
}

fn hop(node_id: &str, short_channel_id: u64, fee_base_msat: u32, fee_proportional_millionths: u32, cltv_expiry_delta: u16) -> RoutingHint {
	let mut src_node_id = [0u8; 33];
	src_node_id.copy_from_slice(&Vec::<u8>::from_hex(node_id).unwrap());
	RoutingHint { src_node_id, short_channel_id, fee_base_msat, fee_proportional_millionths, cltv_expiry_delta }
}

fn get_test_tuples() -> Vec<(String, Expected)> {
	let cake_hash = sha256::Hash::hash(CAKE).to_byte_array();
	vec![
		(
			"lnbc1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdpl2pkx2ctnv5sxxmmwwd5kgetjypeh2ursdae8g6twvus8g6rfwvs8qun0dfjkxaq9qrsgq357wnc5r2ueh7ck6q93dj32dlqnls087fxdwk8qakdyafkq3yap9us6v52vjjsrvywa6rt52cm9r9zqt8r2t7mlcwspyetp5h2tztugp9lfyql".to_owned(),
			Expected {
				description: Some("Please consider supporting this project"),
				signature: "8d3ce9e28357337f62da0162d9454df827f83cfe499aeb1c1db349d4d81127425e434ca29929406c23bba1ae8ac6ca32880b38d4bf6ff874024cac34ba9625f1",
				..Default::default()
			},
		),
		(
			"lnbc2500u1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdq5xysxxatsyp3k7enxv4jsxqzpu9qrsgquk0rl77nj30yxdy8j9vdx85fkpmdla2087ne0xh8nhedh8w27kyke0lp53ut353s06fv3qfegext0eh0ymjpf39tuven09sam30g4vgpfna3rh".to_owned(),
			Expected {
				hrp: "lnbc2500u",
				amount_msat: Some(250_000_000),
				description: Some("1 cup coffee"),
				expiry: 60,
				..Default::default()
			},
		),
		(
			"lnbc2500u1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdpquwpc4curk03c9wlrswe78q4eyqc7d8d0xqzpu9qrsgqhtjpauu9ur7fw2thcl4y9vfvh4m9wlfyz2gem29g5ghe2aak2pm3ps8fdhtceqsaagty2vph7utlgj48u0ged6a337aewvraedendscp573dxr".to_owned(),
			Expected {
				hrp: "lnbc2500u",
				amount_msat: Some(250_000_000),
				description: Some("ナンセンス 1杯"),
				expiry: 60,
				..Default::default()
			},
		),
		(
			"lnbc20m1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqhp58yjmdan79s6qqdhdzgynm4zwqd5d7xmw5fk98klysy043l2ahrqs9qrsgq7ea976txfraylvgzuxs8kgcw23ezlrszfnh8r6qtfpr6cxga50aj6txm9rxrydzd06dfeawfk6swupvz4erwnyutnjq7x39ymw6j38gp7ynn44".to_owned(),
			Expected {
				hrp: "lnbc20m",
				amount_msat: Some(2_000_000_000),
				description_hash: Some(cake_hash),
				..Default::default()
			},
		),
		(
			"lntb20m1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygshp58yjmdan79s6qqdhdzgynm4zwqd5d7xmw5fk98klysy043l2ahrqspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqfpp3x9et2e20v6pu37c5d9vax37wxq72un989qrsgqdj545axuxtnfemtpwkc45hx9d2ft7x04mt8q7y6t0k2dge9e7h8kpy9p34ytyslj3yu569aalz2xdk8xkd7ltxqld94u8h2esmsmacgpghe9k8".to_owned(),
			Expected {
				hrp: "lntb20m",
				amount_msat: Some(2_000_000_000),
				description_hash: Some(cake_hash),
				fallback_addr: Some("mk2QpYatsKicvFVuTAQLBryyccRXMUaGHP"),
				..Default::default()
			},
		),
		(
			"lnbc20m1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqhp58yjmdan79s6qqdhdzgynm4zwqd5d7xmw5fk98klysy043l2ahrqsfpp3qjmp7lwpagxun9pygexvgpjdc4jdj85fr9yq20q82gphp2nflc7jtzrcazrra7wwgzxqc8u7754cdlpfrmccae92qgzqvzq2ps8pqqqqqqpqqqqq9qqqvpeuqafqxu92d8lr6fvg0r5gv0heeeqgcrqlnm6jhphu9y00rrhy4grqszsvpcgpy9qqqqqqgqqqqq7qqzq9qrsgqdfjcdk6w3ak5pca9hwfwfh63zrrz06wwfya0ydlzpgzxkn5xagsqz7x9j4jwe7yj7vaf2k9lqsdk45kts2fd0fkr28am0u4w95tt2nsq76cqw0".to_owned(),
			Expected {
				hrp: "lnbc20m",
				amount_msat: Some(2_000_000_000),
				description_hash: Some(cake_hash),
				fallback_addr: Some("1RustyRX2oai4EYYDpQGWvEL62BBGqN9T"),
				routing_info: vec![
					hop("029e03a901b85534ff1e92c43c74431f7ce72046060fcf7a95c37e148f78c77255", 0x0102030405060708, 1, 20, 3),
					hop("039e03a901b85534ff1e92c43c74431f7ce72046060fcf7a95c37e148f78c77255", 0x030405060708090a, 2, 30, 4),
				],
				recovery_id: 0,
				..Default::default()
			},
		),
		(
			"lnbc20m1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygshp58yjmdan79s6qqdhdzgynm4zwqd5d7xmw5fk98klysy043l2ahrqspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqfppj3a24vwu6r8ejrss3axul8rxldph2q7z99qrsgqz6qsgww34xlatfj6e3sngrwfy3ytkt29d2qttr8qz2mnedfqysuqypgqex4haa2h8fx3wnypranf3pdwyluftwe680jjcfp438u82xqphf75ym".to_owned(),
			Expected {
				hrp: "lnbc20m",
				amount_msat: Some(2_000_000_000),
				description_hash: Some(cake_hash),
				fallback_addr: Some("3EktnHQD7RiAE6uzMj2ZifT9YgRrkSgzQX"),
				..Default::default()
			},
		),
		(
			"lnbc9678785340p1pwmna7lpp5gc3xfm08u9qy06djf8dfflhugl6p7lgza6dsjxq454gxhj9t7a0sd8dgfkx7cmtwd68yetpd5s9xar0wfjn5gpc8qhrsdfq24f5ggrxdaezqsnvda3kkum5wfjkzmfqf3jkgem9wgsyuctwdus9xgrcyqcjcgpzgfskx6eqf9hzqnteypzxz7fzypfhg6trddjhygrcyqezcgpzfysywmm5ypxxjemgw3hxjmn8yptk7untd9hxwg3q2d6xjcmtv4ezq7pqxgsxzmnyyqcjqmt0wfjjq6t5v4khxsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygsxqyjw5qcqp2rzjq0gxwkzc8w6323m55m4jyxcjwmy7stt9hwkwe2qxmy8zpsgg7jcuwz87fcqqeuqqqyqqqqlgqqqqn3qq9q9qrsgqrvgkpnmps664wgkp43l22qsgdw4ve24aca4nymnxddlnp8vh9v2sdxlu5ywdxefsfvm0fq3sesf08uf6q9a2ke0hc9j6z6wlxg5z5kqpu2v9wz".to_owned(),
			Expected {
				hrp: "lnbc9678785340p",
				amount_msat: Some(967878534),
				timestamp: 1572468703,
				payment_hash: "462264ede7e14047e9b249da94fefc47f41f7d02ee9b091815a5506bc8abf75f",
				description: Some("Blockstream Store: 88.85 USD for Blockstream Ledger Nano S x 1, \"Back In My Day\" Sticker x 2, \"I Got Lightning Working\" Sticker x 2 and 1 more items"),
				expiry: 604800,
				routing_info: vec![
					hop("03d06758583bb5154774a6eb221b1276c9e82d65bbaceca806d90e20c108f4b1c7", (589390 << 40) | (3312 << 16) | 1, 1000, 2500, 40),
				],
				signature: "1b1160cf6186b55722c1ac7ea502086baaccaabdc76b326e666b7f309d972b15069bfca11cd365304b36f48230cc12f3f13a017aab65f7c165a169df32282a58",
				..Default::default()
			},
		),
	]
}

#[test]
fn invoice_deserialize() {
	for (serialized, expected) in get_test_tuples() {
		eprintln!("Testing invoice {}...", serialized);
		let parsed = serialized.parse::<Bolt11Invoice>().unwrap();

		assert_eq!(parsed.hrp_string(), expected.hrp);
		assert_eq!(parsed.amount_milli_satoshis(), expected.amount_msat);
		assert_eq!(parsed.timestamp(), expected.timestamp);
		assert_eq!(&parsed.payment_hash().unwrap()[..], &Vec::<u8>::from_hex(expected.payment_hash).unwrap()[..]);
		assert_eq!(parsed.payment_secret(), Some(&[0x11; 32]));
		assert_eq!(parsed.description(), expected.description);
		assert_eq!(parsed.description_hash(), expected.description_hash.as_ref());
		assert_eq!(parsed.expiry(), expected.expiry);
		assert_eq!(parsed.min_final_cltv_expiry(), DEFAULT_MIN_FINAL_CLTV_EXPIRY);
		assert_eq!(parsed.fallback_addr(), expected.fallback_addr);
		assert_eq!(parsed.routing_info(), &expected.routing_info[..]);
		if !expected.signature.is_empty() {
			assert_eq!(&parsed.signature().0[..64], &Vec::<u8>::from_hex(expected.signature).unwrap()[..]);
		}
		assert_eq!(parsed.signature().recovery_id(), expected.recovery_id);

		// Every vector carries a features field, which is left undecoded
		assert!(parsed.warnings().iter().any(|w| matches!(w, DecodeWarning::UnknownTag { tag: 5, .. })));

		// Whatever the payee key, the signature matches the one it recovers to
		let payee = parsed.recover_payee_pub_key().unwrap();
		assert!(parsed.check_signature(&payee));
		assert_eq!(verify_signature(&serialized, &payee.to_string()), Ok(true));
	}
}

#[test]
fn test_bolt_vectors_signed_by_test_key() {
	let payee = PublicKey::from_str(PAYEE).unwrap();
	// All but the last vector were signed with the BOLT 11 test key
	let tuples = get_test_tuples();
	for (serialized, _) in &tuples[..tuples.len() - 1] {
		assert_eq!(verify_signature(serialized, PAYEE), Ok(true));
		assert_eq!(serialized.parse::<Bolt11Invoice>().unwrap().recover_payee_pub_key(), Ok(payee));
	}
}

#[test]
fn test_segwit_fallback_is_skipped() {
	let invoice = "lnbc20m1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygshp58yjmdan79s6qqdhdzgynm4zwqd5d7xmw5fk98klysy043l2ahrqspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqfppqw508d6qejxtdg4y5r3zarvary0c5xw7k9qrsgqt29a0wturnys2hhxpner2e3plp6jyj8qx7548zr2z7ptgjjc7hljm98xhjym0dg52sdrvqamxdezkmqg4gdrvwwnf0kv2jdfnl4xatsqmrnsse"
		.parse::<Bolt11Invoice>()
		.unwrap();

	assert_eq!(invoice.fallback_addr(), None);
	assert!(invoice.warnings().contains(&DecodeWarning::SegWitFallback { version: 0 }));
	assert_eq!(invoice.description_hash(), Some(&sha256::Hash::hash(CAKE).to_byte_array()));
}

#[test]
fn test_uppercase_invoice() {
	let lower = "lnbc25m1pvjluezpp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdq5vdhkven9v5sxyetpdeessp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygs9q5sqqqqqqqqqqqqqqqqsgq2a25dxl5hrntdtn6zvydt7d66hyzsyhqs4wdynavys42xgl6sgx9c4g7me86a27t07mdtfry458rtjr0v92cnmswpsjscgt2vcse3sgpz3uapa"
		.parse::<Bolt11Invoice>()
		.unwrap();
	let upper = "LNBC25M1PVJLUEZPP5QQQSYQCYQ5RQWZQFQQQSYQCYQ5RQWZQFQQQSYQCYQ5RQWZQFQYPQDQ5VDHKVEN9V5SXYETPDEESSP5ZYG3ZYG3ZYG3ZYG3ZYG3ZYG3ZYG3ZYG3ZYG3ZYG3ZYG3ZYG3ZYGS9Q5SQQQQQQQQQQQQQQQQSGQ2A25DXL5HRNTDTN6ZVYDT7D66HYZSYHQS4WDYNAVYS42XGL6SGX9C4G7ME86A27T07MDTFRY458RTJR0V92CNMSWPSJSCGT2VCSE3SGPZ3UAPA"
		.parse::<Bolt11Invoice>()
		.unwrap();

	assert_eq!(lower, upper);
	assert_eq!(upper.prefix(), "lnbc");
	assert_eq!(upper.hrp_string(), "lnbc25m");
	assert_eq!(upper.description(), Some("coffee beans"));
	assert_eq!(upper.amount_milli_satoshis(), Some(2_500_000_000));
	assert_eq!(upper.currency(), Some(Currency::Bitcoin));
}

#[test]
fn test_sub_millisatoshi_amount() {
	let invoice = "lnbc2500000001p1pvjluezpp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdq5xysxxatsyp3k7enxv4jsxqzpusp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygs9qrsgq0lzc236j96a95uv0m3umg28gclm5lqxtqqwk32uuk4k6673k6n5kfvx3d2h8s295fad45fdhmusm8sjudfhlf6dcsxmfvkeywmjdkxcp99202x"
		.parse::<Bolt11Invoice>()
		.unwrap();

	assert_eq!(invoice.amount(), Amount::Specified(2500000001));
	assert_eq!(invoice.multiplier(), Some(SiPrefix::Pico));
	assert_eq!(invoice.amount_pico_btc(), Some(2500000001));
	assert_eq!(invoice.amount_milli_satoshis(), Some(250000000));
}

#[cfg(feature = "std")]
#[test]
fn test_expiry_helpers() {
	let invoice = "lnbc2500u1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdq5xysxxatsyp3k7enxv4jsxqzpu9qrsgquk0rl77nj30yxdy8j9vdx85fkpmdla2087ne0xh8nhedh8w27kyke0lp53ut353s06fv3qfegext0eh0ymjpf39tuven09sam30g4vgpfna3rh"
		.parse::<Bolt11Invoice>()
		.unwrap();

	assert_eq!(invoice.duration_since_epoch(), Duration::from_secs(1496314658));
	assert_eq!(invoice.expires_at(), Some(Duration::from_secs(1496314718)));
	assert_eq!(
		invoice.timestamp_as_system_time(),
		std::time::UNIX_EPOCH + Duration::from_secs(1496314658)
	);
	assert!(invoice.is_expired());
}

#[test]
fn test_bolt_invalid_invoices() {
	// Tests the BOLT 11 invalid invoice test vectors that are invalid at the encoding level
	assert!(matches!(Bolt11Invoice::from_str(
		"lnbc2500u1pvjluezpp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdpquwpc4curk03c9wlrswe78q4eyqc7d8d0xqzpuyk0sg5g70me25alkluzd2x62aysf2pyy8edtjeevuv4p2d5p76r4zkmneet7uvyakky2zr4cusd45tftc9c5fh0nnqpnl2jfll544esqchsrnt"
		), Err(Bolt11ParseError::Bech32Error(_))));
	assert!(matches!(Bolt11Invoice::from_str(
		"pvjluezpp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdpquwpc4curk03c9wlrswe78q4eyqc7d8d0xqzpuyk0sg5g70me25alkluzd2x62aysf2pyy8edtjeevuv4p2d5p76r4zkmneet7uvyakky2zr4cusd45tftc9c5fh0nnqpnl2jfll544esqchsrny"
		), Err(Bolt11ParseError::Bech32Error(_))));
	assert!(matches!(Bolt11Invoice::from_str(
		"LNBC2500u1pvjluezpp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdpquwpc4curk03c9wlrswe78q4eyqc7d8d0xqzpuyk0sg5g70me25alkluzd2x62aysf2pyy8edtjeevuv4p2d5p76r4zkmneet7uvyakky2zr4cusd45tftc9c5fh0nnqpnl2jfll544esqchsrny"
		), Err(Bolt11ParseError::Bech32Error(_))));
	assert_eq!(Bolt11Invoice::from_str(
		"lnbc1pvjluezpp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdpl2pkx2ctnv5sxxmmwwd5kgetjypeh2ursdae8g6na6hlh"
		), Err(Bolt11ParseError::TooShortDataPart));
	assert_eq!(Bolt11Invoice::from_str(
		"lnbc2500x1pvjluezpp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdq5xysxxatsyp3k7enxv4jsxqzpusp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygs9qrsgqrrzc4cvfue4zp3hggxp47ag7xnrlr8vgcmkjxk3j5jqethnumgkpqp23z9jclu3v0a7e0aruz366e9wqdykw6dxhdzcjjhldxq0w6wgqcnu43j"
		), Err(Bolt11ParseError::UnknownSiPrefix));
}

#[test]
fn test_invalid_signature_is_not_an_error() {
	use bech32::primitives::decode::CheckedHrpstring;
	use bech32::primitives::iter::Fe32IterExt;
	use bech32::Fe32;

	let invoice = "lnbc2500u1pvjluezpp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdq5xysxxatsyp3k7enxv4jsxqzpusp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygs9qrsgqwgt7mcn5yqw3yx0w94pswkpq6j9uh6xfqqqtsk4tnarugeektd4hg5975x9am52rz4qskukxdmjemg92vvqz8nvmsye63r5ykel43pgz7zq0g2";
	assert_eq!(verify_signature(invoice, PAYEE), Ok(true));

	// Flip one bit inside the `s` half of the signature and checksum the result again
	let parsed = CheckedHrpstring::new::<Bolt11Bech32>(invoice).unwrap();
	let mut data = parsed.fe32_iter::<&mut dyn Iterator<Item = u8>>().collect::<Vec<Fe32>>();
	let flipped = data.len() - 20;
	data[flipped] = Fe32::try_from(data[flipped].to_u8() ^ 1).unwrap();
	let tampered = data
		.iter()
		.copied()
		.with_checksum::<Bolt11Bech32>(&parsed.hrp())
		.chars()
		.collect::<String>();

	let decoded = tampered.parse::<Bolt11Invoice>().unwrap();
	assert_eq!(decoded.description(), Some("1 cup coffee"));
	assert_eq!(verify_signature(&tampered, PAYEE), Ok(false));
	assert!(!decoded.check_signature(&PublicKey::from_str(PAYEE).unwrap()));
}
