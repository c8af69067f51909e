#![cfg(test)]
use crate::decode::Decoder;
use crate::encode::{emit, Encoder, Error, ToCbor};
use crate::value::{Bytes, Value};
use hex_literal::hex;
use num_bigint::BigInt;
use std::collections::{BTreeMap, HashMap};

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn rfc_integers() {
    // RFC 8949, Appendix A:
    // https://www.rfc-editor.org/rfc/rfc8949.html#section-appendix.a

    assert_eq!(emit(&0u64).unwrap(), hex!("00"));
    assert_eq!(emit(&1u64).unwrap(), hex!("01"));
    assert_eq!(emit(&10u64).unwrap(), hex!("0a"));
    assert_eq!(emit(&23u64).unwrap(), hex!("17"));
    assert_eq!(emit(&24u64).unwrap(), hex!("1818"));
    assert_eq!(emit(&25u64).unwrap(), hex!("1819"));
    assert_eq!(emit(&100u64).unwrap(), hex!("1864"));
    assert_eq!(emit(&1000u64).unwrap(), hex!("1903e8"));
    assert_eq!(emit(&1000000u64).unwrap(), hex!("1a000f4240"));
    assert_eq!(emit(&1000000000000u64).unwrap(), hex!("1b000000e8d4a51000"));
    assert_eq!(
        emit(&18446744073709551615u64).unwrap(),
        hex!("1bffffffffffffffff")
    );
    assert_eq!(emit(&-1i64).unwrap(), hex!("20"));
    assert_eq!(emit(&-10i64).unwrap(), hex!("29"));
    assert_eq!(emit(&-100i64).unwrap(), hex!("3863"));
    assert_eq!(emit(&-1000i64).unwrap(), hex!("3903e7"));
    assert_eq!(emit(&i64::MIN).unwrap(), hex!("3b7fffffffffffffff"));

    // Signed positives take the unsigned form.
    assert_eq!(emit(&1i8).unwrap(), hex!("01"));
    assert_eq!(emit(&1000i32).unwrap(), hex!("1903e8"));
}

#[test]
fn minimal_integer_encoding() {
    // The emitted length is the smallest of {1, 2, 3, 5, 9} bytes that
    // can represent the value, with exact behavior at every boundary.
    for (value, len) in [
        (0u64, 1),
        (23, 1),
        (24, 2),
        (255, 2),
        (256, 3),
        (65535, 3),
        (65536, 5),
        (u32::MAX as u64, 5),
        (u32::MAX as u64 + 1, 9),
        (u64::MAX, 9),
    ] {
        assert_eq!(emit(&value).unwrap().len(), len, "value {value}");
    }

    assert_eq!(emit(&255u64).unwrap(), hex!("18ff"));
    assert_eq!(emit(&256u64).unwrap(), hex!("190100"));
    assert_eq!(emit(&65535u64).unwrap(), hex!("19ffff"));
    assert_eq!(emit(&65536u64).unwrap(), hex!("1a00010000"));
    assert_eq!(emit(&4294967295u64).unwrap(), hex!("1affffffff"));
    assert_eq!(emit(&4294967296u64).unwrap(), hex!("1b0000000100000000"));
    assert_eq!(emit(&-256i64).unwrap(), hex!("38ff"));
    assert_eq!(emit(&-257i64).unwrap(), hex!("390100"));
}

#[test]
fn floats_always_emit_doubles() {
    assert_eq!(emit(&0.0f64).unwrap(), hex!("fb0000000000000000"));
    assert_eq!(emit(&-0.0f64).unwrap(), hex!("fb8000000000000000"));
    assert_eq!(emit(&1.5f64).unwrap(), hex!("fb3ff8000000000000"));
    assert_eq!(emit(&1.1f64).unwrap(), hex!("fb3ff199999999999a"));
    assert_eq!(emit(&-4.1f64).unwrap(), hex!("fbc010666666666666"));
    assert_eq!(emit(&1.0e+300f64).unwrap(), hex!("fb7e37e43c8800759c"));
    assert_eq!(emit(&f64::INFINITY).unwrap(), hex!("fb7ff0000000000000"));
    assert_eq!(
        emit(&f64::NEG_INFINITY).unwrap(),
        hex!("fbfff0000000000000")
    );
    assert_eq!(emit(&f64::NAN).unwrap(), hex!("fb7ff8000000000000"));

    // Narrow inputs widen first.
    assert_eq!(emit(&1.5f32).unwrap(), hex!("fb3ff8000000000000"));
    assert_eq!(emit(&100000.0f32).unwrap(), hex!("fb40f86a0000000000"));
}

#[test]
fn simple_values() {
    assert_eq!(emit(&false).unwrap(), hex!("f4"));
    assert_eq!(emit(&true).unwrap(), hex!("f5"));
    assert_eq!(emit(&None::<u32>).unwrap(), hex!("f6"));
    assert_eq!(emit(&Some(1u32)).unwrap(), hex!("01"));
    assert_eq!(emit(&Value::Null).unwrap(), hex!("f6"));
}

#[test]
fn strings_and_bytes() {
    assert_eq!(emit("").unwrap(), hex!("60"));
    assert_eq!(emit("a").unwrap(), hex!("6161"));
    assert_eq!(emit("IETF").unwrap(), hex!("6449455446"));
    assert_eq!(emit("\"\\").unwrap(), hex!("62225c"));
    assert_eq!(emit("\u{00fc}").unwrap(), hex!("62c3bc"));
    assert_eq!(emit("\u{6c34}").unwrap(), hex!("63e6b0b4"));
    assert_eq!(emit("\u{10151}").unwrap(), hex!("64f0908591"));
    assert_eq!(emit(&"IETF".to_string()).unwrap(), hex!("6449455446"));

    assert_eq!(emit(&Bytes(vec![])).unwrap(), hex!("40"));
    assert_eq!(
        emit(&Bytes(hex!("01020304").to_vec())).unwrap(),
        hex!("4401020304")
    );
}

#[test]
fn byte_sequences_are_byte_strings() {
    // Sequences of bytes take the byte-string form in every container
    // shape; only wider element types emit arrays.
    assert_eq!(emit(&vec![1u8, 2, 3, 4]).unwrap(), hex!("4401020304"));
    assert_eq!(emit(&[1u8, 2, 3, 4]).unwrap(), hex!("4401020304"));
    let data: &[u8] = &hex!("01020304");
    assert_eq!(emit(&data).unwrap(), hex!("4401020304"));
    assert_eq!(emit(&Vec::<u8>::new()).unwrap(), hex!("40"));
    assert_eq!(emit(&vec![1u16, 2, 3, 4]).unwrap(), hex!("8401020304"));

    // The emitted byte string decodes back through the byte-buffer target.
    let bytes = emit(&vec![1u8, 2, 3, 4]).unwrap();
    let mut decoded = Bytes::default();
    Decoder::new(bytes.as_slice()).decode(&mut decoded).unwrap();
    assert_eq!(decoded, Bytes(vec![1, 2, 3, 4]));
}

#[test]
fn arrays() {
    assert_eq!(emit::<[u16; 0]>(&[]).unwrap(), hex!("80"));
    assert_eq!(emit(&[1u64, 2, 3]).unwrap(), hex!("83010203"));
    assert_eq!(emit(&vec![1u64, 2, 3]).unwrap(), hex!("83010203"));
    assert_eq!(
        emit(&vec![vec![2u32, 3], vec![4, 5]]).unwrap(),
        hex!("82820203820405")
    );
    assert_eq!(
        emit(&(1..=25).collect::<Vec<u64>>()).unwrap(),
        hex!("98190102030405060708090a0b0c0d0e0f101112131415161718181819")
    );
    assert_eq!(
        emit(&Value::Array(vec![
            Value::Uint(1),
            Value::Array(vec![Value::Uint(2), Value::Uint(3)]),
            Value::Array(vec![Value::Uint(4), Value::Uint(5)]),
        ]))
        .unwrap(),
        hex!("8301820203820405")
    );
}

#[test]
fn canonical_map_ordering() {
    // Key "a" is emitted before key "b" regardless of insertion order.
    let map = HashMap::from([("b", 2u64), ("a", 1)]);
    assert_eq!(emit(&map).unwrap(), hex!("a2616101616202"));

    // The predicate compares payloads length-first: "b" sorts before "aa".
    let map = HashMap::from([("aa", 1u64), ("b", 2)]);
    assert_eq!(emit(&map).unwrap(), hex!("a2616202626161 01"));

    // Mixed key shapes order by their payload bytes too: "z" (1 byte),
    // then 1000 (03e8), then "aa" (6161).
    let map = Value::Map(vec![
        (text("aa"), Value::Uint(3)),
        (Value::Uint(1000), Value::Uint(2)),
        (text("z"), Value::Uint(1)),
    ]);
    assert_eq!(emit(&map).unwrap(), hex!("a3 617a01 1903e802 62616103"));

    // Two independent encodes of the same mapping are byte-identical.
    let map = HashMap::from([
        ("id".to_string(), 7u64),
        ("name".to_string(), 1),
        ("z".to_string(), 2),
    ]);
    assert_eq!(emit(&map).unwrap(), emit(&map).unwrap());

    // BTreeMap re-sorts under the encoded-key predicate, not Ord.
    let map = BTreeMap::from([("aa", 1u64), ("b", 2)]);
    assert_eq!(emit(&map).unwrap(), hex!("a2616202626161 01"));
}

#[test]
fn unsupported_shapes() {
    assert!(matches!(
        emit(&Value::Bignum(BigInt::from(7))),
        Err(Error::Unsupported("bignum"))
    ));
    assert!(matches!(
        emit(&Value::Tag {
            tag: 1,
            content: Box::new(Value::Uint(0)),
        }),
        Err(Error::Unsupported("tag"))
    ));
}

#[derive(Debug, Default, PartialEq)]
struct Sensor {
    name: String,
    reading: f64,
    count: u32,
    offset: i32,
    enabled: bool,
    serial: String,
    internal: u64,
}

crate::cbor_record!(Sensor {
    name,
    reading,
    count,
    offset,
    enabled,
    serial: "sn",
    internal: "-",
});

#[derive(Debug, Default, PartialEq)]
struct Pair {
    x: i32,
    y: i32,
}

crate::cbor_record!(Pair { x, y });

#[derive(Debug, Default, PartialEq)]
struct Line {
    from: Pair,
    to: Pair,
}

crate::cbor_record!(Line { from, to });

#[test]
fn record_encode() {
    let sensor = Sensor {
        name: "probe-1".to_string(),
        reading: 0.25,
        count: 42,
        offset: -33,
        enabled: true,
        serial: "A1".to_string(),
        internal: 99,
    };

    // Usable fields only, in declaration order, with renames applied.
    assert_eq!(
        emit(&sensor).unwrap(),
        hex!(
            "a6"
            "646e616d65 6770726f62652d31"
            "6772656164696e67 fb3fd0000000000000"
            "65636f756e74 182a"
            "666f6666736574 3820"
            "67656e61626c6564 f5"
            "62736e 624131"
        )
    );
}

#[test]
fn record_round_trip() {
    let line = Line {
        from: Pair { x: 1, y: 2 },
        to: Pair { x: -3, y: 4 },
    };
    let bytes = emit(&line).unwrap();
    assert_eq!(
        bytes,
        hex!("a2 6466726f6d a2617801617902 62746f a2617822617904")
    );

    let mut decoded = Line::default();
    Decoder::new(bytes.as_slice()).decode(&mut decoded).unwrap();
    assert_eq!(decoded, line);
}

#[test]
fn value_round_trips() {
    let cases: [&[u8]; 9] = [
        &hex!("83010203"),
        &hex!("a26161016162820203"),
        &hex!("8301820203820405"),
        &hex!("4401020304"),
        &hex!("6449455446"),
        &hex!("f5"),
        &hex!("f6"),
        &hex!("20"),
        &hex!("1bffffffffffffffff"),
    ];
    for data in cases {
        let value = Decoder::new(data).decode_value().unwrap();
        assert_eq!(emit(&value).unwrap(), data, "{value:?}");
    }
}

#[test]
fn typed_round_trips() {
    let map = HashMap::from([("alpha".to_string(), 1u64), ("beta".to_string(), 2)]);
    let bytes = emit(&map).unwrap();
    let mut decoded: HashMap<String, u64> = HashMap::new();
    Decoder::new(bytes.as_slice()).decode(&mut decoded).unwrap();
    assert_eq!(decoded, map);

    let items = vec![0u64, 23, 24, 255, 256, 65535, 65536, u64::MAX];
    let bytes = emit(&items).unwrap();
    let mut decoded: Vec<u64> = Vec::new();
    Decoder::new(bytes.as_slice()).decode(&mut decoded).unwrap();
    assert_eq!(decoded, items);

    let floats = vec![0.0f64, 1.5, -4.1, 1.0e300, f64::MIN_POSITIVE];
    let bytes = emit(&floats).unwrap();
    let mut decoded: Vec<f64> = Vec::new();
    Decoder::new(bytes.as_slice()).decode(&mut decoded).unwrap();
    for (a, b) in decoded.iter().zip(&floats) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn encoder_over_a_writer() {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.encode(&1u64).unwrap();
    enc.encode("a").unwrap();
    enc.flush().unwrap();
    drop(enc);
    assert_eq!(buf, hex!("016161"));

    let enc = Encoder::new(Vec::new());
    assert_eq!(enc.into_inner(), Vec::<u8>::new());
}

#[test]
fn to_cbor_through_references() {
    let value = 7u64;
    assert_eq!(emit(&&value).unwrap(), hex!("07"));

    let mut enc = Encoder::new(Vec::new());
    (&value).to_cbor(&mut enc).unwrap();
    assert_eq!(enc.into_inner(), hex!("07"));
}
