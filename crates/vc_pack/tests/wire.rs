use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use vc_pack::buffer::SerializerBuffer;
use vc_pack::codec::Serde;
use vc_pack::header::{MapHeader, StringHeader};
use vc_pack::{Pack, PackError, PackOptions, Packer};

#[derive(Pack, Debug, PartialEq)]
struct Sample {
    b: i16,
    a: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Settings {
    volume: u8,
    name: String,
}

#[derive(Pack, Debug, PartialEq)]
struct Profile {
    settings: Serde<Settings>,
    version: u8,
}

#[test]
fn raw_mode_drops_headers() {
    let mut packer = Packer::new();
    packer.serialize_raw(&Sample { a: 300, b: -2 }).unwrap();
    assert_eq!(packer.get_buffer(), &[0xAC, 0x02, 0x03]);

    packer.set_position(0).unwrap();
    let back: Sample = packer.deserialize_raw().unwrap();
    assert_eq!(back, Sample { a: 300, b: -2 });
}

#[test]
fn raw_sequences_extend_to_the_end() {
    let mut packer = Packer::new();
    packer.serialize_raw(&vec![1u16, 2]).unwrap();
    assert_eq!(packer.get_buffer(), &[1, 0, 2, 0]);
    packer.set_position(0).unwrap();
    assert_eq!(packer.deserialize_raw::<Vec<u16>>().unwrap(), [1, 2]);

    let mut packer = Packer::new();
    packer.serialize_raw(&String::from("hi")).unwrap();
    assert_eq!(packer.get_buffer(), b"hi");
    packer.set_position(0).unwrap();
    assert_eq!(packer.deserialize_raw::<String>().unwrap(), "hi");

    let mut packer = Packer::new();
    packer.serialize_raw(&vec![Some(4u8), None]).unwrap();
    assert_eq!(packer.get_buffer(), &[1, 4, 0]);
}

#[test]
fn raw_elements_must_consume_input() {
    let mut packer = Packer::from_bytes(vec![1, 2]);
    let err = packer.deserialize_raw::<Vec<()>>().unwrap_err();
    assert!(matches!(err, PackError::InvalidEncoding { .. }));
    assert_eq!(packer.position(), 0);

    let err = packer.deserialize_raw::<BTreeSet<[u8; 0]>>().unwrap_err();
    assert!(matches!(err, PackError::InvalidEncoding { .. }));
    assert_eq!(packer.position(), 0);

    assert_eq!(packer.deserialize_raw::<Vec<u8>>().unwrap(), [1, 2]);
}

#[test]
fn counts_beyond_the_capacity_limit_are_rejected() {
    // partial header, zig-zag varint of 2^40 elements
    let mut packer = Packer::from_bytes(vec![0x40, 0x80, 0x80, 0x80, 0x80, 0x80, 0x40]);
    let err = packer.deserialize::<Vec<()>>().unwrap_err();
    assert!(matches!(err, PackError::InvalidEncoding { .. }));
    assert_eq!(packer.position(), 0);

    let options = PackOptions::new().with_capacity_limit(8);
    let mut packer = Packer::with_options(options).unwrap();
    let err = packer.serialize(&vec![(); 9]).unwrap_err();
    assert!(matches!(
        err,
        PackError::CapacityExceeded {
            requested: 9,
            limit: 8
        }
    ));
    assert_eq!(packer.length(), 0);

    packer.serialize(&vec![(); 8]).unwrap();
    packer.set_position(0).unwrap();
    assert_eq!(packer.deserialize::<Vec<()>>().unwrap().len(), 8);
}

#[test]
fn raw_shared_references_are_inlined() {
    let shared = Rc::new(5u8);
    let list = vec![Rc::clone(&shared), shared];

    let mut packer = Packer::new();
    packer.serialize_raw(&list).unwrap();
    assert_eq!(packer.get_buffer(), &[5, 5]);

    packer.set_position(0).unwrap();
    let back: Vec<Rc<u8>> = packer.deserialize_raw().unwrap();
    assert_eq!(back.len(), 2);
    assert!(!Rc::ptr_eq(&back[0], &back[1]));
}

#[test]
fn headers_can_be_peeked() {
    let mut packer = Packer::new();
    packer.serialize(&vec![0u8; 63]).unwrap();
    packer.serialize(&"x".repeat(200)).unwrap();

    packer.set_position(0).unwrap();
    assert_eq!(packer.peek_map_header().unwrap(), MapHeader::Length(63));
    assert_eq!(packer.position(), 0);
    assert_eq!(packer.deserialize::<Vec<u8>>().unwrap().len(), 63);

    assert_eq!(packer.peek_string_header().unwrap(), StringHeader::Length(200));
    assert_eq!(packer.peek_u8().unwrap(), 125);
    assert_eq!(packer.deserialize::<String>().unwrap().len(), 200);
    assert_eq!(packer.remaining(), 0);
}

#[test]
fn codec_fields_share_the_frame() {
    let profile = Profile {
        settings: Serde(Settings {
            volume: 3,
            name: "x".into(),
        }),
        version: 2,
    };
    let json = br#"{"volume":3,"name":"x"}"#;

    let mut packer = Packer::new();
    packer.serialize(&profile).unwrap();
    let bytes = packer.get_buffer();
    assert_eq!(bytes[0], 0x80 | (1 + json.len() as u8 + 1));
    assert_eq!(bytes[1] as usize, json.len());
    assert_eq!(&bytes[2..2 + json.len()], json);
    assert_eq!(bytes[bytes.len() - 1], 2);

    packer.set_position(0).unwrap();
    assert_eq!(packer.deserialize::<Profile>().unwrap(), profile);
}

#[test]
fn codec_failure_inside_object_is_corruption() {
    let mut packer = Packer::with_options(PackOptions::new().without_codec()).unwrap();
    let profile = Profile {
        settings: Serde(Settings {
            volume: 0,
            name: String::new(),
        }),
        version: 0,
    };
    let err = packer.serialize(&profile).unwrap_err();
    assert!(matches!(err, PackError::DataCorruption { .. }));
    assert!(matches!(err.root_cause(), PackError::Codec { codec: "none", .. }));
    assert_eq!(packer.length(), 0);
}

#[test]
fn ordered_maps_are_deterministic() {
    let mut map = BTreeMap::new();
    map.insert(String::from("b"), 2u32);
    map.insert(String::from("a"), 1u32);

    let mut packer = Packer::new();
    packer.serialize(&map).unwrap();
    assert_eq!(packer.get_buffer(), &[0x82, 1, b'a', 1, 1, b'b', 2]);

    packer.set_position(0).unwrap();
    assert_eq!(packer.deserialize::<BTreeMap<String, u32>>().unwrap(), map);
}

#[test]
fn fixed_buffers_do_not_grow() {
    let mut packer = Packer::with_buffer(SerializerBuffer::fixed(vec![0; 4].into_boxed_slice()));
    packer.serialize(&u32::MAX).unwrap_err();
    assert_eq!(packer.length(), 0);

    packer.serialize(&1000u32).unwrap();
    assert_eq!(packer.get_buffer(), &[0xE8, 0x07]);
    assert_eq!(packer.capacity(), 4);

    let err = packer.serialize(&[1u8; 3]).unwrap_err();
    assert!(matches!(err, PackError::CapacityExceeded { .. }));
    assert_eq!(packer.length(), 2);
}

#[test]
fn read_only_buffers_reject_writes() {
    let mut packer = Packer::with_buffer(SerializerBuffer::read_only(vec![0x81, 9]));
    let err = packer.serialize(&1u8).unwrap_err();
    assert!(matches!(err, PackError::ReadOnlyViolation));

    assert_eq!(packer.deserialize::<Vec<u8>>().unwrap(), [9]);
    let err = packer.deserialize::<u8>().unwrap_err();
    assert!(err.is_end_of_data());
}

#[test]
fn scalars_round_trip_at_the_edges() {
    fn check<T: Pack + PartialEq + core::fmt::Debug>(values: &[T]) {
        let mut packer = Packer::new();
        for value in values {
            packer.serialize(value).unwrap();
        }
        packer.set_position(0).unwrap();
        for value in values {
            assert_eq!(&packer.deserialize::<T>().unwrap(), value);
        }
        assert_eq!(packer.remaining(), 0);
    }

    check(&[0u64, 1, 127, 128, u64::MAX]);
    check(&[0i64, -1, 1, i64::MIN, i64::MAX]);
    check(&[0i32, -1, i32::MIN, i32::MAX]);
    check(&[0u16, u16::MAX]);
    check(&[i8::MIN, -1, 0, i8::MAX]);
    check(&[u128::MAX, 0]);
    check(&[f64::INFINITY, f64::NEG_INFINITY, -0.0, f64::MIN_POSITIVE]);
    check(&['a', '\u{10FFFF}', '\0']);

    let mut packer = Packer::new();
    packer.serialize(&f32::NAN).unwrap();
    packer.set_position(0).unwrap();
    assert!(packer.deserialize::<f32>().unwrap().is_nan());
}
