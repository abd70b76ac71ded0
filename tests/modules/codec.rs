use assert_matches::assert_matches;
use docwire::spec::BinarySubtype;
use docwire::{
    doc, Binary, Bson, DateTime, DbPointer, Document, JavaScriptCodeWithScope, ObjectId, Regex,
    RepresentationOptions, Timestamp, UuidRepresentation,
};
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn round_trip(doc: &Document) -> Document {
    let bytes = doc.to_vec().expect("encode");
    Document::from_slice(&bytes).expect("decode")
}

#[test]
fn byte_exact_two_int_document() {
    let doc = doc! { "_id": 1, "b": 2 };

    let expected: Vec<u8> = vec![
        0x13, 0x00, 0x00, 0x00, // total length = 19
        0x10, b'_', b'i', b'd', 0x00, 0x01, 0x00, 0x00, 0x00, // _id: int32 1
        0x10, b'b', 0x00, 0x02, 0x00, 0x00, 0x00, // b: int32 2
        0x00, // terminator
    ];
    assert_eq!(doc.to_vec().unwrap(), expected);

    let decoded = Document::from_slice(&expected).unwrap();
    assert_eq!(
        decoded.iter().collect::<Vec<_>>(),
        vec![
            (&"_id".to_string(), &Bson::Int32(1)),
            (&"b".to_string(), &Bson::Int32(2)),
        ]
    );
}

#[test]
fn every_variant_round_trips() {
    let oid = ObjectId::new();
    let doc = doc! {
        "double": 3.5,
        "string": "hello",
        "array": [1, 2.0, "three", null],
        "document": { "nested": true },
        "bool": false,
        "null": null,
        "regex": Regex { pattern: "ab+".to_string(), options: "im".to_string() },
        "code": Bson::JavaScriptCode("function() {}".to_string()),
        "code_w_scope": JavaScriptCodeWithScope {
            code: "function(x) { return x + y; }".to_string(),
            scope: doc! { "y": 1 },
        },
        "int": i32::MIN,
        "long": i64::MAX,
        "timestamp": Timestamp { time: 1_565_545_664, increment: 3 },
        "binary": Binary { subtype: BinarySubtype::Md5, bytes: vec![1, 2, 3] },
        "binary_old": Binary { subtype: BinarySubtype::BinaryOld, bytes: vec![4, 5] },
        "user_defined": Binary { subtype: BinarySubtype::UserDefined(0x80), bytes: vec![] },
        "oid": oid,
        "date": DateTime::from_millis(1_286_705_410_000),
        "pre_epoch": DateTime::from_millis(-44),
        "symbol": Bson::Symbol("sym".to_string()),
        "undefined": Bson::Undefined,
        "min": Bson::MinKey,
        "max": Bson::MaxKey,
        "db_pointer": DbPointer { namespace: "db.coll".to_string(), id: oid },
    };

    assert_eq!(round_trip(&doc), doc);
}

#[test]
fn order_and_duplicates_survive_a_round_trip() {
    let mut doc = Document::new();
    doc.insert("z", 1);
    doc.insert("a", 2);
    doc.insert("z", 3);
    doc.insert("m", "mid");

    let decoded = round_trip(&doc);
    assert_eq!(
        decoded.keys().collect::<Vec<_>>(),
        vec!["z", "a", "z", "m"]
    );
    assert_eq!(decoded.get("z"), Some(&Bson::Int32(3)));
    assert_eq!(decoded, doc);
}

#[test]
fn regex_options_are_stored_sorted() {
    let doc = doc! {
        "r": Regex { pattern: "^x".to_string(), options: "mix".to_string() },
    };
    let decoded = round_trip(&doc);
    assert_eq!(
        decoded.get("r"),
        Some(&Bson::RegularExpression(Regex {
            pattern: "^x".to_string(),
            options: "imx".to_string(),
        }))
    );
}

#[test]
fn interior_nul_in_a_key_fails_to_encode() {
    let mut doc = Document::new();
    doc.insert("bad\0key", 1);

    let err = doc.to_vec().unwrap_err();
    assert_matches!(err.kind, docwire::ErrorKind::Argument { .. });
}

#[test]
fn uuids_round_trip_under_each_representation() {
    let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
    for rep in [
        UuidRepresentation::Standard,
        UuidRepresentation::CSharpLegacy,
        UuidRepresentation::JavaLegacy,
        UuidRepresentation::PythonLegacy,
    ] {
        let options = RepresentationOptions::default().uuid_representation(rep);
        let doc = doc! { "id": Binary::from_uuid_with_representation(uuid, rep) };

        let bytes = doc.to_vec_with(&options).unwrap();
        let decoded = Document::from_slice(&bytes).unwrap();
        let binary = decoded.get_binary("id").unwrap();
        assert_eq!(binary.to_uuid_with_representation(rep).unwrap(), uuid);
    }
}

#[test]
fn trailing_bytes_after_a_document_are_rejected() {
    let mut bytes = doc! { "a": 1 }.to_vec().unwrap();
    bytes.push(0);

    let err = Document::from_slice(&bytes).unwrap_err();
    assert_matches!(err.kind, docwire::ErrorKind::Format { .. });
}

#[test]
fn reader_stops_at_the_document_boundary() {
    let first = doc! { "n": 1 };
    let second = doc! { "n": 2 };

    let mut bytes = first.to_vec().unwrap();
    bytes.extend(second.to_vec().unwrap());

    let mut reader = bytes.as_slice();
    assert_eq!(Document::from_reader(&mut reader).unwrap(), first);
    assert_eq!(Document::from_reader(&mut reader).unwrap(), second);
}

#[test]
fn decode_errors_name_the_offending_key() {
    let mut bytes = doc! { "ok": 1, "broken": "abc" }.to_vec().unwrap();
    // Corrupt the string length prefix of the second value.
    let prefix = 4 + (1 + 3 + 4) + 1 + "broken".len() + 1;
    bytes[prefix] = 0xFF;

    let err = Document::from_slice(&bytes).unwrap_err();
    assert_eq!(err.key.as_deref(), Some("broken"));
}
