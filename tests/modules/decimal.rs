use docwire::spec::ElementType;
use docwire::{doc, Bson, Decimal128, Document, ErrorKind, RepresentationOptions};

fn options(representation: ElementType) -> RepresentationOptions {
    RepresentationOptions::default().decimal_representation(representation)
}

fn round_trip(value: Decimal128, options: &RepresentationOptions) -> Decimal128 {
    let doc = doc! { "d": value };
    let bytes = doc.to_vec_with(options).unwrap();
    let decoded = Document::from_slice(&bytes).unwrap();
    decoded.get_decimal128("d", options).unwrap()
}

#[test]
fn exact_representations_round_trip() {
    let value: Decimal128 = "-12345.6789".parse().unwrap();
    for representation in [ElementType::Array, ElementType::String] {
        assert_eq!(round_trip(value, &options(representation)), value);
    }
}

#[test]
fn array_representation_is_four_int32_words() {
    let value: Decimal128 = "1.5".parse().unwrap();
    let opts = options(ElementType::Array);

    let bytes = doc! { "d": value }.to_vec_with(&opts).unwrap();
    let decoded = Document::from_slice(&bytes).unwrap();
    let words = decoded.get_array("d").unwrap();
    assert_eq!(
        words,
        &vec![
            Bson::Int32(15),
            Bson::Int32(0),
            Bson::Int32(0),
            Bson::Int32(0x0001_0000),
        ]
    );
}

#[test]
fn double_representation_is_close_for_in_range_values() {
    let value: Decimal128 = "0.25".parse().unwrap();
    // 0.25 is exact in binary, so even the double path round-trips.
    assert_eq!(round_trip(value, &options(ElementType::Double)), value);
}

#[test]
fn integer_representations_require_whole_values() {
    let whole: Decimal128 = "42".parse().unwrap();
    assert_eq!(round_trip(whole, &options(ElementType::Int32)), whole);
    assert_eq!(round_trip(whole, &options(ElementType::Int64)), whole);

    let fractional: Decimal128 = "42.5".parse().unwrap();
    let err = doc! { "d": fractional }
        .to_vec_with(&options(ElementType::Int64))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Argument { .. }));
}

#[test]
fn truncation_must_be_opted_into() {
    let fractional: Decimal128 = "42.5".parse().unwrap();
    let opts = options(ElementType::Int32).allow_truncation(true);

    let bytes = doc! { "d": fractional }.to_vec_with(&opts).unwrap();
    let decoded = Document::from_slice(&bytes).unwrap();
    assert_eq!(decoded.get_i32("d").unwrap(), 42);
}

#[test]
fn unknown_representation_is_a_serialization_error() {
    let value: Decimal128 = "1".parse().unwrap();
    let err = doc! { "d": value }
        .to_vec_with(&options(ElementType::Boolean))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Serialization { .. }));
    // The failure is reported, never silently re-represented.
    assert_eq!(err.key.as_deref(), Some("d"));
}

#[test]
fn out_of_range_narrowing_fails_even_with_truncation() {
    let wide: Decimal128 = "3000000000".parse().unwrap();
    let opts = options(ElementType::Int32).allow_truncation(true);
    assert!(doc! { "d": wide }.to_vec_with(&opts).is_err());
}

#[test]
fn decode_accepts_any_stored_representation() {
    let opts = RepresentationOptions::default();
    let doc = doc! {
        "as_string": "7.25",
        "as_double": 7.25,
        "as_int": 7,
        "as_long": 7i64,
    };
    let bytes = doc.to_vec().unwrap();
    let decoded = Document::from_slice(&bytes).unwrap();

    let expected: Decimal128 = "7.25".parse().unwrap();
    assert_eq!(decoded.get_decimal128("as_string", &opts).unwrap(), expected);
    assert_eq!(decoded.get_decimal128("as_double", &opts).unwrap(), expected);

    let seven: Decimal128 = "7".parse().unwrap();
    assert_eq!(decoded.get_decimal128("as_int", &opts).unwrap(), seven);
    assert_eq!(decoded.get_decimal128("as_long", &opts).unwrap(), seven);
}

#[test]
fn type_mismatch_on_decode_names_both_types() {
    let opts = RepresentationOptions::default();
    let bytes = doc! { "d": true }.to_vec().unwrap();
    let decoded = Document::from_slice(&bytes).unwrap();

    let err = decoded.get_decimal128("d", &opts).unwrap_err();
    assert!(err.to_string().contains("bool"), "{err}");
}
