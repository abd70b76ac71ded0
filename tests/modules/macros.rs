use docwire::{bson, doc, Bson};

#[test]
fn literals_map_to_the_expected_variants() {
    let doc = doc! {
        "int": 8,
        "long": 4i64,
        "double": 1.25,
        "string": "text",
        "bool": true,
        "null": null,
        "array": [1, "two", [3]],
        "nested": { "deep": { "deeper": null } },
    };

    assert_eq!(doc.get("int"), Some(&Bson::Int32(8)));
    assert_eq!(doc.get("long"), Some(&Bson::Int64(4)));
    assert_eq!(doc.get("double"), Some(&Bson::Double(1.25)));
    assert_eq!(doc.get("string"), Some(&Bson::String("text".to_string())));
    assert_eq!(doc.get("bool"), Some(&Bson::Boolean(true)));
    assert_eq!(doc.get("null"), Some(&Bson::Null));

    let array = doc.get_array("array").unwrap();
    assert_eq!(array[1], Bson::String("two".to_string()));
    assert_eq!(array[2], Bson::Array(vec![Bson::Int32(3)]));

    let nested = doc.get_document("nested").unwrap();
    assert_eq!(
        nested.get_document("deep").unwrap().get("deeper"),
        Some(&Bson::Null)
    );
}

#[test]
fn keys_and_values_may_be_expressions() {
    let key = "computed";
    let value = 2 + 2;
    let doc = doc! { key: value, format!("{key}_again"): value };

    assert_eq!(doc.get("computed"), Some(&Bson::Int32(4)));
    assert_eq!(doc.get("computed_again"), Some(&Bson::Int32(4)));
}

#[test]
fn trailing_commas_are_accepted() {
    let a = doc! { "x": 1, "y": [1, 2,], };
    let b = doc! { "x": 1, "y": [1, 2] };
    assert_eq!(a, b);
}

#[test]
fn bson_macro_builds_bare_values() {
    assert_eq!(bson!(null), Bson::Null);
    assert_eq!(bson!([]), Bson::Array(vec![]));
    assert_eq!(bson!("s"), Bson::String("s".to_string()));
    assert_eq!(bson!({}), Bson::Document(doc! {}));
}
