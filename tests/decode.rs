//! End-to-end scenarios built as hand-crafted byte streams, exercising the
//! decoder's public surface the way a real file on disk would.

mod support;

use std::rc::Rc;

use javastream::handle::HANDLE_BASE;
use javastream::{Decoder, Error, SliceSource, Value};
use support::*;

fn decode(body: Vec<u8>) -> Value {
    Decoder::parse_stream(SliceSource::new(&stream(&body))).expect("decode should succeed")
}

#[test]
fn int_array_round_trips() {
    let mut body = vec![TC_ARRAY];
    body.extend(class_desc("[I", 0, SC_SERIALIZABLE, &[], &empty_annotation(), &null_super()));
    body.extend_from_slice(&10u32.to_be_bytes());
    for i in 0..10i32 {
        body.extend_from_slice(&i.to_be_bytes());
    }

    let value = decode(body);
    let expected = Value::Seq((0..10).map(|i| Value::Int(i as i64)).collect());
    assert_eq!(value, expected);
}

#[test]
fn double_array_covers_float_limits() {
    let limits: [f64; 5] = [
        f64::from_bits(1), // 2^-1074, the smallest subnormal
        0.0,
        (2.0 - f64::EPSILON) * 2f64.powi(1023),
        f64::NEG_INFINITY,
        f64::INFINITY,
    ];
    let mut body = vec![TC_ARRAY];
    body.extend(class_desc("[D", 0, SC_SERIALIZABLE, &[], &empty_annotation(), &null_super()));
    body.extend_from_slice(&(limits.len() as u32).to_be_bytes());
    for v in limits {
        body.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    let value = decode(body);
    match value {
        Value::Seq(elements) => {
            assert_eq!(elements.len(), limits.len());
            for (element, expected) in elements.iter().zip(limits) {
                match element {
                    Value::Float(f) => assert_eq!(f.to_bits(), expected.to_bits()),
                    other => panic!("expected a float, got {other:?}"),
                }
            }
        }
        other => panic!("expected a sequence, got {other:?}"),
    }
}

#[test]
fn boxed_double_projects_to_its_bare_value() {
    let mut body = vec![TC_OBJECT];
    body.extend(class_desc(
        "java.lang.Double",
        0,
        SC_SERIALIZABLE,
        &[field_primitive(b'D', "value")],
        &empty_annotation(),
        &null_super(),
    ));
    body.extend_from_slice(&10.0f64.to_bits().to_be_bytes());

    assert_eq!(decode(body), Value::Float(10.0));
}

fn person_class_desc() -> Vec<u8> {
    class_desc(
        "Person",
        0,
        SC_SERIALIZABLE,
        &[
            field_object(b'L', "firstName", "java.lang.String"),
            field_object(b'L', "lastName", "java.lang.String"),
            field_primitive(b'I', "ssn"),
            field_primitive(b'I', "age"),
            field_object(b'L', "siblings", "java.util.ArrayList"),
        ],
        &empty_annotation(),
        &null_super(),
    )
}

fn array_list_class_desc() -> Vec<u8> {
    class_desc(
        "java.util.ArrayList",
        0,
        SC_WRITE_METHOD_AND_SERIALIZABLE,
        &[],
        &empty_annotation(),
        &null_super(),
    )
}

fn person_instance(first: &str, last: &str, ssn: i32, age: i32, siblings: Vec<Vec<u8>>) -> Vec<u8> {
    let mut v = vec![TC_OBJECT];
    v.extend(person_class_desc());
    v.extend(string_token(first));
    v.extend(string_token(last));
    v.extend_from_slice(&ssn.to_be_bytes());
    v.extend_from_slice(&age.to_be_bytes());
    v.push(TC_OBJECT);
    v.extend(array_list_class_desc());
    v.extend(ordered_collection_annotation(&siblings));
    v
}

#[test]
fn nested_object_with_collection_field() {
    let nested = person_instance("ben", "homan", 654321, 5, Vec::new());
    let body = person_instance("jack", "homan", 123456, 27, vec![nested]);

    let value = decode(body);
    let expected_inner = Value::Object {
        class: Rc::from("Person"),
        fields: vec![
            ("firstName".into(), Value::string("ben")),
            ("lastName".into(), Value::string("homan")),
            ("ssn".into(), Value::Int(654321)),
            ("age".into(), Value::Int(5)),
            ("siblings".into(), Value::Seq(Vec::new())),
        ],
    };
    let expected = Value::Object {
        class: Rc::from("Person"),
        fields: vec![
            ("firstName".into(), Value::string("jack")),
            ("lastName".into(), Value::string("homan")),
            ("ssn".into(), Value::Int(123456)),
            ("age".into(), Value::Int(27)),
            ("siblings".into(), Value::Seq(vec![expected_inner])),
        ],
    };
    assert_eq!(value, expected);
}

#[test]
fn bitset_projects_to_a_set_of_indices() {
    // word 0b1_0101_0101 has bits 0, 2, 4, 6, 8 set.
    let word: i64 = 0b1_0101_0101;
    let mut body = vec![TC_OBJECT];
    body.extend(class_desc(
        "java.util.BitSet",
        0,
        SC_SERIALIZABLE,
        &[field_object(b'[', "bits", "[J")],
        &empty_annotation(),
        &null_super(),
    ));
    body.push(TC_ARRAY);
    body.extend(class_desc("[J", 0, SC_SERIALIZABLE, &[], &empty_annotation(), &null_super()));
    body.extend_from_slice(&1u32.to_be_bytes());
    body.extend_from_slice(&word.to_be_bytes());

    let value = decode(body);
    assert_eq!(
        value,
        Value::Set(vec![
            Value::Int(0),
            Value::Int(2),
            Value::Int(4),
            Value::Int(6),
            Value::Int(8),
        ])
    );
}

#[test]
fn hashmap_of_boxed_integers_to_strings() {
    let pairs = vec![
        (integer_obj(0), string_token("zero")),
        (integer_obj(1), string_token("one")),
    ];
    let mut body = vec![TC_OBJECT];
    body.extend(class_desc(
        "java.util.HashMap",
        0,
        SC_WRITE_METHOD_AND_SERIALIZABLE,
        &[field_primitive(b'F', "loadFactor"), field_primitive(b'I', "threshold")],
        &empty_annotation(),
        &null_super(),
    ));
    body.extend_from_slice(&0.75f32.to_be_bytes());
    body.extend_from_slice(&12i32.to_be_bytes());
    body.extend(map_annotation(16, &pairs));

    let value = decode(body);
    assert_eq!(
        value,
        Value::Map(vec![
            (Value::Int(0), Value::string("zero")),
            (Value::Int(1), Value::string("one")),
        ])
    );
}

#[test]
fn multi_dimensional_double_array() {
    fn inner_array(values: &[f64]) -> Vec<u8> {
        let mut v = vec![TC_ARRAY];
        v.extend(class_desc("[D", 0, SC_SERIALIZABLE, &[], &empty_annotation(), &null_super()));
        v.extend_from_slice(&(values.len() as u32).to_be_bytes());
        for value in values {
            v.extend_from_slice(&value.to_bits().to_be_bytes());
        }
        v
    }

    let mut body = vec![TC_ARRAY];
    body.extend(class_desc("[[D", 0, SC_SERIALIZABLE, &[], &empty_annotation(), &null_super()));
    body.extend_from_slice(&2u32.to_be_bytes());
    body.extend(inner_array(&[1.0, 2.0]));
    body.extend(inner_array(&[3.0]));

    let value = decode(body);
    assert_eq!(
        value,
        Value::Seq(vec![
            Value::Seq(vec![Value::Float(1.0), Value::Float(2.0)]),
            Value::Seq(vec![Value::Float(3.0)]),
        ])
    );
}

#[test]
fn subclass_field_shadows_superclass_field_of_the_same_name() {
    let person_level = class_desc(
        "Person",
        0,
        SC_SERIALIZABLE,
        &[field_primitive(b'I', "id")],
        &empty_annotation(),
        &null_super(),
    );
    let employee_level = class_desc(
        "Employee",
        0,
        SC_SERIALIZABLE,
        &[field_primitive(b'I', "id"), field_object(b'L', "title", "java.lang.String")],
        &empty_annotation(),
        &person_level,
    );

    let mut body = vec![TC_OBJECT];
    body.extend(employee_level);
    // Field values stream super-first: Person.id, then Employee.id, Employee.title.
    body.extend_from_slice(&1i32.to_be_bytes());
    body.extend_from_slice(&2i32.to_be_bytes());
    body.extend(string_token("Mgr"));

    let value = decode(body);
    assert_eq!(
        value,
        Value::Object {
            class: Rc::from("Employee"),
            fields: vec![("id".into(), Value::Int(2)), ("title".into(), Value::string("Mgr"))],
        }
    );
}

#[test]
fn linked_list_of_boxed_integers() {
    let mut body = vec![TC_OBJECT];
    body.extend(class_desc(
        "java.util.LinkedList",
        0,
        SC_WRITE_METHOD_AND_SERIALIZABLE,
        &[],
        &empty_annotation(),
        &null_super(),
    ));
    body.extend(ordered_collection_annotation(&[integer_obj(1), integer_obj(2)]));

    assert_eq!(decode(body), Value::Seq(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn empty_hash_set() {
    let mut body = vec![TC_OBJECT];
    body.extend(class_desc(
        "java.util.HashSet",
        0,
        SC_WRITE_METHOD_AND_SERIALIZABLE,
        &[],
        &empty_annotation(),
        &null_super(),
    ));
    body.extend(set_annotation(16, 0.75, &[]));

    assert_eq!(decode(body), Value::Set(Vec::new()));
}

#[test]
fn aggregate_class_with_two_collection_fields() {
    let mut array_list_field = vec![TC_OBJECT];
    array_list_field.extend(array_list_class_desc());
    array_list_field.extend(ordered_collection_annotation(&[integer_obj(7)]));

    let mut hash_set_field = vec![TC_OBJECT];
    hash_set_field.extend(class_desc(
        "java.util.HashSet",
        0,
        SC_WRITE_METHOD_AND_SERIALIZABLE,
        &[],
        &empty_annotation(),
        &null_super(),
    ));
    hash_set_field.extend(set_annotation(16, 0.75, &[string_token("x")]));

    let mut body = vec![TC_OBJECT];
    body.extend(class_desc(
        "Aggregate",
        0,
        SC_SERIALIZABLE,
        &[
            field_object(b'L', "arrayList", "java.util.ArrayList"),
            field_object(b'L', "hashSet", "java.util.HashSet"),
        ],
        &empty_annotation(),
        &null_super(),
    ));
    body.extend(array_list_field);
    body.extend(hash_set_field);

    let value = decode(body);
    assert_eq!(
        value,
        Value::Object {
            class: Rc::from("Aggregate"),
            fields: vec![
                ("arrayList".into(), Value::Seq(vec![Value::Int(7)])),
                ("hashSet".into(), Value::Set(vec![Value::string("x")])),
            ],
        }
    );
}

#[test]
fn reset_token_clears_the_handle_table_and_stale_references_fail() {
    let mut body = vec![];
    body.extend(string_token("hi"));
    body.push(TC_RESET);
    body.push(TC_REFERENCE);
    body.extend_from_slice(&HANDLE_BASE.to_be_bytes());

    let err = Decoder::parse_stream(SliceSource::new(&stream(&body))).unwrap_err();
    assert!(matches!(err, Error::BadHandle { .. }));
}

#[test]
fn shared_reference_projects_identical_values_without_infinite_recursion() {
    // Handles are assigned in the order their tag is read: 0 the ArrayList's
    // own class descriptor, 1 the ArrayList instance, 2 the shared Integer's
    // class descriptor, 3 the Integer instance itself. The second list slot
    // back-references handle 3 instead of repeating the instance.
    let shared_instance_handle = HANDLE_BASE + 3;

    let mut body = vec![TC_OBJECT];
    body.extend(array_list_class_desc());
    let mut reference_bytes = vec![TC_REFERENCE];
    reference_bytes.extend_from_slice(&shared_instance_handle.to_be_bytes());
    let elements = vec![integer_obj(9), reference_bytes];
    body.extend(ordered_collection_annotation(&elements));

    let value = decode(body);
    match value {
        Value::Seq(items) => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[0], Value::Int(9));
            assert_eq!(items[1], Value::Ref(shared_instance_handle));
        }
        other => panic!("expected a sequence, got {other:?}"),
    }
}
