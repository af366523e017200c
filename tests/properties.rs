//! Property-based checks for invariants that should hold over the whole
//! input space rather than just the hand-picked scenarios in `decode.rs`.

mod support;

use javastream::{Decoder, SliceSource, Value};
use proptest::prelude::*;
use support::*;

fn int_array_stream(values: &[i32]) -> Vec<u8> {
    let mut body = vec![TC_ARRAY];
    body.extend(class_desc("[I", 0, SC_SERIALIZABLE, &[], &empty_annotation(), &null_super()));
    body.extend_from_slice(&(values.len() as u32).to_be_bytes());
    for v in values {
        body.extend_from_slice(&v.to_be_bytes());
    }
    stream(&body)
}

fn double_array_stream(values: &[u64]) -> Vec<u8> {
    let mut body = vec![TC_ARRAY];
    body.extend(class_desc("[D", 0, SC_SERIALIZABLE, &[], &empty_annotation(), &null_super()));
    body.extend_from_slice(&(values.len() as u32).to_be_bytes());
    for bits in values {
        body.extend_from_slice(&bits.to_be_bytes());
    }
    stream(&body)
}

proptest! {
    /// Every `i32` round-trips through an int array exactly, regardless of
    /// sign or magnitude (invariant 5: primitive round trip).
    #[test]
    fn int_array_round_trips_any_values(values in proptest::collection::vec(any::<i32>(), 0..32)) {
        let bytes = int_array_stream(&values);
        let decoded = Decoder::parse_stream(SliceSource::new(&bytes)).unwrap();
        let expected = Value::Seq(values.iter().map(|v| Value::Int(*v as i64)).collect());
        prop_assert_eq!(decoded, expected);
    }

    /// Every `f64` bit pattern round-trips exactly, including `NaN` payloads
    /// and signed zero, which `==` would otherwise paper over.
    #[test]
    fn double_array_round_trips_any_bit_pattern(raw in proptest::collection::vec(any::<u64>(), 0..32)) {
        let bytes = double_array_stream(&raw);
        let decoded = Decoder::parse_stream(SliceSource::new(&bytes)).unwrap();
        match decoded {
            Value::Seq(elements) => {
                prop_assert_eq!(elements.len(), raw.len());
                for (element, bits) in elements.iter().zip(&raw) {
                    match element {
                        Value::Float(f) => prop_assert_eq!(f.to_bits(), *bits),
                        other => prop_assert!(false, "expected a float, got {:?}", other),
                    }
                }
            }
            other => prop_assert!(false, "expected a sequence, got {:?}", other),
        }
    }
}

/// Handles are assigned as a strictly increasing run starting at
/// `HANDLE_BASE`, with no gaps, across an arbitrary number of top-level
/// strings (invariant 1: handle monotonicity).
#[test]
fn handle_table_assigns_a_gapless_monotonic_run() {
    use javastream::handle::HandleTable;
    let mut table = HandleTable::new();
    let mut previous = None;
    for _ in 0..50 {
        let handle = table.assign(javastream::handle::Entity::Pending);
        if let Some(prev) = previous {
            assert_eq!(handle, prev + 1);
        }
        previous = Some(handle);
    }
}
