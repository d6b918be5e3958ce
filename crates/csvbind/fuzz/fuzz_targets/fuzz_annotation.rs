//! Fuzz target for annotation parsing.
//!
//! Building a schema from arbitrary annotation text must never panic, and
//! every column it yields must respect the span rule.

#![no_main]

use libfuzzer_sys::fuzz_target;
use csvbind::{FieldDef, FieldKind, RecordType, ScalarKind, SchemaBuilder};

fuzz_target!(|data: &[u8]| {
    let Ok(annotation) = std::str::from_utf8(data) else {
        return;
    };

    let record_type = RecordType::new(
        "Fuzz",
        vec![
            FieldDef::new("scalar", FieldKind::Scalar(ScalarKind::Integer)).annotated(annotation),
            FieldDef::new("sequence", FieldKind::Sequence(ScalarKind::Text)).annotated(annotation),
        ],
    );

    if let Ok(schema) = SchemaBuilder::new().build(&record_type) {
        for column in schema.iter() {
            assert!(column.num_span() == 1 || column.is_sequence());
        }
    }
});
