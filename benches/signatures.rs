//! Benchmarks for signature and instruction decoding.
//!
//! Signatures are decoded against a [`SyntheticTypeProvider`], so the numbers cover the
//! blob walk and type construction without any table access.

extern crate cilgraph;

use cilgraph::{
    disassembler::InstructionDecoder,
    metadata::{
        signatures::{
            parse_field_signature, parse_local_var_signature, parse_method_signature,
            parse_method_spec_signature, parse_property_signature, parse_type_spec_signature,
            SyntheticTypeProvider,
        },
        typesystem::GenericContext,
    },
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Method signatures: `void ()`, primitives, instance, generic method, byref and arrays
fn bench_method_signatures(c: &mut Criterion) {
    let provider = SyntheticTypeProvider::new();
    let context = GenericContext::default();
    let cases: [(&str, &[u8]); 6] = [
        ("sig_method_void_no_params", &[0x00, 0x00, 0x01]),
        ("sig_method_primitives", &[0x00, 0x03, 0x08, 0x08, 0x0E, 0x02]),
        ("sig_method_instance", &[0x20, 0x01, 0x01, 0x08]),
        // !!0 M<T>(!!0, class List`1<!!0>)
        (
            "sig_method_generic",
            &[0x10, 0x01, 0x02, 0x1E, 0x00, 0x1E, 0x00, 0x15, 0x12, 0x09, 0x01, 0x1E, 0x00],
        ),
        ("sig_method_byref", &[0x00, 0x02, 0x01, 0x10, 0x08, 0x10, 0x0E]),
        // int32[,] (string[])
        (
            "sig_method_array_return",
            &[0x00, 0x01, 0x14, 0x08, 0x02, 0x00, 0x00, 0x1D, 0x0E],
        ),
    ];

    for (name, signature) in cases {
        c.bench_function(name, |b| {
            b.iter(|| {
                let sig = parse_method_signature(black_box(signature), &provider, &context).unwrap();
                black_box(sig)
            });
        });
    }
}

/// Field, property, local and instantiation signatures
fn bench_other_signatures(c: &mut Criterion) {
    let provider = SyntheticTypeProvider::new();
    let context = GenericContext::default();

    c.bench_function("sig_field_class", |b| {
        let signature = [0x06, 0x12, 0x08];
        b.iter(|| black_box(parse_field_signature(black_box(&signature), &provider, &context).unwrap()));
    });

    c.bench_function("sig_field_modified", |b| {
        // modreq(IsVolatile) int32
        let signature = [0x06, 0x1F, 0x0D, 0x08];
        b.iter(|| black_box(parse_field_signature(black_box(&signature), &provider, &context).unwrap()));
    });

    c.bench_function("sig_property_indexer", |b| {
        let signature = [0x28, 0x01, 0x0E, 0x08];
        b.iter(|| {
            black_box(parse_property_signature(black_box(&signature), &provider, &context).unwrap())
        });
    });

    c.bench_function("sig_localvar_multiple", |b| {
        let signature = [0x07, 0x04, 0x08, 0x0E, 0x45, 0x0F, 0x08, 0x10, 0x12, 0x08];
        b.iter(|| {
            black_box(parse_local_var_signature(black_box(&signature), &provider, &context).unwrap())
        });
    });

    c.bench_function("sig_typespec_nested_generic", |b| {
        // Dictionary`2<string, List`1<int32>>
        let signature = [0x15, 0x12, 0x10, 0x02, 0x0E, 0x15, 0x12, 0x09, 0x01, 0x08];
        b.iter(|| {
            black_box(parse_type_spec_signature(black_box(&signature), &provider, &context).unwrap())
        });
    });

    c.bench_function("sig_methodspec", |b| {
        let signature = [0x0A, 0x02, 0x08, 0x0E];
        b.iter(|| {
            black_box(parse_method_spec_signature(black_box(&signature), &provider, &context).unwrap())
        });
    });
}

/// A loop with a switch, calls and long branches, decoded without token resolution
fn bench_instructions(c: &mut Criterion) {
    let mut code = Vec::new();
    for _ in 0..64 {
        code.extend_from_slice(&[0x02, 0x03, 0x58, 0x0A]); // ldarg.0 ldarg.1 add stloc.0
        code.extend_from_slice(&[0x28, 0x01, 0x00, 0x00, 0x06]); // call
        code.extend_from_slice(&[0x45, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        code.extend_from_slice(&[0x38, 0x00, 0x00, 0x00, 0x00]); // br 0
    }
    code.push(0x2A);

    c.bench_function("il_decode_raw", |b| {
        b.iter(|| black_box(InstructionDecoder::raw(black_box(&code)).count()));
    });
}

criterion_group!(
    benches,
    bench_method_signatures,
    bench_other_signatures,
    bench_instructions
);
criterion_main!(benches);
