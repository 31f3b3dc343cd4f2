//! Assembly identities read from the `Assembly` and `AssemblyRef` tables.

mod common;

use std::sync::Arc;

use cilgraph::{
    metadata::{
        diagnostics::Diagnostics,
        identity::{AssemblyIdentity, PublicKeyToken},
        tables::TableId,
    },
    CilFile, File, LoaderConfig,
};
use common::MetadataBuilder;

/// The ECMA standard public key, whose token is well known
const ECMA_KEY: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];

fn strong_named() -> MetadataBuilder {
    let mut b = MetadataBuilder::new("Signed.dll");
    b.assembly("Signed", (4, 0, 0, 0), &ECMA_KEY);

    // A reference carrying the full key rather than its token
    let key = b.blob(&ECMA_KEY);
    let name = b.string("Standard");
    b.push(TableId::AssemblyRef, vec![4, 0, 0, 0, 0x0001, key, name, 0, 0]);
    b.assembly_ref("Plain", (1, 2, 3, 4), &[]);
    b
}

#[test]
fn token_of_a_full_public_key() {
    let file = common::open(strong_named());
    let assembly = file.assembly().unwrap();

    assert_eq!(assembly.name(), "Signed");
    assert_eq!(
        assembly.public_key_token().unwrap().to_string(),
        "b77a5c561934e089"
    );
    assert_eq!(
        assembly.display_name(),
        "Signed, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
    );
    assert_eq!(file.module().assembly_name().unwrap().as_deref(), Some("Signed"));
}

#[test]
fn reference_tokens() {
    let module = common::module(strong_named());
    let references = module.assembly_references().unwrap();
    assert_eq!(references.len(), 2);

    let standard = &references[0];
    assert_eq!(standard.name(), "Standard");
    assert_eq!(
        standard.public_key_token(),
        Some(PublicKeyToken([0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89]))
    );

    let plain = &references[1];
    assert!(plain.public_key_token().is_none());
    assert_eq!(
        plain.display_name(),
        "Plain, Version=1.2.3.4, Culture=neutral, PublicKeyToken=null"
    );

    let parsed: AssemblyIdentity = standard.display_name().parse().unwrap();
    assert_eq!(parsed.display_name(), standard.display_name());
    assert!(Arc::ptr_eq(standard, &module.assembly_reference(1).unwrap()));
}

#[test]
fn module_without_identity() {
    let file = common::open(MetadataBuilder::new("Part.netmodule"));
    assert!(!file.is_assembly());
    assert!(file.assembly().is_none());
    assert_eq!(file.module().name(), "Part.netmodule");
    assert_eq!(file.module().assembly_name().unwrap(), None);
}

#[test]
fn shared_diagnostics_sink() {
    let diagnostics = Arc::new(Diagnostics::new());
    let file = File::from_mem(strong_named().build()).unwrap();
    let opened = CilFile::open(file, LoaderConfig::default(), diagnostics.clone())
        .unwrap()
        .unwrap();

    assert!(Arc::ptr_eq(opened.diagnostics(), &diagnostics));
    assert_eq!(diagnostics.attribute_faults(), 0);
    assert_eq!(diagnostics.il_faults(), 0);
}
