//! Method bodies decoded through the graph, with operands resolved against the module.

mod common;

use std::sync::Arc;

use cilgraph::{
    disassembler::{FlowType, Operand},
    metadata::{
        signatures::{GenericParameterKind, TypeSig},
        token::Token,
        typesystem::Member,
    },
    LoaderConfig,
};
use common::MetadataBuilder;

fn token_bytes(token: Token) -> [u8; 4] {
    token.value().to_le_bytes()
}

/// ```csharp
/// static class Program {
///     static int counter;
///     static void Main() {
///         Console.WriteLine("hello");
///         counter = counter + 1;
///         _ = typeof(Program).TypeHandle;
///         object boxed = 42;
///     }
///     static void Truncated() { /* nop; call <cut short> */ }
///     static extern void External();
/// }
/// ```
fn program() -> MetadataBuilder {
    let mut b = MetadataBuilder::new("Code.dll");
    b.assembly("Code", (1, 0, 0, 0), &[]);
    let object = b.type_ref_core("System", "Object");
    let console = b.type_ref_core("System", "Console");
    let int32 = b.type_ref_core("System", "Int32");
    let write_line = b.member_ref(console, "WriteLine", &[0x00, 0x01, 0x01, 0x0E]);
    let hello = b.user_string("hello");

    let program = b.type_def(0x0010_0181, "", "Program", object);
    let counter = b.field(program, 0x0011, "counter", &[0x06, 0x08]);
    let main = b.method(program, 0x0091, "Main", &[0x00, 0x00, 0x01]);
    let truncated = b.method(program, 0x0091, "Truncated", &[0x00, 0x00, 0x01]);
    b.method(program, 0x2091, "External", &[0x00, 0x00, 0x01]);

    let mut code = Vec::new();
    code.push(0x72);
    code.extend(token_bytes(hello));
    code.push(0x28);
    code.extend(token_bytes(write_line));
    code.push(0x7E);
    code.extend(token_bytes(counter));
    code.extend([0x17, 0x58]);
    code.push(0x80);
    code.extend(token_bytes(counter));
    code.push(0xD0);
    code.extend(token_bytes(program));
    code.push(0x26);
    code.extend([0x1F, 0x2A]);
    code.push(0x8C);
    code.extend(token_bytes(int32));
    code.extend([0x26, 0x2B, 0x00, 0x2A]);
    b.body(main, &code);

    b.body(truncated, &[0x00, 0x28, 0x01, 0x00]);
    b
}

#[test]
fn operands_resolve_against_the_module() {
    let module = common::module(program());
    let program = module.find_type("", "Program").unwrap().unwrap();
    let main = program
        .methods()
        .unwrap()
        .iter()
        .find(|method| method.name() == "Main")
        .cloned()
        .unwrap();

    let instructions: Vec<_> = main.instructions().unwrap().collect();
    let names: Vec<_> = instructions.iter().map(|instruction| instruction.name).collect();
    assert_eq!(
        names,
        [
            "ldstr", "call", "ldsfld", "ldc.i4.1", "add", "stsfld", "ldtoken", "pop", "ldc.i4.s",
            "box", "pop", "br.s", "ret"
        ]
    );

    match &instructions[0].operand {
        Operand::Token(token) => assert_eq!(module.user_string(*token).unwrap(), "hello"),
        other => panic!("ldstr operand {other:?}"),
    }

    match &instructions[1].operand {
        Operand::Member {
            member: Member::Reference(reference),
            declaring_type,
            type_arguments,
        } => {
            assert_eq!(reference.name(), "WriteLine");
            assert_eq!(declaring_type.as_ref().unwrap().to_string(), "System.Console");
            assert!(type_arguments.is_empty());
            assert_eq!(
                reference.parent_type().unwrap().unwrap().to_string(),
                "System.Console"
            );
        }
        other => panic!("call operand {other:?}"),
    }
    assert_eq!(instructions[1].flow, FlowType::Call);

    let counter = program.fields().unwrap().as_slice()[0].clone();
    for index in [2, 5] {
        match &instructions[index].operand {
            Operand::Member {
                member: Member::Field(field),
                declaring_type,
                ..
            } => {
                assert!(Arc::ptr_eq(field, &counter));
                assert_eq!(declaring_type.as_ref().unwrap().to_string(), "Program");
            }
            other => panic!("field operand {other:?}"),
        }
    }

    assert!(matches!(instructions[6].operand, Operand::Token(token) if token == program.token()));
    assert!(matches!(instructions[8].operand, Operand::Int8(42)));
    match &instructions[9].operand {
        Operand::Type(ty) => assert_eq!(ty.to_string(), "System.Int32"),
        other => panic!("box operand {other:?}"),
    }

    let branch = &instructions[11];
    assert_eq!(branch.targets(), [branch.next_offset()]);
    assert_eq!(instructions[12].flow, FlowType::Return);
    assert_eq!(instructions[12].next_offset(), main.body().unwrap().unwrap().code.len());
    assert_eq!(module.diagnostics().il_faults(), 0);
}

#[test]
fn truncated_body_ends_the_stream() {
    let module = common::module(program());
    let program = module.find_type("", "Program").unwrap().unwrap();
    let methods = program.methods().unwrap();
    let truncated = methods.iter().find(|m| m.name() == "Truncated").unwrap();

    let instructions: Vec<_> = truncated.instructions().unwrap().collect();
    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0].name, "nop");
    assert_eq!(module.diagnostics().il_faults(), 1);

    let external = methods.iter().find(|m| m.name() == "External").unwrap();
    assert!(external.body().unwrap().is_none());
    assert_eq!(external.instructions().unwrap().count(), 0);
    assert_eq!(module.diagnostics().il_faults(), 1);
}

#[test]
fn bodies_can_be_skipped() {
    let config = LoaderConfig {
        decode_method_bodies: false,
        ..LoaderConfig::default()
    };
    let file = common::open_with(program(), config);
    let program = file.module().find_type("", "Program").unwrap().unwrap();
    for method in program.methods().unwrap() {
        assert!(method.rva() != 0 || method.name() == "External");
        assert!(method.body().unwrap().is_none());
        assert_eq!(method.instructions().unwrap().count(), 0);
    }
}

/// ```csharp
/// static class Helpers {
///     static U Identity<U>(U value) => value;
///     static void Echo<T>(List<T> list, T item) => list.Add(Identity<T>(item));
/// }
/// ```
fn generic_calls() -> MetadataBuilder {
    let mut b = MetadataBuilder::new("Generic.dll");
    b.assembly("Generic", (1, 0, 0, 0), &[]);
    let object = b.type_ref_core("System", "Object");
    let list = b.type_ref_core("System.Collections.Generic", "List`1");
    let list_coded = ((list.row() << 2) | 1) as u8;

    // List<!!0>, instantiated over the calling method's first parameter
    let list_of_caller = b.type_spec(&[0x15, 0x12, list_coded, 0x01, 0x1E, 0x00]);
    let add = b.member_ref(list_of_caller, "Add", &[0x20, 0x01, 0x01, 0x13, 0x00]);

    let helpers = b.type_def(0x0010_0181, "", "Helpers", object);
    let identity = b.method(
        helpers,
        0x0096,
        "Identity",
        &[0x10, 0x01, 0x01, 0x1E, 0x00, 0x1E, 0x00],
    );
    let echo = b.method(
        helpers,
        0x0096,
        "Echo",
        &[0x10, 0x01, 0x02, 0x01, 0x15, 0x12, list_coded, 0x01, 0x1E, 0x00, 0x1E, 0x00],
    );
    b.generic_param(identity, 0, "U");
    b.generic_param(echo, 0, "T");
    let identity_of_caller = b.method_spec(identity, &[0x0A, 0x01, 0x1E, 0x00]);

    b.body(identity, &[0x02, 0x2A]);
    let mut code = vec![0x02, 0x03, 0x28];
    code.extend(token_bytes(identity_of_caller));
    code.push(0x6F);
    code.extend(token_bytes(add));
    code.push(0x2A);
    b.body(echo, &code);
    b
}

#[test]
fn call_sites_decode_in_the_callers_context() {
    let module = common::module(generic_calls());
    let helpers = module.find_type("", "Helpers").unwrap().unwrap();
    let methods = helpers.methods().unwrap();
    let echo = methods.iter().find(|m| m.name() == "Echo").unwrap();
    let caller_parameter = echo.generic_parameters().unwrap()[0].clone();

    let instructions: Vec<_> = echo.instructions().unwrap().collect();
    let names: Vec<_> = instructions.iter().map(|instruction| instruction.name).collect();
    assert_eq!(names, ["ldarg.0", "ldarg.1", "call", "callvirt", "ret"]);

    match &instructions[2].operand {
        Operand::Member {
            member: Member::Specification(specification),
            declaring_type,
            type_arguments,
        } => {
            match specification.method().unwrap() {
                Member::Method(method) => assert_eq!(method.name(), "Identity"),
                other => panic!("instantiated {other:?}"),
            }
            assert_eq!(declaring_type.as_ref().unwrap().to_string(), "Helpers");
            match type_arguments.as_slice() {
                [TypeSig::GenericParameter {
                    kind: GenericParameterKind::Method,
                    index: 0,
                    parameter: Some(parameter),
                }] => assert!(Arc::ptr_eq(&parameter.upgrade().unwrap(), &caller_parameter)),
                other => panic!("type arguments {other:?}"),
            }
            assert_eq!(type_arguments[0].to_string(), "T");

            // Without a caller the argument stays positional
            assert_eq!(specification.arguments().unwrap()[0].to_string(), "!!0");
        }
        other => panic!("call operand {other:?}"),
    }

    match &instructions[3].operand {
        Operand::Member {
            member: Member::Reference(add),
            declaring_type,
            type_arguments,
        } => {
            assert_eq!(add.name(), "Add");
            assert!(type_arguments.is_empty());
            assert_eq!(
                declaring_type.as_ref().unwrap().to_string(),
                "System.Collections.Generic.List`1<T>"
            );
            assert_eq!(
                add.parent_type().unwrap().unwrap().to_string(),
                "System.Collections.Generic.List`1<!!0>"
            );
        }
        other => panic!("callvirt operand {other:?}"),
    }
    assert_eq!(module.diagnostics().il_faults(), 0);
}
