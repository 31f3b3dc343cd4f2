//! The entity graph and documentation ids over a crafted library.
//!
//! ```csharp
//! public class C2<K, V> { private K first; public void Swap<T>(V value, T other) { } }
//! public readonly struct S2 { public S2() { } }
//! public class C { public static explicit operator int(C x) => 0; }
//! public class Bar {
//!     public void M2(int x, __arglist) { }
//!     public static void Sum(params int[] values) { }
//! }
//! namespace Demo {
//!     public class Widget {
//!         public const int Limit = 10;
//!         public int Count { get; }
//!         public int this[int index] { get; }
//!         public event EventHandler Changed;
//!     }
//!     public class Outer { public class Inner { } }
//! }
//! ```

mod common;

use std::sync::Arc;

use cilgraph::{
    docid::DocumentationId,
    metadata::{
        token::Token,
        typesystem::{
            ConstantValue, Field, Member, Method, MethodKind, RefKind, TypeDefinition, TypeKind,
        },
    },
};
use common::MetadataBuilder;

fn library() -> MetadataBuilder {
    let mut b = MetadataBuilder::new("Library.dll");
    b.assembly("Library", (1, 0, 0, 0), &[]);

    let object = b.type_ref_core("System", "Object");
    let value_type = b.type_ref_core("System", "ValueType");
    let handler = b.type_ref_core("System", "EventHandler");
    let read_only = b.type_ref_core("System.Runtime.CompilerServices", "IsReadOnlyAttribute");
    let read_only_ctor = b.member_ref(read_only, ".ctor", &[0x20, 0x00, 0x01]);
    let param_array = b.type_ref_core("System", "ParamArrayAttribute");
    let param_array_ctor = b.member_ref(param_array, ".ctor", &[0x20, 0x00, 0x01]);

    let c2 = b.type_def(0x0010_0001, "", "C2`2", object);
    b.field(c2, 0x0001, "first", &[0x06, 0x13, 0x00]);
    let swap = b.method(c2, 0x0086, "Swap", &[0x30, 0x01, 0x02, 0x01, 0x13, 0x01, 0x1E, 0x00]);
    b.generic_param(c2, 0, "K");
    b.generic_param(c2, 1, "V");
    b.generic_param(swap, 0, "T");

    let s2 = b.type_def(0x0010_0109, "", "S2", value_type);
    b.method(s2, 0x1886, ".ctor", &[0x20, 0x00, 0x01]);
    b.custom_attribute(s2, read_only_ctor, &[0x01, 0x00, 0x00, 0x00]);

    let c = b.type_def(0x0010_0001, "", "C", object);
    let explicit = b.method(c, 0x0896, "op_Explicit", &[0x00, 0x01, 0x08, 0x12, (c.row() << 2) as u8]);
    b.param(explicit, 1, "x");

    let bar = b.type_def(0x0010_0001, "", "Bar", object);
    let m2 = b.method(bar, 0x0086, "M2", &[0x25, 0x01, 0x01, 0x08]);
    b.param(m2, 1, "x");
    let sum = b.method(bar, 0x0096, "Sum", &[0x00, 0x01, 0x01, 0x1D, 0x08]);
    let values = b.param(sum, 1, "values");
    b.custom_attribute(values, param_array_ctor, &[0x01, 0x00, 0x00, 0x00]);

    let handler_coded = ((handler.row() << 2) | 1) as u8;
    let widget = b.type_def(0x0010_0001, "Demo", "Widget", object);
    let limit = b.field(widget, 0x8056, "Limit", &[0x06, 0x08]);
    b.constant(limit, 0x08, &10_i32.to_le_bytes());
    let get_count = b.method(widget, 0x0886, "get_Count", &[0x20, 0x00, 0x08]);
    let get_item = b.method(widget, 0x0886, "get_Item", &[0x20, 0x01, 0x08, 0x08]);
    let add_changed = b.method(widget, 0x0886, "add_Changed", &[0x20, 0x01, 0x01, 0x12, handler_coded]);
    let count = b.property(widget, "Count", &[0x28, 0x00, 0x08]);
    b.semantics(count, get_count, 0x0002);
    let item = b.property(widget, "Item", &[0x28, 0x01, 0x08, 0x08]);
    b.semantics(item, get_item, 0x0002);
    let changed = b.event(widget, "Changed", handler);
    b.semantics(changed, add_changed, 0x0008);

    let outer = b.type_def(0x0010_0001, "Demo", "Outer", object);
    let inner = b.type_def(0x0010_0002, "", "Inner", object);
    b.nested(inner, outer);
    b
}

fn find(types: &[Arc<TypeDefinition>], name: &str) -> Arc<TypeDefinition> {
    types
        .iter()
        .find(|ty| ty.name() == name)
        .cloned()
        .unwrap_or_else(|| panic!("type {name}"))
}

fn method(ty: &TypeDefinition, name: &str) -> Arc<Method> {
    ty.methods()
        .unwrap()
        .iter()
        .find(|method| method.name() == name)
        .cloned()
        .unwrap_or_else(|| panic!("method {name}"))
}

#[test]
fn documentation_ids() {
    let module = common::module(library());
    let types = module.types().unwrap();

    let c2 = find(&types, "C2`2");
    assert_eq!(c2.documentation_id().unwrap(), "T:C2`2");
    assert_eq!(
        method(&c2, "Swap").documentation_id().unwrap(),
        "M:C2`2.Swap``1(`1,``0)"
    );
    assert_eq!(
        c2.fields().unwrap().as_slice()[0].documentation_id().unwrap(),
        "F:C2`2.first"
    );

    let s2 = find(&types, "S2");
    assert_eq!(method(&s2, ".ctor").documentation_id().unwrap(), "M:S2.#ctor");

    let c = find(&types, "C");
    assert_eq!(
        method(&c, "op_Explicit").documentation_id().unwrap(),
        "M:C.op_Explicit(C)~System.Int32"
    );

    let bar = find(&types, "Bar");
    assert_eq!(method(&bar, "M2").documentation_id().unwrap(), "M:Bar.M2(System.Int32,)");
    assert_eq!(method(&bar, "Sum").documentation_id().unwrap(), "M:Bar.Sum(System.Int32[])");

    let widget = find(&types, "Widget");
    let properties = widget.properties().unwrap();
    assert_eq!(properties[0].documentation_id().unwrap(), "P:Demo.Widget.Count");
    assert_eq!(properties[1].documentation_id().unwrap(), "P:Demo.Widget.Item(System.Int32)");
    assert_eq!(
        widget.events().unwrap()[0].documentation_id().unwrap(),
        "E:Demo.Widget.Changed"
    );
    assert_eq!(
        widget.fields().unwrap().as_slice()[0].documentation_id().unwrap(),
        "F:Demo.Widget.Limit"
    );

    let inner = find(&types, "Inner");
    assert_eq!(inner.documentation_id().unwrap(), "T:Demo.Outer.Inner");

    let demo = module.namespaces().unwrap().find("Demo").unwrap();
    assert_eq!(demo.documentation_id().unwrap(), "N:Demo");
}

#[test]
fn entities_are_interned() {
    let module = common::module(library());
    let widget = module.find_type("Demo", "Widget").unwrap().unwrap();

    let again = module.type_definition(widget.token().row()).unwrap();
    assert!(Arc::ptr_eq(&widget, &again));
    assert!(Arc::ptr_eq(&widget, &find(&module.types().unwrap(), "Widget")));

    let limit = widget.fields().unwrap().as_slice()[0].clone();
    match (
        module.resolve_member(limit.token()).unwrap(),
        module.resolve_member(limit.token()).unwrap(),
    ) {
        (Member::Field(first), Member::Field(second)) => {
            assert!(Arc::ptr_eq(&first, &second));
            assert!(Arc::ptr_eq(&first, &limit));
        }
        other => panic!("unexpected members {other:?}"),
    }

    let declaring = limit.declaring_type().unwrap().unwrap();
    assert!(Arc::ptr_eq(&declaring, &widget));
    assert!(widget.fields().unwrap().get(limit.token()).is_some());

    let object = module.type_reference(1).unwrap();
    assert!(Arc::ptr_eq(&object, &module.type_reference(1).unwrap()));
    assert_eq!(object.full_name(), "System.Object");
}

#[test]
fn type_shapes_and_laundering() {
    let module = common::module(library());
    let types = module.types().unwrap();

    let s2 = find(&types, "S2");
    assert_eq!(s2.kind().unwrap(), TypeKind::Struct);
    assert!(s2.is_read_only().unwrap());
    assert!(s2.custom_attributes().unwrap().is_empty());
    let all = s2.all_custom_attributes().unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_processed());
    assert_eq!(
        all[0].type_name().unwrap(),
        ("System.Runtime.CompilerServices", "IsReadOnlyAttribute")
    );

    assert_eq!(find(&types, "C").kind().unwrap(), TypeKind::Class);
    assert_eq!(method(&find(&types, "C"), "op_Explicit").kind().unwrap(), MethodKind::Conversion);

    let sum = method(&find(&types, "Bar"), "Sum");
    let parameters = sum.parameters().unwrap();
    assert!(parameters[0].is_params_array);
    assert_eq!(parameters[0].name(), Some("values"));
    let values = parameters[0].definition.clone().unwrap();
    assert!(values.custom_attributes().unwrap().is_empty());
    assert_eq!(values.all_custom_attributes().unwrap().len(), 1);

    let c2 = find(&types, "C2`2");
    let names: Vec<_> = c2
        .generic_parameters()
        .unwrap()
        .iter()
        .map(|parameter| parameter.name().to_string())
        .collect();
    assert_eq!(names, ["K", "V"]);
    assert_eq!(method(&c2, "Swap").generic_parameters().unwrap()[0].name(), "T");
}

#[test]
fn nesting_and_namespaces() {
    let module = common::module(library());
    let outer = module.find_type("Demo", "Outer").unwrap().unwrap();
    let nested = outer.nested_types().unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].name(), "Inner");
    assert!(Arc::ptr_eq(&nested[0].enclosing_type().unwrap().unwrap(), &outer));
    assert_eq!(nested[0].full_name().unwrap(), "Demo.Outer.Inner");
    assert!(module.find_type("", "Inner").unwrap().is_none());

    let root = module.namespaces().unwrap();
    assert!(root.is_root());
    let demo = root.find("Demo").unwrap();
    let names: Vec<_> = demo.types().iter().map(|ty| ty.name()).collect();
    assert_eq!(names, ["Widget", "Outer"]);
    assert!(root.types().iter().any(|ty| ty.name() == "C2`2"));
}

#[test]
fn members_and_accessors() {
    let module = common::module(library());
    let widget = module.find_type("Demo", "Widget").unwrap().unwrap();

    let limit = &widget.fields().unwrap().as_slice()[0];
    assert!(limit.is_literal());
    assert_eq!(limit.constant().unwrap(), Some(&ConstantValue::I4(10)));

    let properties = widget.properties().unwrap();
    assert!(!properties[0].is_indexer().unwrap());
    assert!(properties[1].is_indexer().unwrap());
    let getter = properties[0].getter().unwrap().unwrap();
    assert_eq!(getter.name(), "get_Count");
    assert_eq!(getter.kind().unwrap(), MethodKind::PropertyGet);
    assert!(properties[0].setter().unwrap().is_none());

    let changed = &widget.events().unwrap()[0];
    let adder = changed.adder().unwrap().unwrap();
    assert_eq!(adder.kind().unwrap(), MethodKind::EventAdd);
    let event_type = changed.event_type().unwrap().unwrap();
    assert_eq!(event_type.to_string(), "System.EventHandler");
}

#[test]
fn assembly_identity() {
    let file = common::open(library());
    let assembly = file.assembly().unwrap();
    assert_eq!(
        assembly.display_name(),
        "Library, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"
    );

    let references = file.module().assembly_references().unwrap();
    assert_eq!(references.len(), 1);
    assert_eq!(
        references[0].display_name(),
        "System.Runtime, Version=8.0.0.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a"
    );
}

const COMPILER_SERVICES: &str = "System.Runtime.CompilerServices";
const NO_ARGUMENTS: &[u8] = &[0x01, 0x00, 0x00, 0x00];

fn type_ref_coded(token: Token) -> u8 {
    ((token.row() << 2) | 1) as u8
}

fn marker(b: &mut MetadataBuilder, name: &str) -> Token {
    let ty = b.type_ref_core(COMPILER_SERVICES, name);
    b.member_ref(ty, ".ctor", &[0x20, 0x00, 0x01])
}

/// ```csharp
/// namespace Demo {
///     public ref struct Span {
///         public ref int first;
///         public ref readonly int second;
///         public volatile int flag;
///         public fixed int buffer[4];
///         public ref readonly int Current() => ref first;
///         public static void Read(in int value) { }
///         public static bool TryGet(out int value) { }
///         public static void Look([IsReadOnly] ref int value) { }
///         public static void Swap(ref int value) { }
///     }
///     public class Person {
///         public required string Name;
///         public required string Title { get; init; }
///     }
/// }
/// ```
fn laundered() -> MetadataBuilder {
    let mut b = MetadataBuilder::new("Laundered.dll");
    b.assembly("Laundered", (1, 0, 0, 0), &[]);
    let object = b.type_ref_core("System", "Object");
    let value_type = b.type_ref_core("System", "ValueType");
    let system_type = b.type_ref_core("System", "Type");

    let by_ref_like = marker(&mut b, "IsByRefLikeAttribute");
    let read_only = marker(&mut b, "IsReadOnlyAttribute");
    let required = marker(&mut b, "RequiredMemberAttribute");
    let is_volatile = b.type_ref_core(COMPILER_SERVICES, "IsVolatile");
    let in_attribute = b.type_ref_core("System.Runtime.InteropServices", "InAttribute");
    let fixed = b.type_ref_core(COMPILER_SERVICES, "FixedBufferAttribute");
    let fixed_ctor = b.member_ref(
        fixed,
        ".ctor",
        &[0x20, 0x02, 0x01, 0x12, type_ref_coded(system_type), 0x08],
    );

    let span = b.type_def(0x0010_0109, "Demo", "Span", value_type);
    b.custom_attribute(span, by_ref_like, NO_ARGUMENTS);
    b.field(span, 0x0006, "first", &[0x06, 0x10, 0x08]);
    let second = b.field(span, 0x0006, "second", &[0x06, 0x10, 0x08]);
    b.custom_attribute(second, read_only, NO_ARGUMENTS);
    b.field(span, 0x0006, "flag", &[0x06, 0x1F, type_ref_coded(is_volatile), 0x08]);
    let buffer = b.field(span, 0x0006, "buffer", &[0x06, 0x08]);
    let mut fixed_value = vec![0x01, 0x00, 12];
    fixed_value.extend_from_slice(b"System.Int32");
    fixed_value.extend_from_slice(&4_i32.to_le_bytes());
    fixed_value.extend_from_slice(&[0x00, 0x00]);
    b.custom_attribute(buffer, fixed_ctor, &fixed_value);

    let current = b.method(span, 0x0086, "Current", &[0x20, 0x00, 0x10, 0x08]);
    let returned = b.param(current, 0, "");
    b.custom_attribute(returned, read_only, NO_ARGUMENTS);

    let read = b.method(
        span,
        0x0096,
        "Read",
        &[0x00, 0x01, 0x01, 0x1F, type_ref_coded(in_attribute), 0x10, 0x08],
    );
    b.param(read, 1, "value");
    let try_get = b.method(span, 0x0096, "TryGet", &[0x00, 0x01, 0x02, 0x10, 0x08]);
    b.param_with_flags(try_get, 0x0002, 1, "value");
    let look = b.method(span, 0x0096, "Look", &[0x00, 0x01, 0x01, 0x10, 0x08]);
    let looked = b.param(look, 1, "value");
    b.custom_attribute(looked, read_only, NO_ARGUMENTS);
    let swap = b.method(span, 0x0096, "Swap", &[0x00, 0x01, 0x01, 0x10, 0x08]);
    b.param(swap, 1, "value");

    let person = b.type_def(0x0010_0001, "Demo", "Person", object);
    b.custom_attribute(person, required, NO_ARGUMENTS);
    let name = b.field(person, 0x0006, "Name", &[0x06, 0x0E]);
    b.custom_attribute(name, required, NO_ARGUMENTS);
    let title = b.property(person, "Title", &[0x28, 0x00, 0x0E]);
    b.custom_attribute(title, required, NO_ARGUMENTS);
    b
}

fn field(ty: &TypeDefinition, name: &str) -> Arc<Field> {
    ty.fields()
        .unwrap()
        .iter()
        .find(|field| field.name() == name)
        .cloned()
        .unwrap_or_else(|| panic!("field {name}"))
}

#[test]
fn ref_struct_fields() {
    let module = common::module(laundered());
    let span = module.find_type("Demo", "Span").unwrap().unwrap();

    assert!(span.is_ref_like().unwrap());
    assert!(!span.is_read_only().unwrap());
    assert!(span.custom_attributes().unwrap().is_empty());
    assert_eq!(span.all_custom_attributes().unwrap().len(), 1);

    let first = field(&span, "first");
    assert_eq!(first.ref_kind().unwrap(), RefKind::Ref);
    assert!(!first.is_volatile().unwrap());

    let second = field(&span, "second");
    assert!(second.custom_attributes().unwrap().is_empty());
    assert_eq!(second.ref_kind().unwrap(), RefKind::In);
    let all = second.all_custom_attributes().unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_processed());

    let flag = field(&span, "flag");
    assert!(flag.is_volatile().unwrap());
    assert_eq!(flag.ref_kind().unwrap(), RefKind::None);

    let buffer = field(&span, "buffer");
    let fixed = buffer.fixed_buffer().unwrap().unwrap();
    assert_eq!(fixed.element_type.to_string(), "System.Int32");
    assert_eq!(fixed.length, 4);
    assert!(buffer.custom_attributes().unwrap().is_empty());
    assert_eq!(buffer.all_custom_attributes().unwrap().len(), 1);
    assert!(first.fixed_buffer().unwrap().is_none());
}

#[test]
fn return_markers_are_hidden_before_the_return_is_inspected() {
    let module = common::module(laundered());
    let span = module.find_type("Demo", "Span").unwrap().unwrap();
    let current = method(&span, "Current");

    let returned = current.parameter_definitions().unwrap()[0].clone();
    assert_eq!(returned.sequence(), 0);
    assert!(returned.custom_attributes().unwrap().is_empty());
    assert_eq!(returned.all_custom_attributes().unwrap().len(), 1);
    assert_eq!(current.return_parameter().unwrap().ref_kind, RefKind::In);
    assert!(returned.custom_attributes().unwrap().is_empty());
}

#[test]
fn parameter_ref_kinds() {
    let module = common::module(laundered());
    let span = module.find_type("Demo", "Span").unwrap().unwrap();
    let ref_kind = |name: &str| method(&span, name).parameters().unwrap()[0].ref_kind;

    assert_eq!(ref_kind("Read"), RefKind::In);
    assert_eq!(ref_kind("TryGet"), RefKind::Out);
    assert_eq!(ref_kind("Look"), RefKind::In);
    assert_eq!(ref_kind("Swap"), RefKind::Ref);

    let look = method(&span, "Look");
    let value = look.parameters().unwrap()[0].definition.clone().unwrap();
    assert!(value.custom_attributes().unwrap().is_empty());
    assert!(value.all_custom_attributes().unwrap()[0].is_processed());
    assert!(!look.parameters().unwrap()[0].is_params_array);
}

#[test]
fn required_members() {
    let module = common::module(laundered());
    let person = module.find_type("Demo", "Person").unwrap().unwrap();

    assert!(person.has_required_members().unwrap());
    assert!(person.custom_attributes().unwrap().is_empty());
    assert_eq!(person.all_custom_attributes().unwrap().len(), 1);

    let name = field(&person, "Name");
    assert!(name.is_required().unwrap());
    assert!(name.custom_attributes().unwrap().is_empty());

    let title = &person.properties().unwrap()[0];
    assert!(title.custom_attributes().unwrap().is_empty());
    assert!(title.is_required().unwrap());
    assert_eq!(title.all_custom_attributes().unwrap().len(), 1);

    let span = module.find_type("Demo", "Span").unwrap().unwrap();
    assert!(!span.has_required_members().unwrap());
}

#[test]
fn kinds_follow_sealed_base_types() {
    let mut b = MetadataBuilder::new("Kinds.dll");
    b.assembly("Kinds", (1, 0, 0, 0), &[]);
    let object = b.type_ref_core("System", "Object");
    let value_type = b.type_ref_core("System", "ValueType");
    let system_enum = b.type_ref_core("System", "Enum");
    let multicast = b.type_ref_core("System", "MulticastDelegate");

    b.type_def(0x0000_0101, "Kinds", "Color", system_enum);
    b.type_def(0x0010_0109, "Kinds", "Point", value_type);
    b.type_def(0x0000_0101, "Kinds", "Callback", multicast);
    b.type_def(0x0000_00A1, "Kinds", "IShape", Token::new(0));
    b.type_def(0x0010_0081, "Kinds", "OpenValue", value_type);
    b.type_def(0x0000_0081, "Kinds", "OpenDelegate", multicast);
    b.type_def(0x0010_0101, "Kinds", "Leaf", object);

    let module = common::module(b);
    let kind = |name: &str| module.find_type("Kinds", name).unwrap().unwrap().kind().unwrap();
    assert_eq!(kind("Color"), TypeKind::Enum);
    assert_eq!(kind("Point"), TypeKind::Struct);
    assert_eq!(kind("Callback"), TypeKind::Delegate);
    assert_eq!(kind("IShape"), TypeKind::Interface);
    assert_eq!(kind("OpenValue"), TypeKind::Class);
    assert_eq!(kind("OpenDelegate"), TypeKind::Class);
    assert_eq!(kind("Leaf"), TypeKind::Class);
}
