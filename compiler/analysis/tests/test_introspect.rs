use classfile::testkit::{Ann, TestClass, TestField, TestMethod, ACC_PUBLIC, ACC_STATIC, ACC_TRANSIENT};
use classfile::ClassResolver;
use model::{PrimitiveKind, Schema};
use restscan_analysis::Introspector;
use types::TypeRef;

fn write_fixture(root: &std::path::Path) {
    TestClass::new("pkg/Address")
        .field(TestField::new("city", "Ljava/lang/String;", ACC_PUBLIC))
        .field(TestField::new("zip", "Ljava/lang/String;", ACC_PUBLIC))
        .write_to(root)
        .expect("write Address");

    TestClass::new("pkg/User")
        .field(TestField::new("name", "Ljava/lang/String;", ACC_PUBLIC))
        .field(TestField::new("age", "I", ACC_PUBLIC))
        .field(TestField::new("secret", "Ljava/lang/String;", 0x0002)) // private
        .field(TestField::new("COUNTER", "J", ACC_PUBLIC | ACC_STATIC))
        .method(
            TestMethod::new("getAddress", "()Lpkg/Address;", ACC_PUBLIC),
        )
        .method(TestMethod::new("isActive", "()Z", ACC_PUBLIC))
        .method(TestMethod::new("getNothing", "()V", ACC_PUBLIC))
        .write_to(root)
        .expect("write User");

    // Field-mode selection: private fields participate, transient ones do not.
    TestClass::new("pkg/Record")
        .annotate(
            Ann::marker("Ljavax/xml/bind/annotation/XmlAccessorType;").enum_const(
                "value",
                "Ljavax/xml/bind/annotation/XmlAccessType;",
                "FIELD",
            ),
        )
        .field(TestField::new("id", "J", 0x0002))
        .field(TestField::new("scratch", "I", 0x0002 | ACC_TRANSIENT))
        .write_to(root)
        .expect("write Record");

    // A self-referential type.
    TestClass::new("pkg/Node")
        .field(TestField::new("value", "I", ACC_PUBLIC))
        .field(TestField::new("next", "Lpkg/Node;", ACC_PUBLIC))
        .write_to(root)
        .expect("write Node");

    TestClass::new("pkg/Color")
        .extends("java/lang/Enum")
        .flags(classfile::testkit::ACC_ENUM)
        .write_to(root)
        .expect("write Color");
}

fn open(root: &std::path::Path) -> ClassResolver {
    ClassResolver::open(&[root.to_path_buf()], &[]).expect("open search path")
}

#[test]
fn object_schema_orders_fields_then_getters() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let resolver = open(dir.path());
    let introspector = Introspector::new(&resolver);

    let schema = introspector.introspect(&TypeRef::new("pkg.User"));
    let Schema::Object(props) = &schema else { panic!("object schema expected") };
    let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
    // Public fields first in declaration order, then getter-derived
    // properties; private/static members and void getters are skipped.
    assert_eq!(names, vec!["name", "age", "address", "active"]);

    let address = &props[2].schema;
    let Schema::Object(address_props) = address else { panic!("nested object expected") };
    assert_eq!(address_props.len(), 2);
    assert_eq!(address_props[0].name, "city");
}

#[test]
fn field_access_mode_honors_transient() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let resolver = open(dir.path());
    let introspector = Introspector::new(&resolver);

    let schema = introspector.introspect(&TypeRef::new("pkg.Record"));
    assert_eq!(
        schema,
        Schema::object(vec![("id".to_string(), Schema::Primitive(PrimitiveKind::Integer))])
    );
}

#[test]
fn collections_unwrap_and_platform_types_map() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let resolver = open(dir.path());
    let introspector = Introspector::new(&resolver);

    let list = TypeRef::with_args("java.util.List", vec![TypeRef::new("pkg.Address")]);
    let Schema::Array(element) = introspector.introspect(&list) else {
        panic!("array schema expected")
    };
    assert!(matches!(*element, Schema::Object(_)));

    assert_eq!(
        introspector.introspect(&TypeRef::new("java.lang.String")),
        Schema::Primitive(PrimitiveKind::String)
    );
    assert_eq!(
        introspector.introspect(&TypeRef::new("java.time.Instant")),
        Schema::Primitive(PrimitiveKind::Date)
    );
    assert_eq!(
        introspector.introspect(&TypeRef::new("java.math.BigDecimal")),
        Schema::Primitive(PrimitiveKind::Number)
    );
}

#[test]
fn enums_are_strings_and_cycles_are_sentinels() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let resolver = open(dir.path());
    let introspector = Introspector::new(&resolver);

    assert_eq!(
        introspector.introspect(&TypeRef::new("pkg.Color")),
        Schema::Primitive(PrimitiveKind::String)
    );

    let schema = introspector.introspect(&TypeRef::new("pkg.Node"));
    let Schema::Object(props) = &schema else { panic!("object schema expected") };
    assert_eq!(props[0].schema, Schema::Primitive(PrimitiveKind::Integer));
    // The recursive edge collapses to the empty-object sentinel.
    assert_eq!(props[1].schema, Schema::empty_object());
}

#[test]
fn unknown_types_introspect_to_empty_objects() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let resolver = open(dir.path());
    let introspector = Introspector::new(&resolver);

    assert_eq!(
        introspector.introspect(&TypeRef::new("com.vendor.Opaque")),
        Schema::empty_object()
    );
}

#[test]
fn introspection_is_deterministic() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let resolver = open(dir.path());

    let reference = TypeRef::new("pkg.User");
    let first = Introspector::new(&resolver).introspect(&reference);
    let second = Introspector::new(&resolver).introspect(&reference);
    assert_eq!(first, second);

    let a = serde_json::to_vec(&first).expect("serialize");
    let b = serde_json::to_vec(&second).expect("serialize");
    assert_eq!(a, b, "repeated introspection must be byte-identical");
}
