use std::path::PathBuf;
use std::sync::Arc;

use restscan_classfile::testkit::{Ann, Op, TestClass, TestField, TestMethod, ACC_PUBLIC};
use restscan_classfile::{ClassResolver, Instruction};
use types::{ConstValue, TypeLattice, TypeRef};

fn write_fixtures(root: &std::path::Path) {
    TestClass::new("pkg/UserResource")
        .annotate(Ann::with_value("Ljavax/ws/rs/Path;", "users"))
        .method(
            TestMethod::new("list", "()Ljava/lang/String;", ACC_PUBLIC)
                .annotate(Ann::marker("Ljavax/ws/rs/GET;"))
                .code(vec![Op::LdcStr("ok".to_string()), Op::Areturn]),
        )
        .write_to(root)
        .expect("write UserResource");

    TestClass::new("pkg/User")
        .field(TestField::new("name", "Ljava/lang/String;", ACC_PUBLIC))
        .field(
            TestField::new("tags", "Ljava/util/List;", ACC_PUBLIC)
                .signature("Ljava/util/List<Ljava/lang/String;>;"),
        )
        .write_to(root)
        .expect("write User");

    TestClass::new("pkg/AdminUser").extends("pkg/User").write_to(root).expect("write AdminUser");
}

#[test]
fn parses_assembled_classes() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixtures(dir.path());

    let resolver =
        ClassResolver::open(&[dir.path().to_path_buf()], &[]).expect("open search path");
    assert_eq!(
        resolver.project_classes(),
        &["pkg.AdminUser".to_string(), "pkg.User".to_string(), "pkg.UserResource".to_string()]
    );

    let resource = resolver.get("pkg.UserResource");
    assert!(!resource.synthetic);
    assert!(resource.annotation("javax.ws.rs.Path").is_some());
    let method = &resource.methods[0];
    assert_eq!(method.name, "list");
    assert_eq!(method.ret, TypeRef::new("java.lang.String"));
    assert_eq!(
        method.instructions.as_deref(),
        Some(
            &[
                Instruction::Push(ConstValue::Str("ok".to_string())),
                Instruction::Return { pops: 1 },
            ][..]
        )
    );

    let user = resolver.get("pkg.User");
    assert_eq!(user.fields[1].type_ref.element_of(), TypeRef::new("java.lang.String"));
}

#[test]
fn get_is_referentially_transparent() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixtures(dir.path());

    let resolver =
        ClassResolver::open(&[dir.path().to_path_buf()], &[]).expect("open search path");
    let first = resolver.get("pkg.User");
    let second = resolver.get("pkg.User");
    assert!(Arc::ptr_eq(&first, &second));

    // Misses are cached the same way.
    let missing_a = resolver.get("pkg.Missing");
    let missing_b = resolver.get("pkg.Missing");
    assert!(missing_a.synthetic);
    assert!(Arc::ptr_eq(&missing_a, &missing_b));
}

#[test]
fn missing_project_location_is_an_error() {
    let bogus = PathBuf::from("/nonexistent/classes");
    assert!(ClassResolver::open(&[bogus], &[]).is_err());
}

#[test]
fn supertype_walks_resolve_within_the_search_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixtures(dir.path());

    let resolver =
        ClassResolver::open(&[dir.path().to_path_buf()], &[]).expect("open search path");
    assert_eq!(
        resolver.superclass_chain("pkg.AdminUser"),
        vec!["pkg.AdminUser".to_string(), "pkg.User".to_string(), "java.lang.Object".to_string()]
    );

    // java.lang.Object itself is off the search path, so the chain ends
    // at the synthetic record and the lattice answers.
    let lub = resolver
        .common_supertype(&TypeRef::new("pkg.AdminUser"), &TypeRef::new("pkg.User"))
        .expect("common supertype");
    assert_eq!(lub, TypeRef::new("pkg.User"));
}
