use classfile::testkit::{Ann, Op, TestClass, TestMethod, ACC_PUBLIC};
use classfile::ClassResolver;
use model::{HttpVerb, ParamKind};
use registry::MethodPool;
use restscan_semantics::extract_resources;
use types::TypeRef;

fn write_fixture(root: &std::path::Path) {
    // S1: trivial GET returning a constant string.
    TestClass::new("pkg/UserResource")
        .annotate(Ann::with_value("Ljavax/ws/rs/Path;", "users"))
        .annotate(Ann::with_values("Ljavax/ws/rs/Produces;", &["application/json"]))
        .method(
            TestMethod::new("list", "()Ljava/lang/String;", ACC_PUBLIC)
                .annotate(Ann::marker("Ljavax/ws/rs/GET;"))
                .code(vec![Op::LdcStr("ok".to_string()), Op::Areturn]),
        )
        // S4: path and query parameters.
        .method(
            TestMethod::new("get", "(JZ)Lpkg/User;", ACC_PUBLIC)
                .annotate(Ann::marker("Ljakarta/ws/rs/GET;"))
                .annotate(Ann::with_value("Ljakarta/ws/rs/Path;", "{id}"))
                .param_annotations(vec![
                    vec![Ann::with_value("Ljakarta/ws/rs/PathParam;", "id")],
                    vec![Ann::with_value("Ljakarta/ws/rs/QueryParam;", "full")],
                ])
                .code(vec![Op::AconstNull, Op::Areturn]),
        )
        // Request body from the unannotated entity parameter.
        .method(
            TestMethod::new("create", "(Lpkg/User;)V", ACC_PUBLIC)
                .annotate(Ann::marker("Ljavax/ws/rs/POST;"))
                .annotate(Ann::with_values("Ljavax/ws/rs/Consumes;", &["application/json"]))
                .code(vec![Op::Return]),
        )
        .write_to(root)
        .expect("write UserResource");

    // Inherited public method picked up by the resource subclass.
    TestClass::new("pkg/BaseResource")
        .method(
            TestMethod::new("ping", "()Ljava/lang/String;", ACC_PUBLIC)
                .annotate(Ann::marker("Ljavax/ws/rs/GET;"))
                .annotate(Ann::with_value("Ljavax/ws/rs/Path;", "ping"))
                .code(vec![Op::LdcStr("pong".to_string()), Op::Areturn]),
        )
        .write_to(root)
        .expect("write BaseResource");

    TestClass::new("pkg/HealthResource")
        .extends("pkg/BaseResource")
        .annotate(Ann::with_value("Ljavax/ws/rs/Path;", "/health/"))
        .write_to(root)
        .expect("write HealthResource");

    // The application subclass seeds the base path.
    TestClass::new("pkg/App")
        .annotate(Ann::with_value("Ljavax/ws/rs/ApplicationPath;", "rest"))
        .write_to(root)
        .expect("write App");

    TestClass::new("pkg/User").write_to(root).expect("write User");
}

fn extract(dir: &std::path::Path) -> restscan_semantics::Extraction {
    let resolver = ClassResolver::open(&[dir.to_path_buf()], &[]).expect("open search path");
    let pool = MethodPool::new();
    extract_resources(&resolver, &pool)
}

#[test]
fn trivial_get_with_class_level_produces() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let extraction = extract(dir.path());

    assert_eq!(extraction.base_path, "rest");
    assert_eq!(extraction.resource_classes, 2);

    let list = extraction
        .methods
        .iter()
        .find(|m| m.sub_path == "users" && m.verb == HttpVerb::Get)
        .expect("list method");
    assert!(list.produces.contains("application/json"));
    assert!(list.consumes.is_empty());
    assert_eq!(list.return_body, Some(TypeRef::new("java.lang.String")));
    assert!(list.responses.is_empty());
    assert!(!list.returns_void);
}

#[test]
fn path_and_query_params_bind_by_kind() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let extraction = extract(dir.path());

    let get = extraction
        .methods
        .iter()
        .find(|m| m.sub_path == "users/{id}")
        .expect("get method");
    assert_eq!(get.verb, HttpVerb::Get);
    assert_eq!(
        get.params,
        vec![
            (ParamKind::Path, "id".to_string(), TypeRef::new("long")),
            (ParamKind::Query, "full".to_string(), TypeRef::new("boolean")),
        ]
    );
    assert_eq!(get.return_body, Some(TypeRef::new("pkg.User")));
}

#[test]
fn unannotated_entity_parameter_is_the_request_body() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let extraction = extract(dir.path());

    let create = extraction
        .methods
        .iter()
        .find(|m| m.verb == HttpVerb::Post)
        .expect("create method");
    assert_eq!(create.request_body, Some(TypeRef::new("pkg.User")));
    assert!(create.consumes.contains("application/json"));
    assert!(create.returns_void);
    assert_eq!(create.return_body, None);
}

#[test]
fn inherited_methods_join_the_subclass_template() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let extraction = extract(dir.path());

    let ping = extraction
        .methods
        .iter()
        .find(|m| m.sub_path == "health/ping")
        .expect("inherited ping method");
    assert_eq!(ping.verb, HttpVerb::Get);
    assert_eq!(ping.return_body, Some(TypeRef::new("java.lang.String")));
}
