use std::collections::BTreeSet;
use std::path::PathBuf;

use classfile::testkit::{Op, TestClass, TestMethod, ACC_PUBLIC};
use classfile::ClassResolver;
use registry::MethodPool;
use restscan_analysis::{simulate_method, AnalysisEnv};
use types::{Element, TypeRef};

const RESPONSE: &str = "javax/ws/rs/core/Response";
const BUILDER: &str = "javax/ws/rs/core/Response$ResponseBuilder";

fn status_call(code: i32) -> Vec<Op> {
    vec![
        Op::PushInt(code),
        Op::InvokeStatic {
            owner: RESPONSE.to_string(),
            name: "status".to_string(),
            descriptor: format!("(I)L{};", BUILDER),
        },
    ]
}

fn build_call() -> Op {
    Op::InvokeVirtual {
        owner: BUILDER.to_string(),
        name: "build".to_string(),
        descriptor: format!("()L{};", RESPONSE),
    }
}

fn entity_call() -> Op {
    Op::InvokeVirtual {
        owner: BUILDER.to_string(),
        name: "entity".to_string(),
        descriptor: format!("(Ljava/lang/Object;)L{};", BUILDER),
    }
}

fn write_fixture(root: &std::path::Path) {
    let mut create = status_call(201);
    create.push(Op::ALoad(1));
    create.push(entity_call());
    create.push(build_call());
    create.push(Op::Areturn);

    // if (flag) return Response.ok(u).build(); else return Response.status(404).build();
    let mut cond = vec![
        Op::ILoad(1),
        Op::IfEq,
        Op::ALoad(2),
        Op::InvokeStatic {
            owner: RESPONSE.to_string(),
            name: "ok".to_string(),
            descriptor: format!("(Ljava/lang/Object;)L{};", BUILDER),
        },
        build_call(),
        Op::Areturn,
    ];
    cond.extend(status_call(404));
    cond.push(build_call());
    cond.push(Op::Areturn);

    let mut only = status_call(404);
    only.push(build_call());
    only.push(Op::Areturn);

    // A helper the resource delegates to, exercising the interpreted pool.
    let delegate = vec![
        Op::ALoad(0),
        Op::InvokeVirtual {
            owner: "pkg/CreateResource".to_string(),
            name: "only".to_string(),
            descriptor: format!("()L{};", RESPONSE),
        },
        Op::Areturn,
    ];

    TestClass::new("pkg/CreateResource")
        .method(
            TestMethod::new(
                "create",
                &format!("(Lpkg/User;)L{};", RESPONSE),
                ACC_PUBLIC,
            )
            .code(create),
        )
        .method(
            TestMethod::new("cond", &format!("(ZLpkg/User;)L{};", RESPONSE), ACC_PUBLIC)
                .code(cond),
        )
        .method(TestMethod::new("only", &format!("()L{};", RESPONSE), ACC_PUBLIC).code(only))
        .method(
            TestMethod::new("delegated", &format!("()L{};", RESPONSE), ACC_PUBLIC)
                .code(delegate),
        )
        .write_to(root)
        .expect("write CreateResource");

    TestClass::new("pkg/User").write_to(root).expect("write User");
}

struct Fixture {
    resolver: ClassResolver,
    pool: MethodPool,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let resolver = ClassResolver::open(&[dir.path().to_path_buf()], &[]).expect("open");
    Fixture { resolver, pool: MethodPool::new(), _dir: dir }
}

fn simulate(fixture: &Fixture, method_name: &str) -> Element {
    let record = fixture.resolver.get("pkg.CreateResource");
    let method = record
        .methods
        .iter()
        .find(|m| m.name == method_name)
        .expect("fixture method");
    let env = AnalysisEnv { resolver: &fixture.resolver, pool: &fixture.pool };
    let id = method.identifier("pkg.CreateResource");
    simulate_method(&env, &id, method.instructions.as_deref().expect("method body"))
}

#[test]
fn explicit_status_with_entity() {
    let fixture = fixture();
    let element = simulate(&fixture, "create");

    assert_eq!(element.type_ref().name(), "javax.ws.rs.core.Response");
    let responses: Vec<_> = element.responses().iter().collect();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].statuses, BTreeSet::from([201]));
    assert!(responses[0].entity_types.contains(&TypeRef::new("pkg.User")));
}

#[test]
fn conditional_branches_stay_separate() {
    let fixture = fixture();
    let element = simulate(&fixture, "cond");

    let responses: Vec<_> = element.responses().iter().collect();
    assert_eq!(responses.len(), 2);

    let ok = responses
        .iter()
        .find(|r| r.statuses.contains(&200))
        .expect("200 aggregate");
    assert!(ok.entity_types.contains(&TypeRef::new("pkg.User")));

    let not_found = responses
        .iter()
        .find(|r| r.statuses.contains(&404))
        .expect("404 aggregate");
    assert!(not_found.entity_types.is_empty());
}

#[test]
fn status_round_trip_is_exact() {
    let fixture = fixture();
    let element = simulate(&fixture, "only");

    let responses: Vec<_> = element.responses().iter().collect();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].statuses, BTreeSet::from([404]));
    assert!(responses[0].headers.is_empty());
    assert!(responses[0].entity_types.is_empty());
}

#[test]
fn project_callees_are_interpreted_and_cached() {
    let fixture = fixture();
    let element = simulate(&fixture, "delegated");

    // The helper's 404 flows through the interpreted summary.
    let responses: Vec<_> = element.responses().iter().collect();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].statuses, BTreeSet::from([404]));

    // The callee's summary landed in the pool.
    assert_eq!(fixture.pool.summary_count(), 1);
}

#[test]
fn missing_search_path_still_fails_open() {
    let bogus = PathBuf::from("/nonexistent/classes");
    assert!(ClassResolver::open(&[bogus], &[]).is_err());
}
