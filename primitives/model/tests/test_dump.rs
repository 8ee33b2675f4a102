use restscan_model::{
    Body, HttpVerb, ParamKind, PrimitiveKind, ResourceMethod, Resources, Response, Schema,
};
use types::TypeRef;

#[test]
fn model_dump_round_trips() {
    let mut method = ResourceMethod::new(HttpVerb::Get);
    method.add_param(ParamKind::Path, "id".to_string(), TypeRef::new("long"));
    method.produces.insert("application/json".to_string());
    method.responses.insert(
        200,
        Response {
            headers: Default::default(),
            body: Some(Body {
                type_ref: TypeRef::new("pkg.User"),
                schema: Schema::object(vec![(
                    "name".to_string(),
                    Schema::Primitive(PrimitiveKind::String),
                )]),
            }),
        },
    );

    let mut resources = Resources::new("rest");
    resources.add("users/{id}", method);

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("surface.json");
    resources.to_file(&path).expect("dump model");

    let loaded = Resources::from_file(&path).expect("load model");
    assert_eq!(loaded, resources);
    assert_eq!(loaded.base_path(), "rest");
    assert_eq!(loaded.method_count(), 1);
}
