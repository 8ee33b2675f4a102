//! Well-known platform and framework names.
//!
//! The extractor and the builtin method summaries are table-driven: instead
//! of hard-coding fully qualified names at every use site, this module maps
//! annotation and response-builder names (under both the `javax` and
//! `jakarta` namespaces) to their roles.

use crate::typeref::TypeRef;

/// Namespace prefixes under which the REST annotation vocabulary lives.
const WS_RS_PREFIXES: &[&str] = &["javax.ws.rs.", "jakarta.ws.rs."];

/// Namespace prefixes of the XML binding annotations.
const XML_BIND_PREFIXES: &[&str] = &["javax.xml.bind.annotation.", "jakarta.xml.bind.annotation."];

/// Strip a recognized `ws.rs` prefix, yielding the simple vocabulary name
/// (`Path`, `GET`, `QueryParam`, `core.Response`, ...).
pub fn ws_rs_name(canonical: &str) -> Option<&str> {
    WS_RS_PREFIXES.iter().find_map(|p| canonical.strip_prefix(p))
}

/// Strip a recognized XML binding prefix (`XmlElement`, `XmlTransient`,
/// `XmlAccessorType`).
pub fn xml_bind_name(canonical: &str) -> Option<&str> {
    XML_BIND_PREFIXES.iter().find_map(|p| canonical.strip_prefix(p))
}

/// Whether `canonical` names the well-known HTTP response type.
pub fn is_response_class(canonical: &str) -> bool {
    matches!(ws_rs_name(canonical), Some("core.Response"))
}

/// Whether `canonical` names the response builder type.
pub fn is_response_builder_class(canonical: &str) -> bool {
    matches!(ws_rs_name(canonical), Some("core.Response$ResponseBuilder"))
}

/// Whether `canonical` names the response status enum.
pub fn is_status_enum_class(canonical: &str) -> bool {
    matches!(ws_rs_name(canonical), Some("core.Response$Status"))
}

/// Whether a type reference carries response-builder or response semantics.
pub fn is_response_like(type_ref: &TypeRef) -> bool {
    is_response_class(type_ref.name()) || is_response_builder_class(type_ref.name())
}

/// Numeric status code of a `Response.Status` enum constant.
pub fn status_code_for_constant(constant: &str) -> Option<u16> {
    let code = match constant {
        "OK" => 200,
        "CREATED" => 201,
        "ACCEPTED" => 202,
        "NO_CONTENT" => 204,
        "RESET_CONTENT" => 205,
        "PARTIAL_CONTENT" => 206,
        "MOVED_PERMANENTLY" => 301,
        "FOUND" => 302,
        "SEE_OTHER" => 303,
        "NOT_MODIFIED" => 304,
        "USE_PROXY" => 305,
        "TEMPORARY_REDIRECT" => 307,
        "BAD_REQUEST" => 400,
        "UNAUTHORIZED" => 401,
        "PAYMENT_REQUIRED" => 402,
        "FORBIDDEN" => 403,
        "NOT_FOUND" => 404,
        "METHOD_NOT_ALLOWED" => 405,
        "NOT_ACCEPTABLE" => 406,
        "PROXY_AUTHENTICATION_REQUIRED" => 407,
        "REQUEST_TIMEOUT" => 408,
        "CONFLICT" => 409,
        "GONE" => 410,
        "LENGTH_REQUIRED" => 411,
        "PRECONDITION_FAILED" => 412,
        "REQUEST_ENTITY_TOO_LARGE" => 413,
        "REQUEST_URI_TOO_LONG" => 414,
        "UNSUPPORTED_MEDIA_TYPE" => 415,
        "REQUESTED_RANGE_NOT_SATISFIABLE" => 416,
        "EXPECTATION_FAILED" => 417,
        "INTERNAL_SERVER_ERROR" => 500,
        "NOT_IMPLEMENTED" => 501,
        "BAD_GATEWAY" => 502,
        "SERVICE_UNAVAILABLE" => 503,
        "GATEWAY_TIMEOUT" => 504,
        "HTTP_VERSION_NOT_SUPPORTED" => 505,
        _ => return None,
    };
    Some(code)
}

/// Getter names excluded from introspection.
pub const GETTER_BLACKLIST: &[&str] = &["getClass"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_namespaces_are_recognized() {
        assert_eq!(ws_rs_name("javax.ws.rs.Path"), Some("Path"));
        assert_eq!(ws_rs_name("jakarta.ws.rs.QueryParam"), Some("QueryParam"));
        assert_eq!(ws_rs_name("org.acme.Path"), None);

        assert!(is_response_class("javax.ws.rs.core.Response"));
        assert!(is_response_class("jakarta.ws.rs.core.Response"));
        assert!(is_response_builder_class("javax.ws.rs.core.Response$ResponseBuilder"));
        assert!(!is_response_class("javax.ws.rs.core.Response$ResponseBuilder"));
    }

    #[test]
    fn status_constants_map_to_codes() {
        assert_eq!(status_code_for_constant("OK"), Some(200));
        assert_eq!(status_code_for_constant("CREATED"), Some(201));
        assert_eq!(status_code_for_constant("NOT_FOUND"), Some(404));
        assert_eq!(status_code_for_constant("TEAPOT"), None);
    }

    #[test]
    fn xml_bind_names() {
        assert_eq!(xml_bind_name("javax.xml.bind.annotation.XmlElement"), Some("XmlElement"));
        assert_eq!(xml_bind_name("jakarta.xml.bind.annotation.XmlTransient"), Some("XmlTransient"));
    }
}
