//! Bundled GraphiQL assets.
//!
//! The IDE page and its plugin scripts are compiled into the binary, so the
//! server needs no files on disk at runtime.

/// GraphiQL IDE page served at `GET /graphiql`
pub const GRAPHIQL_HTML: &str = include_str!("../../assets/graphiql/index.html");

/// Page served at `GET /`, forwarding the browser to the IDE
pub const ROOT_REDIRECT_HTML: &str = r#"<html><head><meta http-equiv="refresh" content="0; url=/graphiql"></head></html>"#;

/// Plugin scripts served under `/js/{file}`
const JS_ASSETS: &[(&str, &str)] = &[(
    "introspection-patch.js",
    include_str!("../../assets/graphiql/js/introspection-patch.js"),
)];

/// Look up a bundled script by file name
pub fn script(file: &str) -> Option<&'static str> {
    JS_ASSETS
        .iter()
        .find(|(name, _)| *name == file)
        .map(|(_, content)| *content)
}

/// Content type for a bundled file, by extension
pub fn content_type(file: &str) -> &'static str {
    if file.ends_with(".js") || file.ends_with(".jsx") {
        "text/javascript"
    } else {
        "application/octet-stream"
    }
}
