//! Standalone API reference page.

const SCALAR_CDN: &str = "https://cdn.jsdelivr.net/npm/@scalar/api-reference";

/// Builds an HTML page that renders `openapi_yaml` with the Scalar API reference viewer.
///
/// The document is embedded inline, so the page works when opened straight from disk.
pub fn generate_viewer_html(openapi_yaml: &str, title: &str) -> String {
    let safe_yaml = openapi_yaml.replace("</script>", "<\\/script>");
    let safe_title = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{safe_title}</title>
</head>
<body>
    <script id="api-reference" type="application/yaml">
{safe_yaml}
    </script>
    <script src="{SCALAR_CDN}"></script>
</body>
</html>
"#
    )
}
