//! HTML error view.

/// Render the error page.
///
/// `detail` is only passed in development mode. All content is HTML-escaped.
pub fn render_error_page(message: &str, detail: Option<&serde_json::Value>) -> String {
    let detail_html = detail
        .map(|value| {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            format!(r#"<pre class="detail">{}</pre>"#, html_escape(&pretty))
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Error</title>
<link rel="stylesheet" href="/stylesheets/style.css">
</head>
<body>
<h1>{message}</h1>
{detail_html}
</body>
</html>"#,
        message = html_escape(message),
        detail_html = detail_html,
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("xss")</script>"#),
            "&lt;script&gt;alert(&quot;xss&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_render_without_detail() {
        let html = render_error_page("Not Found", None);
        assert!(html.contains("<h1>Not Found</h1>"));
        assert!(!html.contains("class=\"detail\""));
    }

    #[test]
    fn test_render_with_detail() {
        let html = render_error_page("boom", Some(&json!({"kind": "admin_api", "status": 502})));
        assert!(html.contains("class=\"detail\""));
        assert!(html.contains("&quot;kind&quot;: &quot;admin_api&quot;"));
    }
}
