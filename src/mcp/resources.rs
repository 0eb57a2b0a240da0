//! The widget template resource.
//!
//! Hosts render tool results through a single HTML resource. The HTML is a
//! shell: it pulls `/widget.css` and `/widget.js` from this backend, which
//! in turn proxies the bundle from the widget origin (see [`crate::widget`]).

use serde::Serialize;
use serde_json::{json, Value};

/// URI every tool's `openai/outputTemplate` points at.
pub const WIDGET_TEMPLATE_URI: &str = "ui://widget/todo.html";

/// MIME type hosts expect for widget templates.
pub const WIDGET_MIME_TYPE: &str = "text/html+skybridge";

/// A resource entry for resources/list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// Resource URI.
    pub uri: String,
    /// Short name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the contents.
    pub mime_type: String,
}

/// The todo widget template, bound to the backend's public origin.
#[derive(Debug, Clone)]
pub struct WidgetTemplate {
    backend_origin: String,
}

impl WidgetTemplate {
    /// Creates a template whose asset links point at `backend_origin`.
    ///
    /// `None` produces root-relative links.
    #[must_use]
    pub fn new(backend_origin: Option<&str>) -> Self {
        Self {
            backend_origin: backend_origin
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// Entry for resources/list.
    #[must_use]
    pub fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri: WIDGET_TEMPLATE_URI.to_string(),
            name: "todo-widget".to_string(),
            description: Some("Interactive todo list widget".to_string()),
            mime_type: WIDGET_MIME_TYPE.to_string(),
        }
    }

    /// The HTML shell.
    #[must_use]
    pub fn html(&self) -> String {
        let origin = &self.backend_origin;
        format!(
            "<div id=\"todo-root\"></div>\n\
             <link rel=\"stylesheet\" href=\"{origin}/widget.css\">\n\
             <script type=\"module\" src=\"{origin}/widget.js\"></script>\n"
        )
    }

    /// Body of a resources/read result.
    #[must_use]
    pub fn contents(&self) -> Value {
        let mut meta = json!({
            "openai/widgetDescription": "Shows the todo list and lets the user check off items.",
            "openai/widgetPrefersBorder": true,
        });
        if !self.backend_origin.is_empty() {
            meta["openai/widgetCSP"] = json!({
                "connect_domains": [self.backend_origin],
                "resource_domains": [self.backend_origin],
            });
        }

        json!({
            "contents": [{
                "uri": WIDGET_TEMPLATE_URI,
                "mimeType": WIDGET_MIME_TYPE,
                "text": self.html(),
                "_meta": meta,
            }]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_links_assets_on_backend_origin() {
        let template = WidgetTemplate::new(Some("https://todo.example.com/"));
        let html = template.html();
        assert!(html.contains("href=\"https://todo.example.com/widget.css\""));
        assert!(html.contains("src=\"https://todo.example.com/widget.js\""));
    }

    #[test]
    fn missing_origin_uses_relative_links() {
        let template = WidgetTemplate::new(None);
        assert!(template.html().contains("src=\"/widget.js\""));
        assert!(template.contents()["contents"][0]["_meta"]
            .get("openai/widgetCSP")
            .is_none());
    }

    #[test]
    fn contents_carry_mime_type_and_csp() {
        let template = WidgetTemplate::new(Some("https://todo.example.com"));
        let contents = template.contents();
        let entry = &contents["contents"][0];
        assert_eq!(entry["uri"], WIDGET_TEMPLATE_URI);
        assert_eq!(entry["mimeType"], WIDGET_MIME_TYPE);
        assert_eq!(
            entry["_meta"]["openai/widgetCSP"]["resource_domains"][0],
            "https://todo.example.com"
        );
    }
}
