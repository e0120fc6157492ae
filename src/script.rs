//! Embedded reload script.
//!
//! The client-side JavaScript is inert content to the core: it is rendered
//! once at construction against the actual bound port and handed to the host
//! to embed in served pages. The host can take the raw JS, a full
//! `<script>` tag, or splice it into an HTML document.

use crate::error::ConstructionError;

/// Raw client script with the port placeholder still in place.
const RELOAD_JS: &str = include_str!("script/reload.js");

/// Placeholder substituted with the bound WebSocket port.
const PORT_PLACEHOLDER: &str = "__REKINDLE_WS_PORT__";

/// Pre-rendered browser-side reload snippet.
///
/// Immutable after construction; obtained from
/// [`Reloader::reload_script`](crate::Reloader::reload_script).
#[derive(Debug, Clone)]
pub struct ReloadScript {
    js: String,
    port: u16,
}

impl ReloadScript {
    /// Render the embedded template against the bound port.
    pub(crate) fn render(port: u16) -> Result<Self, ConstructionError> {
        if !RELOAD_JS.contains(PORT_PLACEHOLDER) {
            return Err(ConstructionError::Script(format!(
                "embedded client script lacks the `{PORT_PLACEHOLDER}` placeholder"
            )));
        }

        Ok(Self {
            js: RELOAD_JS.replace(PORT_PLACEHOLDER, &port.to_string()),
            port,
        })
    }

    /// The rendered JavaScript, without surrounding tags.
    pub fn as_js(&self) -> &str {
        &self.js
    }

    /// The port the script will connect back to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The script wrapped in a `<script>` element.
    pub fn script_tag(&self) -> String {
        format!("<script>\n{}</script>", self.js)
    }

    /// Splice the script tag into an HTML document, just before the closing
    /// `</body>` tag (case-insensitive); appended at the end when the
    /// document has none.
    pub fn inject_into(&self, html: &str) -> String {
        const PATTERN: &[u8] = b"</body>";

        let tag = self.script_tag();
        let mut result = String::with_capacity(html.len() + tag.len());

        // Reverse search so trailing boilerplate after nested markup wins
        match html
            .as_bytes()
            .windows(PATTERN.len())
            .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        {
            Some(pos) => {
                result.push_str(&html[..pos]);
                result.push_str(&tag);
                result.push_str(&html[pos..]);
            }
            None => {
                result.push_str(html);
                result.push_str(&tag);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_port() {
        let script = ReloadScript::render(35729).unwrap();
        assert!(script.as_js().contains("ws://127.0.0.1:35729/"));
        assert!(!script.as_js().contains(PORT_PLACEHOLDER));
        assert_eq!(script.port(), 35729);
    }

    #[test]
    fn test_script_tag_wraps_js() {
        let tag = ReloadScript::render(4000).unwrap().script_tag();
        assert!(tag.starts_with("<script>"));
        assert!(tag.ends_with("</script>"));
        assert!(tag.contains("ws://127.0.0.1:4000/"));
    }

    #[test]
    fn test_inject_before_body_close() {
        let script = ReloadScript::render(4000).unwrap();
        let html = "<html><body><p>hi</p></body></html>";

        let injected = script.inject_into(html);

        let script_pos = injected.find("<script>").unwrap();
        let body_pos = injected.find("</body>").unwrap();
        assert!(script_pos < body_pos);
        assert!(injected.contains("<p>hi</p>"));
    }

    #[test]
    fn test_inject_is_case_insensitive() {
        let script = ReloadScript::render(4000).unwrap();
        let injected = script.inject_into("<HTML><BODY>hi</BODY></HTML>");
        let script_pos = injected.find("<script>").unwrap();
        let body_pos = injected.find("</BODY>").unwrap();
        assert!(script_pos < body_pos);
    }

    #[test]
    fn test_inject_without_body_appends() {
        let script = ReloadScript::render(4000).unwrap();
        let injected = script.inject_into("<p>fragment</p>");
        assert!(injected.starts_with("<p>fragment</p>"));
        assert!(injected.ends_with("</script>"));
    }
}
