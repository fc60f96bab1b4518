//! Screen layout files (`<Screen>.scm`)
//!
//! The builder wraps a JSON document in a block comment:
//!
//! ```text
//! #|
//! $JSON
//! {"authURL":[...],"YaVersion":"229","Source":"Form","Properties":{...}}
//! |#
//! ```
//!
//! `Properties` is the screen itself (`$Type` = `Form`); child components
//! nest under `$Components` arrays to any depth.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Type name of the screen root component
pub const SCREEN_ROOT_TYPE: &str = "Form";

/// A component declared in a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredComponent {
    pub name: String,
    pub component_type: String,
}

/// Declarations extracted from one screen layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// Every declared component, the screen root first
    pub components: Vec<DeclaredComponent>,
    pub builder_version: Option<String>,
    /// True when the JSON block was unreadable and the line scan was used
    pub recovered: bool,
}

impl Layout {
    pub fn declares(&self, name: &str) -> bool {
        self.components.iter().any(|c| c.name == name)
    }

    /// Component type names, excluding the screen root
    pub fn component_types(&self) -> impl Iterator<Item = &str> {
        self.components
            .iter()
            .map(|c| c.component_type.as_str())
            .filter(|t| *t != SCREEN_ROOT_TYPE)
    }
}

/// Parse a layout file, recovering declarations when its JSON is malformed
pub fn parse_layout(content: &str) -> Layout {
    let json = extract_json_block(content);
    match serde_json::from_str::<Value>(json) {
        Ok(document) => from_document(&document),
        Err(e) => {
            tracing::debug!(error = %e, "Layout JSON unreadable, scanning lines");
            scan_declarations(content)
        }
    }
}

/// Slice out the text between the `$JSON` marker and the closing `|#`
fn extract_json_block(content: &str) -> &str {
    let Some(marker) = content.find("$JSON") else {
        return content.trim();
    };
    let body = &content[marker + "$JSON".len()..];
    let end = body.rfind("|#").unwrap_or(body.len());
    body[..end].trim()
}

fn from_document(document: &Value) -> Layout {
    let mut components = Vec::new();
    if let Some(root) = document.get("Properties") {
        collect_components(root, &mut components);
    }

    let builder_version = match document.get("YaVersion") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Layout {
        components,
        builder_version,
        recovered: false,
    }
}

fn collect_components(node: &Value, out: &mut Vec<DeclaredComponent>) {
    let name = node.get("$Name").and_then(Value::as_str);
    let component_type = node.get("$Type").and_then(Value::as_str);
    if let (Some(name), Some(component_type)) = (name, component_type) {
        out.push(DeclaredComponent {
            name: name.to_string(),
            component_type: component_type.to_string(),
        });
    }

    if let Some(children) = node.get("$Components").and_then(Value::as_array) {
        for child in children {
            collect_components(child, out);
        }
    }
}

fn declaration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""\$(Name|Type)"\s*:\s*"([^"]*)""#).expect("declaration pattern is valid")
    })
}

/// Pair each `$Name` with the `$Type` that follows it
fn scan_declarations(content: &str) -> Layout {
    let mut components = Vec::new();
    let mut pending_name: Option<String> = None;

    for capture in declaration_pattern().captures_iter(content) {
        let value = capture[2].to_string();
        match &capture[1] {
            "Name" => pending_name = Some(value),
            _ => {
                if let Some(name) = pending_name.take() {
                    components.push(DeclaredComponent {
                        name,
                        component_type: value,
                    });
                }
            }
        }
    }

    Layout {
        components,
        builder_version: None,
        recovered: true,
    }
}
