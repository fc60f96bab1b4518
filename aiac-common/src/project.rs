//! Project data model shared by the inspector, the compile pipeline and the UI
//!
//! Field names serialize in camelCase to match the browser client.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Target platform used when a compile request does not name one
pub const DEFAULT_TARGET: &str = "10";

/// Metadata extracted from an uploaded project archive
///
/// Created once by the inspector and never mutated afterwards; the client
/// only holds it in transient UI state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub project_name: String,
    /// Screen names, main screen first
    pub screens: Vec<String>,
    /// Distinct component type names (serialized sorted)
    pub components: BTreeSet<String>,
    pub version: String,
    /// `YaVersion` recorded by the visual builder in the screen layouts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_version: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub missing_components: Vec<MissingComponent>,
}

impl ProjectMetadata {
    pub fn has_missing_components(&self) -> bool {
        !self.missing_components.is_empty()
    }
}

/// A component referenced by a screen's event logic but not declared in
/// that screen's layout
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingComponent {
    /// Instance name as used in the blocks (e.g. `ImagePicker1`)
    pub component: String,
    pub screen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
}

impl MissingComponent {
    pub fn new(component: impl Into<String>, screen: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            screen: screen.into(),
            component_type: None,
        }
    }
}

impl fmt::Display for MissingComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component_type {
            Some(kind) => write!(f, "{} ({}) on {}", self.component, kind, self.screen),
            None => write!(f, "{} on {}", self.component, self.screen),
        }
    }
}

/// Options for one compile request
///
/// Built by the UI from the current [`ProjectMetadata`] plus the form
/// values. Every field is defaulted on deserialization so that absent
/// required values surface as compile errors rather than decode errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub optimize: bool,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub screens: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_components: Option<Vec<MissingComponent>>,
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

impl CompileOptions {
    /// Combine inspected metadata with the user's form selections
    pub fn from_metadata(metadata: &ProjectMetadata, target: &str, optimize: bool) -> Self {
        Self {
            project_name: metadata.project_name.clone(),
            filename: metadata.filename.clone(),
            target: target.to_string(),
            optimize,
            components: metadata.components.iter().cloned().collect(),
            screens: metadata.screens.clone(),
            version: metadata.version.clone(),
            missing_components: metadata
                .has_missing_components()
                .then(|| metadata.missing_components.clone()),
        }
    }

    /// File name offered for the compiled download
    pub fn download_name(&self) -> String {
        format!("{}.apk", self.project_name)
    }
}
