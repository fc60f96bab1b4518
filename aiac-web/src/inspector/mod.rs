//! Archive Inspector
//!
//! Opens an uploaded project archive (`.aia`, a zip container) in memory and
//! reports its [`ProjectMetadata`]: project name, version, screens, component
//! types, and components the event logic uses without the screen layout
//! declaring them.
//!
//! Archive layout:
//!
//! ```text
//! youngandroidproject/project.properties      descriptor
//! src/<package path>/<Screen>.scm             screen layout (JSON)
//! src/<package path>/<Screen>.bky             screen event logic (Blockly XML)
//! assets/...                                  ignored
//! ```

pub mod blocks;
pub mod descriptor;
pub mod layout;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::path::Path;

use aiac_common::{MissingComponent, ProjectMetadata};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{ApiError, ParseError};
use blocks::BlockUsage;
use descriptor::Descriptor;
use layout::Layout;

pub const ARCHIVE_EXTENSION: &str = "aia";
pub const DESCRIPTOR_PATH: &str = "youngandroidproject/project.properties";
const SOURCE_PREFIX: &str = "src/";

/// Ceiling on the total extracted size of the entries the inspector reads
pub const MAX_EXTRACTED_BYTES: u64 = 256 * 1024 * 1024;

/// Version reported when the descriptor carries none
pub const DEFAULT_VERSION: &str = "1.0";

/// Inspect an archive held in memory
///
/// `filename` is the (already sanitized) name the archive was uploaded as.
pub fn inspect_archive(bytes: &[u8], filename: &str) -> Result<ProjectMetadata, ParseError> {
    let contents = read_entries(bytes, filename, MAX_EXTRACTED_BYTES)?;

    let descriptor_text = contents.descriptor.ok_or(ParseError::MissingDescriptor)?;
    let descriptor = Descriptor::parse(&descriptor_text);

    if !contents.saw_source {
        return Err(ParseError::MissingSource);
    }

    let mut layouts = BTreeMap::new();
    for (screen, text) in &contents.layouts {
        let layout = layout::parse_layout(text);
        if layout.recovered {
            warn!(screen = %screen, "Layout JSON malformed; recovered declarations by scanning");
        }
        layouts.insert(screen.clone(), layout);
    }

    if layouts.is_empty() {
        return Err(ParseError::NoScreens);
    }

    let mut usages = BTreeMap::new();
    for (screen, text) in &contents.blocks {
        match blocks::parse_blocks(text) {
            Ok(usage) => {
                usages.insert(screen.clone(), usage);
            }
            Err(e) => warn!(screen = %screen, error = %e, "Skipping unreadable event logic"),
        }
    }

    let screens = order_screens(layouts.keys().cloned().collect(), descriptor.main_screen());
    let components = collect_component_types(&layouts, &usages);
    let missing_components = find_missing_components(&screens, &layouts, &usages);

    let project_name = descriptor
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(filename));

    let metadata = ProjectMetadata {
        project_name,
        version: descriptor.version().unwrap_or(DEFAULT_VERSION).to_string(),
        builder_version: screens
            .iter()
            .find_map(|s| layouts.get(s).and_then(|l| l.builder_version.clone())),
        screens,
        components,
        filename: filename.to_string(),
        missing_components,
    };

    info!(
        project = %metadata.project_name,
        screens = metadata.screens.len(),
        components = metadata.components.len(),
        missing = metadata.missing_components.len(),
        "Inspected project archive"
    );

    Ok(metadata)
}

/// Run [`inspect_archive`] on the blocking pool
pub async fn inspect_archive_blocking(
    bytes: Vec<u8>,
    filename: String,
) -> Result<ProjectMetadata, ApiError> {
    tokio::task::spawn_blocking(move || inspect_archive(&bytes, &filename))
        .await
        .map_err(|e| ApiError::Internal(format!("Inspection task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Raw text of the entries the inspector cares about
#[derive(Default)]
struct ArchiveContents {
    descriptor: Option<String>,
    saw_source: bool,
    layouts: BTreeMap<String, String>,
    blocks: BTreeMap<String, String>,
}

/// Read the descriptor, layouts and event logic into memory
///
/// `limit` caps the bytes actually decompressed across all entries. Sizes
/// recorded in the archive headers are not trusted.
fn read_entries(
    bytes: &[u8],
    filename: &str,
    limit: u64,
) -> Result<ArchiveContents, ParseError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|_| ParseError::NotAnArchive(filename.to_string()))?;

    let mut contents = ArchiveContents::default();
    let mut extracted: u64 = 0;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ParseError::UnreadableEntry {
                entry: format!("entry #{}", index),
                reason: e.to_string(),
            })?;
        let name = entry.name().replace('\\', "/");

        if name.starts_with(SOURCE_PREFIX) {
            contents.saw_source = true;
        }
        if entry.is_dir() {
            continue;
        }

        let slot = if name == DESCRIPTOR_PATH {
            Slot::Descriptor
        } else if name.starts_with(SOURCE_PREFIX) && name.ends_with(".scm") {
            Slot::Layout
        } else if name.starts_with(SOURCE_PREFIX) && name.ends_with(".bky") {
            Slot::Blocks
        } else {
            continue;
        };

        // extracted <= limit holds here, so one byte past the remaining
        // budget is enough to detect an overrun.
        let mut raw = Vec::new();
        (&mut entry)
            .take(limit - extracted + 1)
            .read_to_end(&mut raw)
            .map_err(|e| ParseError::UnreadableEntry {
                entry: name.clone(),
                reason: e.to_string(),
            })?;
        extracted += raw.len() as u64;
        if extracted > limit {
            warn!(entry = %name, limit, "Archive exceeds the extraction limit");
            return Err(ParseError::TooLarge { limit });
        }
        let text = String::from_utf8_lossy(&raw).into_owned();
        debug!(entry = %name, bytes = raw.len(), "Read archive entry");

        match slot {
            Slot::Descriptor => contents.descriptor = Some(text),
            Slot::Layout => {
                contents.layouts.insert(file_stem(&name), text);
            }
            Slot::Blocks => {
                contents.blocks.insert(file_stem(&name), text);
            }
        }
    }

    Ok(contents)
}

enum Slot {
    Descriptor,
    Layout,
    Blocks,
}

/// Main screen first, then natural order (`Screen2` before `Screen10`)
fn order_screens(mut screens: Vec<String>, main: Option<&str>) -> Vec<String> {
    screens.sort_by(|a, b| {
        let a_main = Some(a.as_str()) == main;
        let b_main = Some(b.as_str()) == main;
        b_main.cmp(&a_main).then_with(|| natural_cmp(a, b))
    });
    screens
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (a_stem, a_num) = split_trailing_number(a);
    let (b_stem, b_num) = split_trailing_number(b);
    a_stem
        .cmp(b_stem)
        .then_with(|| a_num.cmp(&b_num))
        .then_with(|| a.cmp(b))
}

fn split_trailing_number(s: &str) -> (&str, Option<u64>) {
    let stem = s.trim_end_matches(|c: char| c.is_ascii_digit());
    (stem, s[stem.len()..].parse().ok())
}

fn collect_component_types(
    layouts: &BTreeMap<String, Layout>,
    usages: &BTreeMap<String, BlockUsage>,
) -> BTreeSet<String> {
    let declared = layouts.values().flat_map(|l| l.component_types());
    let referenced = usages
        .values()
        .flat_map(|u| u.component_types.iter().map(String::as_str))
        .filter(|t| *t != layout::SCREEN_ROOT_TYPE);

    declared.chain(referenced).map(str::to_string).collect()
}

/// Instance references with no declaration in the same screen
///
/// Screens are visited in display order; event logic without a layout comes
/// last and every reference in it counts as missing.
fn find_missing_components(
    screens: &[String],
    layouts: &BTreeMap<String, Layout>,
    usages: &BTreeMap<String, BlockUsage>,
) -> Vec<MissingComponent> {
    let orphans = usages.keys().filter(|s| !layouts.contains_key(*s));
    let mut missing = Vec::new();

    for screen in screens.iter().chain(orphans) {
        let Some(usage) = usages.get(screen) else {
            continue;
        };
        let layout = layouts.get(screen);

        for reference in &usage.references {
            if layout.is_some_and(|l| l.declares(&reference.instance)) {
                continue;
            }
            debug!(screen = %screen, component = %reference.instance, "Component used in blocks but not declared");
            missing.push(MissingComponent {
                component: reference.instance.clone(),
                screen: screen.clone(),
                component_type: reference.component_type.clone(),
            });
        }
    }

    missing
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// True when the name carries the project archive extension
pub fn has_archive_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Reduce an uploaded file name to a safe base name
///
/// Drops any directory part, turns whitespace into `_`, removes characters
/// outside `[A-Za-z0-9._-]` and leading dots.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}
