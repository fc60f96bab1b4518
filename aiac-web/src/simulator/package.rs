//! Placeholder package writer
//!
//! Produces a zip with the shape of an Android package so that the download
//! opens in archive tools. Nothing in it is executable.

use std::io::{Cursor, Write};

use aiac_common::CompileOptions;
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::CompileError;

pub const APK_MIME_TYPE: &str = "application/vnd.android.package-archive";

const DEX_PLACEHOLDER: &[u8] = b"DUMMY DEX FILE CONTENT - SHOULD BE REPLACED WITH REAL CODE";

const MAIN_LAYOUT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"
    android:layout_width="match_parent"
    android:layout_height="match_parent"
    android:orientation="vertical">
    <TextView
        android:layout_width="match_parent"
        android:layout_height="wrap_content"
        android:text="App built with MIT App Inventor" />
</LinearLayout>"#;

/// Android release targets offered by the compile form
const TARGETS: &[(&str, u16)] = &[
    ("8.0", 26),
    ("8.1", 27),
    ("9", 28),
    ("10", 29),
    ("11", 30),
    ("12", 31),
    ("13", 33),
    ("14", 34),
];

/// Android release selected for the package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPlatform {
    pub release: &'static str,
    pub api_level: u16,
}

impl TargetPlatform {
    pub fn parse(raw: &str) -> Result<Self, CompileError> {
        let wanted = raw.trim();
        TARGETS
            .iter()
            .find(|(release, _)| *release == wanted)
            .map(|&(release, api_level)| Self { release, api_level })
            .ok_or_else(|| CompileError::UnsupportedTarget(raw.to_string()))
    }

    pub fn supported() -> impl Iterator<Item = &'static str> {
        TARGETS.iter().map(|(release, _)| *release)
    }
}

/// The binary produced by a simulated compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPackage {
    /// Download name, `{projectName}.apk`
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Java package name derived from the project name
pub fn package_name(project_name: &str) -> String {
    let mut ident: String = project_name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    format!("org.example.{}", ident)
}

/// Write the placeholder package for `options`
///
/// `stamp` is the human-readable compilation time recorded in the readme.
pub fn build_package(
    options: &CompileOptions,
    target: TargetPlatform,
    stamp: &str,
) -> Result<CompiledPackage, CompileError> {
    let file_options = if options.optimize {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9))
    } else {
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
    };

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let entries: [(&str, Vec<u8>); 4] = [
        ("AndroidManifest.xml", manifest(options, target).into_bytes()),
        ("classes.dex", DEX_PLACEHOLDER.to_vec()),
        ("res/layout/activity_main.xml", MAIN_LAYOUT.as_bytes().to_vec()),
        ("assets/README.txt", readme(options, target, stamp).into_bytes()),
    ];

    for (path, data) in entries {
        writer.start_file(path, file_options).map_err(package_error)?;
        writer.write_all(&data).map_err(package_error)?;
    }

    let bytes = writer.finish().map_err(package_error)?.into_inner();

    Ok(CompiledPackage {
        file_name: options.download_name(),
        bytes,
    })
}

fn package_error(e: impl std::fmt::Display) -> CompileError {
    CompileError::Package(e.to_string())
}

fn manifest(options: &CompileOptions, target: TargetPlatform) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="{package}"
    android:versionName="{version}">
    <uses-sdk android:minSdkVersion="21" android:targetSdkVersion="{api}" />
    <application
        android:label="{label}"
        android:icon="@mipmap/ic_launcher"
        android:roundIcon="@mipmap/ic_launcher_round"
        android:theme="@style/AppTheme">
        <activity android:name=".MainActivity">
            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
                <category android:name="android.intent.category.LAUNCHER" />
            </intent-filter>
        </activity>
    </application>
</manifest>"#,
        package = package_name(&options.project_name),
        version = escape(options.version.as_str()),
        api = target.api_level,
        label = escape(options.project_name.as_str()),
    )
}

fn readme(options: &CompileOptions, target: TargetPlatform, stamp: &str) -> String {
    let or_unknown = |items: &[String]| {
        if items.is_empty() {
            "Unknown".to_string()
        } else {
            items.join(", ")
        }
    };

    let mut text = format!(
        "MIT App Inventor 2 Compilation Information\n\
         Project Name: {}\n\
         Screens: {}\n\
         Components: {}\n\
         Target: Android {} (API {})\n\
         Optimized: {}\n\
         Compilation Date: {}\n\n",
        options.project_name,
        or_unknown(&options.screens),
        or_unknown(&options.components),
        target.release,
        target.api_level,
        if options.optimize { "yes" } else { "no" },
        stamp,
    );

    if let Some(missing) = options.missing_components.as_ref().filter(|m| !m.is_empty()) {
        let listed: Vec<String> = missing.iter().map(ToString::to_string).collect();
        text.push_str(&format!(
            "\nWARNING: The following components are missing but used in blocks: {}\n",
            listed.join(", ")
        ));
        text.push_str("Consider adding these components in MIT App Inventor 2 before using the app.\n");
    }

    text
}
