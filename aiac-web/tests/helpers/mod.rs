//! Shared fixtures for aiac-web integration tests
//!
//! Project archives are assembled in memory with the zip writer.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use serde_json::{json, Value};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const SOURCE_DIR: &str = "src/appinventor/ai_tester/Demo";

/// Builds `.aia` archives entry by entry
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `youngandroidproject/project.properties` with Screen1 as main screen
    pub fn descriptor(self, name: &str, version: &str) -> Self {
        let text = format!(
            "#\n#Mon Jan 01 00:00:00 UTC 2024\nsource=../src\nname={name}\n\
             main=appinventor.ai_tester.{name}.Screen1\nversioncode=1\n\
             versionname={version}\nsizing=Responsive\n"
        );
        self.entry("youngandroidproject/project.properties", text.into_bytes())
    }

    /// Screen layout declaring `(name, type)` components
    pub fn screen(self, screen: &str, components: &[(&str, &str)]) -> Self {
        let children: Vec<Value> = components
            .iter()
            .map(|(name, kind)| json!({"$Name": name, "$Type": kind, "$Version": "1", "Uuid": "1"}))
            .collect();
        let document = json!({
            "authURL": ["ai2.appinventor.mit.edu"],
            "YaVersion": "229",
            "Source": "Form",
            "Properties": {
                "$Name": screen,
                "$Type": "Form",
                "$Version": "31",
                "Title": screen,
                "Uuid": "0",
                "$Components": children,
            }
        });
        let text = format!("#|\n$JSON\n{}\n|#", document);
        self.entry(&format!("{}/{}.scm", SOURCE_DIR, screen), text.into_bytes())
    }

    /// Screen event logic with one click handler per `(instance, type)`
    pub fn blocks(self, screen: &str, references: &[(&str, &str)]) -> Self {
        let mut xml = String::from(r#"<xml xmlns="http://www.w3.org/1999/xhtml">"#);
        for (instance, kind) in references {
            xml.push_str(&format!(
                r#"<block type="component_event"><mutation component_type="{kind}" is_generic="false" instance_name="{instance}" event_name="Click"></mutation><field name="COMPONENT_SELECTOR">{instance}</field></block>"#
            ));
        }
        xml.push_str("</xml>");
        self.entry(&format!("{}/{}.bky", SOURCE_DIR, screen), xml.into_bytes())
    }

    pub fn entry(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.entries.push((path.to_string(), bytes));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, bytes) in self.entries {
            writer
                .start_file(path, SimpleFileOptions::default())
                .expect("Should start entry");
            writer.write_all(&bytes).expect("Should write entry");
        }
        writer.finish().expect("Should finish archive").into_inner()
    }
}

/// Two screens, Button on Screen1 and Label on Screen2, all blocks declared
pub fn demo_archive() -> Vec<u8> {
    ArchiveBuilder::new()
        .descriptor("Demo", "1.0")
        .screen("Screen1", &[("Button1", "Button")])
        .blocks("Screen1", &[("Button1", "Button")])
        .screen("Screen2", &[("Label1", "Label")])
        .blocks("Screen2", &[])
        .build()
}

/// Screen2 logic uses an ImagePicker and a Notifier its layout lacks
pub fn trainer_archive() -> Vec<u8> {
    ArchiveBuilder::new()
        .descriptor("AITrainer", "2.1")
        .screen("Screen1", &[("StartButton", "Button")])
        .blocks("Screen1", &[("StartButton", "Button")])
        .screen("Screen2", &[("PoseLabel", "Label")])
        .blocks(
            "Screen2",
            &[
                ("PoseLabel", "Label"),
                ("ImagePicker1", "ImagePicker"),
                ("Notifier1", "Notifier"),
            ],
        )
        .build()
}

/// multipart/form-data body with one file field
pub fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    multipart_form(&[(field, filename, bytes)])
}

/// multipart/form-data body with one part per `(field, filename, bytes)`
pub fn multipart_form(parts: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "aiac-test-boundary";
    let mut body = Vec::new();
    for (field, filename, bytes) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}
