//! Project descriptor (`youngandroidproject/project.properties`)
//!
//! Java properties syntax: `key=value` or `key:value` per line, `#`/`!`
//! comments, backslash escapes.

use std::collections::HashMap;

/// Parsed descriptor properties
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    properties: HashMap<String, String>,
}

impl Descriptor {
    pub fn parse(content: &str) -> Self {
        let mut properties = HashMap::new();

        for line in content.lines() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let (key, value) = split_entry(line);
            let key = unescape(key.trim());
            if key.is_empty() {
                continue;
            }
            properties.insert(key, unescape(value.trim()));
        }

        Self { properties }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Project name as entered in the builder
    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    /// Version tag: `versionname`, else `versioncode`, else `main`
    pub fn version(&self) -> Option<&str> {
        self.get("versionname")
            .or_else(|| self.get("versioncode"))
            .or_else(|| self.get("main"))
    }

    /// Screen the app starts on
    ///
    /// `main` is a qualified class name such as
    /// `appinventor.ai_user.Demo.Screen1`; the screen is its last segment.
    pub fn main_screen(&self) -> Option<&str> {
        self.get("main")
            .and_then(|main| main.rsplit('.').next())
            .filter(|s| !s.is_empty())
    }
}

/// Split at the first unescaped `=` or `:`
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '=' | ':' if !escaped => return (&line[..i], &line[i + 1..]),
            _ => escaped = false,
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
