//! Minimal `META-INF/MANIFEST.MF` reader.
//!
//! Only attribute extraction is supported: `Name: value` headers, values
//! continued on lines that start with a single space, sections separated
//! by blank lines. The first section is the main section.

use std::collections::HashMap;
use thiserror::Error;

/// Path of the manifest inside a JAR.
pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is not valid UTF-8")]
    Encoding,

    #[error("line {0}: expected `Name: value`")]
    MissingSeparator(usize),

    #[error("line {0}: continuation without a preceding header")]
    DanglingContinuation(usize),

    #[error("line {0}: invalid header name")]
    InvalidName(usize),

    #[error("line {0}: per-entry section without a Name header")]
    UnnamedSection(usize),
}

/// A parsed manifest.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    main: HashMap<String, String>,
    entries: HashMap<String, HashMap<String, String>>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ManifestError::Encoding)?;

        let mut manifest = Manifest::default();
        let mut section: Vec<(String, String)> = Vec::new();
        let mut section_start = 1;
        let mut in_main = true;

        for (idx, line) in split_lines(text).enumerate() {
            let line_no = idx + 1;
            if line.is_empty() {
                if !section.is_empty() || in_main {
                    manifest.finish_section(&mut section, in_main, section_start)?;
                    in_main = false;
                }
                section_start = line_no + 1;
                continue;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                let (_, value) = section
                    .last_mut()
                    .ok_or(ManifestError::DanglingContinuation(line_no))?;
                value.push_str(rest);
                continue;
            }

            let (name, value) = line
                .split_once(": ")
                .or_else(|| line.strip_suffix(':').map(|name| (name, "")))
                .ok_or(ManifestError::MissingSeparator(line_no))?;
            if !is_valid_name(name) {
                return Err(ManifestError::InvalidName(line_no));
            }
            section.push((name.to_string(), value.to_string()));
        }

        if !section.is_empty() || in_main {
            manifest.finish_section(&mut section, in_main, section_start)?;
        }
        Ok(manifest)
    }

    /// Main-section attributes.
    pub fn main_attributes(&self) -> &HashMap<String, String> {
        &self.main
    }

    /// Attributes of the per-entry section named `name`.
    pub fn entry_attributes(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.entries.get(name)
    }

    pub fn into_main_attributes(self) -> HashMap<String, String> {
        self.main
    }

    fn finish_section(
        &mut self,
        section: &mut Vec<(String, String)>,
        main: bool,
        start: usize,
    ) -> Result<(), ManifestError> {
        let attrs: HashMap<_, _> = section.drain(..).collect();
        if main {
            self.main = attrs;
            return Ok(());
        }
        let name = attrs
            .get("Name")
            .cloned()
            .ok_or(ManifestError::UnnamedSection(start))?;
        self.entries.insert(name, attrs);
        Ok(())
    }
}

fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 70
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_main_and_entry_sections() {
        let manifest = Manifest::parse(
            b"Manifest-Version: 1.0\r\n\
              Implementation-Title: demo\r\n\
              Class-Path: lib/a.jar\r\n \
              lib/b.jar\r\n\
              \r\n\
              Name: pkg/\r\n\
              Sealed: true\r\n",
        )
        .unwrap();

        let main = manifest.main_attributes();
        assert_eq!(main["Manifest-Version"], "1.0");
        assert_eq!(main["Implementation-Title"], "demo");
        assert_eq!(main["Class-Path"], "lib/a.jarlib/b.jar");
        assert_eq!(manifest.entry_attributes("pkg/").unwrap()["Sealed"], "true");
    }

    #[test]
    fn empty_manifest_has_no_attributes() {
        let manifest = Manifest::parse(b"").unwrap();
        assert!(manifest.main_attributes().is_empty());
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            Manifest::parse(b"Manifest-Version 1.0\n"),
            Err(ManifestError::MissingSeparator(1))
        );
        assert_eq!(
            Manifest::parse(b" dangling\n"),
            Err(ManifestError::DanglingContinuation(1))
        );
        assert_eq!(
            Manifest::parse(b"Bad Name: x\n"),
            Err(ManifestError::InvalidName(1))
        );
        assert_eq!(
            Manifest::parse(b"A: b\n\nSealed: true\n"),
            Err(ManifestError::UnnamedSection(3))
        );
        assert_eq!(Manifest::parse(&[0xff, 0xfe]), Err(ManifestError::Encoding));
    }
}
