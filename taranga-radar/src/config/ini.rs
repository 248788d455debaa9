//! Minimal line-oriented INI reader for vehicle parameter files.
//!
//! Grammar: `;` starts a comment, empty lines are ignored, `[Name]` opens a
//! section, `key = value` assigns within the current section. Section and
//! key lookup is case-insensitive.

use std::collections::HashMap;
use std::path::Path;

/// Parsed INI document.
#[derive(Clone, Debug, Default)]
pub struct IniFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl IniFile {
    /// Parse an INI document from text. Malformed lines are skipped; the
    /// parser itself never fails.
    pub fn parse(text: &str) -> IniFile {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current = String::new();

        for raw_line in text.lines() {
            let line = match raw_line.find(';') {
                Some(pos) => &raw_line[..pos],
                None => raw_line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current = line[1..line.len() - 1].trim().to_ascii_lowercase();
                sections.entry(current.clone()).or_default();
                continue;
            }

            if let Some(eq) = line.find('=') {
                let key = line[..eq].trim().to_ascii_lowercase();
                let value = line[eq + 1..].trim().to_string();
                if !key.is_empty() {
                    sections
                        .entry(current.clone())
                        .or_default()
                        .insert(key, value);
                }
            }
        }

        IniFile { sections }
    }

    /// Read and parse a file.
    pub fn load(path: &Path) -> std::io::Result<IniFile> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    /// Raw string value of `key` in `section`, if present.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_ascii_lowercase())?
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Scalar value of `key` in `section`, if present and numeric.
    pub fn scalar(&self, section: &str, key: &str) -> Option<f32> {
        self.get(section, key)?.trim().parse::<f32>().ok()
    }

    /// Comma-separated pair of floats, if present and well-formed.
    pub fn pair(&self, section: &str, key: &str) -> Option<(f32, f32)> {
        let value = self.get(section, key)?;
        let mut parts = value.splitn(2, ',');
        let first = parts.next()?.trim().parse::<f32>().ok()?;
        let second = parts.next()?.trim().parse::<f32>().ok()?;
        Some((first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
; vehicle geometry
[Geometry]
distRearAxle = 1.5

[Radar Common]
cornerHardwareTimeDelay = 0.02 ; seconds
frontCenterHardwareTimeDelay = 0.03

[Contour]
contourPt0 = 0.0, 0.0
contourPt1 = 1.0, 2.0
";

    #[test]
    fn test_scalar_lookup() {
        let ini = IniFile::parse(SAMPLE);
        assert_eq!(ini.scalar("Geometry", "distRearAxle"), Some(1.5));
        assert_eq!(
            ini.scalar("Radar Common", "cornerHardwareTimeDelay"),
            Some(0.02)
        );
        assert_eq!(ini.scalar("Geometry", "missing"), None);
        assert_eq!(ini.scalar("Missing", "distRearAxle"), None);
    }

    #[test]
    fn test_case_insensitive() {
        let ini = IniFile::parse(SAMPLE);
        assert_eq!(ini.scalar("geometry", "DISTREARAXLE"), Some(1.5));
    }

    #[test]
    fn test_inline_comment_stripped() {
        let ini = IniFile::parse(SAMPLE);
        assert_eq!(
            ini.scalar("radar common", "cornerhardwaretimedelay"),
            Some(0.02)
        );
    }

    #[test]
    fn test_pair() {
        let ini = IniFile::parse(SAMPLE);
        assert_eq!(ini.pair("Contour", "contourPt1"), Some((1.0, 2.0)));
        assert_eq!(ini.pair("Contour", "contourPt9"), None);
    }
}
