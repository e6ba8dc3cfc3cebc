use regex::Regex;

use crate::vocabulary::Vocabulary;

/// Strips heading words and normalizes whitespace in raw extracted text.
///
/// Headings are removed wherever they appear as whole words, not only on
/// heading lines, so prose like "relevant experience" loses a word too.
pub struct TextCleaner {
    headings: Vec<Regex>,
    blank_lines: Regex,
    spaces: Regex,
}

impl TextCleaner {
    pub fn new(vocabulary: &Vocabulary) -> Result<Self, regex::Error> {
        let headings = vocabulary
            .headings
            .iter()
            .map(|h| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(h))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            headings,
            blank_lines: Regex::new(r"\n(?:[ \t\r]*\n)+")?,
            spaces: Regex::new(r"[ \t]{2,}")?,
        })
    }

    pub fn clean(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for heading in &self.headings {
            cleaned = heading.replace_all(&cleaned, "").into_owned();
        }
        let cleaned = self.blank_lines.replace_all(&cleaned, "\n");
        let cleaned = self.spaces.replace_all(&cleaned, " ");
        cleaned.trim().to_string()
    }
}
