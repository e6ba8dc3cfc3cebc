//! Canonical skill, synonym and heading tables shared by the cleaner and the skill matcher.
//!
//! Built once at startup (either the built-in tables or a JSON override file)
//! and shared read-only behind an `Arc` by every document task.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

const SKILL_KEYWORDS: &[&str] = &[
    "Python",
    "Java",
    "JavaScript",
    "React",
    "SQL",
    "NoSQL",
    "API Design",
    "Project Management",
    "Agile",
    "Scrum",
    "System Architecture",
    "Leadership",
    "Teamwork",
    "Communication",
    "Machine Learning",
];

const COMMON_FRAMEWORKS: &[&str] = &[
    "Django",
    "Flask",
    "FastAPI",
    "Vue",
    "Angular",
    "Node.js",
    "Express",
    "Spring Boot",
];

const TECH_TERMS: &[&str] = &[
    "Python",
    "Java",
    "JavaScript",
    "React",
    "SQL",
    "NoSQL",
    "Django",
    "Flask",
    "FastAPI",
    "Vue",
    "Angular",
    "Node.js",
    "Express",
    "Spring Boot",
    "PyTorch",
    "TensorFlow",
    "Keras",
    "Docker",
    "Kubernetes",
    "Terraform",
    "AWS",
    "GCP",
    "Azure",
    "MongoDB",
    "PostgreSQL",
    "MySQL",
];

const SKILL_SYNONYMS: &[(&str, &str)] = &[
    ("JS", "JavaScript"),
    ("PM", "Project Management"),
    ("ML", "Machine Learning"),
    ("DB", "SQL"),
];

/// Order matters: the cleaner strips headings one after another.
const HEADINGS: &[&str] = &[
    "Personal Information",
    "Education",
    "Skills",
    "Experience",
    "Work Experience",
    "Projects",
    "Certifications",
    "Summary",
];

/// Immutable category → term tables consumed by the cleaner and the skill matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub skill_keywords: Vec<String>,
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub tech_terms: Vec<String>,
    /// abbreviation → canonical skill name
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
    #[serde(default)]
    pub headings: Vec<String>,
}

impl Vocabulary {
    pub fn builtin() -> Self {
        let owned = |terms: &[&str]| terms.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        Self {
            skill_keywords: owned(SKILL_KEYWORDS),
            frameworks: owned(COMMON_FRAMEWORKS),
            tech_terms: owned(TECH_TERMS),
            synonyms: SKILL_SYNONYMS
                .iter()
                .map(|(abbr, canonical)| (abbr.to_string(), canonical.to_string()))
                .collect(),
            headings: owned(HEADINGS),
        }
    }

    /// Loads the override file when a path is configured, otherwise the built-in tables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let vocabulary = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::builtin(),
        };
        info!(
            canonical_terms = vocabulary.canonical_terms().len(),
            synonyms = vocabulary.synonyms.len(),
            headings = vocabulary.headings.len(),
            "Vocabulary loaded"
        );
        Ok(vocabulary)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary file '{}'", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Invalid vocabulary file '{}'", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let vocabulary: Vocabulary = serde_json::from_str(raw)?;
        if vocabulary.canonical_terms().is_empty() {
            anyhow::bail!("vocabulary defines no skill terms");
        }
        if let Some((abbr, _)) = vocabulary
            .synonyms
            .iter()
            .find(|(abbr, canonical)| abbr.trim().is_empty() || canonical.trim().is_empty())
        {
            anyhow::bail!("synonym entry '{abbr}' has an empty side");
        }
        Ok(vocabulary)
    }

    /// Base skills ∪ frameworks ∪ tech terms ∪ synonym targets.
    pub fn canonical_terms(&self) -> BTreeSet<String> {
        self.skill_keywords
            .iter()
            .chain(&self.frameworks)
            .chain(&self.tech_terms)
            .chain(self.synonyms.values())
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Terms that get a dedicated word-boundary pattern: base skills, frameworks
    /// and every abbreviation.
    pub fn pattern_terms(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.skill_keywords
            .iter()
            .chain(&self.frameworks)
            .chain(self.synonyms.keys())
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty() && seen.insert(*t))
            .collect()
    }

    pub fn canonicalize<'a>(&'a self, term: &'a str) -> &'a str {
        self.synonyms.get(term).map(String::as_str).unwrap_or(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_terms_include_synonym_targets() {
        let vocab = Vocabulary::builtin();
        let terms = vocab.canonical_terms();
        assert!(terms.contains("Project Management"));
        assert!(terms.contains("Kubernetes"));
        assert!(!terms.contains("PM"), "abbreviations are not canonical");
    }

    #[test]
    fn test_pattern_terms_are_deduplicated() {
        let vocab = Vocabulary::builtin();
        let terms = vocab.pattern_terms();
        let unique: BTreeSet<_> = terms.iter().collect();
        assert_eq!(unique.len(), terms.len());
        assert!(terms.contains(&"JS"));
        assert!(terms.contains(&"Spring Boot"));
        // tech terms only take part in the substring tier
        assert!(!terms.contains(&"Docker"));
    }

    #[test]
    fn test_canonicalize_resolves_abbreviations() {
        let vocab = Vocabulary::builtin();
        assert_eq!(vocab.canonicalize("JS"), "JavaScript");
        assert_eq!(vocab.canonicalize("DB"), "SQL");
        assert_eq!(vocab.canonicalize("Python"), "Python");
    }

    #[test]
    fn test_from_json_accepts_partial_tables() {
        let raw = r#"{
            "skill_keywords": ["Rust", "Go"],
            "frameworks": ["Axum"],
            "synonyms": {"Golang": "Go"}
        }"#;
        let vocab = Vocabulary::from_json(raw).unwrap();
        assert!(vocab.tech_terms.is_empty());
        assert!(vocab.headings.is_empty());
        assert_eq!(vocab.canonicalize("Golang"), "Go");
        assert_eq!(vocab.canonical_terms().len(), 3);
    }

    #[test]
    fn test_from_json_rejects_empty_vocabulary() {
        let raw = r#"{"skill_keywords": [], "frameworks": []}"#;
        assert!(Vocabulary::from_json(raw).is_err());
    }

    #[test]
    fn test_from_json_rejects_blank_synonym() {
        let raw = r#"{"skill_keywords": ["Rust"], "frameworks": [], "synonyms": {"RS": " "}}"#;
        assert!(Vocabulary::from_json(raw).is_err());
    }

    #[test]
    fn test_load_reads_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        std::fs::write(&path, r#"{"skill_keywords": ["Elixir"], "frameworks": ["Phoenix"]}"#)
            .unwrap();
        let vocab = Vocabulary::load(Some(&path)).unwrap();
        assert_eq!(vocab.skill_keywords, vec!["Elixir".to_string()]);

        let missing = dir.path().join("missing.json");
        assert!(Vocabulary::load(Some(&missing)).is_err());
    }
}
