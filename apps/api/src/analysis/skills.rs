//! Skill extraction in four matching tiers feeding one canonical set.
//!
//! 1. substring check over every canonical term, confirmed by a word-boundary match
//! 2. word-boundary patterns for base skills, frameworks and abbreviations,
//!    resolved through the synonym table
//! 3. multi-word canonical terms as plain case-insensitive phrases
//! 4. only when fewer than three skills were found: exact token matches from
//!    the entity tagger's tokenizer over the head of the text
//!
//! The result is sorted and free of duplicates.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::analysis::nlp::NlpService;
use crate::analysis::truncate_chars;
use crate::vocabulary::Vocabulary;

/// Below this many skills the token tier runs.
pub const TOKEN_TIER_THRESHOLD: usize = 3;
/// Characters tokenized by the token tier.
pub const TOKEN_TIER_LIMIT: usize = 30_000;

struct BoundaryTerm {
    term: String,
    lower: String,
    pattern: Regex,
}

pub struct SkillMatcher {
    vocabulary: Arc<Vocabulary>,
    canonical: HashSet<String>,
    /// Tier 1: every canonical term.
    boundary_terms: Vec<BoundaryTerm>,
    /// Tier 2: (term as written, pattern). Resolved through the synonym table.
    patterns: Vec<(String, Regex)>,
    /// Tier 3: canonical terms containing a space, with their lowercase form.
    phrases: Vec<(String, String)>,
}

fn word_pattern(term: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term)))
}

impl SkillMatcher {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Result<Self, regex::Error> {
        let canonical_terms = vocabulary.canonical_terms();

        let boundary_terms = canonical_terms
            .iter()
            .map(|term| {
                let lower = term.to_lowercase();
                Ok(BoundaryTerm {
                    term: term.clone(),
                    pattern: word_pattern(&lower)?,
                    lower,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let patterns = vocabulary
            .pattern_terms()
            .into_iter()
            .map(|term| Ok((term.to_string(), word_pattern(term)?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let phrases = canonical_terms
            .iter()
            .filter(|term| term.contains(' '))
            .map(|term| (term.clone(), term.to_lowercase()))
            .collect();

        Ok(Self {
            canonical: canonical_terms.into_iter().collect(),
            vocabulary,
            boundary_terms,
            patterns,
            phrases,
        })
    }

    /// Canonical terms whose lowercase form occurs anywhere in the text.
    /// Cheap pre-check used for logging only.
    pub fn potential_skills(&self, text: &str) -> Vec<&str> {
        let lower = text.to_lowercase();
        self.boundary_terms
            .iter()
            .filter(|t| lower.contains(&t.lower))
            .map(|t| t.term.as_str())
            .collect()
    }

    pub fn extract(&self, text: &str, nlp: &NlpService) -> Vec<String> {
        if text.trim().is_empty() {
            warn!("No text provided for skill extraction");
            return Vec::new();
        }

        let lower = text.to_lowercase();
        let mut found = BTreeSet::new();

        for t in &self.boundary_terms {
            if lower.contains(&t.lower) && t.pattern.is_match(text) && found.insert(t.term.clone())
            {
                debug!(skill = %t.term, "Skill found (direct)");
            }
        }

        for (term, pattern) in &self.patterns {
            if pattern.is_match(text) {
                let canonical = self.vocabulary.canonicalize(term);
                if found.insert(canonical.to_string()) {
                    debug!(skill = canonical, "Skill found (pattern)");
                }
            }
        }

        for (phrase, phrase_lower) in &self.phrases {
            if lower.contains(phrase_lower.as_str()) && found.insert(phrase.clone()) {
                debug!(skill = %phrase, "Skill found (multi-word)");
            }
        }

        if found.len() < TOKEN_TIER_THRESHOLD {
            debug!("Trying token-based skill extraction as fallback");
            let head = truncate_chars(text, TOKEN_TIER_LIMIT);
            for token in nlp.tagger().tokens(head) {
                if self.canonical.contains(token) && found.insert(token.to_string()) {
                    debug!(skill = token, "Skill found (token)");
                }
            }
        }

        let skills: Vec<String> = found.into_iter().collect();
        info!(total = skills.len(), ?skills, "Final extracted skills");
        skills
    }
}
