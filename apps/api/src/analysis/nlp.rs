//! Entity tagging and tokenization shared by all document tasks.
//!
//! `NlpService` holds the tagger behind a `OnceLock`: the first caller runs the
//! loader, everyone after reuses the same read-only instance for the life of
//! the process. There is no teardown.
//!
//! The default tagger is rule based: runs of capitalized words are labelled as
//! organizations (known corporate suffix), places (gazetteer hit) or person
//! names (2–4 words, none of them a known non-name word).

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::info;

use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityLabel {
    Person,
    /// Geopolitical entity: city, state, country.
    Gpe,
    Org,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub label: EntityLabel,
    pub text: String,
    /// Byte offset of the entity in the tagged text.
    pub start: usize,
}

pub trait EntityTagger: Send + Sync {
    /// Entities in document order.
    fn entities(&self, text: &str) -> Vec<Entity>;

    /// Lightweight tokenization: whitespace split with edge punctuation removed.
    fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_whitespace()
            .map(|word| {
                word.trim_start_matches(|c: char| c != '.' && EDGE_PUNCT.contains(&c))
                    .trim_end_matches(EDGE_PUNCT)
            })
            .filter(|token| !token.is_empty())
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared, lazily-initialized service
// ────────────────────────────────────────────────────────────────────────────

type TaggerLoader = Box<dyn Fn() -> Box<dyn EntityTagger> + Send + Sync>;

pub struct NlpService {
    tagger: OnceLock<Box<dyn EntityTagger>>,
    loader: TaggerLoader,
}

impl NlpService {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Box<dyn EntityTagger> + Send + Sync + 'static,
    {
        Self {
            tagger: OnceLock::new(),
            loader: Box::new(loader),
        }
    }

    pub fn rule_based(vocabulary: Arc<Vocabulary>) -> Self {
        Self::new(move || Box::new(RuleBasedTagger::new(&vocabulary)))
    }

    /// Returns the tagger, loading it on first use.
    pub fn tagger(&self) -> &dyn EntityTagger {
        self.tagger
            .get_or_init(|| {
                info!("Loading entity tagger...");
                (self.loader)()
            })
            .as_ref()
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.tagger.get().is_some()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rule-based tagger
// ────────────────────────────────────────────────────────────────────────────

const EDGE_PUNCT: &[char] = &[
    ',', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\'', '!', '?', '.', '|', '•', '*',
];
const CLAUSE_END: &[char] = &[',', ';', ':', '.', '!', '?', ')', '|'];

const PLACES: &[&str] = &[
    "india", "bangalore", "bengaluru", "mumbai", "delhi", "new delhi", "chennai",
    "hyderabad", "pune", "kolkata", "noida", "gurgaon", "gurugram", "ahmedabad", "kochi",
    "jaipur", "usa", "united states", "united kingdom", "uk", "london", "new york",
    "san francisco", "seattle", "boston", "chicago", "austin", "california", "texas",
    "toronto", "canada", "germany", "berlin", "munich", "france", "paris", "netherlands",
    "amsterdam", "ireland", "dublin", "singapore", "dubai", "uae", "australia", "sydney",
    "melbourne", "japan", "tokyo", "china", "beijing", "shanghai", "brazil", "mexico",
    "spain", "madrid", "italy", "rome",
];

const ORG_SUFFIXES: &[&str] = &[
    "inc", "ltd", "llc", "llp", "corp", "corporation", "company", "co", "technologies",
    "technology", "solutions", "systems", "labs", "limited", "pvt", "group", "bank",
    "university", "institute", "college", "consulting", "services", "software",
    "industries", "enterprises", "foundation", "partners", "holdings", "gmbh",
];

/// Capitalized words that never start or continue a name.
const NON_NAME_WORDS: &[&str] = &[
    "a", "an", "the", "i", "and", "of", "in", "at", "for", "with", "to", "name", "full",
    "email", "e-mail", "phone", "mobile", "contact", "address", "location", "employee",
    "id", "personal", "information", "summary", "profile", "objective", "education",
    "experience", "work", "skills", "skill", "projects", "project", "certifications",
    "certification", "resume", "curriculum", "vitae", "languages", "references", "hobbies",
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "monday", "tuesday", "wednesday", "thursday",
    "friday", "saturday", "sunday", "present", "current", "led", "managed", "developed",
    "built", "designed", "worked", "created", "implemented", "responsible", "senior",
    "junior", "lead", "engineer", "developer", "manager", "intern", "bachelor", "master",
];

pub struct RuleBasedTagger {
    places: HashSet<String>,
    org_suffixes: HashSet<String>,
    non_name_words: HashSet<String>,
}

struct Run<'a> {
    words: Vec<(usize, &'a str)>,
}

impl RuleBasedTagger {
    /// Words of known skill terms are treated as non-name words, so
    /// "Project Management" is never tagged as a person.
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let mut non_name_words: HashSet<String> = lower_set(NON_NAME_WORDS);
        for term in vocabulary.canonical_terms() {
            non_name_words.extend(term.split_whitespace().map(str::to_lowercase));
        }
        non_name_words.extend(vocabulary.synonyms.keys().map(|k| k.to_lowercase()));

        Self {
            places: lower_set(PLACES),
            org_suffixes: lower_set(ORG_SUFFIXES),
            non_name_words,
        }
    }

    fn runs<'a>(&self, text: &'a str) -> Vec<Run<'a>> {
        let mut runs = Vec::new();
        let mut line_start = 0;

        for line in text.split_inclusive('\n') {
            let mut current: Option<Run<'a>> = None;

            for (offset, raw) in words_with_offsets(line) {
                let lead = raw.len() - raw.trim_start_matches(EDGE_PUNCT).len();
                let core = raw.trim_matches(EDGE_PUNCT);
                let lower = core.to_lowercase();

                let joins = !core.is_empty()
                    && !self.non_name_words.contains(&lower)
                    && (is_capitalized(core)
                        || self.places.contains(&lower)
                        || (current.is_some() && self.org_suffixes.contains(&lower)));

                if joins {
                    current
                        .get_or_insert_with(|| Run { words: Vec::new() })
                        .words
                        .push((line_start + offset + lead, core));
                    if raw.ends_with(CLAUSE_END) {
                        runs.extend(current.take());
                    }
                } else {
                    runs.extend(current.take());
                }
            }

            runs.extend(current.take());
            line_start += line.len();
        }
        runs
    }

    fn classify(&self, run: &Run<'_>) -> Option<Entity> {
        let lower: Vec<String> = run.words.iter().map(|(_, w)| w.to_lowercase()).collect();
        let n = lower.len();

        if n >= 2 && lower.last().is_some_and(|w| self.org_suffixes.contains(w)) {
            return Some(self.span(EntityLabel::Org, run, 0, n));
        }

        for i in 0..n {
            for len in (1..=3.min(n - i)).rev() {
                if self.places.contains(&lower[i..i + len].join(" ")) {
                    return Some(self.span(EntityLabel::Gpe, run, i, len));
                }
            }
        }

        if (2..=4).contains(&n) {
            return Some(self.span(EntityLabel::Person, run, 0, n));
        }
        None
    }

    fn span(&self, label: EntityLabel, run: &Run<'_>, from: usize, len: usize) -> Entity {
        let words = &run.words[from..from + len];
        Entity {
            label,
            text: words.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" "),
            start: words[0].0,
        }
    }
}

impl EntityTagger for RuleBasedTagger {
    fn entities(&self, text: &str) -> Vec<Entity> {
        self.runs(text)
            .iter()
            .filter_map(|run| self.classify(run))
            .collect()
    }
}

fn lower_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
        && word.chars().any(char::is_lowercase)
        && word
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, '-' | '\'' | '.'))
}

fn words_with_offsets(line: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                words.push((s, &line[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        words.push((s, &line[s..]));
    }
    words
}
