use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::nlp::{EntityLabel, NlpService};
use crate::analysis::truncate_chars;

/// Characters handed to the entity tagger for the fallback pass.
pub const NLP_TEXT_LIMIT: usize = 100_000;

/// At most one value per field. Unset fields are left out of the JSON.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PersonalInfo {
    #[serde(rename = "Full Name", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(rename = "Employee ID", skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(rename = "Email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "Phone Number", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(rename = "Location", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "Organization", skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl PersonalInfo {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.populated() == 0
    }

    pub fn populated(&self) -> usize {
        [
            &self.full_name,
            &self.employee_id,
            &self.email,
            &self.phone_number,
            &self.location,
            &self.organization,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineField {
    FullName,
    EmployeeId,
    Email,
    Phone,
    Location,
}

impl LineField {
    /// One candidate per line; earlier triggers win.
    fn for_line(lower: &str) -> Option<Self> {
        if lower.contains("full name") {
            Some(Self::FullName)
        } else if lower.contains("employee id") || lower.contains(" id") {
            Some(Self::EmployeeId)
        } else if lower.contains("email") {
            Some(Self::Email)
        } else if lower.contains("phone") {
            Some(Self::Phone)
        } else if lower.contains("location") {
            Some(Self::Location)
        } else {
            None
        }
    }

    fn slot(self, info: &mut PersonalInfo) -> &mut Option<String> {
        match self {
            Self::FullName => &mut info.full_name,
            Self::EmployeeId => &mut info.employee_id,
            Self::Email => &mut info.email,
            Self::Phone => &mut info.phone_number,
            Self::Location => &mut info.location,
        }
    }
}

/// Line-by-line keyword/pattern pass, then one entity-tagger pass for
/// whatever is still missing.
pub struct PersonalInfoExtractor {
    full_name: Regex,
    employee_id: Regex,
    email: Regex,
    phone: Regex,
    location: Regex,
}

impl PersonalInfoExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            full_name: Regex::new(r"(?i)Full Name[:\s]*(.+)")?,
            employee_id: Regex::new(r"(?i)(Employee ID|ID)[:\s]*(.+)")?,
            email: Regex::new(r"[\w.-]+@[\w.-]+")?,
            phone: Regex::new(r"\+?\d[\d\s-]{8,}\d")?,
            location: Regex::new(r"(?i)Location[:\s]*(.+)")?,
        })
    }

    pub fn extract(&self, text: &str, nlp: &NlpService) -> PersonalInfo {
        let mut info = PersonalInfo::default();

        for line in text.split('\n') {
            let Some(field) = LineField::for_line(&line.to_lowercase()) else {
                continue;
            };
            let slot = field.slot(&mut info);
            if slot.is_some() {
                continue;
            }
            if let Some(value) = self.capture(field, line) {
                debug!(?field, "Personal info matched by pattern");
                *slot = Some(value);
            }
        }

        self.apply_entities(&mut info, text, nlp);
        info!(fields = info.populated(), "Extracted personal info");
        info
    }

    fn capture(&self, field: LineField, line: &str) -> Option<String> {
        let matched = match field {
            LineField::FullName => self.full_name.captures(line).and_then(|c| c.get(1)),
            LineField::EmployeeId => self.employee_id.captures(line).and_then(|c| c.get(2)),
            LineField::Email => self.email.find(line),
            LineField::Phone => self.phone.find(line),
            LineField::Location => self.location.captures(line).and_then(|c| c.get(1)),
        }?;
        let value = matched.as_str().trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn apply_entities(&self, info: &mut PersonalInfo, text: &str, nlp: &NlpService) {
        debug!("Applying NLP fallback for personal info");
        let entities = nlp.tagger().entities(truncate_chars(text, NLP_TEXT_LIMIT));

        let first = |label: EntityLabel| {
            entities
                .iter()
                .find(|e| e.label == label)
                .map(|e| e.text.clone())
        };

        if info.full_name.is_none() {
            info.full_name = first(EntityLabel::Person);
        }
        if info.location.is_none() {
            info.location = first(EntityLabel::Gpe);
        }
        if info.organization.is_none() {
            info.organization = first(EntityLabel::Org);
        }
    }
}
