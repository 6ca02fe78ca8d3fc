//! Column mapping inference
//!
//! Each role has a priority-ordered rule list. For the highest-priority rule
//! that any header satisfies, the first such header (in file order) wins the
//! role. Roles are resolved independently, so one header may win two roles;
//! the user corrects that in the mapping step.

use crate::models::{ColumnMapping, MappingRole};
use serde::Serialize;

/// How a rule compares against a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    /// Header, with separators removed, contains the pattern
    Contains,
    /// One of the header's words equals the pattern
    Word,
}

#[derive(Debug, Clone, Copy)]
struct MatchRule {
    pattern: &'static str,
    kind: RuleKind,
}

const fn contains(pattern: &'static str) -> MatchRule {
    MatchRule {
        pattern,
        kind: RuleKind::Contains,
    }
}

const fn word(pattern: &'static str) -> MatchRule {
    MatchRule {
        pattern,
        kind: RuleKind::Word,
    }
}

// Short abbreviations are word rules: "lname" must not fire inside "fullname".
// Separators are dropped before `contains`, so "email" also covers "E-Mail"
// and "Email Address".
const EMAIL_RULES: &[MatchRule] = &[contains("email"), word("mail")];

const FIRST_NAME_RULES: &[MatchRule] = &[
    contains("first name"),
    contains("given name"),
    contains("forename"),
    word("fname"),
];

const LAST_NAME_RULES: &[MatchRule] = &[
    contains("last name"),
    contains("surname"),
    contains("family name"),
    word("lname"),
];

fn rules_for(role: MappingRole) -> &'static [MatchRule] {
    match role {
        MappingRole::Email => EMAIL_RULES,
        MappingRole::FirstName => FIRST_NAME_RULES,
        MappingRole::LastName => LAST_NAME_RULES,
    }
}

/// Lowercased words of a header, split on anything non-alphanumeric
fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn compact(s: &str) -> String {
    words(s).concat()
}

impl MatchRule {
    fn matches(&self, header_words: &[String], header_compact: &str) -> bool {
        match self.kind {
            RuleKind::Contains => {
                let pattern = compact(self.pattern);
                !pattern.is_empty() && header_compact.contains(&pattern)
            }
            RuleKind::Word => header_words.iter().any(|w| w == self.pattern),
        }
    }
}

/// A role's winning header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleMatch {
    pub role: MappingRole,
    pub column: String,
    /// Position of the header in the file
    pub column_index: usize,
    /// Index of the rule that matched; 0 is the strongest
    pub rule_priority: usize,
}

/// Inference result with per-role match details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InferenceReport {
    pub matches: Vec<RoleMatch>,
}

impl InferenceReport {
    pub fn get(&self, role: MappingRole) -> Option<&RoleMatch> {
        self.matches.iter().find(|m| m.role == role)
    }

    pub fn mapping(&self) -> ColumnMapping {
        let mut mapping = ColumnMapping::default();
        for m in &self.matches {
            mapping.set(m.role, Some(m.column.clone()));
        }
        mapping
    }

    /// Headers that won more than one role
    pub fn collisions(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        let mut collisions: Vec<&str> = Vec::new();
        for m in &self.matches {
            if seen.contains(&m.column.as_str()) {
                if !collisions.contains(&m.column.as_str()) {
                    collisions.push(&m.column);
                }
            } else {
                seen.push(&m.column);
            }
        }
        collisions
    }
}

/// Resolve one role against the headers
fn infer_role(
    role: MappingRole,
    headers: &[(Vec<String>, String)],
    names: &[String],
) -> Option<RoleMatch> {
    for (rule_priority, rule) in rules_for(role).iter().enumerate() {
        let hit = headers
            .iter()
            .position(|(header_words, header_compact)| rule.matches(header_words, header_compact));
        if let Some(column_index) = hit {
            return Some(RoleMatch {
                role,
                column: names[column_index].clone(),
                column_index,
                rule_priority,
            });
        }
    }
    None
}

/// Infer a mapping with match details
pub fn infer_detailed(headers: &[String]) -> InferenceReport {
    let prepared: Vec<(Vec<String>, String)> = headers
        .iter()
        .map(|h| {
            let w = words(h);
            let c = w.concat();
            (w, c)
        })
        .collect();

    let matches: Vec<RoleMatch> = MappingRole::ALL
        .into_iter()
        .filter_map(|role| infer_role(role, &prepared, headers))
        .collect();

    tracing::debug!(
        headers = headers.len(),
        matched = matches.len(),
        "Inferred column mapping"
    );

    InferenceReport { matches }
}

/// Best-effort mapping from headers; unmatched roles are left unset
pub fn infer(headers: &[String]) -> ColumnMapping {
    infer_detailed(headers).mapping()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_standard_headers() {
        let mapping = infer(&headers(&["email", "first_name", "last_name", "company"]));
        assert_eq!(mapping.email.as_deref(), Some("email"));
        assert_eq!(mapping.first_name.as_deref(), Some("first_name"));
        assert_eq!(mapping.last_name.as_deref(), Some("last_name"));
    }

    #[test]
    fn test_case_and_punctuation_variants() {
        let mapping = infer(&headers(&["E-Mail", "FirstName", "Last Name"]));
        assert_eq!(mapping.email.as_deref(), Some("E-Mail"));
        assert_eq!(mapping.first_name.as_deref(), Some("FirstName"));
        assert_eq!(mapping.last_name.as_deref(), Some("Last Name"));
    }

    #[test]
    fn test_first_header_wins_within_rule() {
        let mapping = infer(&headers(&["id", "Work Email", "Personal Email"]));
        assert_eq!(mapping.email.as_deref(), Some("Work Email"));
    }

    #[test]
    fn test_higher_priority_rule_beats_earlier_header() {
        // "Mail" only satisfies the word rule; "Contact Email" the top rule
        let report = infer_detailed(&headers(&["Mail", "Contact Email"]));
        let m = report.get(MappingRole::Email).unwrap();
        assert_eq!(m.column, "Contact Email");
        assert_eq!(m.rule_priority, 0);
    }

    #[test]
    fn test_word_rule_fallback() {
        let report = infer_detailed(&headers(&["name", "mail", "fname", "lname"]));
        assert_eq!(report.get(MappingRole::Email).unwrap().rule_priority, 1);
        assert_eq!(report.mapping().first_name.as_deref(), Some("fname"));
        assert_eq!(report.mapping().last_name.as_deref(), Some("lname"));
    }

    #[test]
    fn test_every_rule_can_win() {
        for role in MappingRole::ALL {
            for (priority, rule) in rules_for(role).iter().enumerate() {
                let report = infer_detailed(&headers(&[rule.pattern]));
                let m = report.get(role).unwrap();
                assert_eq!(m.rule_priority, priority, "{:?} rule '{}'", role, rule.pattern);
            }
        }
    }

    #[test]
    fn test_abbreviation_does_not_match_inside_words() {
        let mapping = infer(&headers(&["fullname", "mailbox_size"]));
        assert_eq!(mapping.last_name, None);
        assert_eq!(mapping.email, None);
    }

    #[test]
    fn test_no_match_leaves_roles_unset() {
        let mapping = infer(&headers(&["id", "company", "phone"]));
        assert_eq!(mapping, ColumnMapping::default());
    }

    #[test]
    fn test_collisions_are_kept() {
        let report = infer_detailed(&headers(&["first name email"]));
        assert_eq!(report.mapping().email.as_deref(), Some("first name email"));
        assert_eq!(report.mapping().first_name.as_deref(), Some("first name email"));
        assert_eq!(report.collisions(), vec!["first name email"]);
    }

    #[test]
    fn test_surname_and_given_name() {
        let mapping = infer(&headers(&["Given Name", "Surname", "Email Address"]));
        assert_eq!(mapping.first_name.as_deref(), Some("Given Name"));
        assert_eq!(mapping.last_name.as_deref(), Some("Surname"));
        assert_eq!(mapping.email.as_deref(), Some("Email Address"));
    }

    #[test]
    fn test_empty_headers() {
        assert_eq!(infer(&[]), ColumnMapping::default());
    }
}
