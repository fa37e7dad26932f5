//! Label-heuristic field matching
//!
//! Typing tools receive a human label ("password", "search box") rather than
//! a selector. Every input-like element on the page is scraped into a
//! transient [`FieldDescriptor`] and scored by case-insensitive substring
//! containment, with an ordered list of pluggable [`LabelMatcher`]s breaking
//! ties. This is a heuristic: false positives are an accepted tradeoff for
//! not requiring callers to know exact selectors.

use serde::{Deserialize, Serialize};

/// Attributes scraped from one input-like element on the live page.
///
/// Derived per call and never cached across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Position among `input, textarea, select` in document order
    pub index: usize,
    /// Lowercased tag name
    pub tag: String,
    /// Lowercased `type` attribute ("" when absent, which means text)
    #[serde(default)]
    pub input_type: String,
    /// `placeholder` attribute
    #[serde(default)]
    pub placeholder: String,
    /// `name` attribute
    #[serde(default)]
    pub name: String,
    /// `id` attribute
    #[serde(default)]
    pub id: String,
    /// `aria-label` attribute
    #[serde(default)]
    pub aria_label: String,
    /// Associated `<label>` text (for= association or enclosing label)
    #[serde(default)]
    pub label: String,
}

impl FieldDescriptor {
    /// True when any scraped attribute and the needle contain each other in
    /// either direction (case-insensitive). A label like "password" must
    /// still find a field whose name is just "pass".
    pub fn contains(&self, needle_lower: &str) -> bool {
        [
            &self.placeholder,
            &self.name,
            &self.id,
            &self.aria_label,
            &self.label,
        ]
        .iter()
        .any(|attr| {
            let attr = attr.to_lowercase();
            !attr.is_empty() && (attr.contains(needle_lower) || needle_lower.contains(&attr))
        })
    }

    /// Short human-readable identity for outcome messages
    pub fn describe(&self) -> String {
        for attr in [&self.name, &self.id, &self.placeholder, &self.label] {
            if !attr.is_empty() {
                return attr.clone();
            }
        }
        format!("{} #{}", self.tag, self.index)
    }
}

/// Script enumerating every input-like element into descriptor JSON.
///
/// Uses the same `input, textarea, select` order as
/// [`crate::resolve::INPUT_LIKE_SELECTOR`] so indices line up.
pub(crate) const ENUMERATE_FIELDS_SCRIPT: &str = r#"
(() => {
    const fields = [];
    const nodes = document.querySelectorAll('input, textarea, select');
    nodes.forEach((el, index) => {
        let label = '';
        if (el.id) {
            const assoc = document.querySelector('label[for="' + el.id + '"]');
            if (assoc) label = assoc.innerText || '';
        }
        if (!label) {
            const enclosing = el.closest('label');
            if (enclosing) label = enclosing.innerText || '';
        }
        fields.push({
            index: index,
            tag: el.tagName.toLowerCase(),
            input_type: (el.getAttribute('type') || '').toLowerCase(),
            placeholder: el.getAttribute('placeholder') || '',
            name: el.getAttribute('name') || '',
            id: el.id || '',
            aria_label: el.getAttribute('aria-label') || '',
            label: label.trim(),
        });
    });
    return JSON.stringify(fields);
})()
"#;

/// One tie-break heuristic over containment-matching candidates.
///
/// Matchers run in order; the first one to pick a candidate wins. New
/// heuristics slot in without touching the click/type call sites.
pub trait LabelMatcher: Send + Sync {
    /// Matcher name, for logs
    fn name(&self) -> &'static str;

    /// Pick a candidate, or pass to the next matcher
    fn select<'a>(
        &self,
        label_lower: &str,
        matching: &[&'a FieldDescriptor],
    ) -> Option<&'a FieldDescriptor>;
}

/// Labels mentioning "password" prefer a `password`-typed input
pub struct PasswordTypePreference;

impl LabelMatcher for PasswordTypePreference {
    fn name(&self) -> &'static str {
        "password-type-preference"
    }

    fn select<'a>(
        &self,
        label_lower: &str,
        matching: &[&'a FieldDescriptor],
    ) -> Option<&'a FieldDescriptor> {
        if !label_lower.contains("password") {
            return None;
        }
        matching
            .iter()
            .find(|d| d.input_type == "password")
            .copied()
    }
}

/// Labels mentioning "user"/"login"/"id"/"email" prefer text or email inputs
pub struct IdentityTypePreference;

impl LabelMatcher for IdentityTypePreference {
    fn name(&self) -> &'static str {
        "identity-type-preference"
    }

    fn select<'a>(
        &self,
        label_lower: &str,
        matching: &[&'a FieldDescriptor],
    ) -> Option<&'a FieldDescriptor> {
        const IDENTITY_WORDS: [&str; 4] = ["user", "login", "id", "email"];
        if !IDENTITY_WORDS.iter().any(|w| label_lower.contains(w)) {
            return None;
        }
        // An input without a type attribute is a text input.
        matching
            .iter()
            .find(|d| matches!(d.input_type.as_str(), "text" | "email" | ""))
            .copied()
    }
}

/// First containment match in document order
pub struct FirstContainment;

impl LabelMatcher for FirstContainment {
    fn name(&self) -> &'static str {
        "first-containment"
    }

    fn select<'a>(
        &self,
        _label_lower: &str,
        matching: &[&'a FieldDescriptor],
    ) -> Option<&'a FieldDescriptor> {
        matching.first().copied()
    }
}

/// The built-in matcher chain, in priority order
pub fn default_matchers() -> Vec<Box<dyn LabelMatcher>> {
    vec![
        Box::new(PasswordTypePreference),
        Box::new(IdentityTypePreference),
        Box::new(FirstContainment),
    ]
}

/// Run the matcher chain over the scraped candidates.
///
/// Candidates are filtered to containment matches first; matchers only break
/// ties among those.
pub fn select_field<'a>(
    label_text: &str,
    candidates: &'a [FieldDescriptor],
    matchers: &[Box<dyn LabelMatcher>],
) -> Option<&'a FieldDescriptor> {
    let label_lower = label_text.to_lowercase();
    let matching: Vec<&FieldDescriptor> = candidates
        .iter()
        .filter(|d| d.contains(&label_lower))
        .collect();

    if matching.is_empty() {
        return None;
    }

    matchers
        .iter()
        .find_map(|m| m.select(&label_lower, &matching))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(index: usize, input_type: &str, name: &str) -> FieldDescriptor {
        FieldDescriptor {
            index,
            tag: "input".to_string(),
            input_type: input_type.to_string(),
            placeholder: String::new(),
            name: name.to_string(),
            id: String::new(),
            aria_label: String::new(),
            label: String::new(),
        }
    }

    #[test]
    fn test_password_label_prefers_password_type() {
        // Both inputs carry "pass"-ish names; the password-typed one must
        // win regardless of document order.
        let candidates = vec![field(0, "text", "passcode"), field(1, "password", "pass")];
        let matchers = default_matchers();
        let selected = select_field("password", &candidates, &matchers).unwrap();
        assert_eq!(selected.index, 1);
        assert_eq!(selected.input_type, "password");
    }

    #[test]
    fn test_short_attribute_matches_longer_label() {
        // The attribute is shorter than the requested label; containment
        // must hold in both directions.
        let candidates = vec![field(0, "password", "pass")];
        let matchers = default_matchers();
        let selected = select_field("password", &candidates, &matchers).unwrap();
        assert_eq!(selected.index, 0);
    }

    #[test]
    fn test_password_type_breaks_tie_among_equal_names() {
        // Both fields match the label equally; the type preference decides.
        let candidates = vec![field(0, "text", "pass"), field(1, "password", "pass")];
        let matchers = default_matchers();
        let selected = select_field("password", &candidates, &matchers).unwrap();
        assert_eq!(selected.index, 1);
    }

    #[test]
    fn test_identity_label_prefers_text_or_email() {
        let candidates = vec![
            field(0, "hidden", "user_token"),
            field(1, "email", "user_email"),
        ];
        let matchers = default_matchers();
        let selected = select_field("user", &candidates, &matchers).unwrap();
        assert_eq!(selected.index, 1);
    }

    #[test]
    fn test_untyped_input_counts_as_text() {
        let candidates = vec![field(0, "", "login")];
        let matchers = default_matchers();
        let selected = select_field("login", &candidates, &matchers).unwrap();
        assert_eq!(selected.index, 0);
    }

    #[test]
    fn test_plain_label_takes_first_in_document_order() {
        let candidates = vec![
            field(0, "text", "search_query"),
            field(1, "text", "search_filter"),
        ];
        let matchers = default_matchers();
        let selected = select_field("search", &candidates, &matchers).unwrap();
        assert_eq!(selected.index, 0);
    }

    #[test]
    fn test_containment_is_case_insensitive() {
        let mut d = field(0, "text", "");
        d.placeholder = "Your Email Address".to_string();
        let candidates = vec![d];
        let matchers = default_matchers();
        assert!(select_field("email", &candidates, &matchers).is_some());
    }

    #[test]
    fn test_label_attribute_matches() {
        let mut d = field(3, "text", "q");
        d.label = "Search the catalog".to_string();
        let candidates = vec![d];
        let matchers = default_matchers();
        let selected = select_field("catalog", &candidates, &matchers).unwrap();
        assert_eq!(selected.index, 3);
    }

    #[test]
    fn test_no_match_returns_none() {
        let candidates = vec![field(0, "text", "city")];
        let matchers = default_matchers();
        assert!(select_field("zipcode", &candidates, &matchers).is_none());
    }

    #[test]
    fn test_password_matcher_passes_without_keyword() {
        let matcher = PasswordTypePreference;
        let d = field(0, "password", "pass");
        let matching = vec![&d];
        assert!(matcher.select("search", &matching).is_none());
    }

    #[test]
    fn test_describe_falls_back_to_tag_and_index() {
        let d = field(7, "text", "");
        assert_eq!(d.describe(), "input #7");
        let named = field(0, "text", "city");
        assert_eq!(named.describe(), "city");
    }
}
