//! Signature and response definitions.
//!
//! Both are deserialized from the honeypot data files and never mutated
//! afterwards; a reload builds fresh values.

use std::collections::BTreeMap;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// Identifier of a canned response.
pub type ResponseId = u32;

/// Response sent when no signature scores above zero.
pub const DEFAULT_RESPONSE_ID: ResponseId = 1;

/// A rule set identifying a class of probing requests.
#[derive(Debug, Clone, Deserialize)]
pub struct Signature {
    /// Stable identity reported to telemetry.
    pub id: u64,

    /// Human-readable label for logs.
    #[serde(default)]
    pub name: Option<String>,

    /// Conditions evaluated by the rule scorer.
    #[serde(default)]
    pub rules: Vec<Rule>,

    /// Candidate responses; one is picked at random on a match.
    pub responses: Vec<ResponseId>,
}

impl Signature {
    /// Compile regex conditions. Called once by the loader.
    pub fn compile(&mut self) -> Result<(), regex::Error> {
        for rule in &mut self.rules {
            rule.compile()?;
        }
        Ok(())
    }

    /// Label used in log lines.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", self.id, name),
            None => self.id.to_string(),
        }
    }
}

/// Request attribute inspected by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Path,
    Method,
    UserAgent,
    /// A named header; the name is taken from [`Rule::header`].
    Header,
}

/// Comparison applied to the attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    Present,
    Absent,
}

/// One weighted condition of a signature.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub attribute: Attribute,

    /// Header name for [`Attribute::Header`].
    #[serde(default)]
    pub header: Option<String>,

    pub condition: Condition,

    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub ignore_case: bool,

    /// Added to the signature score when the rule matches.
    #[serde(default = "default_rule_score")]
    pub score: f64,

    /// A failed required rule zeroes the whole signature.
    #[serde(default)]
    pub required: bool,

    #[serde(skip)]
    pub(crate) pattern: Option<Regex>,
}

fn default_rule_score() -> f64 {
    1.0
}

impl Rule {
    fn compile(&mut self) -> Result<(), regex::Error> {
        if self.condition == Condition::Regex {
            let pattern = RegexBuilder::new(&self.value)
                .case_insensitive(self.ignore_case)
                .build()?;
            self.pattern = Some(pattern);
        }
        Ok(())
    }
}

/// A canned HTTP reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Explicit status; derived from the body length when absent.
    #[serde(default)]
    pub status_code: Option<u16>,

    /// Header values may contain template tags.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_body")]
    pub body: String,
}

fn default_body() -> String {
    "Not Found".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_defaults() {
        let sig: Signature = serde_json::from_str(
            r#"{"id": 4, "rules": [{"attribute": "path", "condition": "contains", "value": "wp-login"}], "responses": [2, 3]}"#,
        )
        .unwrap();
        assert_eq!(sig.rules[0].score, 1.0);
        assert!(!sig.rules[0].required);
        assert_eq!(sig.responses, vec![2, 3]);
        assert_eq!(sig.label(), "4");
    }

    #[test]
    fn invalid_regex_fails_compile() {
        let mut sig: Signature = serde_json::from_str(
            r#"{"id": 1, "name": "broken", "rules": [{"attribute": "path", "condition": "regex", "value": "(unclosed"}], "responses": [1]}"#,
        )
        .unwrap();
        assert!(sig.compile().is_err());
        assert_eq!(sig.label(), "1 (broken)");
    }

    #[test]
    fn response_body_defaults_to_not_found() {
        let response: Response = serde_json::from_str(r#"{"headers": {"Server": "nginx"}}"#).unwrap();
        assert_eq!(response.body, "Not Found");
        assert_eq!(response.status_code, None);
        assert_eq!(response.headers["Server"], "nginx");
    }
}
