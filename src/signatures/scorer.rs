//! Request scoring against signatures.
//!
//! # Responsibilities
//! - Define the `Scorer` seam used by the responder
//! - Provide the default weighted rule scorer
//!
//! # Design Decisions
//! - Scores are opaque: callers only compare them and test the sign
//! - A failed required rule zeroes the signature
//! - Signatures without rules never match

use crate::http::RequestContext;
use crate::signatures::model::{Attribute, Condition, Rule, Signature};

/// Evaluates how well a request matches a signature.
pub trait Scorer: Send + Sync + 'static {
    fn score(&self, ctx: &RequestContext, signature: &Signature) -> f64;
}

impl<F> Scorer for F
where
    F: Fn(&RequestContext, &Signature) -> f64 + Send + Sync + 'static,
{
    fn score(&self, ctx: &RequestContext, signature: &Signature) -> f64 {
        self(ctx, signature)
    }
}

/// Sums the scores of matching rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleScorer;

impl Scorer for RuleScorer {
    fn score(&self, ctx: &RequestContext, signature: &Signature) -> f64 {
        let mut total = 0.0;
        for rule in &signature.rules {
            if rule_matches(rule, ctx) {
                total += rule.score;
            } else if rule.required {
                return 0.0;
            }
        }
        total
    }
}

fn rule_matches(rule: &Rule, ctx: &RequestContext) -> bool {
    let actual = match rule.attribute {
        Attribute::Path => Some(ctx.path.as_str()),
        Attribute::Method => Some(ctx.method.as_str()),
        Attribute::UserAgent => ctx.header("User-Agent"),
        Attribute::Header => rule.header.as_deref().and_then(|name| ctx.header(name)),
    };

    match (rule.condition, actual) {
        (Condition::Present, value) => value.is_some(),
        (Condition::Absent, value) => value.is_none(),
        (_, None) => false,
        (Condition::Regex, Some(value)) => rule
            .pattern
            .as_ref()
            .map(|pattern| pattern.is_match(value))
            .unwrap_or(false),
        (condition, Some(value)) => {
            let (value, expected) = if rule.ignore_case {
                (value.to_lowercase(), rule.value.to_lowercase())
            } else {
                (value.to_string(), rule.value.clone())
            };
            match condition {
                Condition::Equals => value == expected,
                Condition::Contains => value.contains(&expected),
                Condition::StartsWith => value.starts_with(&expected),
                Condition::EndsWith => value.ends_with(&expected),
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ctx(method: &str, path: &str, headers: &[(&str, &str)]) -> RequestContext {
        RequestContext {
            method: method.to_string(),
            path: path.to_string(),
            version: "HTTP/1.1".to_string(),
            remote_addr: "10.0.0.5:40000".parse().unwrap(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            body: Vec::new(),
        }
    }

    fn signature(json: &str) -> Signature {
        let mut sig: Signature = serde_json::from_str(json).unwrap();
        sig.compile().unwrap();
        sig
    }

    #[test]
    fn sums_matching_rules() {
        let sig = signature(
            r#"{"id": 1, "responses": [2], "rules": [
                {"attribute": "path", "condition": "starts_with", "value": "/wp-", "score": 2},
                {"attribute": "method", "condition": "equals", "value": "POST", "score": 3},
                {"attribute": "user_agent", "condition": "contains", "value": "curl", "ignore_case": true}
            ]}"#,
        );
        let request = ctx("POST", "/wp-login.php", &[("User-Agent", "CURL/8.0")]);
        assert_eq!(RuleScorer.score(&request, &sig), 6.0);

        let request = ctx("GET", "/wp-login.php", &[]);
        assert_eq!(RuleScorer.score(&request, &sig), 2.0);
    }

    #[test]
    fn failed_required_rule_zeroes_score() {
        let sig = signature(
            r#"{"id": 1, "responses": [2], "rules": [
                {"attribute": "path", "condition": "regex", "value": "\\.php$", "score": 5},
                {"attribute": "header", "header": "X-Forwarded-For", "condition": "present", "required": true}
            ]}"#,
        );
        assert_eq!(RuleScorer.score(&ctx("GET", "/index.php", &[]), &sig), 0.0);
        let forwarded = ctx("GET", "/index.php", &[("X-Forwarded-For", "1.2.3.4")]);
        assert_eq!(RuleScorer.score(&forwarded, &sig), 6.0);
    }

    #[test]
    fn absent_condition_and_empty_rules() {
        let sig = signature(
            r#"{"id": 9, "responses": [2], "rules": [
                {"attribute": "user_agent", "condition": "absent", "score": 4}
            ]}"#,
        );
        assert_eq!(RuleScorer.score(&ctx("GET", "/", &[]), &sig), 4.0);
        assert_eq!(RuleScorer.score(&ctx("GET", "/", &[("User-Agent", "x")]), &sig), 0.0);

        let empty = signature(r#"{"id": 10, "responses": [2]}"#);
        assert_eq!(RuleScorer.score(&ctx("GET", "/", &[]), &empty), 0.0);
    }
}
