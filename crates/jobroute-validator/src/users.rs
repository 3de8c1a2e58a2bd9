//! Requester lists: per-rule `users:` restrictions and the root `users:`
//! section that assigns requesters their default tier.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use jobroute_core::{Tier, UserEntry};
use regex::Regex;
use serde_json::Value;

use crate::validator::{Validator, display};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

pub(crate) fn is_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

fn invalid_priority(email: &str) -> String {
    format!("User '{email}', priority is not valid! Must be either low, med, or high.")
}

impl Validator<'_> {
    /// Validate a rule's `users:` list. `None` drops the rule.
    pub(crate) fn rule_users(&mut self, raw: &Value, tool: &str, n: usize) -> Option<Vec<UserEntry>> {
        let Value::Array(entries) = raw else {
            self.report("Couldn't find a list under 'users:'!", Some("Ignoring rule."));
            return None;
        };

        let mut users = Vec::with_capacity(entries.len());
        for entry in entries {
            let (email, priority) = match entry {
                Value::String(email) => (email.as_str(), None),
                Value::Object(fields) => match fields.get("email").and_then(Value::as_str) {
                    Some(email) => (email, fields.get("priority").filter(|p| !p.is_null())),
                    None => {
                        self.report(
                            format!(
                                "Entry '{}' in users for rule {n} in tool '{tool}' is in an invalid format!",
                                display(entry)
                            ),
                            Some("Ignoring entry."),
                        );
                        continue;
                    }
                },
                other => {
                    self.report(
                        format!(
                            "Entry '{}' in users for rule {n} in tool '{tool}' is in an invalid format!",
                            display(other)
                        ),
                        Some("Ignoring entry."),
                    );
                    continue;
                }
            };

            if !is_email(email) {
                self.report(
                    format!(
                        "Supplied email '{email}' for rule {n} in tool '{tool}' is in an invalid format!"
                    ),
                    Some("Ignoring email."),
                );
                continue;
            }

            let priority = match priority {
                None => None,
                Some(value) => match value.as_str().and_then(Tier::parse) {
                    Some(tier) => Some(tier),
                    None => {
                        self.report(invalid_priority(email), None);
                        continue;
                    }
                },
            };

            users.push(UserEntry {
                email: email.to_string(),
                priority,
            });
        }

        if users.is_empty() {
            self.report(
                format!("No valid user emails were specified for rule {n} in tool '{tool}'!"),
                Some("Ignoring rule."),
            );
            return None;
        }
        Some(users)
    }

    /// Validate the root `users:` section: `email: {priority: <tier>}` or
    /// `email: <tier>`.
    pub(crate) fn requesters(&mut self, section: &Value) -> BTreeMap<String, Tier> {
        let mut requesters = BTreeMap::new();
        let entries = match section {
            Value::Object(entries) => entries,
            Value::Null => return requesters,
            _ => {
                self.report("Malformed YML; expected user emails under 'users:'!", None);
                return requesters;
            }
        };

        for (email, entry) in entries {
            if !is_email(email) {
                self.report(
                    format!("Supplied email '{email}' in 'users:' is in an invalid format!"),
                    Some("Ignoring email."),
                );
                continue;
            }

            let token = match entry {
                Value::String(token) => Some(token.as_str()),
                Value::Object(fields) => fields.get("priority").and_then(Value::as_str),
                _ => None,
            };
            match token.and_then(Tier::parse) {
                Some(tier) => {
                    requesters.insert(email.clone(), tier);
                }
                None => self.report(invalid_priority(email), None),
            }
        }
        requesters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_email("user@email.com"));
        assert!(is_email("first.last@sub.example.org"));
        assert!(!is_email("userATemail.com"));
        assert!(!is_email("user@email"));
        assert!(!is_email("us er@email.com"));
        assert!(!is_email("a@b@c.com"));
    }
}
