//! Per-rule validation.
//!
//! Checks run in a fixed order and a dropped rule stops reporting as soon
//! as it is dropped: type, unknown fields, type-specific fields, bounds,
//! nice value, destination, priority tiers, users.

use jobroute_core::{
    Bound, Condition, Destinations, FAIL_DESTINATION, Outcome, Range, Rule, RuleKind, Tier,
    parse_size_value, units::INFINITY,
};
use serde_json::{Map, Value};

use crate::validator::{Validator, display, non_blank, tier_suffix};

const NICE_RANGE: std::ops::RangeInclusive<i64> = -20..=20;

const RULE_FIELDS: [&str; 8] = [
    "rule_type",
    "lower_bound",
    "upper_bound",
    "arguments",
    "nice_value",
    "destination",
    "fail_message",
    "users",
];

impl Validator<'_> {
    /// Validate rule number `n` (1-based) of `tool`. `None` drops it.
    pub(crate) fn rule(&mut self, tool: &str, n: usize, raw: &Value) -> Option<Rule> {
        let Value::Object(fields) = raw else {
            self.report(
                format!("Malformed rule {n} in '{tool}'; expected a mapping!"),
                Some("Ignoring rule."),
            );
            return None;
        };

        let kind = match fields.get("rule_type") {
            None | Some(Value::Null) => {
                self.report(format!("No rule_type found for rule {n} in '{tool}'."), None);
                return None;
            }
            Some(value) => match value.as_str().and_then(RuleKind::parse) {
                Some(kind) => kind,
                None => {
                    self.report(
                        format!(
                            "Unrecognized rule_type '{}' found in '{tool}'.",
                            display(value)
                        ),
                        Some("Ignoring..."),
                    );
                    return None;
                }
            },
        };

        for key in fields.keys() {
            if !RULE_FIELDS.contains(&key.as_str()) && tier_suffix(key, "destination").is_none() {
                self.report(
                    format!("Unrecognized field '{key}' in rule {n} for '{tool}'."),
                    Some("Ignoring..."),
                );
            }
        }

        for key in foreign_fields(kind) {
            if fields.contains_key(*key) {
                self.report(
                    format!(
                        "Field '{key}' does not apply to {} rule {n} in '{tool}'.",
                        kind.as_str()
                    ),
                    Some("Ignoring..."),
                );
            }
        }

        let condition = self.condition(kind, fields, tool, n)?;
        let nice_value = self.nice_value(fields, tool, n);
        let outcome = self.outcome(fields, tool, n);
        let users = match fields.get("users") {
            Some(raw_users) => Some(self.rule_users(raw_users, tool, n)?),
            None => None,
        };

        Some(Rule {
            condition,
            nice_value,
            outcome,
            users,
        })
    }

    fn condition(
        &mut self,
        kind: RuleKind,
        fields: &Map<String, Value>,
        tool: &str,
        n: usize,
    ) -> Option<Condition> {
        if kind == RuleKind::Arguments {
            return match fields.get("arguments") {
                Some(Value::Object(args)) if !args.is_empty() => {
                    Some(Condition::Arguments(args.clone()))
                }
                _ => {
                    self.report(
                        format!(
                            "No arguments found for rule {n} in '{tool}' despite being of type arguments."
                        ),
                        Some("Ignoring rule."),
                    );
                    None
                }
            };
        }

        let range = self.range(kind, fields, tool, n)?;
        Some(match kind {
            RuleKind::FileSize => Condition::FileSize(range),
            RuleKind::Records => Condition::Records(range),
            _ => Condition::NumInputDatasets(range),
        })
    }

    fn range(
        &mut self,
        kind: RuleKind,
        fields: &Map<String, Value>,
        tool: &str,
        n: usize,
    ) -> Option<Range> {
        let present = |key: &str| fields.get(key).filter(|v| !v.is_null());
        let (Some(raw_lower), Some(raw_upper)) = (present("lower_bound"), present("upper_bound"))
        else {
            self.report(
                format!("Missing bounds for rule {n} in '{tool}'."),
                Some("Ignoring rule."),
            );
            return None;
        };

        let (Some(mut lower), Some(mut upper)) = (parse_bound(raw_lower), parse_bound(raw_upper))
        else {
            self.report(
                format!("Malformed bounds for rule {n} in '{tool}'."),
                Some("Ignoring rule."),
            );
            return None;
        };

        if kind == RuleKind::NumInputDatasets && lower.is_unbounded() {
            self.report(
                "Error: lower_bound is set to Infinity, but must be lower than upper_bound!",
                Some("Setting lower_bound to 0!"),
            );
            if self.repairs() {
                lower = Bound::Finite(0);
            }
        }

        if lower > upper {
            self.report(
                format!("lower_bound exceeds upper_bound for rule {n} in '{tool}'."),
                Some("Reversing bounds."),
            );
            std::mem::swap(&mut lower, &mut upper);
        }

        Some(Range::new(lower, upper))
    }

    fn nice_value(&mut self, fields: &Map<String, Value>, tool: &str, n: usize) -> i32 {
        match fields.get("nice_value") {
            None | Some(Value::Null) => {
                self.report(
                    format!("No nice_value found for rule {n} in '{tool}'."),
                    Some("Setting nice_value to 0."),
                );
                0
            }
            Some(value) => match value.as_i64().filter(|v| NICE_RANGE.contains(v)) {
                Some(nice) => nice as i32,
                None => {
                    self.report(
                        format!(
                            "nice_value goes from -20 to 20; rule {n} in '{tool}' has a nice_value of '{}'.",
                            display(value)
                        ),
                        Some("Setting nice_value to 0."),
                    );
                    0
                }
            },
        }
    }

    fn outcome(&mut self, fields: &Map<String, Value>, tool: &str, n: usize) -> Outcome {
        let destination = non_blank(fields.get("destination"));
        let fail_message = non_blank(fields.get("fail_message"));
        let is_fail = destination.as_deref() == Some(FAIL_DESTINATION);

        if is_fail || fail_message.is_some() {
            self.unused_tiers(fields, tool, n);
        }

        match (is_fail, fail_message) {
            (false, Some(message)) => {
                self.report(
                    format!(
                        "Found a fail_message for rule {n} in '{tool}', but destination is not 'fail'!"
                    ),
                    Some("Setting destination to 'fail'."),
                );
                Outcome::Fail { message }
            }
            (true, None) => {
                self.report(
                    format!("Missing a fail_message for rule {n} in '{tool}'."),
                    Some("Adding generic fail_message."),
                );
                Outcome::Fail {
                    message: format!("Invalid parameters for rule {n} in '{tool}'."),
                }
            }
            (true, Some(message)) => Outcome::Fail { message },
            (false, None) => {
                let destinations = Destinations {
                    plain: destination,
                    ..self.rule_tiers(fields, tool, n)
                };
                if destinations.is_empty() {
                    self.report(
                        format!("No destination specified for rule {n} in '{tool}'."),
                        Some("Ignoring..."),
                    );
                    Outcome::Unset
                } else {
                    Outcome::Route(destinations)
                }
            }
        }
    }

    /// A failing rule never routes, so its tier destinations are dropped.
    fn unused_tiers(&mut self, fields: &Map<String, Value>, tool: &str, n: usize) {
        for key in fields.keys() {
            if tier_suffix(key, "destination").is_some() {
                self.report(
                    format!("Priority destination '{key}' for failing rule {n} in '{tool}' is unused."),
                    Some("Ignoring..."),
                );
            }
        }
    }

    /// Collect `destination_<tier>` overrides. Unknown tiers are dropped;
    /// a set without `med` is dropped whole.
    fn rule_tiers(&mut self, fields: &Map<String, Value>, tool: &str, n: usize) -> Destinations {
        let mut tiers = Destinations::default();
        for (key, value) in fields {
            let Some(token) = tier_suffix(key, "destination") else {
                continue;
            };
            match Tier::parse(token) {
                Some(tier) => tiers.set_tier(tier, non_blank(Some(value))),
                None => self.report(
                    format!("Invalid priority destination '{token}' for rule {n} in '{tool}'."),
                    Some("Ignoring..."),
                ),
            }
        }

        if tiers.has_tiers() && tiers.med.is_none() {
            self.report(
                format!("No 'med' priority destination for rule {n} in '{tool}'."),
                Some("Ignoring..."),
            );
            tiers.clear_tiers();
        }
        tiers
    }
}

/// Known rule fields that belong to other rule types.
fn foreign_fields(kind: RuleKind) -> &'static [&'static str] {
    match kind {
        RuleKind::Arguments => &["lower_bound", "upper_bound"],
        _ => &["arguments"],
    }
}

/// `"Infinity"` (any case) and negative sizes are unbounded.
fn parse_bound(value: &Value) -> Option<Bound> {
    if value
        .as_str()
        .is_some_and(|s| s.trim().eq_ignore_ascii_case(INFINITY))
    {
        return Some(Bound::Unbounded);
    }
    if let Some(f) = value.as_f64().filter(|_| !value.is_i64() && !value.is_u64()) {
        // Floats only make sense as whole numbers of bytes/records.
        return (f.fract() == 0.0).then(|| Bound::from_bytes(f as i128));
    }
    parse_size_value(value).ok().map(Bound::from_bytes)
}
