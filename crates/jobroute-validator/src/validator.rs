//! Root-level validation: categories, global defaults, tool entries.

use std::collections::BTreeMap;

use jobroute_core::{
    Diagnostic, DiagnosticSink, Destinations, RouteConfig, Tier, ToolEntry, Trail,
};
use serde_json::{Map, Value};

use crate::{Mode, ValidationReport};

/// Emitted (regardless of `verbose`) when the document root is not a mapping.
pub const MALFORMED_ROOT: &str = "Malformed config; expected a mapping at the top level!";

const DEFAULT_KEY: &str = "default_destination";

pub(crate) fn run(document: &Value, mode: Mode, sink: &mut dyn DiagnosticSink) -> ValidationReport {
    let root = match document {
        Value::Null => {
            return ValidationReport {
                config: RouteConfig::default(),
                corrections: 0,
            };
        }
        Value::Object(root) => root,
        _ => {
            // The verbose flag lives inside the mapping we don't have.
            sink.emit(Diagnostic::debug(MALFORMED_ROOT));
            return ValidationReport {
                config: RouteConfig::default(),
                corrections: 1,
            };
        }
    };

    let verbose = root.get("verbose").and_then(Value::as_bool).unwrap_or(false);
    let mut validator = Validator::new(sink, verbose, mode);
    validator.announce("Running config validation...");

    let mut config = RouteConfig {
        default_destination: validator.global_defaults(root),
        verbose,
        ..RouteConfig::default()
    };

    for (key, value) in root {
        match key.as_str() {
            "tools" => config.tools = validator.tools(value),
            "users" => config.users = validator.requesters(value),
            "verbose" | DEFAULT_KEY => {}
            key if tier_suffix(key, DEFAULT_KEY).is_some() => {}
            other => validator.report(
                format!("Unrecognized category '{other}' found in config file!"),
                None,
            ),
        }
    }

    validator.announce("Finished config validation.");

    let corrections = validator.corrections;
    tracing::trace!(
        tools = config.tools.len(),
        corrections,
        "config validation pass complete"
    );
    ValidationReport { config, corrections }
}

/// Returns the part after `<prefix>_`, if `key` has that shape.
pub(crate) fn tier_suffix<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    key.strip_prefix(prefix)?.strip_prefix('_')
}

/// A string value that is present and non-blank.
pub(crate) fn non_blank(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Render a raw value the way diagnostics quote it.
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) struct Validator<'a> {
    trail: Trail<'a>,
    mode: Mode,
    corrections: usize,
}

impl<'a> Validator<'a> {
    fn new(sink: &'a mut dyn DiagnosticSink, verbose: bool, mode: Mode) -> Self {
        Self {
            trail: Trail::new(sink, verbose),
            mode,
            corrections: 0,
        }
    }

    /// Progress lines, only emitted while normalizing.
    fn announce(&mut self, message: &str) {
        if self.mode == Mode::Normalize {
            self.trail.note(message);
        }
    }

    /// Record one corrective decision. `fix` describes what was done about
    /// it and is only shown while normalizing.
    pub(crate) fn report(&mut self, head: impl AsRef<str>, fix: Option<&str>) {
        self.corrections += 1;
        let head = head.as_ref();
        match (self.mode, fix) {
            (Mode::Normalize, Some(fix)) => self.trail.note(format!("{head} {fix}")),
            _ => self.trail.note(head),
        }
    }

    /// Whether repairs should be visible to the checks that follow them.
    pub(crate) fn repairs(&self) -> bool {
        self.mode == Mode::Normalize
    }

    fn global_defaults(&mut self, root: &Map<String, Value>) -> Destinations {
        let mut defaults = Destinations {
            plain: non_blank(root.get(DEFAULT_KEY)),
            ..Destinations::default()
        };

        for (key, value) in root {
            let Some(token) = tier_suffix(key, DEFAULT_KEY) else {
                continue;
            };
            match Tier::parse(token) {
                Some(tier) => defaults.set_tier(tier, non_blank(Some(value))),
                None => self.report(
                    format!("Invalid default priority destination '{token}' found in config!"),
                    None,
                ),
            }
        }

        if defaults.has_tiers() {
            for tier in Tier::ALL {
                if defaults.tier(tier).is_none() {
                    self.report(format!("No default '{tier}' priority destination!"), None);
                }
            }
        } else if defaults.plain.is_none() {
            self.report("No global default destination specified in config!", None);
        }

        defaults
    }

    fn tools(&mut self, section: &Value) -> BTreeMap<String, ToolEntry> {
        let mut tools = BTreeMap::new();
        let entries = match section {
            Value::Object(entries) => entries,
            Value::Null => return tools,
            Value::Array(_) => {
                self.report(
                    "Malformed YML; expected job name, but found a list instead!",
                    None,
                );
                return tools;
            }
            other => {
                self.report(
                    format!(
                        "Malformed YML; expected job name, but found '{}' instead!",
                        display(other)
                    ),
                    None,
                );
                return tools;
            }
        };

        for (name, entry) in entries {
            if let Some(tool) = self.tool(name, entry) {
                tools.insert(name.clone(), tool);
            }
        }
        tools
    }

    fn tool(&mut self, name: &str, entry: &Value) -> Option<ToolEntry> {
        let fields = match entry {
            Value::Object(fields) if !fields.is_empty() => fields,
            Value::Array(_) => {
                self.report(
                    "Malformed YML; expected job name, but found a list instead!",
                    None,
                );
                return None;
            }
            _ => {
                self.report(format!("Config section for tool '{name}' is blank!"), None);
                return None;
            }
        };

        let has_rules = fields.get("rules").is_some_and(|r| !r.is_null());
        let has_default = fields.iter().any(|(key, value)| {
            !value.is_null() && (key == DEFAULT_KEY || tier_suffix(key, DEFAULT_KEY).is_some())
        });
        if !has_rules && !has_default {
            self.report(
                format!("Tool '{name}' does not have rules nor a default_destination!"),
                None,
            );
            return None;
        }

        let mut tool = ToolEntry {
            default_destination: Destinations {
                plain: non_blank(fields.get(DEFAULT_KEY)),
                ..Destinations::default()
            },
            rules: Vec::new(),
        };

        for (key, value) in fields {
            match key.as_str() {
                "rules" => tool.rules = self.rule_list(name, value),
                DEFAULT_KEY => {}
                key => match tier_suffix(key, DEFAULT_KEY) {
                    Some(token) => match Tier::parse(token) {
                        Some(tier) => tool
                            .default_destination
                            .set_tier(tier, non_blank(Some(value))),
                        None => self.report(
                            format!("Invalid priority destination '{token}' for tool '{name}'."),
                            Some("Ignoring..."),
                        ),
                    },
                    None => self.report(
                        format!("Unrecognized field '{key}' for tool '{name}'."),
                        Some("Ignoring..."),
                    ),
                },
            }
        }

        let defaults = &tool.default_destination;
        if defaults.has_tiers() && defaults.med.is_none() {
            self.report(
                format!("No 'med' priority destination for tool '{name}'."),
                Some("Ignoring..."),
            );
            tool.default_destination.clear_tiers();
        }

        // Every rule was dropped and there is nothing to fall back on.
        if tool.rules.is_empty() && tool.default_destination.is_empty() {
            return None;
        }
        Some(tool)
    }

    fn rule_list(&mut self, tool: &str, value: &Value) -> Vec<jobroute_core::Rule> {
        let Value::Array(raw_rules) = value else {
            if !value.is_null() {
                self.report(
                    format!("Malformed YML; expected a list of rules for tool '{tool}'!"),
                    Some("Ignoring rules."),
                );
            }
            return Vec::new();
        };

        raw_rules
            .iter()
            .enumerate()
            .filter_map(|(idx, raw)| self.rule(tool, idx + 1, raw))
            .collect()
    }
}
