//! Normalized routing config shared across jobroute crates.
//!
//! These are the shapes the validator produces and the resolver consumes.
//! Nothing here is loosely typed: every rule carries exactly the fields its
//! rule type needs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::units::INFINITY;

/// Destination value that turns a matched rule into a hard failure.
pub const FAIL_DESTINATION: &str = "fail";

/// Priority tier appended to destinations in priority mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Med,
    High,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Low, Tier::Med, Tier::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Low => "low",
            Tier::Med => "med",
            Tier::High => "high",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.as_str() == token)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end of a rule's range. `Unbounded` sorts above every finite value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bound {
    Finite(u128),
    Unbounded,
}

impl Bound {
    /// Negative byte counts are the "unbounded" sentinel.
    pub fn from_bytes(bytes: i128) -> Self {
        u128::try_from(bytes).map_or(Bound::Unbounded, Bound::Finite)
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Bound::Unbounded)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Bound::Finite(n) => match u64::try_from(*n) {
                Ok(n) => Value::from(n),
                Err(_) => Value::from(n.to_string()),
            },
            Bound::Unbounded => Value::from(INFINITY),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Finite(n) => write!(f, "{n}"),
            Bound::Unbounded => f.write_str(INFINITY),
        }
    }
}

/// Inclusive `[lower, upper]` range. Validation guarantees `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub lower: Bound,
    pub upper: Bound,
}

impl Range {
    pub fn new(lower: Bound, upper: Bound) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, value: u128) -> bool {
        let value = Bound::Finite(value);
        self.lower <= value && value <= self.upper
    }
}

/// The closed set of rule types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    FileSize,
    Records,
    Arguments,
    NumInputDatasets,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::FileSize => "file_size",
            RuleKind::Records => "records",
            RuleKind::Arguments => "arguments",
            RuleKind::NumInputDatasets => "num_input_datasets",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "file_size" => Some(RuleKind::FileSize),
            "records" => Some(RuleKind::Records),
            "arguments" => Some(RuleKind::Arguments),
            "num_input_datasets" => Some(RuleKind::NumInputDatasets),
            _ => None,
        }
    }
}

/// What a rule tests. Each variant carries only its own fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Total input size in bytes.
    FileSize(Range),
    /// Total record count across inputs.
    Records(Range),
    /// Every listed tool argument must equal the job's value.
    Arguments(Map<String, Value>),
    /// Number of input datasets.
    NumInputDatasets(Range),
}

impl Condition {
    pub fn kind(&self) -> RuleKind {
        match self {
            Condition::FileSize(_) => RuleKind::FileSize,
            Condition::Records(_) => RuleKind::Records,
            Condition::Arguments(_) => RuleKind::Arguments,
            Condition::NumInputDatasets(_) => RuleKind::NumInputDatasets,
        }
    }
}

/// A destination plus optional per-tier overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destinations {
    pub plain: Option<String>,
    pub low: Option<String>,
    pub med: Option<String>,
    pub high: Option<String>,
}

impl Destinations {
    pub fn plain(destination: impl Into<String>) -> Self {
        Self {
            plain: Some(destination.into()),
            ..Self::default()
        }
    }

    pub fn tier(&self, tier: Tier) -> Option<&str> {
        match tier {
            Tier::Low => self.low.as_deref(),
            Tier::Med => self.med.as_deref(),
            Tier::High => self.high.as_deref(),
        }
    }

    pub fn set_tier(&mut self, tier: Tier, destination: Option<String>) {
        match tier {
            Tier::Low => self.low = destination,
            Tier::Med => self.med = destination,
            Tier::High => self.high = destination,
        }
    }

    pub fn has_tiers(&self) -> bool {
        Tier::ALL.iter().any(|t| self.tier(*t).is_some())
    }

    pub fn clear_tiers(&mut self) {
        for tier in Tier::ALL {
            self.set_tier(tier, None);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_none() && !self.has_tiers()
    }

    /// Pick the destination for a tier, falling back to the plain one and
    /// then to `med`, which stands in as the baseline of a tiered set.
    pub fn select(&self, tier: Option<Tier>) -> Option<&str> {
        tier.and_then(|t| self.tier(t))
            .or(self.plain.as_deref())
            .or(self.med.as_deref())
    }

    /// Write `<key>` and `<key>_<tier>` entries into a document map.
    pub fn write_into(&self, map: &mut Map<String, Value>, key: &str) {
        if let Some(plain) = &self.plain {
            map.insert(key.to_string(), Value::from(plain.as_str()));
        }
        for tier in Tier::ALL {
            if let Some(dest) = self.tier(tier) {
                map.insert(format!("{key}_{tier}"), Value::from(dest));
            }
        }
    }
}

/// What happens when a rule matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Route to a destination (tier-qualified in priority mode).
    Route(Destinations),
    /// Stop resolution with this message.
    Fail { message: String },
    /// Declared without any destination; a match changes nothing.
    Unset,
}

/// A requester a rule is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub email: String,
    pub priority: Option<Tier>,
}

impl UserEntry {
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("email".into(), Value::from(self.email.as_str()));
        if let Some(tier) = self.priority {
            map.insert("priority".into(), Value::from(tier.as_str()));
        }
        Value::Object(map)
    }
}

/// A validated rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub condition: Condition,
    pub nice_value: i32,
    pub outcome: Outcome,
    /// `None` means any requester.
    pub users: Option<Vec<UserEntry>>,
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        self.condition.kind()
    }

    /// Whether `requester` passes this rule's user restriction.
    pub fn admits(&self, requester: &str) -> bool {
        self.user(requester).is_some() || self.users.is_none()
    }

    pub fn user(&self, requester: &str) -> Option<&UserEntry> {
        self.users
            .as_ref()
            .and_then(|users| users.iter().find(|u| u.email == requester))
    }

    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        map.insert("rule_type".into(), Value::from(self.kind().as_str()));
        match &self.condition {
            Condition::FileSize(range)
            | Condition::Records(range)
            | Condition::NumInputDatasets(range) => {
                map.insert("lower_bound".into(), range.lower.to_value());
                map.insert("upper_bound".into(), range.upper.to_value());
            }
            Condition::Arguments(args) => {
                map.insert("arguments".into(), Value::Object(args.clone()));
            }
        }
        map.insert("nice_value".into(), Value::from(self.nice_value));
        match &self.outcome {
            Outcome::Route(destinations) => destinations.write_into(&mut map, "destination"),
            Outcome::Fail { message } => {
                map.insert("destination".into(), Value::from(FAIL_DESTINATION));
                map.insert("fail_message".into(), Value::from(message.as_str()));
            }
            Outcome::Unset => {}
        }
        if let Some(users) = &self.users {
            let list = users.iter().map(UserEntry::to_value).collect();
            map.insert("users".into(), Value::Array(list));
        }
        Value::Object(map)
    }
}

/// Routing for one tool: ordered rules plus an optional default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolEntry {
    pub default_destination: Destinations,
    pub rules: Vec<Rule>,
}

impl ToolEntry {
    pub fn uses(&self, kind: RuleKind) -> bool {
        self.rules.iter().any(|rule| rule.kind() == kind)
    }

    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        if !self.rules.is_empty() {
            let rules = self.rules.iter().map(Rule::to_document).collect();
            map.insert("rules".into(), Value::Array(rules));
        }
        self.default_destination
            .write_into(&mut map, "default_destination");
        Value::Object(map)
    }
}

/// A fully validated routing config. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteConfig {
    pub default_destination: Destinations,
    pub tools: BTreeMap<String, ToolEntry>,
    /// Requester email → default tier.
    pub users: BTreeMap<String, Tier>,
    pub verbose: bool,
}

impl RouteConfig {
    /// Priority mode is declared by tiered global defaults.
    pub fn priority_mode(&self) -> bool {
        self.default_destination.has_tiers()
    }

    pub fn tool(&self, tool_id: &str) -> Option<&ToolEntry> {
        self.tools.get(tool_id)
    }

    pub fn user_tier(&self, email: &str) -> Option<Tier> {
        self.users.get(email).copied()
    }

    /// Render back to the canonical document form. Validating the result
    /// again reproduces this config.
    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        if !self.tools.is_empty() {
            let tools = self
                .tools
                .iter()
                .map(|(name, entry)| (name.clone(), entry.to_document()))
                .collect();
            map.insert("tools".into(), Value::Object(tools));
        }
        self.default_destination
            .write_into(&mut map, "default_destination");
        if !self.users.is_empty() {
            let users = self
                .users
                .iter()
                .map(|(email, tier)| {
                    let mut entry = Map::new();
                    entry.insert("priority".into(), Value::from(tier.as_str()));
                    (email.clone(), Value::Object(entry))
                })
                .collect();
            map.insert("users".into(), Value::Object(users));
        }
        if self.verbose {
            map.insert("verbose".into(), Value::Bool(true));
        }
        Value::Object(map)
    }
}

impl Serialize for RouteConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unbounded_sorts_above_finite() {
        assert!(Bound::Finite(u128::MAX) < Bound::Unbounded);
        assert_eq!(Bound::from_bytes(-1), Bound::Unbounded);
        assert_eq!(Bound::from_bytes(12), Bound::Finite(12));
    }

    #[test]
    fn range_is_inclusive() {
        let range = Range::new(Bound::Finite(10), Bound::Finite(20));
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(21));

        let open = Range::new(Bound::Finite(0), Bound::Unbounded);
        assert!(open.contains(u128::from(u64::MAX)));
    }

    #[test]
    fn select_prefers_tier_then_plain_then_med() {
        let mut dest = Destinations::plain("cluster");
        dest.high = Some("cluster_high".into());
        assert_eq!(dest.select(Some(Tier::High)), Some("cluster_high"));
        assert_eq!(dest.select(Some(Tier::Low)), Some("cluster"));
        assert_eq!(dest.select(None), Some("cluster"));

        let tiered_only = Destinations {
            med: Some("cluster_med".into()),
            ..Destinations::default()
        };
        assert_eq!(tiered_only.select(None), Some("cluster_med"));
    }

    #[test]
    fn tier_tokens() {
        assert_eq!(Tier::parse("med"), Some(Tier::Med));
        assert_eq!(Tier::parse("mine"), None);
        assert_eq!(Tier::High.to_string(), "high");
    }

    #[test]
    fn fail_rule_document() {
        let rule = Rule {
            condition: Condition::FileSize(Range::new(Bound::Finite(0), Bound::Unbounded)),
            nice_value: 0,
            outcome: Outcome::Fail {
                message: "too big".into(),
            },
            users: None,
        };
        assert_eq!(
            rule.to_document(),
            json!({
                "rule_type": "file_size",
                "lower_bound": 0,
                "upper_bound": "Infinity",
                "nice_value": 0,
                "destination": "fail",
                "fail_message": "too big",
            })
        );
    }

    #[test]
    fn user_restriction() {
        let rule = Rule {
            condition: Condition::Arguments(Map::new()),
            nice_value: 0,
            outcome: Outcome::Unset,
            users: Some(vec![UserEntry {
                email: "a@b.org".into(),
                priority: None,
            }]),
        };
        assert!(rule.admits("a@b.org"));
        assert!(!rule.admits("c@b.org"));
    }

    #[test]
    fn config_document_omits_empty_sections() {
        let config = RouteConfig {
            default_destination: Destinations::plain("waffles_default"),
            ..RouteConfig::default()
        };
        assert_eq!(
            config.to_document(),
            json!({ "default_destination": "waffles_default" })
        );
        assert!(!config.priority_mode());
    }
}
