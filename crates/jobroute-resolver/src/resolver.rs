//! Rule evaluation — picks exactly one destination for a job.
//!
//! Given a validated config, the resolver:
//! 1. Looks the tool up, falling back to the global default
//! 2. Measures only what the tool's rules test
//! 3. Scans rules in declared order; the first admitted match wins, and a
//!    `fail` match stops resolution
//! 4. Falls back to the tool default, then the global default
//!
//! In priority mode every destination is picked for the requester's tier.

use jobroute_core::{
    DiagnosticSink, Destinations, Outcome, RouteConfig, Rule, RuleKind, Tier, ToolEntry, Trail,
    format_bytes,
};
use tracing::{debug, debug_span};

use crate::error::{JobMappingError, MappingResult};
use crate::matcher::Facts;
use crate::measure::{JobMeasurer, Measured};

/// Resolves jobs against one validated config.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'c> {
    config: &'c RouteConfig,
}

impl<'c> Resolver<'c> {
    pub fn new(config: &'c RouteConfig) -> Self {
        Self { config }
    }

    /// Pick a destination for `job` running `tool_id` on behalf of
    /// `requester`. `priority` asks for tier-qualified destinations; it only
    /// takes effect when the config declares tiered global defaults.
    pub fn resolve(
        &self,
        job: &dyn JobMeasurer,
        tool_id: &str,
        requester: &str,
        priority: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> MappingResult<String> {
        let _span = debug_span!("resolve", tool = tool_id).entered();
        let mut trail = Trail::new(sink, self.config.verbose);
        let priority = priority && self.config.priority_mode();

        let Some(tool) = self.config.tool(tool_id) else {
            trail.note(format!(
                "Tool '{tool_id}' not specified in config. Using default destination."
            ));
            let tier = self.requester_tier(None, requester, priority);
            let destination = self.fallback(None, tier, tool_id)?;
            return Ok(finish(&mut trail, tool_id, destination));
        };

        let (facts, file_count) = measure(tool, job, &mut trail)?;
        let mut files_announced = false;

        for (idx, rule) in tool.rules.iter().enumerate() {
            if !rule.admits(requester) || !facts.satisfies(&rule.condition) {
                continue;
            }
            debug!(tool = tool_id, rule = idx + 1, kind = rule.kind().as_str(), "rule matched");

            // The file count is only reported once a size rule has matched.
            if rule.kind() == RuleKind::FileSize && !files_announced {
                trail.note(format!("Total number of files: {file_count}"));
                files_announced = true;
            }

            match &rule.outcome {
                Outcome::Fail { message } => return Err(JobMappingError::Failed(message.clone())),
                // A rule without a destination changes nothing; keep scanning.
                Outcome::Unset => continue,
                Outcome::Route(destinations) => {
                    if rule.nice_value != 0 {
                        trail.note(format!(
                            "Applying nice_value {} for rule {} in '{tool_id}'.",
                            rule.nice_value,
                            idx + 1
                        ));
                    }
                    let tier = self.requester_tier(Some(rule), requester, priority);
                    if let Some(destination) = destinations.select(tier) {
                        return Ok(finish(&mut trail, tool_id, destination.to_string()));
                    }
                }
            }
        }

        let tier = self.requester_tier(None, requester, priority);
        let destination = self.fallback(Some(&tool.default_destination), tier, tool_id)?;
        Ok(finish(&mut trail, tool_id, destination))
    }

    /// Tier for a requester: the matched rule's user entry, then the root
    /// `users` section, then `med`. `None` outside priority mode.
    fn requester_tier(&self, rule: Option<&Rule>, requester: &str, priority: bool) -> Option<Tier> {
        if !priority {
            return None;
        }
        let tier = rule
            .and_then(|rule| rule.user(requester))
            .and_then(|entry| entry.priority)
            .or_else(|| self.config.user_tier(requester))
            .unwrap_or(Tier::Med);
        Some(tier)
    }

    fn fallback(
        &self,
        tool_default: Option<&Destinations>,
        tier: Option<Tier>,
        tool_id: &str,
    ) -> MappingResult<String> {
        tool_default
            .and_then(|defaults| defaults.select(tier))
            .or_else(|| self.config.default_destination.select(tier))
            .map(str::to_string)
            .ok_or_else(|| {
                JobMappingError::NoDestination(format!(
                    "No destination found for tool '{tool_id}' and no global default destination is configured."
                ))
            })
    }
}

fn finish(trail: &mut Trail<'_>, tool_id: &str, destination: String) -> String {
    trail.always(format!("Running '{tool_id}' with '{destination}'."));
    destination
}

/// Measure what the tool's rules test, logging the totals as we go.
/// Returns the facts and the number of sized input files.
fn measure(
    tool: &ToolEntry,
    job: &dyn JobMeasurer,
    trail: &mut Trail<'_>,
) -> MappingResult<(Facts, usize)> {
    let mut facts = Facts::default();
    let mut file_count = 0;

    if tool.uses(RuleKind::FileSize) {
        let sizes = job.input_sizes()?;
        let total = announce_inputs(trail, &sizes);
        trail.note(format!("Total size: {}", format_bytes(total as i128, None)));
        file_count = sizes.len();
        facts.total_size = Some(total);
    }

    if tool.uses(RuleKind::Records) {
        let records = job.record_counts()?;
        let total = announce_inputs(trail, &records);
        trail.note(format!("Total amount of records: {total}"));
        facts.total_records = Some(total);
    }

    if tool.uses(RuleKind::NumInputDatasets) {
        let count = job.input_dataset_count();
        trail.note(format!("Total number of input datasets: {count}"));
        facts.dataset_count = Some(count as u128);
    }

    if tool.uses(RuleKind::Arguments) {
        facts.arguments = job.tool_arguments();
    }

    Ok((facts, file_count))
}

fn announce_inputs(trail: &mut Trail<'_>, inputs: &[Measured]) -> u128 {
    inputs
        .iter()
        .map(|input| {
            trail.note(format!("Loading file: {}{}", input.name, input.location));
            u128::from(input.value)
        })
        .sum()
}
