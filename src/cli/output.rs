//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde_json::{json, Value};
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{DomainConfig, ValidationResult};
use crate::elasticsearch::DomainStatus;
use crate::planner::{DomainPlan, PlanAction};
use crate::reconciler::DeployOutputs;
use crate::state::ComponentState;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Field change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Desired")]
    desired: String,
}

/// Key/value row for table display.
#[derive(Tabled)]
struct PropertyRow {
    #[tabled(rename = "Property")]
    property: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the outputs of a deploy.
    #[must_use]
    pub fn format_deploy(&self, outputs: &DeployOutputs) -> String {
        match self.format {
            OutputFormat::Json => to_json(outputs),
            OutputFormat::Text => {
                let mut output = format!("{} Domain {} deployed\n\n", "✓".green(), outputs.name.bold());
                let _ = writeln!(output, "   ARN:      {}", outputs.arn);
                let _ = writeln!(
                    output,
                    "   Endpoint: {}",
                    outputs.endpoint.as_deref().unwrap_or("-")
                );
                let _ = writeln!(output, "   Region:   {}", outputs.region);
                output
            }
        }
    }

    /// Formats the result of a remove.
    #[must_use]
    pub fn format_remove(&self, name: Option<&str>) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({})),
            OutputFormat::Text => name.map_or_else(
                || String::from("No domain recorded, nothing to remove.\n"),
                |name| format!("{} Domain {name} removed\n", "✓".green()),
            ),
        }
    }

    /// Formats a deployment plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &DomainPlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(plan),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &DomainPlan) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\nDeployment plan for {} ({})", plan.name.bold(), plan.region);
        let _ = writeln!(
            output,
            "   Name input: {}{}",
            plan.name_input,
            if plan.name_reused { " (name reused from state)" } else { "" }
        );

        if plan.awaiting_processing {
            let _ = writeln!(
                output,
                "{} Domain is processing a previous change; deploy will wait for it first",
                "⚠".yellow()
            );
        }

        let _ = writeln!(
            output,
            "\n{} {}",
            Self::format_action(plan.action),
            plan.summary()
        );

        if !plan.changes.is_empty() {
            let rows: Vec<ChangeRow> = plan
                .changes
                .iter()
                .map(|c| ChangeRow {
                    field: c.field.to_string(),
                    current: compact(&c.current),
                    desired: compact(&c.desired),
                })
                .collect();

            output.push('\n');
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        output
    }

    /// Formats the recorded state and the live domain.
    #[must_use]
    pub fn format_status(&self, state: &ComponentState, live: Option<&DomainStatus>) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({ "state": state, "domain": live })),
            OutputFormat::Text => {
                let Some(name) = state.name.as_deref() else {
                    return String::from("No domain deployed.\n");
                };

                let mut output = format!("\nDomain: {}\n\n", name.bold());

                let Some(domain) = live else {
                    let _ = writeln!(
                        output,
                        "{} Domain recorded in state does not exist remotely",
                        "✗".red()
                    );
                    return output;
                };

                let health = if domain.is_active() {
                    "active".green().to_string()
                } else if domain.processing {
                    "processing".yellow().to_string()
                } else {
                    "pending".yellow().to_string()
                };

                let cluster = &domain.cluster_config;
                let ebs = &domain.ebs_options;
                let rows = vec![
                    PropertyRow { property: "Status", value: health },
                    PropertyRow {
                        property: "Endpoint",
                        value: domain.endpoint.clone().unwrap_or_else(|| String::from("-")),
                    },
                    PropertyRow {
                        property: "Version",
                        value: domain
                            .elasticsearch_version
                            .clone()
                            .unwrap_or_else(|| String::from("-")),
                    },
                    PropertyRow {
                        property: "Instances",
                        value: format!("{}x {}", cluster.instance_count, cluster.instance_type),
                    },
                    PropertyRow {
                        property: "Storage",
                        value: if ebs.ebs_enabled {
                            format!("{} GiB {}", ebs.volume_size, ebs.volume_type)
                        } else {
                            String::from("instance store")
                        },
                    },
                    PropertyRow {
                        property: "Snapshot hour",
                        value: domain.snapshot_options.automated_snapshot_start_hour.to_string(),
                    },
                    PropertyRow {
                        property: "ARN",
                        value: domain.arn.clone(),
                    },
                ];

                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats persisted state.
    #[must_use]
    pub fn format_state(&self, state: &ComponentState) -> String {
        match self.format {
            OutputFormat::Json => to_json(state),
            OutputFormat::Text => {
                let mut output = String::from("\nState\n\n");
                let field = |value: Option<&str>| value.unwrap_or("-").to_string();

                let _ = writeln!(output, "   Version:      {}", field(state.version.as_deref()));
                let _ = writeln!(output, "   Name:         {}", field(state.name.as_deref()));
                let _ = writeln!(
                    output,
                    "   Name input:   {}",
                    state
                        .name_input
                        .as_ref()
                        .map_or_else(|| String::from("-"), ToString::to_string)
                );
                let _ = writeln!(output, "   Region:       {}", field(state.region.as_deref()));
                let _ = writeln!(output, "   ARN:          {}", field(state.arn.as_deref()));
                let _ = writeln!(output, "   Endpoint:     {}", field(state.endpoint.as_deref()));
                if let Some(updated) = state.last_updated {
                    let _ = writeln!(
                        output,
                        "   Last updated: {}",
                        updated.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                if !state.extra.is_empty() {
                    let keys: Vec<&str> = state.extra.keys().map(String::as_str).collect();
                    let _ = writeln!(output, "   Other keys:   {}", keys.join(", "));
                }

                output
            }
        }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &DomainConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&json!({
                "valid": result.is_valid(),
                "warnings": result.warnings,
                "config": config,
            })),
            OutputFormat::Text => {
                let mut output = format!("{} Configuration is valid\n", "✓".green());

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                let cluster = &config.elasticsearch_cluster_config;
                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(output, "   Region:    {}", config.region);
                let _ = writeln!(
                    output,
                    "   Name:      {}",
                    config.name.as_deref().unwrap_or("(generated)")
                );
                let _ = writeln!(output, "   Version:   {}", config.elasticsearch_version);
                let _ = writeln!(
                    output,
                    "   Instances: {}x {}",
                    cluster.instance_count, cluster.instance_type
                );
                let _ = writeln!(
                    output,
                    "   Policy:    {}",
                    if config.access_policies.is_some() { "set" } else { "none" }
                );

                output
            }
        }
    }

    /// Formats a plan action with color.
    fn format_action(action: PlanAction) -> String {
        match action {
            PlanAction::Create => "+create".green().to_string(),
            PlanAction::Update => "~update".yellow().to_string(),
            PlanAction::NoChange => "=".dimmed().to_string(),
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Renders a value on one line, truncated for table cells.
fn compact(value: &Value) -> String {
    const MAX_LEN: usize = 60;

    let text = match value {
        Value::Null => String::from("-"),
        other => other.to_string(),
    };

    if text.chars().count() <= MAX_LEN {
        text
    } else {
        let truncated: String = text.chars().take(MAX_LEN - 3).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::NameResolution;
    use crate::state::NameInput;

    fn outputs() -> DeployOutputs {
        DeployOutputs {
            name: String::from("logs-abc12345"),
            arn: String::from("arn:aws:es:us-east-1:123456789012:domain/logs-abc12345"),
            endpoint: None,
            region: String::from("us-east-1"),
        }
    }

    #[test]
    fn test_deploy_json_uses_output_keys() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let value: Value = serde_json::from_str(&formatter.format_deploy(&outputs())).unwrap();

        assert_eq!(value["name"], "logs-abc12345");
        assert_eq!(value["endpoint"], Value::Null);
        assert_eq!(value["region"], "us-east-1");
    }

    #[test]
    fn test_remove_json_is_empty_object() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let value: Value =
            serde_json::from_str(&formatter.format_remove(Some("logs-abc12345"))).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_plan_text_lists_action() {
        let resolution = NameResolution {
            name: String::from("logs-abc12345"),
            name_input: NameInput::Named(String::from("logs")),
            reused: false,
        };
        let plan = DomainPlan::new(&resolution, &DomainConfig::default(), None);

        let text = OutputFormatter::new(OutputFormat::Text).format_plan(&plan);
        assert!(text.contains("Create domain logs-abc12345"));
    }

    #[test]
    fn test_status_without_deployment() {
        let text = OutputFormatter::new(OutputFormat::Text).format_status(&ComponentState::new(), None);
        assert_eq!(text, "No domain deployed.\n");
    }

    #[test]
    fn test_compact_truncates_long_values() {
        let long = Value::String("x".repeat(200));
        let text = compact(&long);
        assert_eq!(text.chars().count(), 60);
        assert!(text.ends_with("..."));
        assert_eq!(compact(&Value::Null), "-");
    }
}
