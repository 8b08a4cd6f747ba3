//! Status rendering: condition mapping plus the label/value blocks printed by
//! `status` commands.

use std::io::{self, Write};

use crate::{BuilderStatus, ClusterStackStatus, Condition};

pub const CONDITION_READY: &str = "Ready";

/// Anything carrying reconciler conditions.
pub trait Conditions {
    fn conditions(&self) -> &[Condition];

    fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions().iter().find(|c| c.condition_type == condition_type)
    }
}

impl Conditions for BuilderStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

impl Conditions for ClusterStackStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

/// Three-state view of the Ready condition.
pub fn status_text<C: Conditions + ?Sized>(status: &C) -> &'static str {
    match status.condition(CONDITION_READY).map(|c| c.status.as_str()) {
        Some("True") => "Ready",
        Some("False") => "Not Ready",
        _ => "Unknown",
    }
}

pub type StatusItems = Vec<(String, String)>;

fn item(label: &str, value: impl Into<String>) -> (String, String) {
    (label.to_string(), value.into())
}

pub fn cluster_stack_items(status: &ClusterStackStatus, verbose: bool) -> StatusItems {
    let mut items = vec![
        item("Status", status_text(status)),
        item("Id", status.id.as_str()),
        item("Run Image", status.run_image.latest_image.as_str()),
        item("Build Image", status.build_image.latest_image.as_str()),
    ];
    if verbose {
        items.push(item("Mixins", status.mixins.join(", ")));
    }
    items
}

pub fn builder_items(status: &BuilderStatus, verbose: bool) -> StatusItems {
    let text = status_text(status);
    let mut items = vec![
        item("Status", text),
        item("Image", status.latest_image.as_str()),
        item("Stack", status.stack.id.as_str()),
        item("Run Image", status.stack.run_image.as_str()),
    ];
    if text != "Ready" {
        if let Some(message) = status.condition(CONDITION_READY).and_then(|c| c.message.as_deref()) {
            items.push(item("Reason", message));
        }
    }
    if verbose {
        for (i, entry) in status.order.iter().enumerate() {
            let group: Vec<String> = entry.group.iter().map(|bp| bp.to_string()).collect();
            items.push((format!("Group {}", i + 1), group.join(", ")));
        }
    }
    items
}

/// Print `Label:` padded to the widest label, one pair per line.
pub fn write_status_block<W: Write + ?Sized>(out: &mut W, items: &[(String, String)]) -> io::Result<()> {
    let width = items.iter().map(|(label, _)| label.len() + 1).max().unwrap_or(0);
    for (label, value) in items {
        let label = format!("{}:", label);
        if value.is_empty() {
            writeln!(out, "{}", label)?;
        } else {
            writeln!(out, "{:<width$} {}", label, value, width = width)?;
        }
    }
    Ok(())
}
