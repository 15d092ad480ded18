//! Publication lifecycle
//!
//! ```text
//! draft ──publish──> published <──publish── paused
//!                        │                    ^
//!                        └──────pause─────────┘
//! any (except archived) ──archive──> archived
//! ```
//!
//! Publishing is gated on validation: a flow with error issues stays where
//! it is. The trigger is enabled exactly while the flow is published.

use chrono::{DateTime, Utc};

use crate::error::{FlowError, Result};
use crate::types::{AutomationFlow, FlowStatus};
use crate::validation::validate_flow;

fn check_transition(
    flow: &AutomationFlow,
    to: FlowStatus,
    allowed_from: &[FlowStatus],
) -> Result<()> {
    if allowed_from.contains(&flow.status) {
        Ok(())
    } else {
        Err(FlowError::InvalidTransition {
            from: flow.status,
            to,
        })
    }
}

fn transition(
    flow: &AutomationFlow,
    to: FlowStatus,
    allowed_from: &[FlowStatus],
    now: DateTime<Utc>,
) -> Result<AutomationFlow> {
    check_transition(flow, to, allowed_from)?;
    let mut next = flow.clone();
    next.status = to;
    next.trigger.enabled = to == FlowStatus::Published;
    next.updated_at = Some(now);
    log::info!("Flow '{}' moved from {} to {}", flow.name, flow.status, to);
    Ok(next)
}

/// Publish a draft or paused flow
///
/// Fails with [`FlowError::InvalidTransition`] from any other status, then
/// with [`FlowError::ValidationFailed`] while the flow has errors.
pub fn publish(flow: &AutomationFlow, now: DateTime<Utc>) -> Result<AutomationFlow> {
    const PUBLISHABLE: [FlowStatus; 2] = [FlowStatus::Draft, FlowStatus::Paused];
    check_transition(flow, FlowStatus::Published, &PUBLISHABLE)?;

    let errors: Vec<_> = validate_flow(flow)
        .into_iter()
        .filter(|issue| issue.is_error())
        .collect();
    if let Some(first) = errors.first() {
        return Err(FlowError::ValidationFailed {
            count: errors.len(),
            first: first.to_string(),
        });
    }

    let mut next = transition(flow, FlowStatus::Published, &PUBLISHABLE, now)?;
    if next.published_at.is_none() {
        next.published_at = Some(now);
    }
    Ok(next)
}

/// Pause a published flow
pub fn pause(flow: &AutomationFlow, now: DateTime<Utc>) -> Result<AutomationFlow> {
    transition(flow, FlowStatus::Paused, &[FlowStatus::Published], now)
}

/// Archive a flow; archived flows cannot change status again
pub fn archive(flow: &AutomationFlow, now: DateTime<Utc>) -> Result<AutomationFlow> {
    transition(
        flow,
        FlowStatus::Archived,
        &[FlowStatus::Draft, FlowStatus::Published, FlowStatus::Paused],
        now,
    )
}
