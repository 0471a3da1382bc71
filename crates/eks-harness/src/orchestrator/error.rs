//! Harness run errors

use super::outputs::OutputError;
use super::phase::Phase;
use crate::cleanup::TeardownReport;
use crate::wait::PollError;
use eks_harness_common::ValidationError;
use thiserror::Error;

/// Primary cause of a failed run
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid cluster configuration")]
    Validation(#[from] ValidationError),

    #[error("apply failed")]
    Apply(#[source] anyhow::Error),

    #[error("apply produced unexpected outputs")]
    Outputs(#[from] OutputError),

    #[error("{phase} did not reach its ready condition")]
    Poll {
        phase: Phase,
        #[source]
        source: PollError,
    },

    #[error("run cancelled during {phase}")]
    Cancelled { phase: Phase },

    #[error("failed to create probe workload")]
    ProbeCreate(#[source] anyhow::Error),
}

impl HarnessError {
    /// True when a polling phase ran out of attempts
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            HarnessError::Poll {
                source: PollError::Timeout { .. },
                ..
            }
        )
    }
}

/// A failed run: the primary cause plus whatever teardown reported
///
/// Teardown failures never replace `error`; they ride along in `teardown`.
#[derive(Debug, Error)]
#[error("harness run failed{}", teardown_suffix(.teardown))]
pub struct RunFailure {
    #[source]
    pub error: HarnessError,
    pub teardown: TeardownReport,
    pub phases: Vec<Phase>,
}

fn teardown_suffix(teardown: &TeardownReport) -> String {
    if teardown.is_clean() {
        String::new()
    } else {
        let errors: Vec<String> = teardown.errors.iter().map(ToString::to_string).collect();
        format!(" (teardown also failed: {})", errors.join("; "))
    }
}
