//! Acquisition checks.
//!
//! Every check runs before anything is debited, so a refusal leaves the
//! ledger and the progress store untouched.
use thiserror::Error;

use crate::definitions::DoctrineDefinition;
use crate::ledger::ResourceLedger;
use crate::progress::ProgressView;
use crate::status::{DoctrineStatus, resolve_status};

/// Why a doctrine could not be acquired. The display text is the
/// user-facing reason.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquireError {
    #[error("unknown doctrine")]
    UnknownDoctrine { key: String },
    #[error("prerequisite not met")]
    PrerequisiteNotMet { key: String },
    #[error("feats incomplete")]
    FeatsIncomplete { key: String, status: DoctrineStatus },
    #[error("not enough gold")]
    NotEnoughGold { required: i64, available: i64 },
    #[error("not enough influence")]
    NotEnoughInfluence { required: i64, available: i64 },
}

/// Validate an acquisition of `key` against the current state and ledger.
///
/// # Errors
///
/// Returns the first failing check, in order: existence, status, gold, influence.
pub fn check_acquisition<'a>(
    view: &ProgressView<'a>,
    key: &str,
    ledger: &dyn ResourceLedger,
) -> Result<&'a DoctrineDefinition, AcquireError> {
    let doctrine = view
        .catalog()
        .and_then(|catalog| catalog.get(key))
        .ok_or_else(|| AcquireError::UnknownDoctrine {
            key: key.to_string(),
        })?;

    match resolve_status(view, key) {
        DoctrineStatus::InProgress => {}
        DoctrineStatus::Locked => {
            return Err(AcquireError::PrerequisiteNotMet {
                key: key.to_string(),
            });
        }
        status => {
            return Err(AcquireError::FeatsIncomplete {
                key: key.to_string(),
                status,
            });
        }
    }

    let gold = ledger.gold();
    if gold < doctrine.gold_cost {
        return Err(AcquireError::NotEnoughGold {
            required: doctrine.gold_cost,
            available: gold,
        });
    }
    let influence = ledger.influence();
    if influence < doctrine.influence_cost {
        return Err(AcquireError::NotEnoughInfluence {
            required: doctrine.influence_cost,
            available: influence,
        });
    }
    Ok(doctrine)
}
