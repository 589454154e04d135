//! Retention policy for duplicate groups
//!
//! Decides which member of each duplicate group survives a cleanup. Members
//! are ordered by creation time, read again from the filesystem at decision
//! time, since a group is only a snapshot of the scan. Members whose metadata
//! can no longer be read are left out of the decision entirely.

use crate::duplicate::detector::{file_timestamp, DuplicateGroup, FileRecord};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Which member of a group to keep
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum KeepPolicy {
    /// Keep the most recently created file
    #[default]
    Newest,
    /// Keep the earliest created file
    Oldest,
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeepPolicy::Newest => f.write_str("newest"),
            KeepPolicy::Oldest => f.write_str("oldest"),
        }
    }
}

/// Outcome for one duplicate group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionDecision {
    /// The surviving file
    pub keep: PathBuf,
    /// Files to delete, oldest first
    pub delete: Vec<PathBuf>,
    /// Recorded size of everything in `delete`
    pub reclaimable_bytes: u64,
}

/// Decisions for a whole set of groups
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionPlan {
    /// One entry per group that still has something to delete
    pub decisions: Vec<RetentionDecision>,
    /// Bytes freed if every deletion succeeds
    pub reclaimable_bytes: u64,
}

impl RetentionPlan {
    /// All paths marked for deletion, group by group
    pub fn paths_to_delete(&self) -> Vec<PathBuf> {
        self.decisions
            .iter()
            .flat_map(|d| d.delete.iter().cloned())
            .collect()
    }

    /// Number of files marked for deletion
    pub fn files_to_delete(&self) -> usize {
        self.decisions.iter().map(|d| d.delete.len()).sum()
    }

    /// Check if nothing would be deleted
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Decide what to keep and what to delete in every group
pub fn plan_retention(groups: &[DuplicateGroup], keep: KeepPolicy) -> RetentionPlan {
    plan_with(groups, keep, current_timestamp)
}

/// Flattened list of paths to delete under `keep`.
///
/// Paths come group by group, and in creation order within a group.
pub fn select_for_deletion(groups: &[DuplicateGroup], keep: KeepPolicy) -> Vec<PathBuf> {
    plan_retention(groups, keep).paths_to_delete()
}

fn current_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path).ok().and_then(|m| file_timestamp(&m))
}

fn plan_with<F>(groups: &[DuplicateGroup], keep: KeepPolicy, timestamp: F) -> RetentionPlan
where
    F: Fn(&Path) -> Option<DateTime<Utc>>,
{
    let mut plan = RetentionPlan::default();

    for group in groups {
        let mut members: Vec<(DateTime<Utc>, &FileRecord)> = group
            .members
            .iter()
            .filter_map(|m| match timestamp(&m.path) {
                Some(ts) => Some((ts, m)),
                None => {
                    debug!("Leaving out {}: metadata unavailable", m.path.display());
                    None
                }
            })
            .collect();

        members.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path.cmp(&b.1.path)));
        // The same path listed twice is one file, not a redundant copy.
        members.dedup_by(|a, b| a.1.path == b.1.path);

        if members.len() < 2 {
            continue;
        }

        let keep_index = match keep {
            KeepPolicy::Newest => members.len() - 1,
            KeepPolicy::Oldest => 0,
        };

        let mut decision = RetentionDecision {
            keep: members[keep_index].1.path.clone(),
            delete: Vec::with_capacity(members.len() - 1),
            reclaimable_bytes: 0,
        };
        for (i, (_, record)) in members.iter().enumerate() {
            if i != keep_index && record.path != decision.keep {
                decision.delete.push(record.path.clone());
                decision.reclaimable_bytes += record.size;
            }
        }

        plan.reclaimable_bytes += decision.reclaimable_bytes;
        plan.decisions.push(decision);
    }

    plan
}
