//! Collision resolution within one batch.
//!
//! Names collide when they land in the same destination subdirectory and
//! compare equal ignoring case. The first occurrence keeps its name; later
//! ones get `{stem}{sep}{n}.{ext}` with the smallest free `n >= 1`.

use std::collections::HashSet;
use std::path::PathBuf;

use super::{PlannedRename, ResolvedRename};
use crate::error::RenameError;

type Key = (PathBuf, String);

fn key(subdir: &std::path::Path, name: &str) -> Key {
    (subdir.to_path_buf(), name.to_lowercase())
}

/// Split `name` at its last dot. A leading dot is part of the stem.
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

fn suffixed(name: &str, separator: &str, n: u64) -> String {
    match split_name(name) {
        (stem, Some(ext)) => format!("{stem}{separator}{n}.{ext}"),
        (stem, None) => format!("{stem}{separator}{n}"),
    }
}

/// Assign final, batch-unique names.
///
/// Pure and idempotent: resolving an already resolved batch changes nothing.
/// Failed plans pass through with no name.
pub fn resolve_collisions(
    plans: &[PlannedRename],
    separator: &str,
) -> Result<Vec<ResolvedRename>, RenameError> {
    // Every candidate is reserved up front so a suffix never steals a later file's name
    let mut taken: HashSet<Key> = plans
        .iter()
        .filter_map(|p| p.candidate().map(|name| key(&p.subdir, name)))
        .collect();
    let mut kept: HashSet<Key> = HashSet::new();
    let mut resolved = Vec::with_capacity(plans.len());

    for plan in plans {
        let Some(candidate) = plan.candidate() else {
            resolved.push(ResolvedRename {
                plan: plan.clone(),
                name: None,
            });
            continue;
        };

        let candidate_key = key(&plan.subdir, candidate);
        let name = if kept.insert(candidate_key) {
            candidate.to_string()
        } else {
            let mut n = 1u64;
            loop {
                let attempt = suffixed(candidate, separator, n);
                let attempt_key = key(&plan.subdir, &attempt);
                if !taken.contains(&attempt_key) {
                    taken.insert(attempt_key.clone());
                    kept.insert(attempt_key);
                    tracing::debug!("Name collision: {candidate} -> {attempt}");
                    break attempt;
                }
                n += 1;
            }
        };

        resolved.push(ResolvedRename {
            plan: plan.clone(),
            name: Some(name),
        });
    }

    verify_unique(&resolved)?;
    Ok(resolved)
}

/// Final check that no two entries share a destination.
pub fn verify_unique(resolved: &[ResolvedRename]) -> Result<(), RenameError> {
    let mut seen = HashSet::new();
    for entry in resolved {
        if let Some(name) = &entry.name {
            if !seen.insert(key(&entry.plan.subdir, name)) {
                return Err(RenameError::CollisionUnresolvable(
                    entry.plan.subdir.join(name),
                ));
            }
        }
    }
    Ok(())
}
