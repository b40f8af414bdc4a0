use crate::steps::Step;
use anyhow::{anyhow, bail, Result};
use std::collections::BTreeSet;

/// Resolves which steps to run based on include/exclude filters.
///
/// The result is always in pipeline order. A selected step whose
/// prerequisites are not selected is kept (the master may already hold
/// their rows) and a warning is logged.
pub fn resolve_steps(
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
) -> Result<Vec<Step>> {
    let selected: BTreeSet<Step> = match (include, exclude) {
        (Some(_), Some(_)) => {
            bail!("Cannot use both --include and --exclude at the same time");
        }
        (Some(include_list), None) => {
            let steps = parse_steps(&include_list)?;
            tracing::info!(?include_list, "including {} steps", steps.len());
            steps
        }
        (None, Some(exclude_list)) => {
            let excluded = parse_steps(&exclude_list)?;
            tracing::info!(?exclude_list, "excluding {} steps", excluded.len());
            Step::ALL
                .iter()
                .copied()
                .filter(|s| !excluded.contains(s))
                .collect()
        }
        (None, None) => Step::ALL.iter().copied().collect(),
    };

    // BTreeSet iterates in declaration order, which is pipeline order
    let steps: Vec<Step> = selected.into_iter().collect();
    for (step, req) in missing_prerequisites(&steps) {
        tracing::warn!(
            step = step.name(),
            missing = req.name(),
            "prerequisite step not selected; relying on existing master rows"
        );
    }

    Ok(steps)
}

fn parse_steps(names: &[String]) -> Result<BTreeSet<Step>> {
    names
        .iter()
        .map(|name| name.parse::<Step>().map_err(|e| anyhow!(e)))
        .collect()
}

/// Prerequisites of `steps` that are not themselves in `steps`
pub fn missing_prerequisites(steps: &[Step]) -> Vec<(Step, Step)> {
    steps
        .iter()
        .flat_map(|step| {
            step.requires()
                .iter()
                .filter(|req| !steps.contains(req))
                .map(move |req| (*step, *req))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Option<Vec<String>> {
        Some(v.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_all_steps_by_default() {
        assert_eq!(resolve_steps(None, None).unwrap(), Step::ALL.to_vec());
    }

    #[test]
    fn test_include_is_reordered_to_pipeline_order() {
        let steps = resolve_steps(names(&["search-index", "customers"]), None).unwrap();
        assert_eq!(steps, vec![Step::Customers, Step::SearchIndex]);
    }

    #[test]
    fn test_exclude() {
        let steps = resolve_steps(None, names(&["admin-account"])).unwrap();
        assert_eq!(steps.len(), Step::ALL.len() - 1);
        assert!(!steps.contains(&Step::AdminAccount));
    }

    #[test]
    fn test_include_and_exclude_conflict() {
        assert!(resolve_steps(names(&["routes"]), names(&["customers"])).is_err());
    }

    #[test]
    fn test_unknown_step_error() {
        assert!(resolve_steps(names(&["nonexistent"]), None).is_err());
    }

    #[test]
    fn test_missing_prerequisites() {
        let missing = missing_prerequisites(&[Step::Customers, Step::SearchIndex, Step::Products]);
        assert_eq!(missing, vec![(Step::Products, Step::Categories)]);
    }
}
