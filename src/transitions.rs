// src/transitions.rs

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::models::incident::IncidentStatus;

/// Which incident status changes are accepted.
///
/// `permissive` accepts every change, which lets an NGO reopen a resolved
/// case. `forward-only` only allows pending → in progress → resolved, plus
/// pending → resolved. Writing the current status again is always allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPolicy {
    name: &'static str,
    allowed: HashMap<IncidentStatus, HashSet<IncidentStatus>>,
}

impl TransitionPolicy {
    pub fn permissive() -> Self {
        let allowed = IncidentStatus::ALL
            .iter()
            .map(|from| (*from, IncidentStatus::ALL.iter().copied().collect()))
            .collect();
        TransitionPolicy { name: "permissive", allowed }
    }

    pub fn forward_only() -> Self {
        use IncidentStatus::*;
        let mut allowed = HashMap::new();
        allowed.insert(Pending, HashSet::from([InProgress, Resolved]));
        allowed.insert(InProgress, HashSet::from([Resolved]));
        allowed.insert(Resolved, HashSet::new());
        TransitionPolicy { name: "forward-only", allowed }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn allows(&self, from: IncidentStatus, to: IncidentStatus) -> bool {
        from == to || self.allowed.get(&from).is_some_and(|targets| targets.contains(&to))
    }

    pub fn check(&self, from: IncidentStatus, to: IncidentStatus) -> AppResult<()> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(AppError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        TransitionPolicy::permissive()
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::permissive()),
            "forward-only" | "forward_only" => Ok(TransitionPolicy::forward_only()),
            other => Err(format!("unknown status transition policy '{}'", other)),
        }
    }
}
