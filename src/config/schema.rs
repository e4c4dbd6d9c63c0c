use crate::conditions::ConditionSet;
use crate::ts::{MatcherOptions, SwiftNameMatcher};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct LocatorConfig {
    #[serde(default)]
    pub conditions: ConditionsSection,
    #[serde(default)]
    pub matcher: MatcherOptions,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConditionsSection {
    #[serde(default)]
    pub active: Vec<String>,
}

impl LocatorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        let mut seen = BTreeSet::new();

        for (index, name) in self.conditions.active.iter().enumerate() {
            let normalized: String = name.chars().filter(|c| !c.is_whitespace()).collect();
            if normalized.is_empty() {
                issues.push(ValidationIssue::EmptyCondition { index });
                continue;
            }
            if !parens_balanced(&normalized) {
                issues.push(ValidationIssue::UnbalancedParens {
                    condition: name.clone(),
                });
            }
            if !seen.insert(normalized) {
                issues.push(ValidationIssue::DuplicateCondition {
                    condition: name.clone(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Configured conditions plus any given on the command line.
    pub fn condition_set<'a>(&self, extra: impl IntoIterator<Item = &'a str>) -> ConditionSet {
        let mut set = ConditionSet::from(self.conditions.active.clone());
        for condition in extra {
            set.insert(condition);
        }
        set
    }

    pub fn matcher<'a>(&self, extra_conditions: impl IntoIterator<Item = &'a str>) -> SwiftNameMatcher {
        SwiftNameMatcher::new(self.condition_set(extra_conditions), self.matcher)
    }
}

fn parens_balanced(name: &str) -> bool {
    let mut depth = 0usize;
    for c in name.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyCondition { index: usize },
    UnbalancedParens { condition: String },
    DuplicateCondition { condition: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyCondition { index } => {
                write!(f, "condition #{index} is empty")
            }
            ValidationIssue::UnbalancedParens { condition } => {
                write!(f, "condition '{condition}' has unbalanced parentheses")
            }
            ValidationIssue::DuplicateCondition { condition } => {
                write!(f, "condition '{condition}' is listed more than once")
            }
        }
    }
}
