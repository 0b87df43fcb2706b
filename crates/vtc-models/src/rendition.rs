//! Rendition specs and the deployment rendition plan.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Duplicate rendition name in plan: {0}")]
    DuplicateName(String),

    #[error("Rendition plan is empty")]
    Empty,
}

/// One target output profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionSpec {
    /// Human-scannable profile name, e.g. "720p"
    pub name: String,
    /// Target frame width in pixels
    pub width: u32,
    /// Target frame height in pixels
    pub height: u32,
    /// Optional target video bitrate, e.g. "1500k"
    pub bitrate: Option<String>,
}

impl RenditionSpec {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            bitrate: None,
        }
    }

    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = Some(bitrate.into());
        self
    }
}

/// Ordered set of target output profiles for one deployment.
///
/// Names are unique within a plan; construction rejects duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionPlan {
    specs: Vec<RenditionSpec>,
}

impl RenditionPlan {
    pub fn new(specs: Vec<RenditionSpec>) -> Result<Self, PlanError> {
        if specs.is_empty() {
            return Err(PlanError::Empty);
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(PlanError::DuplicateName(spec.name.clone()));
            }
        }
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[RenditionSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenditionSpec> {
        self.specs.iter()
    }
}

/// The plan this deployment ships with: three H.264 ladder rungs.
pub fn default_plan() -> RenditionPlan {
    RenditionPlan::new(vec![
        RenditionSpec::new("360p", 480, 360),
        RenditionSpec::new("480p", 858, 480),
        RenditionSpec::new("720p", 1280, 720),
    ])
    .expect("default plan is statically valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_order() {
        let plan = default_plan();
        let names: Vec<_> = plan.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["360p", "480p", "720p"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = RenditionPlan::new(vec![
            RenditionSpec::new("720p", 1280, 720),
            RenditionSpec::new("720p", 1920, 1080),
        ]);
        assert!(matches!(result, Err(PlanError::DuplicateName(n)) if n == "720p"));
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert!(matches!(RenditionPlan::new(vec![]), Err(PlanError::Empty)));
    }

    #[test]
    fn test_bitrate_builder() {
        let spec = RenditionSpec::new("480p", 858, 480).with_bitrate("1200k");
        assert_eq!(spec.bitrate.as_deref(), Some("1200k"));
    }
}
