//! Pipeline configuration

/// Default revise→review round trips per run
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// Optional stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StageFlags {
    /// Run the Plan stage
    pub planning: bool,
    /// Split the plan into numbered steps, generated and reviewed one by one
    ///
    /// Implies `planning`.
    pub stepping: bool,
    /// Synthesize and run a test command before each review
    pub testing: bool,
    /// Run the Summarize stage
    pub summary: bool,
}

impl StageFlags {
    /// Whether the Plan stage runs
    #[inline]
    #[must_use]
    pub fn runs_plan(&self) -> bool {
        self.planning || self.stepping
    }
}

impl Default for StageFlags {
    fn default() -> Self {
        Self {
            planning: false,
            stepping: false,
            testing: false,
            summary: true,
        }
    }
}

/// Scheduler settings
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Revise→review round trips allowed per run, shared across steps
    pub max_iterations: u32,
    /// Optional stages
    pub stages: StageFlags,
    /// Re-run tests after each revision when testing is on
    pub retest_after_revision: bool,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max iterations
    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// With stage flags
    #[inline]
    #[must_use]
    pub fn with_stages(mut self, stages: StageFlags) -> Self {
        self.stages = stages;
        self
    }

    /// With planning
    #[inline]
    #[must_use]
    pub fn with_planning(mut self, on: bool) -> Self {
        self.stages.planning = on;
        self
    }

    /// With stepping
    #[inline]
    #[must_use]
    pub fn with_stepping(mut self, on: bool) -> Self {
        self.stages.stepping = on;
        self
    }

    /// With testing
    #[inline]
    #[must_use]
    pub fn with_testing(mut self, on: bool) -> Self {
        self.stages.testing = on;
        self
    }

    /// With summary
    #[inline]
    #[must_use]
    pub fn with_summary(mut self, on: bool) -> Self {
        self.stages.summary = on;
        self
    }

    /// With re-testing after revisions
    #[inline]
    #[must_use]
    pub fn with_retest_after_revision(mut self, on: bool) -> Self {
        self.retest_after_revision = on;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stages: StageFlags::default(),
            retest_after_revision: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_iterations, 3);
        assert!(config.stages.summary);
        assert!(!config.stages.planning && !config.stages.stepping && !config.stages.testing);
        assert!(config.retest_after_revision);
    }

    #[test]
    fn stepping_implies_plan() {
        let config = PipelineConfig::new().with_stepping(true);
        assert!(config.stages.runs_plan());
        assert!(!PipelineConfig::new().stages.runs_plan());
    }

    #[test]
    fn partial_deserialization_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"max_iterations":5,"stages":{"testing":true}}"#).unwrap();
        assert_eq!(config.max_iterations, 5);
        assert!(config.stages.testing);
        assert!(config.stages.summary);
        assert!(config.retest_after_revision);
    }
}
