//! Configuration validation.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::schema::{Config, SubmitMode};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn collected errors into a single `ConfigError`.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        let message = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Invalid(message))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_agents(config, &mut result);
        Self::validate_debate(config, &mut result);
        Self::validate_timings(config, &mut result);

        result
    }

    fn validate_agents(config: &Config, result: &mut ValidationResult) {
        if config.agents.len() != 2 {
            result.add_error(ValidationError::new(
                "agents",
                format!("exactly two agents are required, found {}", config.agents.len()),
            ));
        }

        let mut names = HashSet::new();
        for (i, agent) in config.agents.iter().enumerate() {
            let path = format!("agents[{}]", i);
            if agent.name.trim().is_empty() {
                result.add_error(ValidationError::new(format!("{}.name", path), "name cannot be empty"));
            } else if !names.insert(agent.name.trim().to_lowercase()) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("duplicate agent name '{}'", agent.name),
                ));
            }

            if agent.url.trim().is_empty() {
                result.add_error(ValidationError::new(format!("{}.url", path), "url cannot be empty"));
            }

            if agent.submit == SubmitMode::Button && agent.submit_labels.is_empty() {
                result.add_warning(ValidationWarning::new(
                    format!("{}.submit_labels", path),
                    "submit = \"button\" without labels; the default send labels will be tried",
                ));
            }
        }
    }

    fn validate_debate(config: &Config, result: &mut ValidationResult) {
        if config.debate.rounds == 0 {
            result.add_error(ValidationError::new("debate.rounds", "rounds must be greater than 0"));
        }

        if config.debate.rounds > 100 {
            result.add_warning(ValidationWarning::new(
                "debate.rounds",
                "rounds is very high (>100), the chat sites may rate-limit the session",
            ));
        }
    }

    fn validate_timings(config: &Config, result: &mut ValidationResult) {
        let t = &config.timings;

        if t.poll_interval_ms == 0 {
            result.add_error(ValidationError::new("timings.poll_interval_ms", "must be greater than 0"));
        }

        if t.discovery_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "timings.discovery_interval_ms",
                "must be greater than 0",
            ));
        }

        if t.discovery_attempts == 0 {
            result.add_error(ValidationError::new(
                "timings.discovery_attempts",
                "must be greater than 0",
            ));
        }

        if t.settle_checks == 0 {
            result.add_error(ValidationError::new("timings.settle_checks", "must be greater than 0"));
        }

        if t.probe_max_chars == 0 {
            result.add_error(ValidationError::new("timings.probe_max_chars", "must be greater than 0"));
        }

        if t.start_timeout_ms > t.round_timeout_ms {
            result.add_error(ValidationError::new(
                "timings.start_timeout_ms",
                "cannot exceed round_timeout_ms",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
