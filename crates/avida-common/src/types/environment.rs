//! Environment - resources and reactions an organism is evaluated against
//!
//! Loading environment files is a collaborator concern. This module offers
//! programmatic construction, JSON (de)serialization, and the standard
//! logic-nine reaction table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::resource::{ResourceDef, ResourceLevels};
use crate::error::{AvidaError, ConfigError, ResourceError};

/// Logic task detected from an organism's outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Not,
    Nand,
    And,
    OrN,
    Or,
    AndN,
    Nor,
    Xor,
    Equ,
}

impl Task {
    /// All tasks in reporting order
    pub const ALL: [Task; 9] = [
        Task::Not,
        Task::Nand,
        Task::And,
        Task::OrN,
        Task::Or,
        Task::AndN,
        Task::Nor,
        Task::Xor,
        Task::Equ,
    ];

    /// Short name used in dumps
    pub fn name(&self) -> &'static str {
        match self {
            Task::Not => "not",
            Task::Nand => "nand",
            Task::And => "and",
            Task::OrN => "orn",
            Task::Or => "or",
            Task::AndN => "andn",
            Task::Nor => "nor",
            Task::Xor => "xor",
            Task::Equ => "equ",
        }
    }

    fn eval(&self, a: i32, b: i32) -> i32 {
        match self {
            Task::Not => !a,
            Task::Nand => !(a & b),
            Task::And => a & b,
            Task::OrN => a | !b,
            Task::Or => a | b,
            Task::AndN => a & !b,
            Task::Nor => !(a | b),
            Task::Xor => a ^ b,
            Task::Equ => !(a ^ b),
        }
    }

    /// Check whether `output` performs this task on the recent `inputs`
    ///
    /// One-operand tasks match any single input; two-operand tasks match any
    /// ordered pair of distinct input positions.
    pub fn check(&self, output: i32, inputs: &[i32]) -> bool {
        if *self == Task::Not {
            return inputs.iter().any(|a| self.eval(*a, 0) == output);
        }
        inputs.iter().enumerate().any(|(i, a)| {
            inputs
                .iter()
                .enumerate()
                .any(|(j, b)| i != j && self.eval(*a, *b) == output)
        })
    }
}

/// How a reaction's value is folded into the organism's bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionProcess {
    /// bonus *= 2^value
    #[default]
    Pow,
    /// bonus *= value
    Mult,
    /// bonus += value
    Add,
}

impl ReactionProcess {
    /// Apply a reward of `value` to a bonus
    pub fn apply(&self, bonus: f64, value: f64) -> f64 {
        match self {
            ReactionProcess::Pow => bonus * 2f64.powf(value),
            ReactionProcess::Mult => bonus * value,
            ReactionProcess::Add => bonus + value,
        }
    }
}

/// Resource consumed when a reaction fires
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionResource {
    /// Index into the environment's resource list
    pub resource: usize,
    /// Maximum quantity consumed per firing
    pub max: f64,
    /// Maximum fraction of the available quantity consumed per firing
    pub frac: f64,
}

impl ReactionResource {
    /// Quantity consumed given what is available
    pub fn consumption(&self, available: f64) -> f64 {
        (self.frac * available).min(self.max).max(0.0)
    }
}

/// A task-triggered reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    /// Triggering task
    pub task: Task,
    /// Reward value
    pub value: f64,
    /// Reward process
    #[serde(default)]
    pub process: ReactionProcess,
    /// Rewarded completions per gestation
    #[serde(default = "default_max_count")]
    pub max_count: u32,
    /// Optional consumed resource; the reward scales with `consumed / max`
    #[serde(default)]
    pub resource: Option<ReactionResource>,
}

fn default_max_count() -> u32 {
    1
}

impl Reaction {
    /// Unbounded reaction rewarding `value` with the pow process
    pub fn new(task: Task, value: f64) -> Self {
        Self {
            task,
            value,
            process: ReactionProcess::Pow,
            max_count: 1,
            resource: None,
        }
    }

    /// Bind the reaction to a consumed resource
    pub fn consuming(mut self, resource: usize, max: f64, frac: f64) -> Self {
        self.resource = Some(ReactionResource {
            resource,
            max: max.max(f64::MIN_POSITIVE),
            frac: frac.clamp(0.0, 1.0),
        });
        self
    }
}

/// Ordered resource list plus reaction table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Environment {
    /// Resources in index order
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
    /// Reactions checked on every output
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Environment {
    /// Environment with no resources and no reactions
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard logic-nine reaction table with no resources
    pub fn logic_nine() -> Self {
        let values = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0];
        Self {
            resources: Vec::new(),
            reactions: Task::ALL
                .iter()
                .zip(values)
                .map(|(task, value)| Reaction::new(*task, value))
                .collect(),
        }
    }

    /// Append a resource definition
    pub fn with_resource(mut self, def: ResourceDef) -> Self {
        self.resources.push(def);
        self
    }

    /// Append a reaction
    pub fn with_reaction(mut self, reaction: Reaction) -> Self {
        self.reactions.push(reaction);
        self
    }

    /// Number of resources
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Index of a resource by name
    pub fn resource_index(&self, name: &str) -> Result<usize, ResourceError> {
        self.resources
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| ResourceError::UnknownResource(name.to_string()))
    }

    /// Initial quantities of every resource
    pub fn initial_levels(&self) -> ResourceLevels {
        ResourceLevels::from_clipped(self.resources.iter().map(|r| r.initial))
    }

    /// Check internal consistency (unique names, valid reaction resources)
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, def) in self.resources.iter().enumerate() {
            if self.resources[..i].iter().any(|other| other.name == def.name) {
                return Err(ConfigError::Environment(format!(
                    "duplicate resource name '{}'",
                    def.name
                )));
            }
            if !(def.initial.is_finite() && def.inflow.is_finite()) {
                return Err(ConfigError::Environment(format!(
                    "quantities of '{}' must be finite",
                    def.name
                )));
            }
            if !(0.0..=1.0).contains(&def.outflow) {
                return Err(ConfigError::Environment(format!(
                    "outflow of '{}' must be within 0..=1",
                    def.name
                )));
            }
        }
        for reaction in &self.reactions {
            if !reaction.value.is_finite() {
                return Err(ConfigError::Environment(format!(
                    "reaction {} has a non-finite value",
                    reaction.task.name()
                )));
            }
            if let Some(bound) = &reaction.resource {
                if bound.resource >= self.resources.len() {
                    return Err(ConfigError::Environment(format!(
                        "reaction {} consumes unknown resource index {}",
                        reaction.task.name(),
                        bound.resource
                    )));
                }
                if !(bound.max.is_finite() && bound.max > 0.0) {
                    return Err(ConfigError::Environment(format!(
                        "reaction {} must consume a positive finite max",
                        reaction.task.name()
                    )));
                }
                if !(0.0..=1.0).contains(&bound.frac) {
                    return Err(ConfigError::Environment(format!(
                        "reaction {} consumption fraction must be within 0..=1",
                        reaction.task.name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse and validate an environment from JSON
    pub fn from_json(text: &str) -> Result<Self, AvidaError> {
        let env: Environment = serde_json::from_str(text)?;
        env.validate()?;
        debug!(
            resources = env.resources.len(),
            reactions = env.reactions.len(),
            "Loaded environment"
        );
        Ok(env)
    }
}
