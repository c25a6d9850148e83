//! Pipeline topology: steps, edges and their validation

use crate::{
    core::{
        edge::{Branch, Edge},
        step::Step,
    },
    error::{PipelineError, Result},
};
use std::collections::{HashMap, HashSet};

/// A validated pipeline definition
///
/// Immutable once built; runs borrow it, so one pipeline may back many
/// concurrent runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    steps: HashMap<String, Step>,

    /// Step names in declaration order
    order: Vec<String>,

    /// Outgoing edge per step
    edges: HashMap<String, Edge>,

    entry: String,
}

impl Pipeline {
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Get a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.get(name)
    }

    /// The single step without incoming edges
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Outgoing edge of a step, `None` for terminal steps
    pub fn edge(&self, from: &str) -> Option<&Edge> {
        self.edges.get(from)
    }

    /// Step names in declaration order
    pub fn step_names(&self) -> &[String] {
        &self.order
    }

    /// Steps without outgoing edges
    pub fn terminal_steps(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|name| !self.edges.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Assembles and validates a [`Pipeline`]
#[derive(Debug)]
pub struct PipelineBuilder {
    name: String,
    steps: Vec<Step>,
    edges: Vec<(String, Edge)>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Unconditional edge
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), Edge::Unconditional(to.into())));
        self
    }

    /// Conditional edge evaluated in branch order
    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        branches: Vec<Branch>,
        otherwise: Option<String>,
    ) -> Self {
        self.edges.push((
            from.into(),
            Edge::Conditional {
                branches,
                otherwise,
            },
        ));
        self
    }

    /// Validate the topology and build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        if self.steps.is_empty() {
            return Err(PipelineError::configuration(format!(
                "pipeline '{}' has no steps",
                self.name
            )));
        }

        // Check that all step names are unique
        let mut order = Vec::with_capacity(self.steps.len());
        let mut steps = HashMap::with_capacity(self.steps.len());
        for step in self.steps {
            if steps.contains_key(&step.name) {
                return Err(PipelineError::configuration(format!(
                    "duplicate step name: {}",
                    step.name
                )));
            }
            order.push(step.name.clone());
            steps.insert(step.name.clone(), step);
        }

        let mut edges = HashMap::with_capacity(self.edges.len());
        let mut has_incoming = HashSet::new();
        for (from, edge) in self.edges {
            if !steps.contains_key(&from) {
                return Err(PipelineError::configuration(format!(
                    "edge leaves non-existent step '{}'",
                    from
                )));
            }
            if let Edge::Conditional { branches, otherwise } = &edge {
                if branches.is_empty() && otherwise.is_none() {
                    return Err(PipelineError::configuration(format!(
                        "conditional edge from '{}' has no branches",
                        from
                    )));
                }
            }
            for target in edge.targets() {
                if !steps.contains_key(target) {
                    return Err(PipelineError::configuration(format!(
                        "edge from '{}' references non-existent step '{}'",
                        from, target
                    )));
                }
                has_incoming.insert(target.to_string());
            }
            if edges.insert(from.clone(), edge).is_some() {
                return Err(PipelineError::configuration(format!(
                    "step '{}' has more than one outgoing edge",
                    from
                )));
            }
        }

        let entries: Vec<&String> = order.iter().filter(|n| !has_incoming.contains(*n)).collect();
        let entry = match entries.as_slice() {
            [entry] => (*entry).clone(),
            [] => {
                return Err(PipelineError::configuration(format!(
                    "pipeline '{}' has no entry step (every step has an incoming edge)",
                    self.name
                )))
            }
            many => {
                let names: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
                return Err(PipelineError::configuration(format!(
                    "pipeline '{}' has more than one entry step: {}",
                    self.name,
                    names.join(", ")
                )));
            }
        };

        if order.iter().all(|n| edges.contains_key(n)) {
            return Err(PipelineError::configuration(format!(
                "pipeline '{}' has no terminal step",
                self.name
            )));
        }

        Ok(Pipeline {
            name: self.name,
            steps,
            order,
            edges,
            entry,
        })
    }
}
