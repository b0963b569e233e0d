//! Per-block measurement trees and whole experiment runs.

use crate::domain::field::{FieldPath, Fields};
use crate::domain::params::ExperimentParameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A nested measurement record. Leaves are timings in seconds (or counts);
/// lists hold per-thread sub-records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementNode {
    Scalar(f64),
    List(Vec<MeasurementNode>),
    Record(BTreeMap<String, MeasurementNode>),
}

impl MeasurementNode {
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, MeasurementNode)>,
        K: Into<String>,
    {
        MeasurementNode::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn child(&self, name: &str) -> Option<&MeasurementNode> {
        match self {
            MeasurementNode::Record(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Walks `path`; on failure returns the segment that was missing.
    pub fn node_at<'p>(&self, path: &'p FieldPath) -> Result<&MeasurementNode, &'p str> {
        let mut node = self;
        for segment in path.segments() {
            node = node.child(segment).ok_or(segment)?;
        }
        Ok(node)
    }
}

impl Fields for MeasurementNode {
    fn lookup<'p>(&self, path: &'p FieldPath) -> Result<f64, &'p str> {
        match self.node_at(path)? {
            MeasurementNode::Scalar(value) => Ok(*value),
            _ => Err(path.segments().last().unwrap_or_default()),
        }
    }
}

/// One full run. `block_results` is in round order and must stay that way:
/// the round index is the x-axis of every derived series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRun {
    pub params: ExperimentParameters,
    pub block_results: Vec<MeasurementNode>,
}

impl ExperimentRun {
    pub fn num_rounds(&self) -> usize {
        self.block_results.len()
    }
}
