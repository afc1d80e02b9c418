// src/dag/critical_path.rs

//! Maximum-effort dependency chain. A reporting aid only; scheduling never
//! consults it.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::dag::{DependencyGraph, Task, TaskId};

/// Ids along the chain with the largest summed `estimated_effort`, ordered
/// from root to sink.
///
/// Ties between chains (and between candidate predecessors) go to the
/// earliest task id.
pub fn critical_path(graph: &DependencyGraph, tasks: &BTreeMap<TaskId, Task>) -> Vec<TaskId> {
    let order = match graph.topological_order() {
        Ok(order) => order,
        Err(err) => {
            warn!(error = %err, "dependency graph not orderable; no critical path");
            return Vec::new();
        }
    };

    // Best chain total ending at each task, plus the predecessor on it.
    let mut best: HashMap<&str, (f64, Option<&str>)> = HashMap::new();

    for id in &order {
        let Some(task) = tasks.get(id) else { continue };

        let mut pred: Option<&str> = None;
        let mut pred_total = 0.0;
        for dep in graph.dependencies_of(id) {
            if let Some(&(total, _)) = best.get(dep.as_str()) {
                if pred.is_none() || total > pred_total {
                    pred = Some(dep.as_str());
                    pred_total = total;
                }
            }
        }

        best.insert(task.id(), (task.estimated_effort() + pred_total, pred));
    }

    let mut end: Option<(&str, f64)> = None;
    for id in tasks.keys() {
        if let Some(&(total, _)) = best.get(id.as_str()) {
            if end.is_none_or(|(_, best_total)| total > best_total) {
                end = Some((id.as_str(), total));
            }
        }
    }

    let mut path = Vec::new();
    let mut cursor = end.map(|(id, _)| id);
    while let Some(id) = cursor {
        path.push(id.to_string());
        cursor = best.get(id).and_then(|&(_, pred)| pred);
    }
    path.reverse();
    path
}
