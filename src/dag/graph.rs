// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::dag::TaskId;
use crate::errors::{AgentDevError, Result};

static NO_TASKS: BTreeSet<TaskId> = BTreeSet::new();

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one can run.
    deps: BTreeSet<TaskId>,
    /// Direct dependents: tasks that depend on this one.
    dependents: BTreeSet<TaskId>,
}

/// Directed graph over task ids. Edge `dep -> task` exists iff `dep` is in
/// `task`'s dependency set.
///
/// Owns no task data. Every edge endpoint is a known node, and an edge that
/// would close a cycle is refused, so the graph is acyclic at all times.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<TaskId, DagNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Register a node with no edges.
    pub fn add_node(&mut self, id: &str) -> Result<()> {
        if self.nodes.contains_key(id) {
            return Err(AgentDevError::DuplicateTask(id.to_string()));
        }
        self.nodes.insert(id.to_string(), DagNode::default());
        Ok(())
    }

    /// Insert edge `dep -> task`.
    pub fn add_edge(&mut self, dep: &str, task: &str) -> Result<()> {
        if dep == task {
            return Err(AgentDevError::SelfDependency(task.to_string()));
        }
        if !self.nodes.contains_key(task) {
            return Err(AgentDevError::TaskNotFound(task.to_string()));
        }
        if !self.nodes.contains_key(dep) {
            return Err(AgentDevError::UnknownDependency {
                task: task.to_string(),
                dependency: dep.to_string(),
            });
        }

        // `task` already reaching `dep` means the new edge closes a loop.
        let downstream = self.descendants(task);
        if downstream.contains(dep) {
            let upstream = self.ancestors(dep);
            let mut cycle: Vec<TaskId> = downstream
                .into_iter()
                .filter(|id| id == dep || upstream.contains(id))
                .collect();
            cycle.push(task.to_string());
            cycle.sort();
            return Err(AgentDevError::DagCycle(cycle));
        }

        if let Some(node) = self.nodes.get_mut(task) {
            node.deps.insert(dep.to_string());
        }
        if let Some(node) = self.nodes.get_mut(dep) {
            node.dependents.insert(task.to_string());
        }
        Ok(())
    }

    /// All node ids, in ascending order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, id: &str) -> &BTreeSet<TaskId> {
        self.nodes.get(id).map(|n| &n.deps).unwrap_or(&NO_TASKS)
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, id: &str) -> &BTreeSet<TaskId> {
        self.nodes.get(id).map(|n| &n.dependents).unwrap_or(&NO_TASKS)
    }

    /// Nodes without dependencies.
    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.deps.is_empty())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Every task reachable by following dependency edges backwards.
    pub fn ancestors(&self, id: &str) -> BTreeSet<TaskId> {
        self.walk(id, |node| &node.deps)
    }

    /// Every task that transitively depends on `id`.
    pub fn descendants(&self, id: &str) -> BTreeSet<TaskId> {
        self.walk(id, |node| &node.dependents)
    }

    /// Dependencies-first ordering of all nodes.
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for id in self.nodes.keys() {
            graph.add_node(id.as_str());
        }
        for (id, node) in &self.nodes {
            for dep in &node.deps {
                graph.add_edge(dep.as_str(), id.as_str(), ());
            }
        }

        toposort(&graph, None)
            .map(|order| order.into_iter().map(str::to_string).collect())
            .map_err(|cycle| AgentDevError::DagCycle(vec![cycle.node_id().to_string()]))
    }

    fn walk<'a, F>(&'a self, start: &str, next: F) -> BTreeSet<TaskId>
    where
        F: Fn(&'a DagNode) -> &'a BTreeSet<TaskId>,
    {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = match self.nodes.get(start) {
            Some(node) => next(node).iter().map(|s| s.as_str()).collect(),
            None => return seen,
        };

        while let Some(id) = stack.pop() {
            if !seen.insert(id.to_string()) {
                continue;
            }
            if let Some(node) = self.nodes.get(id) {
                stack.extend(next(node).iter().map(|s| s.as_str()));
            }
        }
        seen
    }
}

/// Find one dependency cycle among `nodes`, given `(dep, task)` edges.
///
/// Returns the ids of the offending strongly connected component, sorted, or
/// `None` when the edges form a DAG. Edges that mention unknown nodes are
/// ignored; callers report those separately.
pub fn find_cycle<'a, N, E>(nodes: N, edges: E) -> Option<Vec<TaskId>>
where
    N: IntoIterator<Item = &'a str>,
    E: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in nodes {
        graph.add_node(node);
    }
    for (dep, task) in edges {
        if graph.contains_node(dep) && graph.contains_node(task) {
            graph.add_edge(dep, task, ());
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut ids: Vec<TaskId> = scc.into_iter().map(str::to_string).collect();
            ids.sort();
            ids
        })
        .min()
}
