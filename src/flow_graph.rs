//! Task dependency graph built from `context:` lists (Arc<str> optimized)
//!
//! Edges run upstream -> downstream. Execution order is a Kahn walk that
//! prefers declaration order among ready tasks, so a linear chain runs
//! exactly as declared.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::error::CrewError;
use crate::task::TaskSpec;

pub struct FlowGraph {
    /// task_id -> downstream task_ids
    adjacency: HashMap<Arc<str>, Vec<Arc<str>>>,
    /// task_id -> upstream task_ids, in `context:` order
    predecessors: HashMap<Arc<str>, Vec<Arc<str>>>,
    /// Declaration order
    task_ids: Vec<Arc<str>>,
}

impl FlowGraph {
    /// Build the graph, rejecting duplicate ids, unknown upstreams and self-references
    pub fn from_tasks(tasks: &[TaskSpec]) -> Result<Self, CrewError> {
        let capacity = tasks.len();
        let mut adjacency: HashMap<Arc<str>, Vec<Arc<str>>> = HashMap::with_capacity(capacity);
        let mut predecessors: HashMap<Arc<str>, Vec<Arc<str>>> = HashMap::with_capacity(capacity);
        let mut task_ids: Vec<Arc<str>> = Vec::with_capacity(capacity);
        let mut task_set: HashSet<Arc<str>> = HashSet::with_capacity(capacity);

        // Create Arc<str> once per task, reuse everywhere
        for task in tasks {
            let id: Arc<str> = Arc::from(task.id.as_str());
            if !task_set.insert(Arc::clone(&id)) {
                return Err(CrewError::DuplicateTask { id: task.id.clone() });
            }
            task_ids.push(Arc::clone(&id));
            adjacency.insert(Arc::clone(&id), Vec::new());
            predecessors.insert(id, Vec::new());
        }

        for task in tasks {
            let target = task_set
                .get(task.id.as_str())
                .cloned()
                .unwrap_or_else(|| Arc::from(task.id.as_str()));

            for upstream in &task.context {
                if upstream == &task.id {
                    return Err(CrewError::CircularContext {
                        task_id: task.id.clone(),
                    });
                }
                let source = task_set.get(upstream.as_str()).cloned().ok_or_else(|| {
                    CrewError::UnknownUpstream {
                        upstream: upstream.clone(),
                        task_id: task.id.clone(),
                    }
                })?;

                adjacency
                    .entry(Arc::clone(&source))
                    .or_default()
                    .push(Arc::clone(&target));
                predecessors
                    .entry(Arc::clone(&target))
                    .or_default()
                    .push(source);
            }
        }

        Ok(Self {
            adjacency,
            predecessors,
            task_ids,
        })
    }

    /// Upstream tasks of `task_id`, in `context:` order
    #[inline]
    pub fn dependencies(&self, task_id: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.predecessors
            .get(task_id)
            .map(|v| v.as_slice())
            .unwrap_or(EMPTY)
    }

    /// Tasks nothing else depends on
    pub fn final_tasks(&self) -> Vec<Arc<str>> {
        self.task_ids
            .iter()
            .filter(|id| {
                self.adjacency
                    .get(id.as_ref())
                    .map(|v| v.is_empty())
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }

    /// Topological order; ties resolve by declaration order
    pub fn execution_order(&self) -> Result<Vec<Arc<str>>, CrewError> {
        let n = self.task_ids.len();
        let index: HashMap<&str, usize> = self
            .task_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (&**id, i))
            .collect();
        let mut in_degree: Vec<usize> = self
            .task_ids
            .iter()
            .map(|id| self.dependencies(id).len())
            .collect();
        let mut done = vec![false; n];
        let mut order = Vec::with_capacity(n);

        while order.len() < n {
            // First ready task in declaration order
            let Some(next) = (0..n).find(|&i| !done[i] && in_degree[i] == 0) else {
                let stuck = (0..n)
                    .find(|&i| !done[i])
                    .map(|i| self.task_ids[i].to_string())
                    .unwrap_or_default();
                return Err(CrewError::CircularContext { task_id: stuck });
            };

            done[next] = true;
            let successors = self.adjacency.get(&self.task_ids[next]);
            for succ in successors.into_iter().flatten() {
                if let Some(&j) = index.get(&**succ) {
                    in_degree[j] = in_degree[j].saturating_sub(1);
                }
            }
            order.push(Arc::clone(&self.task_ids[next]));
        }

        Ok(order)
    }

    /// Check if there's a path from `from` to `to` (BFS)
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = self.adjacency.get(current) {
                for neighbor in neighbors {
                    if neighbor.as_ref() == to {
                        return true;
                    }
                    if visited.insert(neighbor.as_ref()) {
                        queue.push_back(neighbor.as_ref());
                    }
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, context: &[&str]) -> TaskSpec {
        let mut t = TaskSpec::new(id, "do it", "text", "r");
        for c in context {
            t = t.with_context(*c);
        }
        t
    }

    fn ids(order: &[Arc<str>]) -> Vec<&str> {
        order.iter().map(|s| s.as_ref()).collect()
    }

    #[test]
    fn linear_chain_keeps_declaration_order() {
        let tasks = vec![
            task("research", &[]),
            task("write", &["research"]),
            task("translate", &["write"]),
        ];
        let graph = FlowGraph::from_tasks(&tasks).unwrap();
        let order = graph.execution_order().unwrap();
        assert_eq!(ids(&order), vec!["research", "write", "translate"]);
        assert_eq!(ids(&graph.final_tasks()), vec!["translate"]);
    }

    #[test]
    fn upstream_declared_later_runs_first() {
        let tasks = vec![task("summary", &["facts"]), task("facts", &[])];
        let graph = FlowGraph::from_tasks(&tasks).unwrap();
        let order = graph.execution_order().unwrap();
        assert_eq!(ids(&order), vec!["facts", "summary"]);
    }

    #[test]
    fn diamond_runs_each_task_once() {
        let tasks = vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["a"]),
            task("d", &["b", "c"]),
        ];
        let graph = FlowGraph::from_tasks(&tasks).unwrap();
        let order = graph.execution_order().unwrap();
        assert_eq!(ids(&order), vec!["a", "b", "c", "d"]);
        assert_eq!(ids(graph.dependencies("d")), vec!["b", "c"]);
        assert!(graph.has_path("a", "d"));
        assert!(!graph.has_path("b", "c"));
    }

    #[test]
    fn unknown_upstream_rejected() {
        let tasks = vec![task("write", &["research"])];
        let err = FlowGraph::from_tasks(&tasks).err().unwrap();
        assert!(matches!(
            err,
            CrewError::UnknownUpstream { ref upstream, .. } if upstream == "research"
        ));
    }

    #[test]
    fn self_reference_rejected() {
        let tasks = vec![task("loop", &["loop"])];
        let err = FlowGraph::from_tasks(&tasks).err().unwrap();
        assert!(matches!(err, CrewError::CircularContext { .. }));
    }

    #[test]
    fn cycle_detected_in_order() {
        let tasks = vec![task("a", &["b"]), task("b", &["a"])];
        let graph = FlowGraph::from_tasks(&tasks).unwrap();
        let err = graph.execution_order().unwrap_err();
        assert!(matches!(err, CrewError::CircularContext { .. }));
    }

    #[test]
    fn duplicate_task_rejected() {
        let tasks = vec![task("a", &[]), task("a", &[])];
        let err = FlowGraph::from_tasks(&tasks).err().unwrap();
        assert!(matches!(err, CrewError::DuplicateTask { ref id } if id == "a"));
    }
}
