use super::{Nfa, StateId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug)]
pub(crate) struct EpsilonFreeState {
    /// Sorted destinations, already including everything epsilon-reachable from them.
    transitions: BTreeMap<char, Vec<StateId>>,
    closure: Vec<StateId>,
}

/// NFA without epsilon edges, states renumbered `0..state_count()` in
/// discovery order starting from the init state.
#[derive(Debug)]
pub(crate) struct EpsilonFreeNfa {
    states: Vec<EpsilonFreeState>,
    init: StateId,
    accept: StateId,
}

impl EpsilonFreeNfa {
    pub(crate) fn state_count(&self) -> usize {
        self.states.len()
    }

    /// The logical start: every state reachable from the init state without consuming input.
    pub(crate) fn init_closure(&self) -> &[StateId] {
        &self.states[self.init].closure
    }

    pub(crate) fn accept(&self) -> StateId {
        self.accept
    }

    pub(crate) fn transitions(&self, id: StateId) -> &BTreeMap<char, Vec<StateId>> {
        &self.states[id].transitions
    }
}

impl Nfa {
    /// Depth-first order of the states reachable from the init state, along
    /// with the position of the accept state in that order. The accept state
    /// is always listed, even when no path leads to it.
    fn reachable_states(&self) -> (Vec<StateId>, StateId) {
        let mut visited = vec![false; self.states.len()];
        let mut order = Vec::new();
        let mut accept = None;
        let mut stack = vec![self.init];

        while let Some(id) = stack.pop() {
            if visited[id] {
                continue;
            }
            visited[id] = true;
            if id == self.accept {
                accept = Some(order.len());
            }
            order.push(id);

            for targets in self.states[id].transitions.values().rev() {
                stack.extend(targets.iter().rev());
            }
        }

        let accept = accept.unwrap_or_else(|| {
            order.push(self.accept);
            order.len() - 1
        });
        (order, accept)
    }

    pub(crate) fn into_epsilon_free(self) -> EpsilonFreeNfa {
        let (order, accept) = self.reachable_states();

        let mut renumbered = vec![None; self.states.len()];
        for (new_id, &old_id) in order.iter().enumerate() {
            renumbered[old_id] = Some(new_id);
        }

        let mut epsilon_edges = Vec::with_capacity(order.len());
        let mut labeled_edges = Vec::with_capacity(order.len());
        for &old_id in &order {
            let mut epsilon = Vec::new();
            let mut labeled = BTreeMap::new();
            for (label, targets) in &self.states[old_id].transitions {
                // every target of a reachable state is reachable too
                let targets = targets.iter().filter_map(|&target| renumbered[target]);
                match label {
                    None => epsilon.extend(targets),
                    Some(c) => {
                        labeled.insert(*c, targets.collect::<Vec<_>>());
                    }
                }
            }
            epsilon_edges.push(epsilon);
            labeled_edges.push(labeled);
        }

        let mut seen = vec![false; order.len()];
        let closures: Vec<Vec<StateId>> = (0..order.len())
            .map(|id| epsilon_closure(id, &epsilon_edges, &mut seen))
            .collect();

        let states = labeled_edges
            .into_iter()
            .zip(&closures)
            .map(|(labeled, closure)| EpsilonFreeState {
                transitions: labeled
                    .into_iter()
                    .map(|(c, targets)| (c, union_of_closures(&targets, &closures)))
                    .collect(),
                closure: closure.clone(),
            })
            .collect::<Vec<_>>();

        log::debug!(
            "epsilon elimination kept {} of {} nfa states",
            states.len(),
            self.states.len()
        );

        EpsilonFreeNfa {
            states,
            init: 0,
            accept,
        }
    }
}

/// Grows `{start}` by following epsilon edges until nothing new is added,
/// the edges of each member are followed once. `seen` must be all `false`
/// and is left that way.
fn epsilon_closure(
    start: StateId,
    epsilon_edges: &[Vec<StateId>],
    seen: &mut [bool],
) -> Vec<StateId> {
    let mut closure = vec![start];
    seen[start] = true;

    let mut next = 0;
    while let Some(&id) = closure.get(next) {
        next += 1;
        for &target in &epsilon_edges[id] {
            if !seen[target] {
                seen[target] = true;
                closure.push(target);
            }
        }
    }

    for &id in &closure {
        seen[id] = false;
    }
    closure.sort_unstable();
    closure
}

fn union_of_closures(targets: &[StateId], closures: &[Vec<StateId>]) -> Vec<StateId> {
    match targets {
        [single] => closures[*single].clone(),
        _ => targets
            .iter()
            .flat_map(|&target| closures[target].iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    }
}

#[cfg(test)]
impl EpsilonFreeNfa {
    pub(crate) fn accepts(&self, s: &str) -> bool {
        let mut current: BTreeSet<StateId> = self.init_closure().iter().copied().collect();
        for c in s.chars() {
            current = current
                .iter()
                .filter_map(|&id| self.states[id].transitions.get(&c))
                .flatten()
                .copied()
                .collect();
        }
        current.contains(&self.accept)
    }
}
