use crate::nfa::{EpsilonFreeNfa, StateSet};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

pub(crate) type DfaStateId = usize;

#[derive(Debug, Default, Clone)]
struct DfaState {
    /// A missing character means the input is rejected.
    transitions: BTreeMap<char, DfaStateId>,
}

#[derive(Debug, Clone)]
pub(crate) struct Dfa {
    states: Vec<DfaState>,
    init: DfaStateId,
    accept_states: BTreeSet<DfaStateId>,
}

/// Subset construction state: every distinct set of NFA states gets exactly
/// one DFA state, ids are handed out in order of first appearance.
struct SubsetConstruction<'a> {
    nfa: &'a EpsilonFreeNfa,
    ids: HashMap<StateSet, DfaStateId>,
    subsets: Vec<StateSet>,
    states: Vec<DfaState>,
    pending: Vec<DfaStateId>,
}

impl<'a> SubsetConstruction<'a> {
    fn new(nfa: &'a EpsilonFreeNfa) -> Self {
        Self {
            nfa,
            ids: HashMap::new(),
            subsets: Vec::new(),
            states: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Id of the DFA state for `subset`, scheduling it for expansion when it is new.
    fn intern(&mut self, subset: StateSet) -> DfaStateId {
        if let Some(&id) = self.ids.get(&subset) {
            return id;
        }

        let id = self.states.len();
        log::trace!("dfa state {id} stands for {} nfa states", subset.len());
        self.ids.insert(subset.clone(), id);
        self.subsets.push(subset);
        self.states.push(DfaState::default());
        self.pending.push(id);
        id
    }

    /// For each character, the union of the destinations of every state in `subset`.
    fn merge_transitions(&self, subset: &StateSet) -> BTreeMap<char, StateSet> {
        let mut merged: BTreeMap<char, StateSet> = BTreeMap::new();
        for id in subset.iter() {
            for (&c, targets) in self.nfa.transitions(id) {
                merged
                    .entry(c)
                    .or_insert_with(|| StateSet::new(self.nfa.state_count()))
                    .extend(targets.iter().copied());
            }
        }
        merged
    }

    fn run(mut self) -> Dfa {
        let nfa = self.nfa;
        let mut init_subset = StateSet::new(nfa.state_count());
        init_subset.extend(nfa.init_closure().iter().copied());
        let init = self.intern(init_subset);

        while let Some(id) = self.pending.pop() {
            let merged = self.merge_transitions(&self.subsets[id]);
            for (c, next_subset) in merged {
                let next = self.intern(next_subset);
                self.states[id].transitions.insert(c, next);
            }
        }

        let accept_states = self
            .subsets
            .iter()
            .enumerate()
            .filter(|(_, subset)| subset.contains(nfa.accept()))
            .map(|(id, _)| id)
            .collect();

        Dfa {
            states: self.states,
            init,
            accept_states,
        }
    }
}

impl Dfa {
    pub(crate) fn from_nfa(nfa: &EpsilonFreeNfa) -> Self {
        let dfa = SubsetConstruction::new(nfa).run();
        log::debug!(
            "subset construction produced {} dfa states from {} nfa states",
            dfa.state_count(),
            nfa.state_count()
        );
        dfa
    }

    /// Whole-string match, gives up at the first character without a transition.
    pub(crate) fn is_match(&self, input: &str) -> bool {
        let mut state = self.init;
        for c in input.chars() {
            match self.states[state].transitions.get(&c) {
                Some(&next) => state = next,
                None => return false,
            }
        }
        self.accept_states.contains(&state)
    }

    pub(crate) fn state_count(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn transitions(&self) -> impl Iterator<Item = (DfaStateId, char, DfaStateId)> + '_ {
        self.states.iter().enumerate().flat_map(|(id, state)| {
            state
                .transitions
                .iter()
                .map(move |(&c, &next)| (id, c, next))
        })
    }

    pub(crate) fn init(&self) -> DfaStateId {
        self.init
    }

    pub(crate) fn is_accepting(&self, id: DfaStateId) -> bool {
        self.accept_states.contains(&id)
    }
}

impl Display for Dfa {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let accept = self
            .accept_states
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("|");
        write!(f, "[init: {}, accept: {}]", self.init, accept)?;

        for (id, state) in self.states.iter().enumerate() {
            let transitions = state
                .transitions
                .iter()
                .map(|(c, next)| format!("{}->{}", c.escape_debug(), next))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "\n{id}: {{{transitions}}}")?;
        }
        Ok(())
    }
}
