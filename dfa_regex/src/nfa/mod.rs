mod closure;
mod set;

pub(crate) use closure::EpsilonFreeNfa;
pub(crate) use set::StateSet;

use crate::ast::RegexAstNode;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) type StateId = usize;

#[derive(Debug, Default, Clone)]
pub(crate) struct NfaState {
    /// `None` labels epsilon transitions.
    transitions: BTreeMap<Option<char>, BTreeSet<StateId>>,
}

/// Sub-graph with a single entry and a single exit, the unit of composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fragment {
    init: StateId,
    accept: StateId,
    /// Lowest arena id allocated for this fragment. Edges into `init` only
    /// come from the fragment's own states, so they all start at or after it.
    first: StateId,
}

/// States live in an arena and refer to each other by index. States merged
/// away while splicing fragments stay in the arena but become unreachable.
#[derive(Debug)]
pub(crate) struct Nfa {
    states: Vec<NfaState>,
    init: StateId,
    accept: StateId,
}

impl Nfa {
    pub(crate) fn from_ast(ast: &RegexAstNode) -> Self {
        let mut builder = NfaBuilder::default();
        let fragment = builder.build(ast);

        Nfa {
            states: builder.states,
            init: fragment.init,
            accept: fragment.accept,
        }
    }
}

#[derive(Default)]
struct NfaBuilder {
    states: Vec<NfaState>,
}

impl NfaBuilder {
    fn add_state(&mut self) -> StateId {
        self.states.push(NfaState::default());
        self.states.len() - 1
    }

    fn add_transition(&mut self, start: StateId, label: Option<char>, end: StateId) {
        self.states[start]
            .transitions
            .entry(label)
            .or_default()
            .insert(end);
    }

    fn new_fragment(&mut self) -> Fragment {
        let init = self.add_state();
        let accept = self.add_state();
        Fragment {
            init,
            accept,
            first: init,
        }
    }

    fn build(&mut self, node: &RegexAstNode) -> Fragment {
        let first = self.states.len();
        let fragment = match node {
            RegexAstNode::Epsilon => self.epsilon_fragment(),
            RegexAstNode::Char(char_set) => self.char_set_fragment(char_set),
            RegexAstNode::Concatenation(children) => self.concatenation_fragment(children),
            RegexAstNode::Union(children) => self.union_fragment(children),
            RegexAstNode::Quantification {
                operand,
                lower_bound,
                upper_bound,
            } => self.quantification_fragment(operand, *lower_bound, *upper_bound),
        };
        Fragment { first, ..fragment }
    }

    fn epsilon_fragment(&mut self) -> Fragment {
        let fragment = self.new_fragment();
        self.add_transition(fragment.init, None, fragment.accept);
        fragment
    }

    fn char_set_fragment(&mut self, char_set: &BTreeSet<char>) -> Fragment {
        let fragment = self.new_fragment();
        for &c in char_set {
            self.add_transition(fragment.init, Some(c), fragment.accept);
        }
        fragment
    }

    fn concatenation_fragment(&mut self, children: &[RegexAstNode]) -> Fragment {
        let Some((first, rest)) = children.split_first() else {
            return self.epsilon_fragment();
        };

        let mut fragment = self.build(first);
        for child in rest {
            let next = self.build(child);
            fragment = self.append(fragment, next);
        }
        fragment
    }

    fn union_fragment(&mut self, children: &[RegexAstNode]) -> Fragment {
        let alternatives: Vec<Fragment> = children.iter().map(|child| self.build(child)).collect();

        let fragment = self.new_fragment();
        for alternative in alternatives {
            self.add_transition(fragment.init, None, alternative.init);
            self.add_transition(alternative.accept, None, fragment.accept);
        }
        fragment
    }

    /// Mandatory copies first, then either `upper - lower` optional copies or
    /// one Kleene closure. Starts from a single state that is both init and
    /// accept, which is the whole result for `{0}`.
    fn quantification_fragment(
        &mut self,
        operand: &RegexAstNode,
        lower_bound: usize,
        upper_bound: Option<usize>,
    ) -> Fragment {
        let state = self.add_state();
        let mut fragment = Fragment {
            init: state,
            accept: state,
            first: state,
        };

        for _ in 0..lower_bound {
            let copy = self.build(operand);
            fragment = self.append(fragment, copy);
        }

        match upper_bound {
            Some(upper_bound) => {
                for _ in lower_bound..upper_bound {
                    let copy = self.build(operand);
                    let optional = self.make_optional(copy);
                    fragment = self.append(fragment, optional);
                }
            }
            None => {
                let copy = self.build(operand);
                let closure = self.kleene_closure(copy);
                fragment = self.append(fragment, closure);
            }
        }

        fragment
    }

    fn make_optional(&mut self, fragment: Fragment) -> Fragment {
        self.add_transition(fragment.init, None, fragment.accept);
        fragment
    }

    fn kleene_closure(&mut self, target: Fragment) -> Fragment {
        let fragment = self.new_fragment();

        self.add_transition(fragment.init, None, target.init);
        self.add_transition(target.accept, None, fragment.accept);
        // loop back for the next iteration
        self.add_transition(target.accept, None, target.init);
        // zero iterations
        self.add_transition(fragment.init, None, fragment.accept);

        Fragment {
            first: target.first,
            ..fragment
        }
    }

    /// Splices `tail` after `head` by merging the accept state of `head` with the init state of `tail`.
    fn append(&mut self, head: Fragment, tail: Fragment) -> Fragment {
        self.fuse(head.accept, tail.init, tail.first);

        let accept = if tail.accept == tail.init {
            head.accept
        } else {
            tail.accept
        };

        Fragment {
            init: head.init,
            accept,
            first: head.first,
        }
    }

    /// `into` takes over the outgoing transitions of `from` and every edge
    /// pointing at `from`. Only states from `scan_from` on can point at it.
    fn fuse(&mut self, into: StateId, from: StateId, scan_from: StateId) {
        let moved = std::mem::take(&mut self.states[from].transitions);
        for (label, targets) in moved {
            let targets = targets
                .into_iter()
                .map(|target| if target == from { into } else { target });
            self.states[into]
                .transitions
                .entry(label)
                .or_default()
                .extend(targets);
        }

        for state in &mut self.states[scan_from..] {
            for targets in state.transitions.values_mut() {
                if targets.remove(&from) {
                    targets.insert(into);
                }
            }
        }
    }
}

#[cfg(test)]
impl Nfa {
    fn follow_epsilons(&self, initial_states: &[StateId]) -> BTreeSet<StateId> {
        let mut reachable = BTreeSet::new();
        let mut stack = initial_states.to_vec();

        while let Some(cur) = stack.pop() {
            if reachable.insert(cur) {
                if let Some(targets) = self.states[cur].transitions.get(&None) {
                    stack.extend(targets);
                }
            }
        }

        reachable
    }

    /// Direct simulation, used to check the construction independently of the DFA.
    pub(crate) fn accepts(&self, s: &str) -> bool {
        let mut current_states = self.follow_epsilons(&[self.init]);
        for c in s.chars() {
            let next_states: Vec<StateId> = current_states
                .iter()
                .filter_map(|&state| self.states[state].transitions.get(&Some(c)))
                .flatten()
                .copied()
                .collect();

            current_states = self.follow_epsilons(&next_states);
            if current_states.is_empty() {
                return false;
            }
        }

        current_states.contains(&self.accept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn nfa_of(pattern: &str) -> Nfa {
        Nfa::from_ast(&RegexAstNode::new(pattern).unwrap())
    }

    mod from_char {
        use super::*;

        #[test]
        fn should_match_nfa_char_and_dont_any_other() {
            for i in 32..=126u8 {
                // build nfa for each char
                let pattern_char = i as char;
                let nfa = Nfa::from_ast(&RegexAstNode::Char(BTreeSet::from([pattern_char])));

                // should match the same char
                assert!(nfa.accepts(&pattern_char.to_string()));

                // shouldn't match any other one
                for x in 32..=126u8 {
                    if i != x {
                        assert!(!nfa.accepts(&(x as char).to_string()));
                    }
                }
            }
        }

        #[test]
        fn char_set_fans_out_into_parallel_edges() {
            // when
            let nfa = nfa_of("[a-c]");

            // then
            let labels: Vec<_> = nfa.states[nfa.init].transitions.keys().copied().collect();
            assert_eq!(labels, vec![Some('a'), Some('b'), Some('c')]);
            for targets in nfa.states[nfa.init].transitions.values() {
                assert_eq!(targets, &BTreeSet::from([nfa.accept]));
            }
        }

        #[test]
        fn empty_char_set_matches_nothing() {
            // when
            let nfa = nfa_of("[]");

            // then
            assert!(!nfa.accepts(""));
            assert!(!nfa.accepts("]"));
        }
    }

    mod concatenate {
        use super::*;

        #[rstest]
        #[case("ab", "ab")]
        #[case("12", "12")]
        #[case("$%", "$%")]
        #[case("zz", "zz")]
        #[case("abc", "abc")]
        fn should_match_concatenated_string(#[case] pattern: &str, #[case] input: &str) {
            assert!(nfa_of(pattern).accepts(input));
        }

        #[rstest]
        #[case("ab", "a")]
        #[case("ab", "abc")]
        #[case("ab", "")]
        #[case("ab", "ba")]
        #[case("ab", "b")]
        #[case("ab", "aa")]
        fn should_not_match_concatenated_string(#[case] pattern: &str, #[case] input: &str) {
            assert!(!nfa_of(pattern).accepts(input));
        }

        #[test]
        fn accept_state_is_merged_with_the_next_init() {
            // when
            let nfa = nfa_of("ab");

            // then
            let middle = *nfa.states[nfa.init].transitions[&Some('a')]
                .first()
                .unwrap();
            assert_eq!(
                nfa.states[middle].transitions[&Some('b')],
                BTreeSet::from([nfa.accept])
            );
            assert!(!nfa.states[middle].transitions.contains_key(&None));
        }

        #[test]
        fn zero_width_tail_keeps_the_head_accept() {
            // when
            let nfa = nfa_of("ab{0}");

            // then
            assert!(nfa.accepts("a"));
            assert!(!nfa.accepts("ab"));
        }
    }

    mod alternate {
        use super::*;

        #[rstest]
        #[case("a|b", "a")]
        #[case("a|b", "b")]
        #[case("ab|c", "ab")]
        #[case("ab|c", "c")]
        #[case("a|", "")]
        fn should_match_alternate_string(#[case] pattern: &str, #[case] input: &str) {
            assert!(nfa_of(pattern).accepts(input));
        }

        #[rstest]
        #[case("a|b", "c")]
        #[case("a|b", "ab")]
        #[case("a|b", "")]
        #[case("ab|c", "ac")]
        fn shouldnt_match_alternate_string(#[case] pattern: &str, #[case] input: &str) {
            assert!(!nfa_of(pattern).accepts(input));
        }
    }

    mod quantification {
        use super::*;

        #[test]
        fn zero_repetitions_is_a_single_state() {
            // when
            let nfa = nfa_of("a{0}");

            // then
            assert_eq!(nfa.init, nfa.accept);
            assert!(nfa.accepts(""));
            assert!(!nfa.accepts("a"));
        }

        #[rstest]
        #[case("a*", "")]
        #[case("a*", "aaaa")]
        #[case("a+", "a")]
        #[case("a+", "aaa")]
        #[case("a?", "")]
        #[case("a?", "a")]
        #[case("a{3}", "aaa")]
        #[case("a{2,4}", "aa")]
        #[case("a{2,4}", "aaaa")]
        #[case("(a|b)*", "abba")]
        #[case("(a{0})*", "")]
        #[case("(ab)+", "abab")]
        fn should_match_quantified_string(#[case] pattern: &str, #[case] input: &str) {
            assert!(nfa_of(pattern).accepts(input));
        }

        #[rstest]
        #[case("a+", "")]
        #[case("a?", "aa")]
        #[case("a{3}", "aa")]
        #[case("a{3}", "aaaa")]
        #[case("a{2,4}", "a")]
        #[case("a{2,4}", "aaaaa")]
        #[case("(a|b)*", "abc")]
        #[case("(a{0})*", "a")]
        #[case("(ab)+", "aba")]
        fn shouldnt_match_quantified_string(#[case] pattern: &str, #[case] input: &str) {
            assert!(!nfa_of(pattern).accepts(input));
        }

        #[test]
        fn long_bounded_repetition_is_a_chain() {
            // when
            let nfa = nfa_of("a{2000}");

            // then
            assert_eq!(nfa.states.len(), 1 + 2 * 2000);
            assert!(nfa.accepts(&"a".repeat(2000)));
            assert!(!nfa.accepts(&"a".repeat(1999)));
            assert!(!nfa.accepts(&"a".repeat(2001)));
        }

        #[test]
        fn fragments_remember_their_first_state() {
            // given
            let mut builder = NfaBuilder::default();
            builder.add_state();

            // when
            let union = builder.build(&RegexAstNode::new("a|b").unwrap());

            // then: the union's own states come after its alternatives
            assert_eq!(union.first, 1);
            assert_eq!((union.init, union.accept), (5, 6));
        }

        #[test]
        fn self_loop_of_a_fused_state_follows_it() {
            // given
            let mut builder = NfaBuilder::default();
            let head = builder.new_fragment();
            builder.add_transition(head.init, Some('a'), head.accept);
            let looping = builder.add_state();
            builder.add_transition(looping, Some('b'), looping);
            let tail = Fragment {
                init: looping,
                accept: looping,
                first: looping,
            };

            // when
            let fragment = builder.append(head, tail);

            // then
            assert_eq!(fragment.accept, head.accept);
            assert_eq!(
                builder.states[head.accept].transitions[&Some('b')],
                BTreeSet::from([head.accept])
            );
        }

        #[test]
        fn inverted_bounds_do_not_loop() {
            // given
            let ast = RegexAstNode::Quantification {
                operand: Box::new(RegexAstNode::Char(BTreeSet::from(['a']))),
                lower_bound: 3,
                upper_bound: Some(1),
            };

            // when
            let nfa = Nfa::from_ast(&ast);

            // then
            assert!(nfa.accepts("aaa"));
        }
    }
}
