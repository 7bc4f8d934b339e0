//! Regular expressions compiled into a deterministic finite automaton.
//!
//! A pattern goes through the tokenizer, the parser, Thompson's construction,
//! epsilon elimination and finally subset construction. The resulting [`Regex`]
//! only answers whether a whole string belongs to the language of the pattern.

use ast::RegexAstNode;
use dfa::Dfa;
use nfa::Nfa;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub use error::RegexError;

mod ast;
mod dfa;
mod error;
mod nfa;
mod token;

/// Compiles `pattern`, same as [`Regex::new`].
pub fn compile(pattern: &str) -> Result<Regex, RegexError> {
    Regex::new(pattern)
}

#[derive(Debug, Clone)]
pub struct Regex {
    pattern: String,
    dfa: Dfa,
}

impl Regex {
    pub fn new(pattern: &str) -> Result<Self, RegexError> {
        let ast = RegexAstNode::new(pattern)?;
        log::trace!("ast of {pattern:?}: {ast:?}");

        let nfa = Nfa::from_ast(&ast).into_epsilon_free();
        let dfa = Dfa::from_nfa(&nfa);
        log::debug!(
            "compiled {pattern:?}: {} nfa states, {} dfa states",
            nfa.state_count(),
            dfa.state_count()
        );

        Ok(Self {
            pattern: pattern.to_string(),
            dfa,
        })
    }

    /// Returns `true` if the whole `input` is matched, this is not a substring search.
    pub fn matches(&self, input: &str) -> bool {
        self.dfa.is_match(input)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Number of DFA states, all of them reachable from the init state.
    pub fn state_count(&self) -> usize {
        self.dfa.state_count()
    }

    pub fn init_state(&self) -> usize {
        self.dfa.init()
    }

    pub fn is_accept_state(&self, state: usize) -> bool {
        self.dfa.is_accepting(state)
    }

    /// Every `(from, char, to)` transition, ordered by state and then by character.
    pub fn transitions(&self) -> impl Iterator<Item = (usize, char, usize)> + '_ {
        self.dfa.transitions()
    }
}

impl FromStr for Regex {
    type Err = RegexError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        Regex::new(pattern)
    }
}

/// Dumps the transition table, one state per line.
impl Display for Regex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dfa)
    }
}
