extern crate source_span;

pub mod automaton;
pub mod syntax;

pub use automaton::{Dfa, Nfa};
