use btree_slab::BTreeSet;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;

use super::{DisplayLabel, Dfa, Error};

/// Non deterministic finite automaton.
///
/// States are indices in `[0, num_states)`. Transitions are labeled with
/// either an alphabet symbol or `None`, the epsilon label, crossed without
/// consuming any input. Any number of targets may share a `(state, label)`
/// pair.
pub struct Nfa {
	/// Number of states.
	num_states: u32,

	/// Initial state.
	initial: u32,

	/// Transitions.
	transitions: BTreeMap<u32, BTreeMap<Option<char>, BTreeSet<u32>>>,

	/// Accepting states.
	final_states: BTreeSet<u32>,
}

impl std::fmt::Debug for Nfa {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Nfa")
			.field("num_states", &self.num_states)
			.field("initial", &self.initial)
			.field(
				"transitions",
				&self
					.transitions
					.iter()
					.map(|(state, by_label)| {
						(
							*state,
							by_label
								.iter()
								.map(|(label, targets)| {
									(*label, targets.iter().copied().collect::<Vec<u32>>())
								})
								.collect::<Vec<_>>(),
						)
					})
					.collect::<Vec<_>>(),
			)
			.field(
				"final_states",
				&self.final_states.iter().copied().collect::<Vec<u32>>(),
			)
			.finish()
	}
}

impl Nfa {
	/// Creates a new automaton with `num_states` states, no transitions and
	/// no final states.
	pub fn new(num_states: u32, initial: u32) -> Nfa {
		Nfa {
			num_states,
			initial,
			transitions: BTreeMap::new(),
			final_states: BTreeSet::new(),
		}
	}

	pub fn num_states(&self) -> u32 {
		self.num_states
	}

	pub fn initial_state(&self) -> u32 {
		self.initial
	}

	pub fn final_states(&self) -> &BTreeSet<u32> {
		&self.final_states
	}

	/// Marks `state` as accepting.
	pub fn add_final(&mut self, state: u32) {
		self.final_states.insert(state);
	}

	/// Adds a transition from `source` to `target`.
	///
	/// A `None` label is an epsilon-transition.
	pub fn add(&mut self, source: u32, label: Option<char>, target: u32) {
		self.transitions
			.entry(source)
			.or_insert_with(BTreeMap::new)
			.entry(label)
			.or_insert_with(BTreeSet::new)
			.insert(target);
	}

	/// Returns the states reachable from `state` by crossing one transition
	/// labeled `label`.
	pub fn transition(&self, state: u32, label: Option<char>) -> impl Iterator<Item = u32> + '_ {
		self.transitions
			.get(&state)
			.and_then(|transitions| transitions.get(&label))
			.into_iter()
			.flat_map(|targets| targets.iter().cloned())
	}

	/// Returns the outgoing transitions of `state`, grouped by label.
	pub fn successors(&self, state: u32) -> Successors {
		Successors::new(self.transitions.get(&state))
	}

	/// Symbols appearing on the non-epsilon transitions of the automaton.
	pub fn alphabet(&self) -> BTreeSet<char> {
		let mut alphabet = BTreeSet::new();

		for transitions in self.transitions.values() {
			for label in transitions.keys() {
				if let Some(c) = label {
					alphabet.insert(*c);
				}
			}
		}

		alphabet
	}

	/// Checks that every state referenced by the automaton is in range.
	pub fn check(&self) -> Result<(), Error> {
		if self.initial >= self.num_states {
			return Err(Error::InitialStateOutOfRange(self.initial, self.num_states));
		}

		for (source, transitions) in &self.transitions {
			if *source >= self.num_states {
				return Err(Error::StateOutOfRange(*source, self.num_states));
			}

			for targets in transitions.values() {
				for target in targets {
					if *target >= self.num_states {
						return Err(Error::StateOutOfRange(*target, self.num_states));
					}
				}
			}
		}

		for q in &self.final_states {
			if *q >= self.num_states {
				return Err(Error::FinalStateOutOfRange(*q, self.num_states));
			}
		}

		Ok(())
	}

	/// Computes the set of states reachable from `states` by crossing any
	/// number of epsilon-transitions.
	///
	/// Each state enters the worklist at most once, so the traversal is
	/// bounded by the number of states and the result does not depend on the
	/// processing order.
	pub fn epsilon_closure(&self, states: &BTreeSet<u32>) -> BTreeSet<u32> {
		let mut closure = BTreeSet::new();
		let mut stack: Vec<u32> = states.iter().cloned().collect();

		while let Some(q) = stack.pop() {
			if closure.insert(q) {
				for target in self.transition(q, None) {
					stack.push(target)
				}
			}
		}

		closure
	}

	/// Builds an equivalent deterministic automaton using the subset
	/// construction.
	///
	/// Every reachable epsilon-closed set of states becomes one state of the
	/// result, starting from the closure of the initial state. A subset is
	/// accepting iff it contains an accepting state. Symbols with no
	/// reachable target are left without a transition in the result.
	///
	/// Fails if the automaton references a state out of range.
	pub fn determinize(&self) -> Result<Dfa, Error> {
		self.check()?;

		let alphabet = self.alphabet();
		let mut dfa = Dfa::new();

		// Canonical subsets already seen, mapped to their state in the
		// result. The worklist carries the interned index along with each
		// subset.
		let mut subset_index: HashMap<BTreeSet<u32>, u32> = HashMap::new();
		let mut worklist: VecDeque<(u32, BTreeSet<u32>)> = VecDeque::new();

		let mut seed = BTreeSet::new();
		seed.insert(self.initial);
		let initial = self.epsilon_closure(&seed);

		let q0 = dfa.add_state();
		if self.intersects_final(&initial) {
			dfa.add_final(q0)
		}
		subset_index.insert(initial.clone(), q0);
		worklist.push_back((q0, initial));

		while let Some((source, subset)) = worklist.pop_front() {
			for &symbol in &alphabet {
				let mut targets = BTreeSet::new();
				for &q in &subset {
					targets.extend(self.transition(q, Some(symbol)))
				}

				let successor = self.epsilon_closure(&targets);

				// The transition is left undefined when nothing is reachable.
				if successor.is_empty() {
					continue;
				}

				let target = match subset_index.get(&successor) {
					Some(target) => *target,
					None => {
						let target = dfa.add_state();
						if self.intersects_final(&successor) {
							dfa.add_final(target)
						}
						subset_index.insert(successor.clone(), target);
						worklist.push_back((target, successor));
						target
					}
				};

				dfa.set_transition(source, symbol, target);
			}
		}

		{
			use itertools::Itertools;
			log::debug!(
				"determinized {} states into {} over alphabet {{{}}}",
				self.num_states,
				dfa.num_states(),
				alphabet.iter().format(", ")
			);
		}

		Ok(dfa)
	}

	/// Runs the automaton on `input`, returning whether some reachable state
	/// at the end of the input is accepting.
	pub fn accepts(&self, input: &str) -> bool {
		let mut seed = BTreeSet::new();
		seed.insert(self.initial);
		let mut current = self.epsilon_closure(&seed);

		for c in input.chars() {
			let mut next = BTreeSet::new();
			for &q in &current {
				next.extend(self.transition(q, Some(c)))
			}

			current = self.epsilon_closure(&next);

			if current.is_empty() {
				return false;
			}
		}

		self.intersects_final(&current)
	}

	fn intersects_final(&self, states: &BTreeSet<u32>) -> bool {
		states.iter().any(|q| self.final_states.contains(q))
	}

	/// Writes the automaton as a Graphviz graph.
	///
	/// Final states are `doublecircle` nodes, every other state a `circle`;
	/// an unlabeled pseudo-node points at the initial state. Epsilon edges
	/// are labeled `ɛ`.
	pub fn dot_write<W: io::Write>(&self, f: &mut W) -> io::Result<()> {
		write!(f, "digraph NFA {{\n")?;
		write!(f, "\trankdir=LR\n")?;
		write!(f, "\t\"\" [shape=none, label=\"\"]\n")?;

		if self.num_states > 0 {
			write!(f, "\t\"\" -> {}\n", self.initial)?;
		}

		for q in 0..self.num_states {
			let shape = if self.final_states.contains(&q) {
				"doublecircle"
			} else {
				"circle"
			};

			write!(f, "\t{} [shape={}]\n", q, shape)?;
		}

		for q in 0..self.num_states {
			for (label, targets) in self.successors(q) {
				for target in targets {
					write!(
						f,
						"\t{} -> {} [label=\"{}\"]\n",
						q,
						target,
						DisplayLabel(*label)
					)?
				}
			}
		}

		write!(f, "}}\n")
	}
}

pub struct Successors<'a> {
	inner: Option<std::collections::btree_map::Iter<'a, Option<char>, BTreeSet<u32>>>,
}

impl<'a> Successors<'a> {
	pub fn new(map: Option<&'a BTreeMap<Option<char>, BTreeSet<u32>>>) -> Self {
		Self {
			inner: map.map(|map| map.iter()),
		}
	}
}

impl<'a> Iterator for Successors<'a> {
	type Item = (&'a Option<char>, &'a BTreeSet<u32>);

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.as_mut().map(|inner| inner.next()).flatten()
	}
}
