pub use source_span::{Loc, Position, Span};
use source_span::Metrics;
use std::fmt;
use std::io;
use std::iter::Peekable;

use crate::Nfa;

#[derive(Debug)]
pub enum Error {
	IO(std::io::Error),
	UnexpectedEos,
	Unexpected(char),
	InvalidInteger(String),
	InvalidStateCount(i64),
	StateOutOfRange(i64, u32),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		use self::Error::*;
		match self {
			IO(e) => write!(f, "I/O: {}", e),
			UnexpectedEos => write!(f, "unexpected end of stream"),
			Unexpected(c) => write!(f, "unexpected character `{}`", c),
			InvalidInteger(s) => write!(f, "invalid integer `{}`", s),
			InvalidStateCount(n) => write!(f, "invalid state count {}", n),
			StateOutOfRange(q, len) => write!(
				f,
				"state {} out of range (the automaton has {} states)",
				q, len
			),
		}
	}
}

pub type Result<T> = std::result::Result<T, Loc<Error>>;

/// Parser for the line-oriented automaton description format.
///
/// ```text
/// <numStates>
/// <initialState>
/// <symbol>,<target1>,<target2>
/// ...
/// <finalState1> <finalState2> ... -1
/// ```
///
/// One transition line per state. The symbol `-` is the epsilon label and
/// the symbol ` ` marks a state with no outgoing transitions; a negative
/// target means the edge is absent. The final-state list is terminated by
/// the `-1` sentinel.
pub struct Parser<I: Iterator<Item = io::Result<char>>, M: Metrics> {
	input: Peekable<I>,
	metrics: M,
	span: Span,
}

impl<I: Iterator<Item = io::Result<char>>, M: Metrics> Parser<I, M> {
	pub fn new(input: I, metrics: M) -> Parser<I, M> {
		Parser {
			input: input.peekable(),
			metrics,
			span: Span::default(),
		}
	}

	fn peek(&mut self) -> Result<Option<char>> {
		match self.input.peek() {
			Some(Ok(c)) => Ok(Some(*c)),
			Some(Err(_)) => self.consume(),
			None => Ok(None),
		}
	}

	fn consume(&mut self) -> Result<Option<char>> {
		match self.input.next() {
			Some(Ok(c)) => {
				self.span.push(c, &self.metrics);
				Ok(Some(c))
			}
			Some(Err(e)) => Err(Loc::new(Error::IO(e), self.span.end().into())),
			None => Ok(None),
		}
	}

	fn skip_blanks(&mut self) -> Result<()> {
		while let Some(c) = self.peek()? {
			if c == ' ' || c == '\t' || c == '\r' {
				self.consume()?;
			} else {
				break;
			}
		}

		Ok(())
	}

	fn skip_whitespace(&mut self) -> Result<()> {
		while let Some(c) = self.peek()? {
			if c.is_whitespace() {
				self.consume()?;
			} else {
				break;
			}
		}

		Ok(())
	}

	fn expect(&mut self, punct: char) -> Result<()> {
		self.skip_blanks()?;
		self.span.clear();

		match self.consume()? {
			Some(c) if c == punct => Ok(()),
			Some(c) => Err(Loc::new(Error::Unexpected(c), self.span)),
			None => Err(Loc::new(Error::UnexpectedEos, self.span.end().into())),
		}
	}

	fn expect_eol(&mut self) -> Result<()> {
		self.skip_blanks()?;
		self.span.clear();

		match self.consume()? {
			Some('\n') | None => Ok(()),
			Some(c) => Err(Loc::new(Error::Unexpected(c), self.span)),
		}
	}

	fn parse_int(&mut self) -> Result<i64> {
		self.skip_blanks()?;
		self.span.clear();

		let mut buffer = String::new();

		if let Some('-') = self.peek()? {
			self.consume()?;
			buffer.push('-');
		}

		while let Some(c) = self.peek()? {
			if c.is_ascii_digit() {
				self.consume()?;
				buffer.push(c);
			} else {
				break;
			}
		}

		if buffer.is_empty() || buffer == "-" {
			return match self.consume()? {
				Some(c) => Err(Loc::new(Error::Unexpected(c), self.span)),
				None => Err(Loc::new(Error::UnexpectedEos, self.span.end().into())),
			};
		}

		match buffer.parse() {
			Ok(value) => Ok(value),
			Err(_) => Err(Loc::new(Error::InvalidInteger(buffer), self.span)),
		}
	}

	fn parse_count(&mut self) -> Result<u32> {
		let count = self.parse_int()?;

		if count < 0 || count > u32::MAX as i64 {
			return Err(Loc::new(Error::InvalidStateCount(count), self.span));
		}

		Ok(count as u32)
	}

	fn parse_state(&mut self, num_states: u32) -> Result<u32> {
		let state = self.parse_int()?;

		if state < 0 || state >= num_states as i64 {
			return Err(Loc::new(Error::StateOutOfRange(state, num_states), self.span));
		}

		Ok(state as u32)
	}

	fn parse_target(&mut self, num_states: u32) -> Result<Option<u32>> {
		let target = self.parse_int()?;

		// A negative target means the edge is absent.
		if target < 0 {
			return Ok(None);
		}

		if target >= num_states as i64 {
			return Err(Loc::new(
				Error::StateOutOfRange(target, num_states),
				self.span,
			));
		}

		Ok(Some(target as u32))
	}

	fn parse_transition_line(
		&mut self,
		nfa: &mut Nfa,
		source: u32,
		num_states: u32,
	) -> Result<()> {
		self.span.clear();

		// The symbol is the first character of the line, taken verbatim.
		let symbol = match self.consume()? {
			Some(c) if c != '\n' => c,
			Some(c) => return Err(Loc::new(Error::Unexpected(c), self.span)),
			None => return Err(Loc::new(Error::UnexpectedEos, self.span.end().into())),
		};

		self.expect(',')?;
		let first = self.parse_target(num_states)?;
		self.expect(',')?;
		let second = self.parse_target(num_states)?;
		self.expect_eol()?;

		// A ` ` symbol marks a state with no outgoing transitions; its
		// targets are ignored.
		if symbol == ' ' {
			return Ok(());
		}

		let label = if symbol == '-' { None } else { Some(symbol) };

		for target in first.into_iter().chain(second) {
			nfa.add(source, label, target);
		}

		Ok(())
	}

	fn parse_final_states(&mut self, nfa: &mut Nfa, num_states: u32) -> Result<()> {
		loop {
			self.skip_whitespace()?;

			let state = self.parse_int()?;

			// The list is terminated by the `-1` sentinel.
			if state == -1 {
				return Ok(());
			}

			if state < 0 || state >= num_states as i64 {
				return Err(Loc::new(
					Error::StateOutOfRange(state, num_states),
					self.span,
				));
			}

			nfa.add_final(state as u32);
		}
	}

	/// Parses a complete automaton description.
	///
	/// No automaton is returned unless the whole description is well formed
	/// and every state it references is in range.
	pub fn parse(mut self) -> Result<Nfa> {
		let num_states = self.parse_count()?;
		self.expect_eol()?;

		let initial = self.parse_state(num_states)?;
		self.expect_eol()?;

		let mut nfa = Nfa::new(num_states, initial);

		for source in 0..num_states {
			self.parse_transition_line(&mut nfa, source, num_states)?;
		}

		self.parse_final_states(&mut nfa, num_states)?;

		self.skip_whitespace()?;
		self.span.clear();
		if let Some(c) = self.consume()? {
			return Err(Loc::new(Error::Unexpected(c), self.span));
		}

		Ok(nfa)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(description: &str) -> Result<Nfa> {
		Parser::new(description.chars().map(Ok), source_span::DEFAULT_METRICS).parse()
	}

	#[test]
	fn parses_a_description() {
		let nfa = parse("3\n0\n-,1,2\na,2,-1\n ,-1,-1\n2 -1\n").unwrap();

		assert_eq!(nfa.num_states(), 3);
		assert_eq!(nfa.initial_state(), 0);

		let epsilon: Vec<u32> = nfa.transition(0, None).collect();
		assert_eq!(epsilon, vec![1, 2]);

		let on_a: Vec<u32> = nfa.transition(1, Some('a')).collect();
		assert_eq!(on_a, vec![2]);

		// The ` ` symbol line adds nothing.
		assert_eq!(nfa.successors(2).count(), 0);

		let finals: Vec<u32> = nfa.final_states().iter().cloned().collect();
		assert_eq!(finals, vec![2]);

		assert!(nfa.check().is_ok());
	}

	#[test]
	fn accepts_a_missing_trailing_newline() {
		let nfa = parse("1\n0\n ,-1,-1\n0 -1").unwrap();
		assert!(nfa.accepts(""));
	}

	#[test]
	fn rejects_a_truncated_description() {
		// Three states declared, two transition lines supplied.
		let e = parse("3\n0\na,1,-1\nb,2,-1\n2 -1\n").unwrap_err();
		match e.into_raw_parts().0 {
			Error::Unexpected(_) | Error::UnexpectedEos => (),
			other => panic!("unexpected error: {}", other),
		}
	}

	#[test]
	fn rejects_a_non_numeric_target() {
		let e = parse("2\n0\na,x,-1\n ,-1,-1\n1 -1\n").unwrap_err();
		match e.into_raw_parts().0 {
			Error::Unexpected('x') => (),
			other => panic!("unexpected error: {}", other),
		}
	}

	#[test]
	fn rejects_a_missing_field() {
		let e = parse("1\n0\na,0\n0 -1\n").unwrap_err();
		match e.into_raw_parts().0 {
			Error::Unexpected(_) | Error::UnexpectedEos => (),
			other => panic!("unexpected error: {}", other),
		}
	}

	#[test]
	fn rejects_an_out_of_range_target() {
		let e = parse("2\n0\na,7,-1\n ,-1,-1\n1 -1\n").unwrap_err();
		match e.into_raw_parts().0 {
			Error::StateOutOfRange(7, 2) => (),
			other => panic!("unexpected error: {}", other),
		}
	}

	#[test]
	fn rejects_an_out_of_range_final_state() {
		let e = parse("2\n0\na,1,-1\n ,-1,-1\n9 -1\n").unwrap_err();
		match e.into_raw_parts().0 {
			Error::StateOutOfRange(9, 2) => (),
			other => panic!("unexpected error: {}", other),
		}
	}

	#[test]
	fn rejects_a_missing_sentinel() {
		let e = parse("1\n0\n ,-1,-1\n0\n").unwrap_err();
		match e.into_raw_parts().0 {
			Error::UnexpectedEos => (),
			other => panic!("unexpected error: {}", other),
		}
	}
}
