#[macro_use]
extern crate clap;

use source_span::{
	fmt::{Formatter, Style},
	Position,
};
use std::{
	fs::File,
	io::{self, BufReader, Read},
};
use utf8_decode::UnsafeDecoder;
use yansi::Paint;

use detfa::syntax;

fn main() -> io::Result<()> {
	// Parse options.
	let yaml = load_yaml!("detfa.yml");
	let matches = clap::App::from_yaml(yaml).get_matches();

	// Init logger.
	let verbosity = matches.occurrences_of("verbose") as usize;
	stderrlog::new().verbosity(verbosity).init().unwrap();

	let filename = matches.value_of("FILE").unwrap();
	let output_path = matches.value_of("output").unwrap_or("output.dot");

	let file = File::open(filename)?;
	let input = BufReader::new(file);

	let metrics = source_span::DefaultMetrics::with_tab_stop(4);
	let utf8_input = UnsafeDecoder::new(input.bytes());
	let buffer = source_span::SourceBuffer::new(utf8_input, Position::default(), metrics);

	log::info!("parsing automaton description...");
	let nfa = match syntax::Parser::new(buffer.iter(), metrics).parse() {
		Ok(nfa) => nfa,
		Err(e) => {
			eprintln!(
				"{}{} {}",
				Paint::red("error").bold(),
				Paint::new(':').bold(),
				Paint::new(&e).bold()
			);
			let mut fmt = Formatter::new();
			fmt.add(e.span(), Some(format!("{}", e)), Style::Error);
			let formatted = fmt.render(buffer.iter(), buffer.span(), &metrics)?;
			eprintln!("{}", formatted);
			std::process::exit(1)
		}
	};

	let mut output = File::create(output_path)?;

	if matches.is_present("nfa") {
		log::info!("writing source automaton graph...");
		nfa.dot_write(&mut output)?
	} else {
		log::info!("running subset construction...");
		match nfa.determinize() {
			Ok(dfa) => {
				log::info!("writing deterministic automaton graph...");
				dfa.dot_write(&mut output)?
			}
			Err(e) => {
				eprintln!(
					"{}{} {}",
					Paint::red("error").bold(),
					Paint::new(':').bold(),
					Paint::new(&e).bold()
				);
				std::process::exit(1)
			}
		}
	}

	Ok(())
}
