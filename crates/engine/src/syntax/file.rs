//! The `.snippets` file format.
//!
//! A file holds template blocks:
//!
//! ```text
//! # create a function
//! snippet fn | rust
//! fn ${1:name}(${2:args}) {
//! 	$0
//! }
//! ```
//!
//! A block starts at a `snippet <trigger>` header, optionally scoped with
//! `| <language>`. Body lines run verbatim until the next header; blank
//! lines at either end are trimmed. A `#` comment run separated from the
//! body by a blank line documents the next header, with the last comment
//! line winning; a comment glued to body text stays in the body.

use std::mem;

use super::{ParseError, Template, parse_body};

/// Outcome of a lossy file parse: every block that parsed, plus one
/// error per block that did not.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileParse {
	pub templates: Vec<Template>,
	pub errors: Vec<ParseError>,
}

/// Parses a snippet file, failing on the first malformed block. Error
/// positions are file-absolute.
pub fn parse_templates(source: &str) -> Result<Vec<Template>, ParseError> {
	let mut templates = Vec::new();
	for block in scan_blocks(source) {
		templates.push(block?);
	}
	Ok(templates)
}

/// Parses a snippet file, collecting malformed blocks as errors while
/// keeping every block that parses.
pub fn parse_templates_lossy(source: &str) -> FileParse {
	let mut parse = FileParse::default();
	for block in scan_blocks(source) {
		match block {
			Ok(template) => parse.templates.push(template),
			Err(error) => parse.errors.push(error),
		}
	}
	parse
}

enum State<'a> {
	/// Between blocks.
	Idle,
	/// After a malformed header or stray text, until the next header.
	Skipping,
	Open(OpenBlock<'a>),
}

struct OpenBlock<'a> {
	trigger: String,
	language: Option<String>,
	description: Option<String>,
	/// Body lines with their 1-based file line numbers.
	lines: Vec<(usize, &'a str)>,
}

fn scan_blocks(source: &str) -> Vec<Result<Template, ParseError>> {
	let mut blocks = Vec::new();
	let mut state = State::Idle;
	let mut pending_description: Option<String> = None;

	for (number, line) in source.lines().enumerate() {
		let number = number + 1;
		if is_header(line) {
			let description = match mem::replace(&mut state, State::Idle) {
				State::Open(block) => {
					let (finished, tail_description) = block.finish(true);
					blocks.push(finished);
					tail_description
				}
				_ => pending_description.take(),
			};
			pending_description = None;
			match parse_header(line, number) {
				Ok((trigger, language)) => {
					state = State::Open(OpenBlock {
						trigger,
						language,
						description,
						lines: Vec::new(),
					});
				}
				Err(err) => {
					blocks.push(Err(err));
					state = State::Skipping;
				}
			}
			continue;
		}
		match &mut state {
			State::Open(block) => block.lines.push((number, line)),
			State::Skipping => {
				if line.trim().is_empty() {
					state = State::Idle;
				}
			}
			State::Idle => {
				if line.trim().is_empty() {
					// blank lines separate blocks
				} else if line.starts_with('#') {
					pending_description = comment_text(line);
				} else {
					blocks.push(Err(ParseError::new(number, 1, "expected `snippet` header")));
					state = State::Skipping;
				}
			}
		}
	}
	if let State::Open(block) = state {
		let (finished, _) = block.finish(false);
		blocks.push(finished);
	}
	blocks
}

impl OpenBlock<'_> {
	fn finish(mut self, has_next_header: bool) -> (Result<Template, ParseError>, Option<String>) {
		let mut next_description = None;
		if has_next_header {
			// a trailing comment run belongs to the next header when a
			// blank line separates it from the body text
			let mut tail = Vec::new();
			while let Some(&(number, line)) = self.lines.last() {
				if !line.starts_with('#') {
					break;
				}
				tail.push((number, line));
				self.lines.pop();
			}
			let separated = self.lines.last().is_none_or(|(_, line)| line.trim().is_empty());
			if separated && !tail.is_empty() {
				if let Some(&(_, closest)) = tail.first() {
					next_description = comment_text(closest);
				}
			} else {
				while let Some(entry) = tail.pop() {
					self.lines.push(entry);
				}
			}
		}
		while self.lines.last().is_some_and(|(_, line)| line.trim().is_empty()) {
			self.lines.pop();
		}
		while self.lines.first().is_some_and(|(_, line)| line.trim().is_empty()) {
			self.lines.remove(0);
		}

		let body_start = self.lines.first().map_or(1, |(number, _)| *number);
		let source = self.lines.iter().map(|(_, line)| *line).collect::<Vec<_>>().join("\n");
		let body = match parse_body(&source) {
			Ok(body) => body,
			Err(err) => return (Err(err.at_line_offset(body_start - 1)), next_description),
		};
		let template = Template {
			name: self.trigger.clone(),
			trigger: self.trigger,
			language: self.language,
			description: self.description,
			body,
		};
		(Ok(template), next_description)
	}
}

fn is_header(line: &str) -> bool {
	line == "snippet" || line.starts_with("snippet ") || line.starts_with("snippet\t")
}

fn parse_header(line: &str, number: usize) -> Result<(String, Option<String>), ParseError> {
	let rest = line["snippet".len()..].trim();
	if rest.is_empty() {
		return Err(ParseError::new(number, 1, "missing trigger after `snippet`"));
	}
	let (trigger, language) = match rest.split_once('|') {
		Some((trigger, language)) => {
			let language = language.trim();
			(trigger.trim(), (!language.is_empty()).then(|| language.to_string()))
		}
		None => (rest, None),
	};
	if trigger.is_empty() {
		return Err(ParseError::new(number, 1, "missing trigger after `snippet`"));
	}
	if trigger.chars().any(char::is_whitespace) {
		return Err(ParseError::new(number, 1, "trigger must be a single word"));
	}
	Ok((trigger.to_string(), language))
}

fn comment_text(line: &str) -> Option<String> {
	let text = line.trim_start_matches('#').trim();
	(!text.is_empty()).then(|| text.to_string())
}
