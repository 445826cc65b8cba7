//! Snippet template syntax.
//!
//! A template body is plain text with embedded constructs:
//!
//! - `$N` / `${N}`: tab stop N
//! - `${N:default}`: tab stop N with default text; constructs nest
//! - `${N/pat/rep/flags}`: mirror of stop N through a [`Transform`]
//! - `$NAME` / `${NAME}`: variable
//! - `${NAME:default}`: variable with a static fallback
//! - `${NAME/pat/rep/flags}`: variable through a transform
//! - `$(cmd)`: shell command substitution
//!
//! `\$`, `` \` ``, `\\` and `\}` escape literally; a `$` that opens no
//! construct is plain text. Tab stop `0` marks the final caret position
//! and never carries default text. The first tab stop form seen for an
//! index is authoritative; later occurrences of the same index become
//! mirrors of it.

mod body;
mod file;

use std::collections::BTreeSet;

use thiserror::Error;

use crate::transform::Transform;

pub use file::{FileParse, parse_templates, parse_templates_lossy};

/// A syntax error with its 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
	pub line: usize,
	pub column: usize,
	pub message: String,
}

impl ParseError {
	pub(crate) fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
		Self { line, column, message: message.into() }
	}

	/// Shifts the error onto file-absolute lines when a body was parsed
	/// out of a larger snippet file.
	pub(crate) fn at_line_offset(mut self, offset: usize) -> Self {
		self.line += offset;
		self
	}
}

/// What a variable chunk resolves through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarRef {
	/// Looked up via the resolver hook, then the builtin table.
	Named(String),
	/// Run through the system shell, stdout captured.
	Command(String),
}

/// One parsed element of a template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkSpec {
	/// Verbatim text.
	Literal { text: String },
	/// The authoritative occurrence of a tab stop.
	TabStop { index: u32, default: Vec<ChunkSpec> },
	/// A linked duplicate of a tab stop, optionally transformed.
	Mirror { of_index: u32, transform: Option<Transform> },
	/// Variable expansion with a static fallback for empty values.
	Variable { var: VarRef, default: Vec<ChunkSpec>, transform: Option<Transform> },
}

/// A named snippet: trigger word, optional language scope, and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	pub name: String,
	pub trigger: String,
	pub language: Option<String>,
	pub description: Option<String>,
	pub body: Vec<ChunkSpec>,
}

impl Template {
	/// Builds a template directly from body source, named after its trigger.
	pub fn from_body(trigger: impl Into<String>, body: &str) -> Result<Self, ParseError> {
		let trigger = trigger.into();
		Ok(Self {
			name: trigger.clone(),
			trigger,
			language: None,
			description: None,
			body: parse_body(body)?,
		})
	}

	/// Serializes the body back to template source. Parsing the result
	/// yields the same chunk structure.
	pub fn body_source(&self) -> String {
		let mut out = String::new();
		write_chunks(&mut out, &self.body);
		out
	}
}

/// Parses template body source into chunks.
///
/// Duplicate tab stop indexes are resolved here: the first occurrence in
/// reading order stays a [`ChunkSpec::TabStop`], later ones demote to
/// [`ChunkSpec::Mirror`] and drop their defaults.
pub fn parse_body(source: &str) -> Result<Vec<ChunkSpec>, ParseError> {
	let mut chunks = body::parse(source)?;
	let mut seen = BTreeSet::new();
	demote_duplicate_stops(&mut chunks, &mut seen);
	Ok(chunks)
}

fn demote_duplicate_stops(chunks: &mut [ChunkSpec], seen: &mut BTreeSet<u32>) {
	for chunk in chunks {
		if let ChunkSpec::TabStop { index, default } = chunk {
			let index = *index;
			// stop 0 is the final caret and renders nothing
			if index == 0 {
				default.clear();
			}
			if seen.insert(index) {
				demote_duplicate_stops(default, seen);
			} else {
				*chunk = ChunkSpec::Mirror { of_index: index, transform: None };
			}
		}
	}
}

fn write_chunks(out: &mut String, chunks: &[ChunkSpec]) {
	for chunk in chunks {
		match chunk {
			ChunkSpec::Literal { text } => write_literal(out, text),
			ChunkSpec::TabStop { index, default } => {
				if default.is_empty() {
					out.push('$');
					out.push_str(&index.to_string());
				} else {
					out.push_str("${");
					out.push_str(&index.to_string());
					out.push(':');
					write_chunks(out, default);
					out.push('}');
				}
			}
			ChunkSpec::Mirror { of_index, transform } => match transform {
				Some(t) => write_transform(out, &of_index.to_string(), t),
				None => {
					out.push('$');
					out.push_str(&of_index.to_string());
				}
			},
			ChunkSpec::Variable { var, default, transform } => {
				write_variable(out, var, default, transform.as_ref());
			}
		}
	}
}

fn write_variable(
	out: &mut String,
	var: &VarRef,
	default: &[ChunkSpec],
	transform: Option<&Transform>,
) {
	let name = match var {
		VarRef::Command(command) => {
			out.push_str("$(");
			out.push_str(command);
			out.push(')');
			return;
		}
		VarRef::Named(name) => name,
	};
	if let Some(t) = transform {
		write_transform(out, name, t);
	} else if default.is_empty() {
		out.push_str("${");
		out.push_str(name);
		out.push('}');
	} else {
		out.push_str("${");
		out.push_str(name);
		out.push(':');
		write_chunks(out, default);
		out.push('}');
	}
}

fn write_transform(out: &mut String, subject: &str, transform: &Transform) {
	out.push_str("${");
	out.push_str(subject);
	out.push('/');
	out.push_str(transform.pattern());
	out.push('/');
	out.push_str(transform.replacement());
	out.push('/');
	out.push_str(&transform.flags());
	out.push('}');
}

fn write_literal(out: &mut String, text: &str) {
	for ch in text.chars() {
		match ch {
			'\\' => out.push_str(r"\\"),
			'$' => out.push_str(r"\$"),
			'}' => out.push_str(r"\}"),
			other => out.push(other),
		}
	}
}
