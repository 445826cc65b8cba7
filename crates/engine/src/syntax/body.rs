//! Recursive-descent scanner for template body source.

use super::{ChunkSpec, ParseError, VarRef};
use crate::transform::Transform;

pub(super) fn parse(source: &str) -> Result<Vec<ChunkSpec>, ParseError> {
	let mut scanner = Scanner { chars: source.chars().collect(), pos: 0 };
	scanner.chunks(None)
}

struct Scanner {
	chars: Vec<char>,
	pos: usize,
}

impl Scanner {
	/// Parses chunks until end of input, or until an unescaped `}` when
	/// `brace_open` holds the position of the opening `${`. The closing
	/// brace is consumed.
	fn chunks(&mut self, brace_open: Option<usize>) -> Result<Vec<ChunkSpec>, ParseError> {
		let mut chunks = Vec::new();
		let mut literal = String::new();
		loop {
			let Some(ch) = self.peek() else {
				if let Some(open) = brace_open {
					return Err(self.error_at(open, "unterminated `${`"));
				}
				break;
			};
			match ch {
				'}' if brace_open.is_some() => {
					self.pos += 1;
					break;
				}
				'\\' => {
					self.pos += 1;
					match self.peek() {
						Some(escaped @ ('$' | '`' | '\\' | '}')) => {
							literal.push(escaped);
							self.pos += 1;
						}
						// unknown escapes keep the backslash
						Some(_) | None => literal.push('\\'),
					}
				}
				'$' => {
					self.pos += 1;
					if let Some(chunk) = self.dollar()? {
						flush_literal(&mut chunks, &mut literal);
						chunks.push(chunk);
					} else {
						literal.push('$');
					}
				}
				other => {
					literal.push(other);
					self.pos += 1;
				}
			}
		}
		flush_literal(&mut chunks, &mut literal);
		Ok(chunks)
	}

	/// Parses the construct after a consumed `$`. `None` means the dollar
	/// opened nothing and is plain text.
	fn dollar(&mut self) -> Result<Option<ChunkSpec>, ParseError> {
		let dollar = self.pos - 1;
		match self.peek() {
			Some(c) if c.is_ascii_digit() => {
				let index = self.stop_index()?;
				Ok(Some(ChunkSpec::TabStop { index, default: Vec::new() }))
			}
			Some('{') => {
				self.pos += 1;
				self.braced(dollar).map(Some)
			}
			Some('(') => {
				self.pos += 1;
				let command = self.command(dollar)?;
				Ok(Some(ChunkSpec::Variable {
					var: VarRef::Command(command),
					default: Vec::new(),
					transform: None,
				}))
			}
			Some(c) if is_name_start(c) => Ok(Some(ChunkSpec::Variable {
				var: VarRef::Named(self.name()),
				default: Vec::new(),
				transform: None,
			})),
			_ => Ok(None),
		}
	}

	/// Parses the interior of `${...}`. `open` is the position of the `$`.
	fn braced(&mut self, open: usize) -> Result<ChunkSpec, ParseError> {
		match self.peek() {
			Some(c) if c.is_ascii_digit() => {
				let index = self.stop_index()?;
				match self.peek() {
					Some('}') => {
						self.pos += 1;
						Ok(ChunkSpec::TabStop { index, default: Vec::new() })
					}
					Some(':') => {
						self.pos += 1;
						let default = self.chunks(Some(open))?;
						Ok(ChunkSpec::TabStop { index, default })
					}
					Some('/') => {
						self.pos += 1;
						let transform = self.transform(open)?;
						Ok(ChunkSpec::Mirror { of_index: index, transform: Some(transform) })
					}
					Some(_) => Err(self.error_here("expected `}`, `:`, or `/` after tab stop index")),
					None => Err(self.error_at(open, "unterminated `${`")),
				}
			}
			Some(c) if is_name_start(c) => {
				let name = self.name();
				match self.peek() {
					Some('}') => {
						self.pos += 1;
						Ok(variable(name, Vec::new(), None))
					}
					Some(':') => {
						self.pos += 1;
						let default = self.chunks(Some(open))?;
						Ok(variable(name, default, None))
					}
					Some('/') => {
						self.pos += 1;
						let transform = self.transform(open)?;
						Ok(variable(name, Vec::new(), Some(transform)))
					}
					Some(_) => Err(self.error_here("expected `}`, `:`, or `/` after variable name")),
					None => Err(self.error_at(open, "unterminated `${`")),
				}
			}
			Some(_) => Err(self.error_here("expected tab stop index or variable name after `${`")),
			None => Err(self.error_at(open, "unterminated `${`")),
		}
	}

	fn stop_index(&mut self) -> Result<u32, ParseError> {
		let start = self.pos;
		while self.peek().is_some_and(|c| c.is_ascii_digit()) {
			self.pos += 1;
		}
		let digits: String = self.chars[start..self.pos].iter().collect();
		digits.parse().map_err(|_| self.error_at(start, "tab stop index out of range"))
	}

	fn name(&mut self) -> String {
		let start = self.pos;
		while self.peek().is_some_and(is_name_char) {
			self.pos += 1;
		}
		self.chars[start..self.pos].iter().collect()
	}

	/// Reads a command after `$(` up to the matching `)`. Parentheses
	/// nest; a backslash passes the next char through uncounted.
	fn command(&mut self, open: usize) -> Result<String, ParseError> {
		let mut depth = 1usize;
		let mut command = String::new();
		while let Some(ch) = self.peek() {
			self.pos += 1;
			match ch {
				'\\' => {
					command.push('\\');
					if let Some(next) = self.peek() {
						command.push(next);
						self.pos += 1;
					}
				}
				'(' => {
					depth += 1;
					command.push('(');
				}
				')' => {
					depth -= 1;
					if depth == 0 {
						return Ok(command);
					}
					command.push(')');
				}
				other => command.push(other),
			}
		}
		Err(self.error_at(open, "unterminated `$(`"))
	}

	/// Parses `pat/rep/flags}` after the first `/` of a transform.
	fn transform(&mut self, open: usize) -> Result<Transform, ParseError> {
		let pattern = self.transform_part(open)?;
		let replacement = self.transform_part(open)?;
		let mut flags = String::new();
		loop {
			match self.peek() {
				Some('}') => {
					self.pos += 1;
					break;
				}
				Some(ch) => {
					flags.push(ch);
					self.pos += 1;
				}
				None => return Err(self.error_at(open, "unterminated `${`")),
			}
		}
		Transform::new(&pattern, &replacement, &flags)
			.map_err(|err| self.error_at(open, err.to_string()))
	}

	/// Reads a `/`-terminated transform section. Backslash escapes are
	/// kept verbatim so the pattern and replacement stay raw; `\/` only
	/// hides the slash from the delimiter scan.
	fn transform_part(&mut self, open: usize) -> Result<String, ParseError> {
		let mut part = String::new();
		loop {
			match self.peek() {
				Some('/') => {
					self.pos += 1;
					return Ok(part);
				}
				Some('\\') => {
					part.push('\\');
					self.pos += 1;
					if let Some(next) = self.peek() {
						part.push(next);
						self.pos += 1;
					}
				}
				Some(ch) => {
					part.push(ch);
					self.pos += 1;
				}
				None => return Err(self.error_at(open, "unterminated transform")),
			}
		}
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn error_here(&self, message: impl Into<String>) -> ParseError {
		self.error_at(self.pos, message)
	}

	fn error_at(&self, pos: usize, message: impl Into<String>) -> ParseError {
		let mut line = 1;
		let mut column = 1;
		for &ch in &self.chars[..pos.min(self.chars.len())] {
			if ch == '\n' {
				line += 1;
				column = 1;
			} else {
				column += 1;
			}
		}
		ParseError::new(line, column, message)
	}
}

fn flush_literal(chunks: &mut Vec<ChunkSpec>, literal: &mut String) {
	if !literal.is_empty() {
		chunks.push(ChunkSpec::Literal { text: std::mem::take(literal) });
	}
}

fn variable(name: String, default: Vec<ChunkSpec>, transform: Option<Transform>) -> ChunkSpec {
	ChunkSpec::Variable { var: VarRef::Named(name), default, transform }
}

fn is_name_start(ch: char) -> bool {
	ch.is_ascii_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
	ch.is_ascii_alphanumeric() || ch == '_'
}
