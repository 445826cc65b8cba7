//! Regex substitutions attached to mirrors and variable chunks.
//!
//! A transform is written `pattern/replacement/flags` inside a chunk. The
//! pattern is a [`regex`] expression, the flags are `g` (replace every
//! match) and `i` (case-insensitive), and the replacement is a small
//! sed-style program: `&` or `$0` insert the whole match, `$1`..`$9` and
//! `\1`..`\9` insert capture groups, and `\U` `\L` `\u` `\l` `\E` fold
//! case. A bare digit ends a group reference, so `$1_bar` is group one
//! followed by the literal `_bar`.

use regex::{Captures, Regex, RegexBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
	/// The pattern did not compile as a regex.
	#[error("invalid pattern: {0}")]
	Pattern(#[from] regex::Error),
	/// A flag other than `g` or `i` was given.
	#[error("unknown transform flag `{0}`")]
	UnknownFlag(char),
}

/// A compiled `pattern/replacement/flags` substitution.
///
/// Equality compares the source text, not the compiled program, so
/// parse/serialize round trips stay stable.
#[derive(Debug, Clone)]
pub struct Transform {
	regex: Regex,
	ops: Vec<ReplaceOp>,
	pattern: String,
	replacement: String,
	global: bool,
	ignore_case: bool,
}

impl PartialEq for Transform {
	fn eq(&self, other: &Self) -> bool {
		self.pattern == other.pattern
			&& self.replacement == other.replacement
			&& self.global == other.global
			&& self.ignore_case == other.ignore_case
	}
}

impl Eq for Transform {}

impl Transform {
	pub fn new(pattern: &str, replacement: &str, flags: &str) -> Result<Self, TransformError> {
		let mut global = false;
		let mut ignore_case = false;
		for flag in flags.chars() {
			match flag {
				'g' => global = true,
				'i' => ignore_case = true,
				other => return Err(TransformError::UnknownFlag(other)),
			}
		}
		let regex = RegexBuilder::new(pattern).case_insensitive(ignore_case).build()?;
		Ok(Self {
			regex,
			ops: parse_replacement(replacement),
			pattern: pattern.to_string(),
			replacement: replacement.to_string(),
			global,
			ignore_case,
		})
	}

	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	pub fn replacement(&self) -> &str {
		&self.replacement
	}

	/// Flag characters in canonical `g` then `i` order.
	pub fn flags(&self) -> String {
		let mut flags = String::new();
		if self.global {
			flags.push('g');
		}
		if self.ignore_case {
			flags.push('i');
		}
		flags
	}

	/// Runs the substitution over `input`. Unmatched input passes through
	/// unchanged; without the `g` flag only the first match is replaced.
	pub fn apply(&self, input: &str) -> String {
		let mut out = String::new();
		let mut last = 0;
		for caps in self.regex.captures_iter(input) {
			let Some(whole) = caps.get(0) else { continue };
			out.push_str(&input[last..whole.start()]);
			self.render_replacement(&caps, &mut out);
			last = whole.end();
			if !self.global {
				break;
			}
		}
		out.push_str(&input[last..]);
		out
	}

	fn render_replacement(&self, caps: &Captures<'_>, out: &mut String) {
		let mut mode = CaseMode::Preserve;
		let mut pending: Option<CaseMode> = None;
		for op in &self.ops {
			match op {
				ReplaceOp::Text(text) => push_cased(out, text, mode, &mut pending),
				ReplaceOp::Group(n) => {
					let text = caps.get(*n).map_or("", |m| m.as_str());
					push_cased(out, text, mode, &mut pending);
				}
				ReplaceOp::Upper => mode = CaseMode::Upper,
				ReplaceOp::Lower => mode = CaseMode::Lower,
				ReplaceOp::UpperNext => pending = Some(CaseMode::Upper),
				ReplaceOp::LowerNext => pending = Some(CaseMode::Lower),
				ReplaceOp::ResetCase => {
					mode = CaseMode::Preserve;
					pending = None;
				}
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplaceOp {
	Text(String),
	/// Capture group reference; group 0 is the whole match.
	Group(usize),
	Upper,
	Lower,
	UpperNext,
	LowerNext,
	ResetCase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseMode {
	Preserve,
	Upper,
	Lower,
}

fn push_cased(out: &mut String, text: &str, mode: CaseMode, pending: &mut Option<CaseMode>) {
	for ch in text.chars() {
		match pending.take().unwrap_or(mode) {
			CaseMode::Upper => out.extend(ch.to_uppercase()),
			CaseMode::Lower => out.extend(ch.to_lowercase()),
			CaseMode::Preserve => out.push(ch),
		}
	}
}

fn parse_replacement(src: &str) -> Vec<ReplaceOp> {
	let chars: Vec<char> = src.chars().collect();
	let mut ops = Vec::new();
	let mut text = String::new();
	let mut i = 0;
	while i < chars.len() {
		match chars[i] {
			'&' => {
				flush_text(&mut ops, &mut text);
				ops.push(ReplaceOp::Group(0));
				i += 1;
			}
			'$' => {
				if let Some((group, next)) = scan_group_ref(&chars, i + 1) {
					flush_text(&mut ops, &mut text);
					ops.push(ReplaceOp::Group(group));
					i = next;
				} else {
					text.push('$');
					i += 1;
				}
			}
			'\\' => {
				let Some(&escaped) = chars.get(i + 1) else {
					text.push('\\');
					i += 1;
					continue;
				};
				i += 2;
				match escaped {
					'U' => {
						flush_text(&mut ops, &mut text);
						ops.push(ReplaceOp::Upper);
					}
					'L' => {
						flush_text(&mut ops, &mut text);
						ops.push(ReplaceOp::Lower);
					}
					'u' => {
						flush_text(&mut ops, &mut text);
						ops.push(ReplaceOp::UpperNext);
					}
					'l' => {
						flush_text(&mut ops, &mut text);
						ops.push(ReplaceOp::LowerNext);
					}
					'E' => {
						flush_text(&mut ops, &mut text);
						ops.push(ReplaceOp::ResetCase);
					}
					digit @ '0'..='9' => {
						flush_text(&mut ops, &mut text);
						ops.push(ReplaceOp::Group(digit as usize - '0' as usize));
					}
					'n' => text.push('\n'),
					't' => text.push('\t'),
					// \\ \& \$ \/ and anything else keep the escaped char
					other => text.push(other),
				}
			}
			other => {
				text.push(other);
				i += 1;
			}
		}
	}
	flush_text(&mut ops, &mut text);
	ops
}

fn flush_text(ops: &mut Vec<ReplaceOp>, text: &mut String) {
	if !text.is_empty() {
		ops.push(ReplaceOp::Text(std::mem::take(text)));
	}
}

/// Scans a group reference after `$`: a single digit, or `{digits}`.
/// Returns the group number and the index past the reference.
fn scan_group_ref(chars: &[char], start: usize) -> Option<(usize, usize)> {
	if chars.get(start) == Some(&'{') {
		let mut i = start + 1;
		while chars.get(i).is_some_and(char::is_ascii_digit) {
			i += 1;
		}
		if i == start + 1 || chars.get(i) != Some(&'}') {
			return None;
		}
		let group: usize = chars[start + 1..i].iter().collect::<String>().parse().ok()?;
		return Some((group, i + 1));
	}
	let digit = chars.get(start)?;
	digit.to_digit(10).map(|d| (d as usize, start + 1))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn whole_match_references() {
		let t = Transform::new(".*", r"<&>", "").unwrap();
		assert_eq!(t.apply("abc"), "<abc>");
		let t = Transform::new("b", "[$0]", "").unwrap();
		assert_eq!(t.apply("abc"), "a[b]c");
	}

	#[test]
	fn group_references() {
		let t = Transform::new(r"(\w+)@(\w+)", "$2.$1", "").unwrap();
		assert_eq!(t.apply("user@host"), "host.user");
		let t = Transform::new("(x)(y)", r"\2\1", "").unwrap();
		assert_eq!(t.apply("xy"), "yx");
	}

	#[test]
	fn digit_ends_group_reference() {
		let t = Transform::new("(a+)", "$1_bar", "").unwrap();
		assert_eq!(t.apply("aa"), "aa_bar");
	}

	#[test]
	fn braced_group_reference() {
		let t = Transform::new("(a)(b)", "${2}${1}", "").unwrap();
		assert_eq!(t.apply("ab"), "ba");
	}

	#[test]
	fn dollar_without_digit_is_literal() {
		let t = Transform::new("a", "$x$", "").unwrap();
		assert_eq!(t.apply("a"), "$x$");
	}

	#[test]
	fn escapes_keep_literal_chars() {
		let t = Transform::new("(x)", r"\1\&\$\\", "").unwrap();
		assert_eq!(t.apply("x"), r"x&$\");
	}

	#[test]
	fn global_flag_replaces_every_match() {
		let first = Transform::new("a", "b", "").unwrap();
		assert_eq!(first.apply("banana"), "bbnana");
		let all = Transform::new("a", "b", "g").unwrap();
		assert_eq!(all.apply("banana"), "bbnbnb");
	}

	#[test]
	fn ignore_case_flag() {
		let t = Transform::new("hello", "x", "i").unwrap();
		assert_eq!(t.apply("HeLLo world"), "x world");
	}

	#[test]
	fn unknown_flag_is_rejected() {
		let err = Transform::new("a", "b", "gz").unwrap_err();
		assert!(matches!(err, TransformError::UnknownFlag('z')));
	}

	#[test]
	fn invalid_pattern_is_rejected() {
		let err = Transform::new("(", "", "").unwrap_err();
		assert!(matches!(err, TransformError::Pattern(_)));
	}

	#[test]
	fn case_folding_runs_until_reset() {
		let t = Transform::new(r"(\w+)-(\w+)", r"\U$1\E-$2", "").unwrap();
		assert_eq!(t.apply("ab-cd"), "AB-cd");
		let t = Transform::new(".*", r"\L&", "").unwrap();
		assert_eq!(t.apply("MiXeD"), "mixed");
	}

	#[test]
	fn single_shot_case_folds_one_char() {
		let t = Transform::new(r"(\w+) (\w+)", r"\u$1 \l$2", "").unwrap();
		assert_eq!(t.apply("hello WORLD"), "Hello wORLD");
	}

	#[test]
	fn unmatched_group_renders_empty() {
		let t = Transform::new("(a)|(b)", "[$2]", "").unwrap();
		assert_eq!(t.apply("a"), "[]");
	}

	#[test]
	fn no_match_passes_through() {
		let t = Transform::new("zzz", "x", "").unwrap();
		assert_eq!(t.apply("abc"), "abc");
	}

	#[test]
	fn flags_serialize_in_canonical_order() {
		let t = Transform::new("a", "b", "ig").unwrap();
		assert_eq!(t.flags(), "gi");
		assert_eq!(t, Transform::new("a", "b", "gi").unwrap());
	}

	#[test]
	fn whitespace_escapes_in_replacement() {
		let t = Transform::new(", ", r"\n", "g").unwrap();
		assert_eq!(t.apply("a, b, c"), "a\nb\nc");
		let t = Transform::new(" ", r"\t", "").unwrap();
		assert_eq!(t.apply("a b c"), "a\tb c");
	}
}
