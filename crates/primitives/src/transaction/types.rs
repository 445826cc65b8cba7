use crate::range::{CharIdx, CharLen};

/// A single text replacement: the range `[start, end)` is replaced by
/// `replacement`. [`None`] deletes the range without inserting anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
	/// First character of the replaced range.
	pub start: CharIdx,
	/// One past the last character of the replaced range.
	pub end: CharIdx,
	/// Replacement text, or [`None`] for a plain deletion.
	pub replacement: Option<String>,
}

impl Change {
	/// Replacement of `[start, end)` with `text`.
	pub fn replace(start: CharIdx, end: CharIdx, text: impl Into<String>) -> Self {
		Self {
			start,
			end,
			replacement: Some(text.into()),
		}
	}

	/// Insertion of `text` at `pos`.
	pub fn insert(pos: CharIdx, text: impl Into<String>) -> Self {
		Self::replace(pos, pos, text)
	}

	/// Deletion of `[start, end)`.
	pub fn delete(start: CharIdx, end: CharIdx) -> Self {
		Self {
			start,
			end,
			replacement: None,
		}
	}
}

/// Which side a position glues to when text is inserted exactly at it.
///
/// Mapping a position through a change set needs a tie-break when an
/// insertion lands on the position itself: [`Bias::Left`] keeps the position
/// before the new text, [`Bias::Right`] moves it after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
	/// Stay before text inserted at this position.
	Left,
	/// Move after text inserted at this position.
	Right,
}

/// Inserted text with its character count computed once.
///
/// `char_len` always equals `text.chars().count()`; the fields are private so
/// the invariant cannot be broken from outside. `apply`, `map_pos`, and
/// `compose` all read the cached count instead of rescanning the string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
	text: String,
	char_len: CharLen,
}

impl Insertion {
	/// Wraps `text`, counting its characters.
	#[inline]
	pub fn new(text: String) -> Self {
		let char_len = text.chars().count();
		Self { text, char_len }
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.char_len == 0
	}

	/// The inserted text.
	#[inline]
	pub fn text(&self) -> &str {
		&self.text
	}

	/// Character count of the inserted text.
	#[inline]
	pub fn char_len(&self) -> CharLen {
		self.char_len
	}

	pub(super) fn append(&mut self, other: &Insertion) {
		self.text.push_str(&other.text);
		self.char_len += other.char_len;
	}

	/// Removes and returns the first `n` characters, leaving the rest.
	pub(super) fn take_prefix(&mut self, n: CharLen) -> String {
		debug_assert!(n <= self.char_len);
		let split = self
			.text
			.char_indices()
			.nth(n)
			.map(|(at, _)| at)
			.unwrap_or(self.text.len());
		let rest = self.text.split_off(split);
		let prefix = std::mem::replace(&mut self.text, rest);
		self.char_len -= n;
		prefix
	}
}

/// One step of a change set, in source-document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
	/// Keep the next N characters of the source document.
	Retain(CharLen),
	/// Drop the next N characters of the source document.
	Delete(CharLen),
	/// Emit new text at the current position.
	Insert(Insertion),
}
