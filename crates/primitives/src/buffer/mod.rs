//! A rope-backed text buffer carrying positioned marks.
//!
//! Marks are positions that survive edits: every [`Buffer::replace`] remaps
//! all marks through the resulting change set using each mark's [`Bias`].
//! Edits return a [`BufferEdit`] record tagged with an [`EditOrigin`] so a
//! listener can tell user typing from engine-internal writes.

#[cfg(test)]
mod tests;

use std::ops::Range;

use slab::Slab;

use crate::range::{CharIdx, CharLen};
use crate::transaction::{Bias, Transaction};
use crate::{Rope, RopeSlice};

/// Where an edit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
	/// Typing, pasting, or any other host-driven edit.
	User,
	/// The one-shot insertion of rendered snippet text.
	Expand,
	/// A mirror resynchronization write.
	Sync,
}

/// Stable handle for a mark stored in a [`Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkId(usize);

#[derive(Debug, Clone, Copy)]
struct Mark {
	pos: CharIdx,
	bias: Bias,
}

/// Notification record for one applied edit.
///
/// `start` and `deleted` describe the pre-edit range that was removed,
/// `inserted` the text that took its place. Records are produced in edit
/// order; the host forwards them to whoever listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEdit {
	pub start: CharIdx,
	pub deleted: CharLen,
	pub inserted: String,
	pub origin: EditOrigin,
}

impl BufferEdit {
	/// One past the last pre-edit position the edit removed.
	pub fn deleted_end(&self) -> CharIdx {
		self.start + self.deleted
	}
}

/// A text document plus the marks tracking positions across its edits.
#[derive(Debug, Clone)]
pub struct Buffer {
	text: Rope,
	marks: Slab<Mark>,
}

impl Buffer {
	pub fn new(text: &str) -> Self {
		Self {
			text: Rope::from(text),
			marks: Slab::new(),
		}
	}

	pub fn len_chars(&self) -> CharLen {
		self.text.len_chars()
	}

	/// Read-only view of the whole document.
	pub fn text(&self) -> &Rope {
		&self.text
	}

	pub fn slice(&self, range: Range<CharIdx>) -> RopeSlice<'_> {
		self.text.slice(range)
	}

	/// Extracts `range` as an owned string.
	pub fn text_of(&self, range: Range<CharIdx>) -> String {
		self.text.slice(range).to_string()
	}

	/// Creates a mark at `pos`, clamped to the document, gluing to `bias`.
	pub fn create_mark(&mut self, pos: CharIdx, bias: Bias) -> MarkId {
		let pos = pos.min(self.len_chars());
		MarkId(self.marks.insert(Mark { pos, bias }))
	}

	/// Current position of a mark, or `None` once it has been released.
	pub fn mark_pos(&self, id: MarkId) -> Option<CharIdx> {
		self.marks.get(id.0).map(|m| m.pos)
	}

	/// Repositions a mark explicitly, clamped to the document.
	pub fn move_mark(&mut self, id: MarkId, pos: CharIdx) {
		let pos = pos.min(self.text.len_chars());
		if let Some(mark) = self.marks.get_mut(id.0) {
			mark.pos = pos;
		}
	}

	/// Changes which side of an insertion a mark glues to.
	pub fn set_mark_bias(&mut self, id: MarkId, bias: Bias) {
		if let Some(mark) = self.marks.get_mut(id.0) {
			mark.bias = bias;
		}
	}

	/// Removes a mark. Releasing an already-released mark is fine.
	pub fn release_mark(&mut self, id: MarkId) {
		let _ = self.marks.try_remove(id.0);
	}

	/// Replaces `range` with `text`, remaps every mark, and returns the
	/// notification record for the edit.
	pub fn replace(&mut self, range: Range<CharIdx>, text: &str, origin: EditOrigin) -> BufferEdit {
		debug_assert!(range.start <= range.end && range.end <= self.len_chars());

		let tx = Transaction::replace(self.text.slice(..), range.clone(), text);
		tx.apply(&mut self.text);
		for (_, mark) in self.marks.iter_mut() {
			mark.pos = tx.map_pos(mark.pos, mark.bias);
		}

		BufferEdit {
			start: range.start,
			deleted: range.end - range.start,
			inserted: text.to_string(),
			origin,
		}
	}

	/// Insertion wrapper over [`Buffer::replace`].
	pub fn insert(&mut self, at: CharIdx, text: &str, origin: EditOrigin) -> BufferEdit {
		self.replace(at..at, text, origin)
	}

	/// Deletion wrapper over [`Buffer::replace`].
	pub fn delete(&mut self, range: Range<CharIdx>, origin: EditOrigin) -> BufferEdit {
		self.replace(range, "", origin)
	}
}
