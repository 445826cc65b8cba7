//! Change sets and transactions over rope documents.
//!
//! A [`ChangeSet`] is the low-level operation stream; a [`Transaction`] wraps
//! one built from a list of [`Change`]s and is what the buffer applies. Marks
//! and other positions are carried across an edit with
//! [`ChangeSet::map_pos`], using a [`Bias`] to settle boundary cases.

mod changeset;
#[cfg(test)]
mod tests;
mod types;

pub use changeset::ChangeSet;
pub use types::{Bias, Change, Insertion, Operation};

use crate::range::CharIdx;
use crate::{Rope, RopeSlice};

/// A set of changes applied to a document as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	changes: ChangeSet,
}

impl Transaction {
	/// Builds a transaction from replacements sorted by position.
	///
	/// The changes must be non-overlapping and within the document; this is
	/// debug-asserted, not validated.
	pub fn change(doc: RopeSlice, changes: Vec<Change>) -> Self {
		let doc_len = doc.len_chars();
		let mut set = ChangeSet::new();
		let mut last = 0;

		for change in changes {
			debug_assert!(last <= change.start, "changes must be sorted and disjoint");
			debug_assert!(change.start <= change.end && change.end <= doc_len);

			set.retain(change.start - last);
			if let Some(text) = change.replacement {
				set.insert(text);
			}
			set.delete(change.end - change.start);
			last = change.end;
		}
		set.retain(doc_len - last);

		Self { changes: set }
	}

	/// Single replacement of `range` with `text`.
	pub fn replace(doc: RopeSlice, range: std::ops::Range<CharIdx>, text: &str) -> Self {
		Self::change(doc, vec![Change::replace(range.start, range.end, text)])
	}

	/// Applies the transaction to `doc` in place.
	pub fn apply(&self, doc: &mut Rope) {
		self.changes.apply(doc);
	}

	/// Builds the inverse transaction against the pre-apply document.
	pub fn invert(&self, original: &Rope) -> Transaction {
		Self {
			changes: self.changes.invert(original),
		}
	}

	/// Maps a pre-edit position into the post-edit document.
	pub fn map_pos(&self, pos: CharIdx, bias: Bias) -> CharIdx {
		self.changes.map_pos(pos, bias)
	}

	/// The underlying change set.
	pub fn changes(&self) -> &ChangeSet {
		&self.changes
	}

	/// True if the transaction performs no edits.
	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}
}
