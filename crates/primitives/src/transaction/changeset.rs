use super::types::{Bias, Insertion, Operation};
use crate::Rope;
use crate::range::{CharIdx, CharLen};

/// An ordered sequence of retain/delete/insert operations over a document.
///
/// The operation list always covers the source document exactly: the retained
/// and deleted counts sum to `len`, the retained and inserted counts to
/// `len_after`. That invariant is what makes [`ChangeSet::map_pos`] and
/// [`ChangeSet::compose`] total functions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
	changes: Vec<Operation>,
	len: usize,
	len_after: usize,
}

impl ChangeSet {
	/// An empty change set over an empty document.
	pub fn new() -> Self {
		Self::default()
	}

	/// Length in characters of the document the changes apply to.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Length in characters of the document after applying the changes.
	pub fn len_after(&self) -> usize {
		self.len_after
	}

	/// True if no operations have been recorded.
	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	/// The recorded operations, in source order.
	pub fn changes(&self) -> &[Operation] {
		&self.changes
	}

	/// Keeps the next `n` source characters. Adjacent retains merge.
	pub(crate) fn retain(&mut self, n: CharLen) {
		if n == 0 {
			return;
		}

		self.len += n;
		self.len_after += n;

		if let Some(Operation::Retain(count)) = self.changes.last_mut() {
			*count += n;
		} else {
			self.changes.push(Operation::Retain(n));
		}
	}

	/// Drops the next `n` source characters. Adjacent deletes merge.
	pub(crate) fn delete(&mut self, n: CharLen) {
		if n == 0 {
			return;
		}

		self.len += n;

		if let Some(Operation::Delete(count)) = self.changes.last_mut() {
			*count += n;
		} else {
			self.changes.push(Operation::Delete(n));
		}
	}

	/// Emits `text` at the current position.
	pub(crate) fn insert(&mut self, text: String) {
		self.push_insert(Insertion::new(text));
	}

	/// Insert variant that reuses an already-counted [`Insertion`].
	///
	/// Keeps the canonical form: runs of inserts merge, and an insert paired
	/// with a pending delete is ordered insert-first.
	fn push_insert(&mut self, ins: Insertion) {
		if ins.is_empty() {
			return;
		}

		self.len_after += ins.char_len();

		match self.changes.as_mut_slice() {
			[.., Operation::Insert(prev)] | [.., Operation::Insert(prev), Operation::Delete(_)] => {
				prev.append(&ins);
			}
			[.., last @ Operation::Delete(_)] => {
				let del = std::mem::replace(last, Operation::Insert(ins));
				self.changes.push(del);
			}
			_ => {
				self.changes.push(Operation::Insert(ins));
			}
		}
	}

	/// Applies the changes to `doc` in place.
	pub fn apply(&self, doc: &mut Rope) {
		if self.changes.is_empty() {
			return;
		}

		let mut pos = 0;
		for op in &self.changes {
			match op {
				Operation::Retain(n) => {
					pos += n;
				}
				Operation::Delete(n) => {
					doc.remove(pos..pos + n);
				}
				Operation::Insert(ins) => {
					doc.insert(pos, ins.text());
					pos += ins.char_len();
				}
			}
		}
	}

	/// Builds the change set that undoes this one.
	///
	/// `doc` must be the document as it was before these changes applied,
	/// since deleted text has to be recovered from it.
	pub fn invert(&self, doc: &Rope) -> ChangeSet {
		let mut result = ChangeSet {
			changes: Vec::new(),
			len: self.len_after,
			len_after: self.len,
		};

		let mut pos = 0;
		for op in &self.changes {
			match op {
				Operation::Retain(n) => {
					result.retain(*n);
					pos += n;
				}
				Operation::Delete(n) => {
					let deleted: String = doc.slice(pos..pos + n).chars().collect();
					result.insert(deleted);
					pos += n;
				}
				Operation::Insert(ins) => {
					result.delete(ins.char_len());
				}
			}
		}

		result
	}

	/// Maps a pre-change position to the corresponding post-change position.
	///
	/// `bias` settles the one ambiguous case, an insertion landing exactly on
	/// `pos`: [`Bias::Left`] keeps the position before the inserted text,
	/// [`Bias::Right`] places it after. Positions inside a deleted range
	/// collapse to the deletion point.
	pub fn map_pos(&self, pos: CharIdx, bias: Bias) -> CharIdx {
		let mut old_pos = 0;
		let mut new_pos = 0;

		for op in &self.changes {
			if old_pos > pos {
				break;
			}

			match op {
				Operation::Retain(n) => {
					if old_pos + n > pos {
						return new_pos + (pos - old_pos);
					}
					old_pos += n;
					new_pos += n;
				}
				Operation::Delete(n) => {
					if old_pos + n > pos {
						return new_pos;
					}
					old_pos += n;
				}
				Operation::Insert(ins) => {
					if pos > old_pos || bias == Bias::Right {
						new_pos += ins.char_len();
					}
				}
			}
		}

		new_pos + (pos - old_pos)
	}

	/// Combines `self` then `other` into one equivalent change set.
	///
	/// `other.len` must equal `self.len_after`; the two operation streams are
	/// walked in lockstep, splitting whichever side's current operation is
	/// longer.
	pub fn compose(self, other: ChangeSet) -> ChangeSet {
		debug_assert_eq!(self.len_after, other.len);
		let (source_len, target_len) = (self.len, other.len_after);

		// retain/delete/push_insert accumulate len/len_after below, so the
		// result starts empty rather than pre-seeded.
		let mut result = ChangeSet::new();

		let mut a_ops = self.changes.into_iter();
		let mut b_ops = other.changes.into_iter();
		let mut a = a_ops.next();
		let mut b = b_ops.next();

		loop {
			match (a, b) {
				(None, None) => break,
				// Text deleted by `self` was never visible to `other`.
				(Some(Operation::Delete(n)), rest) => {
					result.delete(n);
					a = a_ops.next();
					b = rest;
				}
				// Text inserted by `other` is independent of `self`'s output.
				(rest, Some(Operation::Insert(ins))) => {
					result.push_insert(ins);
					a = rest;
					b = b_ops.next();
				}
				(Some(Operation::Retain(n)), Some(Operation::Retain(m))) => {
					let step = n.min(m);
					result.retain(step);
					a = if n > step {
						Some(Operation::Retain(n - step))
					} else {
						a_ops.next()
					};
					b = if m > step {
						Some(Operation::Retain(m - step))
					} else {
						b_ops.next()
					};
				}
				(Some(Operation::Retain(n)), Some(Operation::Delete(m))) => {
					let step = n.min(m);
					result.delete(step);
					a = if n > step {
						Some(Operation::Retain(n - step))
					} else {
						a_ops.next()
					};
					b = if m > step {
						Some(Operation::Delete(m - step))
					} else {
						b_ops.next()
					};
				}
				(Some(Operation::Insert(mut ins)), Some(Operation::Retain(m))) => {
					let kept = ins.char_len();
					if kept <= m {
						result.push_insert(ins);
						a = a_ops.next();
						b = if m > kept {
							Some(Operation::Retain(m - kept))
						} else {
							b_ops.next()
						};
					} else {
						result.insert(ins.take_prefix(m));
						a = Some(Operation::Insert(ins));
						b = b_ops.next();
					}
				}
				(Some(Operation::Insert(mut ins)), Some(Operation::Delete(m))) => {
					// Inserted by `self`, removed by `other`: cancels out.
					let dropped = ins.char_len();
					if dropped <= m {
						a = a_ops.next();
						b = if m > dropped {
							Some(Operation::Delete(m - dropped))
						} else {
							b_ops.next()
						};
					} else {
						let _ = ins.take_prefix(m);
						a = Some(Operation::Insert(ins));
						b = b_ops.next();
					}
				}
				// One stream ran out while the other still covers content,
				// which the length invariant rules out.
				_ => unreachable!(),
			}
		}

		debug_assert_eq!(result.len, source_len);
		debug_assert_eq!(result.len_after, target_len);
		result
	}
}
