//! Live snippet sessions.
//!
//! A session renders a template, inserts the text, and brackets every
//! chunk with a pair of marks. The active tab stop takes an absorbing
//! pair (start leans left, end leans right) so typing at its edges grows
//! the stop; every other chunk takes a repelling pair so neighbouring
//! edits slide past it. User edits confined to the active stop trigger a
//! mirror resync sweep; any other user edit cancels the session. Writes
//! the session issues itself carry the `Expand` and `Sync` origins and
//! are ignored when they come back through [`Session::on_buffer_changed`].

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;

use stencil_primitives::range::{CharIdx, CharLen, span_contains};
use stencil_primitives::{Bias, Buffer, BufferEdit, EditOrigin, MarkId};

use crate::render::{self, RenderedKind};
use crate::syntax::Template;
use crate::transform::Transform;
use crate::vars::ExpansionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Active,
	/// Reached the final stop; the buffer keeps the expanded text.
	Finished,
	/// Abandoned; the buffer keeps whatever text was present.
	Cancelled,
}

/// A chunk tracked in the buffer: two marks bracketing its text.
#[derive(Debug, Clone)]
struct Chunk {
	start: MarkId,
	end: MarkId,
	kind: ChunkKind,
}

#[derive(Debug, Clone)]
enum ChunkKind {
	/// An editable stop; its index lives in the [`Session::groups`] key.
	TabStop,
	Mirror { transform: Option<Transform> },
	Variable,
}

/// Chunk indexes for one tab stop index: the stop itself plus the
/// mirrors that follow it.
#[derive(Debug)]
struct Group {
	authoritative: usize,
	mirrors: Vec<usize>,
}

pub struct Session {
	template: Arc<Template>,
	chunks: Vec<Chunk>,
	groups: BTreeMap<u32, Group>,
	/// Traversal order: ascending stop indexes with `0` last.
	order: Vec<u32>,
	/// Position within `order` of the active stop.
	active_i: usize,
	/// Span of the active stop before the edit being handled.
	active_span: Range<CharIdx>,
	state: SessionState,
	final_cursor: Option<CharIdx>,
}

impl Session {
	/// Renders `template` and inserts it at `at`, taking ownership of the
	/// inserted region. The session starts at the lowest numbered stop;
	/// a template with only the final stop finishes immediately.
	pub fn begin(
		template: Arc<Template>,
		ctx: &mut ExpansionContext,
		buffer: &mut Buffer,
		at: CharIdx,
	) -> Session {
		let at = at.min(buffer.len_chars());
		let rendered = render::render(&template, ctx);
		buffer.insert(at, &rendered.text, EditOrigin::Expand);

		let mut chunks = Vec::with_capacity(rendered.chunks.len());
		let mut groups: BTreeMap<u32, Group> = BTreeMap::new();
		for chunk in &rendered.chunks {
			let start = buffer.create_mark(at + chunk.range.start, Bias::Right);
			let end = buffer.create_mark(at + chunk.range.end, Bias::Left);
			let kind = match &chunk.kind {
				RenderedKind::TabStop { index } => {
					groups.insert(*index, Group { authoritative: chunks.len(), mirrors: Vec::new() });
					ChunkKind::TabStop
				}
				RenderedKind::Mirror { transform, .. } => {
					ChunkKind::Mirror { transform: transform.clone() }
				}
				RenderedKind::Variable => ChunkKind::Variable,
			};
			chunks.push(Chunk { start, end, kind });
		}
		for (i, chunk) in rendered.chunks.iter().enumerate() {
			if let RenderedKind::Mirror { of_index, .. } = &chunk.kind {
				if let Some(group) = groups.get_mut(of_index) {
					group.mirrors.push(i);
				}
			}
		}

		let order = tabstop_order(&groups);
		let mut session = Session {
			template,
			chunks,
			groups,
			order,
			active_i: 0,
			active_span: at..at,
			state: SessionState::Active,
			final_cursor: None,
		};
		session.focus_current(buffer);
		tracing::debug!(
			trigger = %session.template.trigger,
			stops = session.order.len(),
			"snippet session started"
		);
		session
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn template(&self) -> &Template {
		&self.template
	}

	/// Index of the stop the caret is on. `Some(0)` once finished, `None`
	/// once cancelled.
	pub fn current_index(&self) -> Option<u32> {
		match self.state {
			SessionState::Cancelled => None,
			_ => self.order.get(self.active_i).copied(),
		}
	}

	/// The region the caret should select: the active stop's span while
	/// active, the final caret position once finished.
	pub fn active_range(&self, buffer: &Buffer) -> Option<Range<CharIdx>> {
		match self.state {
			SessionState::Active => {
				let index = self.order.get(self.active_i)?;
				let group = self.groups.get(index)?;
				self.chunk_span(buffer, group.authoritative)
			}
			SessionState::Finished => self.final_cursor.map(|pos| pos..pos),
			SessionState::Cancelled => None,
		}
	}

	/// Current spans of a stop and its mirrors, normalized.
	pub fn ranges_of(&self, buffer: &Buffer, index: u32) -> Vec<Range<CharIdx>> {
		if self.state != SessionState::Active {
			return Vec::new();
		}
		let Some(group) = self.groups.get(&index) else {
			return Vec::new();
		};
		let mut spans = Vec::with_capacity(group.mirrors.len() + 1);
		if let Some(span) = self.chunk_span(buffer, group.authoritative) {
			spans.push(span);
		}
		for &mirror in &group.mirrors {
			if let Some(span) = self.chunk_span(buffer, mirror) {
				spans.push(span);
			}
		}
		normalize_spans(&mut spans);
		spans
	}

	/// Moves to the next or previous stop. Returns true when the caret
	/// moved to another editable stop. Moving forward past the last
	/// numbered stop finishes the session and returns false; moving
	/// backward from the first stop is a no-op.
	pub fn advance(&mut self, buffer: &mut Buffer, forward: bool) -> bool {
		if self.state != SessionState::Active {
			return false;
		}
		if forward {
			if self.active_i + 1 >= self.order.len() {
				self.finish(buffer);
				return false;
			}
			self.active_i += 1;
		} else {
			if self.active_i == 0 {
				return false;
			}
			self.active_i -= 1;
		}
		self.focus_current(buffer);
		self.state == SessionState::Active
	}

	/// Hands a buffer event to the session. Engine-tagged writes pass
	/// through; user edits inside the active stop resync mirrors; any
	/// other user edit cancels.
	pub fn on_buffer_changed(&mut self, buffer: &mut Buffer, edit: &BufferEdit) {
		if self.state != SessionState::Active || edit.origin != EditOrigin::User {
			return;
		}
		let span = self.active_span.clone();
		if span.start <= edit.start && edit.deleted_end() <= span.end {
			self.resync(buffer, edit);
		} else {
			self.cancel_with_reason(buffer, "edit outside the active tab stop");
		}
	}

	pub fn cancel(&mut self, buffer: &mut Buffer) {
		if self.state == SessionState::Active {
			self.cancel_with_reason(buffer, "cancelled by host");
		}
	}

	/// Caret position chosen when the session finished.
	pub fn final_cursor(&self) -> Option<CharIdx> {
		self.final_cursor
	}

	/// Points the bias pairs at the stop `active_i` names and caches its
	/// span. Landing on stop 0 finishes the session.
	fn focus_current(&mut self, buffer: &mut Buffer) {
		let Some(&index) = self.order.get(self.active_i) else {
			self.cancel_with_reason(buffer, "no tab stops");
			return;
		};
		if index == 0 {
			self.finish(buffer);
			return;
		}
		let Some(active_chunk) = self.groups.get(&index).map(|g| g.authoritative) else {
			self.cancel_with_reason(buffer, "active tab stop disappeared");
			return;
		};
		for (i, chunk) in self.chunks.iter().enumerate() {
			let (start_bias, end_bias) = if i == active_chunk {
				(Bias::Left, Bias::Right)
			} else {
				(Bias::Right, Bias::Left)
			};
			buffer.set_mark_bias(chunk.start, start_bias);
			buffer.set_mark_bias(chunk.end, end_bias);
		}
		match self.chunk_span(buffer, active_chunk) {
			Some(span) => self.active_span = span,
			None => self.cancel_with_reason(buffer, "snippet mark was lost"),
		}
	}

	fn finish(&mut self, buffer: &mut Buffer) {
		let cursor = self
			.groups
			.get(&0)
			.and_then(|group| self.chunk_span(buffer, group.authoritative))
			.map(|span| span.start)
			.unwrap_or_else(|| self.active_span.end.min(buffer.len_chars()));
		self.release_marks(buffer);
		self.final_cursor = Some(cursor);
		self.state = SessionState::Finished;
		tracing::debug!(trigger = %self.template.trigger, "snippet session finished");
	}

	fn cancel_with_reason(&mut self, buffer: &mut Buffer, reason: &str) {
		self.release_marks(buffer);
		self.state = SessionState::Cancelled;
		tracing::debug!(trigger = %self.template.trigger, reason, "snippet session cancelled");
	}

	fn release_marks(&mut self, buffer: &mut Buffer) {
		for chunk in &self.chunks {
			buffer.release_mark(chunk.start);
			buffer.release_mark(chunk.end);
		}
	}

	fn chunk_span(&self, buffer: &Buffer, chunk: usize) -> Option<Range<CharIdx>> {
		let chunk = self.chunks.get(chunk)?;
		let start = buffer.mark_pos(chunk.start)?;
		let end = buffer.mark_pos(chunk.end)?;
		Some(start..end.max(start))
	}

	/// Propagates a confined user edit to every dependent mirror.
	///
	/// Seeds with the groups the edit touched plus everything enclosing
	/// the active stop, then rewrites innermost first so enclosing stops
	/// read updated interior text. A group that needs rewriting twice in
	/// one sweep will not converge and cancels the session.
	fn resync(&mut self, buffer: &mut Buffer, edit: &BufferEdit) {
		let Some(&active_index) = self.order.get(self.active_i) else {
			self.cancel_with_reason(buffer, "active tab stop disappeared");
			return;
		};
		let Some(active_now) = self
			.groups
			.get(&active_index)
			.and_then(|g| self.chunk_span(buffer, g.authoritative))
		else {
			self.cancel_with_reason(buffer, "snippet mark was lost");
			return;
		};

		let edited = edit.start..edit.start + edit.inserted.chars().count();
		let mut dirty: Vec<u32> = Vec::new();
		let mut lost_mark = false;
		for (&index, group) in &self.groups {
			let Some(span) = self.chunk_span(buffer, group.authoritative) else {
				lost_mark = true;
				break;
			};
			let touches = span.start <= edited.end && edited.start <= span.end;
			if touches || span_contains(&span, &active_now) {
				dirty.push(index);
			}
		}
		if lost_mark {
			self.cancel_with_reason(buffer, "snippet mark was lost");
			return;
		}

		let mut done: BTreeSet<u32> = BTreeSet::new();
		while !dirty.is_empty() {
			let Some(slot) = self.innermost(buffer, &dirty) else {
				self.cancel_with_reason(buffer, "snippet mark was lost");
				return;
			};
			let index = dirty.swap_remove(slot);
			done.insert(index);
			match self.resync_group(buffer, index) {
				Some(newly_dirty) => {
					for idx in newly_dirty {
						if done.contains(&idx) {
							self.cancel_with_reason(buffer, "mirror update loop");
							return;
						}
						if !dirty.contains(&idx) {
							dirty.push(idx);
						}
					}
				}
				None => {
					self.cancel_with_reason(buffer, "snippet mark was lost");
					return;
				}
			}
		}

		match self
			.groups
			.get(&active_index)
			.and_then(|g| self.chunk_span(buffer, g.authoritative))
		{
			Some(span) => self.active_span = span,
			None => self.cancel_with_reason(buffer, "snippet mark was lost"),
		}
	}

	/// Picks the dirty group with the shortest authoritative span.
	fn innermost(&self, buffer: &Buffer, dirty: &[u32]) -> Option<usize> {
		let mut best: Option<(usize, CharLen)> = None;
		for (slot, index) in dirty.iter().enumerate() {
			let span = self
				.groups
				.get(index)
				.and_then(|g| self.chunk_span(buffer, g.authoritative))?;
			let len = span.end - span.start;
			if best.is_none_or(|(_, best_len)| len < best_len) {
				best = Some((slot, len));
			}
		}
		best.map(|(slot, _)| slot)
	}

	/// Rewrites every mirror of `index` from the stop's current text.
	/// Returns the indexes of stops whose text changed as a result, or
	/// None when a mark has been lost.
	fn resync_group(&self, buffer: &mut Buffer, index: u32) -> Option<Vec<u32>> {
		let Some(group) = self.groups.get(&index) else {
			return Some(Vec::new());
		};
		let source_span = self.chunk_span(buffer, group.authoritative)?;
		let source = buffer.text_of(source_span);
		let mut dirtied = Vec::new();
		for &mirror_i in &group.mirrors {
			let Some(chunk) = self.chunks.get(mirror_i) else {
				continue;
			};
			let ChunkKind::Mirror { transform } = &chunk.kind else {
				continue;
			};
			let expected = match transform {
				Some(t) => t.apply(&source),
				None => source.clone(),
			};
			let target = self.chunk_span(buffer, mirror_i)?;
			if buffer.text_of(target.clone()) == expected {
				continue;
			}
			// other chunks' marks sitting exactly on the rewrite start
			// (an abutting stop's absorbing end, an enclosing stop's
			// start) must not travel with the inserted text
			let pinned: Vec<MarkId> = self
				.chunks
				.iter()
				.enumerate()
				.filter(|&(i, _)| i != mirror_i)
				.flat_map(|(_, c)| [c.start, c.end])
				.filter(|&mark| buffer.mark_pos(mark) == Some(target.start))
				.collect();
			buffer.replace(target.clone(), &expected, EditOrigin::Sync);
			// the rewrite's own marks are repelling, so pin them back
			// around the new text
			let new_len = expected.chars().count();
			buffer.move_mark(chunk.start, target.start);
			buffer.move_mark(chunk.end, target.start + new_len);
			for mark in pinned {
				buffer.move_mark(mark, target.start);
			}
			let new_span = target.start..target.start + new_len;
			for (&other, other_group) in &self.groups {
				let other_span = self.chunk_span(buffer, other_group.authoritative)?;
				if span_contains(&other_span, &new_span) && !dirtied.contains(&other) {
					dirtied.push(other);
				}
			}
		}
		Some(dirtied)
	}
}

/// Holder for at most one live session per buffer. Starting a new
/// session cancels the previous one.
#[derive(Default)]
pub struct SessionSlot {
	pub session: Option<Session>,
}

impl SessionSlot {
	pub fn begin(
		&mut self,
		template: Arc<Template>,
		ctx: &mut ExpansionContext,
		buffer: &mut Buffer,
		at: CharIdx,
	) -> SessionState {
		if let Some(previous) = self.session.as_mut() {
			previous.cancel(buffer);
		}
		let session = Session::begin(template, ctx, buffer, at);
		let state = session.state();
		self.session = Some(session);
		state
	}

	/// Forwards a buffer event to the held session, dropping it when the
	/// edit cancelled it. Finished sessions stay queryable.
	pub fn handle_edit(&mut self, buffer: &mut Buffer, edit: &BufferEdit) {
		let Some(session) = self.session.as_mut() else {
			return;
		};
		session.on_buffer_changed(buffer, edit);
		if session.state() == SessionState::Cancelled {
			self.session = None;
		}
	}

	pub fn advance(&mut self, buffer: &mut Buffer, forward: bool) -> bool {
		let Some(session) = self.session.as_mut() else {
			return false;
		};
		let moved = session.advance(buffer, forward);
		if session.state() == SessionState::Cancelled {
			self.session = None;
		}
		moved
	}

	pub fn cancel(&mut self, buffer: &mut Buffer) {
		if let Some(mut session) = self.session.take() {
			session.cancel(buffer);
		}
	}

	pub fn active(&self) -> Option<&Session> {
		self.session.as_ref().filter(|s| s.state() == SessionState::Active)
	}
}

/// Ascending stop indexes with the final stop `0` moved to the end.
fn tabstop_order(groups: &BTreeMap<u32, Group>) -> Vec<u32> {
	let mut order: Vec<u32> = groups.keys().copied().filter(|&index| index != 0).collect();
	if groups.contains_key(&0) {
		order.push(0);
	}
	order
}

/// Sorts spans, merges strict overlaps and duplicate points. Adjacent
/// spans stay separate.
fn normalize_spans(spans: &mut Vec<Range<CharIdx>>) {
	spans.sort_by_key(|span| (span.start, span.end));
	let mut merged: Vec<Range<CharIdx>> = Vec::new();
	for span in spans.drain(..) {
		if let Some(last) = merged.last_mut() {
			if span.start < last.end || span == *last {
				last.end = last.end.max(span.end);
				continue;
			}
		}
		merged.push(span);
	}
	*spans = merged;
}
