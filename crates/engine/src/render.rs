//! Template materialization: flattens a template into the text to insert
//! plus the char ranges of its chunks.
//!
//! Tab stop defaults render inline. Mirrors render the initial text of
//! their stop through their transform; stop texts are resolved in a
//! pre-pass so a mirror can appear before its stop in the template.
//! Variables resolve through the context, falling back to their static
//! default when the value comes back empty.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::syntax::{ChunkSpec, Template};
use crate::transform::Transform;
use crate::vars::ExpansionContext;

/// Rendered text plus the chunks the session needs to track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
	pub text: String,
	pub chunks: Vec<RenderedChunk>,
}

/// A chunk's place in the rendered text, in chars relative to the start
/// of the rendered block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChunk {
	pub range: Range<usize>,
	pub kind: RenderedKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedKind {
	TabStop { index: u32 },
	Mirror { of_index: u32, transform: Option<Transform> },
	Variable,
}

/// Renders a template body. The result always carries a tab stop `0`
/// chunk; when the template has none, an empty one sits at the end.
pub fn render(template: &Template, ctx: &mut ExpansionContext) -> RenderedTemplate {
	let mut defaults = StopDefaults::collect(&template.body, ctx);
	let mut renderer = Renderer { text: String::new(), chars: 0, chunks: Vec::new() };
	renderer.render_chunks(&template.body, ctx, &mut defaults);
	if !renderer.chunks.iter().any(|c| matches!(c.kind, RenderedKind::TabStop { index: 0 })) {
		let at = renderer.chars;
		renderer
			.chunks
			.push(RenderedChunk { range: at..at, kind: RenderedKind::TabStop { index: 0 } });
	}
	RenderedTemplate { text: renderer.text, chunks: renderer.chunks }
}

struct Renderer {
	text: String,
	/// Chars pushed so far; chunk ranges are char-based.
	chars: usize,
	chunks: Vec<RenderedChunk>,
}

impl Renderer {
	fn render_chunks(
		&mut self,
		chunks: &[ChunkSpec],
		ctx: &mut ExpansionContext,
		defaults: &mut StopDefaults<'_>,
	) {
		for chunk in chunks {
			match chunk {
				ChunkSpec::Literal { text } => self.push_text(text),
				ChunkSpec::TabStop { index, default } => {
					let start = self.chars;
					self.render_chunks(default, ctx, defaults);
					self.chunks.push(RenderedChunk {
						range: start..self.chars,
						kind: RenderedKind::TabStop { index: *index },
					});
				}
				ChunkSpec::Mirror { of_index, transform } => {
					let text = match transform {
						Some(t) => t.apply(defaults.text_of(*of_index)),
						None => defaults.text_of(*of_index).to_string(),
					};
					let start = self.chars;
					self.push_text(&text);
					self.chunks.push(RenderedChunk {
						range: start..self.chars,
						kind: RenderedKind::Mirror {
							of_index: *of_index,
							transform: transform.clone(),
						},
					});
				}
				ChunkSpec::Variable { var, default, transform } => {
					let resolved = ctx.resolve(var);
					let value = if resolved.is_empty() {
						let mut fallback = String::new();
						defaults.static_text(default, ctx, &mut fallback);
						fallback
					} else {
						resolved
					};
					let text = match transform {
						Some(t) => t.apply(&value),
						None => value,
					};
					let start = self.chars;
					self.push_text(&text);
					self.chunks.push(RenderedChunk {
						range: start..self.chars,
						kind: RenderedKind::Variable,
					});
				}
			}
		}
	}

	fn push_text(&mut self, text: &str) {
		self.text.push_str(text);
		self.chars += text.chars().count();
	}
}

/// Initial text of every authoritative tab stop, resolved before
/// emission so mirrors can render ahead of their stop.
struct StopDefaults<'a> {
	specs: BTreeMap<u32, &'a [ChunkSpec]>,
	texts: BTreeMap<u32, String>,
	resolving: BTreeSet<u32>,
}

impl<'a> StopDefaults<'a> {
	fn collect(body: &'a [ChunkSpec], ctx: &mut ExpansionContext) -> Self {
		let mut specs = BTreeMap::new();
		collect_stop_specs(body, &mut specs);
		let mut defaults = Self { specs, texts: BTreeMap::new(), resolving: BTreeSet::new() };
		let indexes: Vec<u32> = defaults.specs.keys().copied().collect();
		for index in indexes {
			defaults.resolve(index, ctx);
		}
		defaults
	}

	fn text_of(&self, index: u32) -> &str {
		self.texts.get(&index).map_or("", String::as_str)
	}

	fn resolve(&mut self, index: u32, ctx: &mut ExpansionContext) -> String {
		if let Some(text) = self.texts.get(&index) {
			return text.clone();
		}
		if !self.resolving.insert(index) {
			tracing::warn!(index, "mirror cycle in snippet defaults");
			return String::new();
		}
		let spec = self.specs.get(&index).copied().unwrap_or(&[]);
		let mut text = String::new();
		self.static_text(spec, ctx, &mut text);
		self.resolving.remove(&index);
		self.texts.insert(index, text.clone());
		text
	}

	/// Flattens chunks to their initial text without emitting ranges.
	/// Used for stop defaults and for variable fallbacks, whose interior
	/// never becomes live chunks.
	fn static_text(&mut self, chunks: &[ChunkSpec], ctx: &mut ExpansionContext, out: &mut String) {
		for chunk in chunks {
			match chunk {
				ChunkSpec::Literal { text } => out.push_str(text),
				ChunkSpec::TabStop { index, .. } => {
					let text = self.resolve(*index, ctx);
					out.push_str(&text);
				}
				ChunkSpec::Mirror { of_index, transform } => {
					let source = self.resolve(*of_index, ctx);
					match transform {
						Some(t) => out.push_str(&t.apply(&source)),
						None => out.push_str(&source),
					}
				}
				ChunkSpec::Variable { var, default, transform } => {
					let resolved = ctx.resolve(var);
					let value = if resolved.is_empty() {
						let mut fallback = String::new();
						self.static_text(default, ctx, &mut fallback);
						fallback
					} else {
						resolved
					};
					match transform {
						Some(t) => out.push_str(&t.apply(&value)),
						None => out.push_str(&value),
					}
				}
			}
		}
	}
}

fn collect_stop_specs<'a>(chunks: &'a [ChunkSpec], specs: &mut BTreeMap<u32, &'a [ChunkSpec]>) {
	for chunk in chunks {
		if let ChunkSpec::TabStop { index, default } = chunk {
			specs.entry(*index).or_insert(default.as_slice());
			collect_stop_specs(default, specs);
		}
	}
}
