//! Snippet engine: template parsing, variable expansion, and live
//! editing sessions over a [`stencil_primitives::Buffer`].
//!
//! A snippet travels through three stages. [`syntax`] parses template
//! source into a [`syntax::Template`]. [`render`] resolves variables and
//! tab stop defaults into flat text plus chunk ranges. [`session`] owns
//! the inserted region and keeps mirrors synchronized while the user
//! tabs through the stops.

#![cfg_attr(test, allow(unused_crate_dependencies))]

/// Template materialization into text and chunk ranges.
pub mod render;
/// Live editing sessions over an inserted snippet.
pub mod session;
/// Template and snippet-file parsing.
pub mod syntax;
/// Regex substitutions applied to mirror and variable text.
pub mod transform;
/// Variable resolution for snippet expansion.
pub mod vars;

pub use render::{RenderedChunk, RenderedKind, RenderedTemplate, render};
pub use session::{Session, SessionSlot, SessionState};
pub use syntax::{
	ChunkSpec, FileParse, ParseError, Template, VarRef, parse_body, parse_templates,
	parse_templates_lossy,
};
pub use transform::Transform;
pub use vars::{ExpansionContext, VariableResolver};
