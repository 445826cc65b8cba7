//! Trigger-keyed storage for parsed snippet templates.
//!
//! Hosts load `*.snippets` files into a process-scoped registry and look
//! templates up by trigger word plus the language of the buffer being
//! edited. Loading is lossy: a malformed block is reported and skipped
//! without taking the rest of its file down.

#![cfg_attr(test, allow(unused_crate_dependencies))]

use std::collections::BTreeMap;
use std::io;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use stencil_engine::{ParseError, Template, parse_templates_lossy};
use thiserror::Error;

/// File extension recognized by [`SnippetRegistry::load_dir`].
pub const SNIPPET_EXTENSION: &str = "snippets";

/// One block that failed to parse while loading.
#[derive(Debug, Error)]
#[error("{source_name}: {error}")]
pub struct LoadError {
	/// File path or caller-supplied name of the source text.
	pub source_name: String,
	pub error: ParseError,
}

/// Outcome of a load call: how many templates registered, which blocks
/// were skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
	pub loaded: usize,
	pub errors: Vec<LoadError>,
}

impl LoadReport {
	fn merge(&mut self, other: LoadReport) {
		self.loaded += other.loaded;
		self.errors.extend(other.errors);
	}
}

#[derive(Default)]
struct TriggerEntry {
	generic: Option<Arc<Template>>,
	by_language: BTreeMap<String, Arc<Template>>,
}

impl TriggerEntry {
	fn visible(&self, language: Option<&str>) -> Option<&Arc<Template>> {
		language
			.and_then(|lang| self.by_language.get(lang))
			.or(self.generic.as_ref())
	}
}

/// Owned, process-scoped template store keyed by trigger and language.
///
/// Registering a template for a trigger + language pair replaces the
/// previous holder, so load order decides shadowing: files loaded later
/// win.
#[derive(Default)]
pub struct SnippetRegistry {
	triggers: BTreeMap<String, TriggerEntry>,
}

impl SnippetRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers one template, replacing any previous template with the
	/// same trigger and language.
	pub fn add(&mut self, template: Template) {
		let template = Arc::new(template);
		let entry = self.triggers.entry(template.trigger.clone()).or_default();
		match &template.language {
			Some(language) => {
				entry.by_language.insert(language.clone(), template);
			}
			None => entry.generic = Some(template),
		}
	}

	/// Looks up a trigger for a buffer language. A template registered
	/// for that language wins over a generic one.
	pub fn get(&self, trigger: &str, language: Option<&str>) -> Option<Arc<Template>> {
		self.triggers.get(trigger)?.visible(language).cloned()
	}

	/// Parses snippet file text and registers every well-formed block.
	pub fn load_str(&mut self, source: &str, source_name: &str) -> LoadReport {
		let parsed = parse_templates_lossy(source);
		let mut report = LoadReport {
			loaded: parsed.templates.len(),
			errors: Vec::new(),
		};
		for template in parsed.templates {
			self.add(template);
		}
		for error in parsed.errors {
			tracing::warn!(source = source_name, error = %error, "skipping snippet block");
			report.errors.push(LoadError {
				source_name: source_name.to_string(),
				error,
			});
		}
		report
	}

	/// Loads one snippet file.
	pub fn load_file(&mut self, path: &Path) -> io::Result<LoadReport> {
		let source = std::fs::read_to_string(path)?;
		Ok(self.load_str(&source, &path.display().to_string()))
	}

	/// Loads every `*.snippets` file in a directory, in path order so
	/// shadowing between files is deterministic. An unreadable file is
	/// skipped with a warning; a missing directory is an error.
	pub fn load_dir(&mut self, dir: &Path) -> io::Result<LoadReport> {
		let mut paths = Vec::new();
		for entry in std::fs::read_dir(dir)? {
			let path = entry?.path();
			if path.extension().is_some_and(|ext| ext == SNIPPET_EXTENSION) {
				paths.push(path);
			}
		}
		paths.sort();

		let mut report = LoadReport::default();
		for path in paths {
			match self.load_file(&path) {
				Ok(file_report) => report.merge(file_report),
				Err(error) => {
					tracing::warn!(path = %path.display(), error = %error, "skipping unreadable snippet file");
				}
			}
		}
		Ok(report)
	}

	/// Every registered template in trigger order, generic before
	/// language-specific within one trigger.
	pub fn iter(&self) -> impl Iterator<Item = &Arc<Template>> {
		self.triggers
			.values()
			.flat_map(|entry| entry.generic.iter().chain(entry.by_language.values()))
	}

	/// Templates visible for `language` whose trigger starts with
	/// `prefix`, in trigger order. Drives completion listings.
	pub fn completions(&self, prefix: &str, language: Option<&str>) -> Vec<Arc<Template>> {
		self.triggers
			.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
			.take_while(|(trigger, _)| trigger.starts_with(prefix))
			.filter_map(|(_, entry)| entry.visible(language).cloned())
			.collect()
	}

	pub fn len(&self) -> usize {
		self.triggers
			.values()
			.map(|entry| usize::from(entry.generic.is_some()) + entry.by_language.len())
			.sum()
	}

	pub fn is_empty(&self) -> bool {
		self.triggers.is_empty()
	}
}
