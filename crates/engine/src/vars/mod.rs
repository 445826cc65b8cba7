//! Variable resolution for snippet expansion.
//!
//! Resolution order: the host [`VariableResolver`] hook first, then the
//! builtin table. Date and time variables read one timestamp pinned at
//! context creation, so every reference in a template sees the same
//! instant. Each variable and command resolves at most once per context;
//! repeated references reuse the cached value. Failures degrade to empty
//! text so expansion never stalls on a variable.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};
use thiserror::Error;

use crate::syntax::VarRef;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Host hook consulted before the builtin variable table.
pub trait VariableResolver {
	fn resolve(&self, name: &str) -> Option<String>;
}

/// Per-expansion variable state: editor-provided values, the pinned
/// timestamp, and the resolution cache.
pub struct ExpansionContext {
	now: DateTime<Local>,
	selection: Option<String>,
	clipboard: Option<String>,
	file_path: Option<PathBuf>,
	resolver: Option<Box<dyn VariableResolver>>,
	allow_commands: bool,
	command_timeout: Duration,
	cache: HashMap<VarRef, String>,
}

impl Default for ExpansionContext {
	fn default() -> Self {
		Self::new()
	}
}

impl ExpansionContext {
	pub fn new() -> Self {
		Self {
			now: Local::now(),
			selection: None,
			clipboard: None,
			file_path: None,
			resolver: None,
			allow_commands: true,
			command_timeout: DEFAULT_COMMAND_TIMEOUT,
			cache: HashMap::new(),
		}
	}

	/// Pins the timestamp the date and time variables read.
	pub fn with_timestamp(mut self, now: DateTime<Local>) -> Self {
		self.now = now;
		self
	}

	/// Text the expansion replaces, exposed as `SELECTION`.
	pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
		self.selection = Some(selection.into());
		self
	}

	pub fn with_clipboard(mut self, clipboard: impl Into<String>) -> Self {
		self.clipboard = Some(clipboard.into());
		self
	}

	/// Path of the document being edited, exposed as the `TM_*` variables.
	pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.file_path = Some(path.into());
		self
	}

	pub fn with_resolver(mut self, resolver: Box<dyn VariableResolver>) -> Self {
		self.resolver = Some(resolver);
		self
	}

	/// Enables or disables `$(cmd)` execution. Enabled by default.
	pub fn allow_commands(mut self, allow: bool) -> Self {
		self.allow_commands = allow;
		self
	}

	pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
		self.command_timeout = timeout;
		self
	}

	/// Resolves a variable reference, caching the value per context.
	pub fn resolve(&mut self, var: &VarRef) -> String {
		if let Some(cached) = self.cache.get(var) {
			return cached.clone();
		}
		let value = match var {
			VarRef::Named(name) => self.resolve_named(name),
			VarRef::Command(command) => self.run_command(command),
		};
		self.cache.insert(var.clone(), value.clone());
		value
	}

	fn resolve_named(&self, name: &str) -> String {
		if let Some(resolver) = &self.resolver {
			if let Some(value) = resolver.resolve(name) {
				return value;
			}
		}
		self.builtin(name).unwrap_or_else(|| {
			tracing::debug!(name, "unresolved snippet variable");
			String::new()
		})
	}

	fn builtin(&self, name: &str) -> Option<String> {
		let now = &self.now;
		let value = match name {
			"CURRENT_YEAR" => format!("{:04}", now.year()),
			"CURRENT_YEAR_SHORT" => format!("{:02}", now.year() % 100),
			"CURRENT_MONTH" => format!("{:02}", now.month()),
			"CURRENT_MONTH_NAME" => month_name(now.month()).to_string(),
			"CURRENT_MONTH_NAME_SHORT" => month_name(now.month())[..3].to_string(),
			"CURRENT_DATE" => format!("{:02}", now.day()),
			"CURRENT_DAY_NAME" => day_name(now.weekday()).to_string(),
			"CURRENT_DAY_NAME_SHORT" => day_name(now.weekday())[..3].to_string(),
			"CURRENT_HOUR" => format!("{:02}", now.hour()),
			"CURRENT_MINUTE" => format!("{:02}", now.minute()),
			"CURRENT_SECOND" => format!("{:02}", now.second()),
			"SELECTION" | "TM_SELECTED_TEXT" => self.selection.clone().unwrap_or_default(),
			"CLIPBOARD" => self.clipboard.clone().unwrap_or_default(),
			"TM_FILEPATH" => self
				.file_path
				.as_ref()
				.map(|p| p.to_string_lossy().into_owned())
				.unwrap_or_default(),
			"TM_DIRECTORY" => self
				.file_path
				.as_ref()
				.and_then(|p| p.parent())
				.map(|p| p.to_string_lossy().into_owned())
				.unwrap_or_default(),
			"TM_FILENAME" => self
				.file_path
				.as_ref()
				.and_then(|p| p.file_name())
				.map(|n| n.to_string_lossy().into_owned())
				.unwrap_or_default(),
			"TM_FILENAME_BASE" => self
				.file_path
				.as_ref()
				.and_then(|p| p.file_stem())
				.map(|n| n.to_string_lossy().into_owned())
				.unwrap_or_default(),
			_ => return None,
		};
		Some(value)
	}

	fn run_command(&self, command: &str) -> String {
		if !self.allow_commands {
			tracing::debug!(command, "snippet command execution is disabled");
			return String::new();
		}
		match self.spawn_and_wait(command) {
			Ok(output) => output,
			Err(err) => {
				tracing::warn!(command, error = %err, "snippet command failed");
				String::new()
			}
		}
	}

	fn spawn_and_wait(&self, command: &str) -> Result<String, CommandError> {
		let mut child = shell_command(command)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.spawn()?;

		// the pipe buffer is finite; a side thread drains it while the
		// loop below polls for exit
		let mut stdout = child.stdout.take();
		let reader = std::thread::spawn(move || {
			let mut bytes = Vec::new();
			if let Some(stdout) = stdout.as_mut() {
				let _ = stdout.read_to_end(&mut bytes);
			}
			bytes
		});

		let deadline = Instant::now() + self.command_timeout;
		let status = loop {
			if let Some(status) = child.try_wait()? {
				break status;
			}
			if Instant::now() >= deadline {
				let _ = child.kill();
				let _ = child.wait();
				return Err(CommandError::Timeout(self.command_timeout));
			}
			std::thread::sleep(POLL_INTERVAL);
		};
		let bytes = reader.join().unwrap_or_default();
		if !status.success() {
			return Err(CommandError::Failed(status));
		}
		let mut text = String::from_utf8_lossy(&bytes).into_owned();
		while text.ends_with('\n') || text.ends_with('\r') {
			text.pop();
		}
		Ok(text)
	}
}

#[derive(Debug, Error)]
enum CommandError {
	#[error("timed out after {0:?}")]
	Timeout(Duration),
	#[error("exited with {0}")]
	Failed(std::process::ExitStatus),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
	let mut shell = Command::new("sh");
	shell.arg("-c").arg(command);
	shell
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
	let mut shell = Command::new("cmd");
	shell.args(["/C", command]);
	shell
}

fn month_name(month: u32) -> &'static str {
	const NAMES: [&str; 12] = [
		"January",
		"February",
		"March",
		"April",
		"May",
		"June",
		"July",
		"August",
		"September",
		"October",
		"November",
		"December",
	];
	NAMES.get(month.saturating_sub(1) as usize).copied().unwrap_or("January")
}

fn day_name(weekday: Weekday) -> &'static str {
	match weekday {
		Weekday::Mon => "Monday",
		Weekday::Tue => "Tuesday",
		Weekday::Wed => "Wednesday",
		Weekday::Thu => "Thursday",
		Weekday::Fri => "Friday",
		Weekday::Sat => "Saturday",
		Weekday::Sun => "Sunday",
	}
}
