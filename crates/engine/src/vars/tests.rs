use std::cell::Cell;
use std::rc::Rc;

use chrono::TimeZone;

use super::*;

fn named(name: &str) -> VarRef {
	VarRef::Named(name.into())
}

fn fixed_context() -> ExpansionContext {
	let now = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 4).single().unwrap();
	ExpansionContext::new().with_timestamp(now).allow_commands(false)
}

#[test]
fn date_and_time_variables() {
	let mut ctx = fixed_context();
	assert_eq!(ctx.resolve(&named("CURRENT_YEAR")), "2024");
	assert_eq!(ctx.resolve(&named("CURRENT_YEAR_SHORT")), "24");
	assert_eq!(ctx.resolve(&named("CURRENT_MONTH")), "03");
	assert_eq!(ctx.resolve(&named("CURRENT_MONTH_NAME")), "March");
	assert_eq!(ctx.resolve(&named("CURRENT_MONTH_NAME_SHORT")), "Mar");
	assert_eq!(ctx.resolve(&named("CURRENT_DATE")), "07");
	assert_eq!(ctx.resolve(&named("CURRENT_DAY_NAME")), "Thursday");
	assert_eq!(ctx.resolve(&named("CURRENT_DAY_NAME_SHORT")), "Thu");
	assert_eq!(ctx.resolve(&named("CURRENT_HOUR")), "09");
	assert_eq!(ctx.resolve(&named("CURRENT_MINUTE")), "05");
	assert_eq!(ctx.resolve(&named("CURRENT_SECOND")), "04");
}

#[test]
fn file_path_variables() {
	let mut ctx = fixed_context().with_file_path("/tmp/dir/file.rs");
	assert_eq!(ctx.resolve(&named("TM_FILEPATH")), "/tmp/dir/file.rs");
	assert_eq!(ctx.resolve(&named("TM_DIRECTORY")), "/tmp/dir");
	assert_eq!(ctx.resolve(&named("TM_FILENAME")), "file.rs");
	assert_eq!(ctx.resolve(&named("TM_FILENAME_BASE")), "file");
}

#[test]
fn selection_and_clipboard() {
	let mut ctx = fixed_context().with_selection("sel").with_clipboard("clip");
	assert_eq!(ctx.resolve(&named("SELECTION")), "sel");
	assert_eq!(ctx.resolve(&named("TM_SELECTED_TEXT")), "sel");
	assert_eq!(ctx.resolve(&named("CLIPBOARD")), "clip");
}

#[test]
fn unset_values_resolve_empty() {
	let mut ctx = fixed_context();
	assert_eq!(ctx.resolve(&named("SELECTION")), "");
	assert_eq!(ctx.resolve(&named("TM_FILEPATH")), "");
	assert_eq!(ctx.resolve(&named("NO_SUCH_VARIABLE")), "");
}

#[test]
fn resolver_hook_wins_over_builtins() {
	struct Hook;
	impl VariableResolver for Hook {
		fn resolve(&self, name: &str) -> Option<String> {
			(name == "CURRENT_YEAR" || name == "USER_NAME").then(|| format!("hook:{name}"))
		}
	}
	let mut ctx = fixed_context().with_resolver(Box::new(Hook));
	assert_eq!(ctx.resolve(&named("CURRENT_YEAR")), "hook:CURRENT_YEAR");
	assert_eq!(ctx.resolve(&named("USER_NAME")), "hook:USER_NAME");
	assert_eq!(ctx.resolve(&named("CURRENT_MONTH")), "03");
}

#[test]
fn values_resolve_once_per_context() {
	struct Counting(Rc<Cell<usize>>);
	impl VariableResolver for Counting {
		fn resolve(&self, _name: &str) -> Option<String> {
			self.0.set(self.0.get() + 1);
			Some("x".into())
		}
	}
	let calls = Rc::new(Cell::new(0));
	let mut ctx = fixed_context().with_resolver(Box::new(Counting(calls.clone())));
	assert_eq!(ctx.resolve(&named("ANY")), "x");
	assert_eq!(ctx.resolve(&named("ANY")), "x");
	assert_eq!(calls.get(), 1);
}

#[cfg(unix)]
mod commands {
	use std::time::Duration;

	use super::*;

	fn command(text: &str) -> VarRef {
		VarRef::Command(text.into())
	}

	#[test]
	fn stdout_is_captured() {
		let mut ctx = ExpansionContext::new();
		assert_eq!(ctx.resolve(&command("printf 'a b'")), "a b");
	}

	#[test]
	fn trailing_newlines_are_trimmed() {
		let mut ctx = ExpansionContext::new();
		assert_eq!(ctx.resolve(&command("echo hi")), "hi");
	}

	#[test]
	fn failing_command_resolves_empty() {
		let mut ctx = ExpansionContext::new();
		assert_eq!(ctx.resolve(&command("false")), "");
	}

	#[test]
	fn disabled_commands_resolve_empty() {
		let mut ctx = ExpansionContext::new().allow_commands(false);
		assert_eq!(ctx.resolve(&command("echo hi")), "");
	}

	#[test]
	fn slow_command_times_out() {
		let mut ctx = ExpansionContext::new().with_command_timeout(Duration::from_millis(50));
		assert_eq!(ctx.resolve(&command("sleep 5")), "");
	}

	#[test]
	fn output_larger_than_the_pipe_is_drained() {
		let mut ctx = ExpansionContext::new();
		let out = ctx.resolve(&command("seq 1 20000"));
		assert!(out.ends_with("\n20000"));
		assert!(out.len() > 100_000);
	}
}
