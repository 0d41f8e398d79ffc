//! Threadly command-line client.
//!
//! Signs in against the Threadly API, manages notifications, and follows the
//! realtime notification channel. Credentials persist between invocations in
//! the configured credentials file.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "threadly")]
#[command(about = "Threadly session and notification client")]
struct Args {
	/// Configuration file (defaults to the platform config directory)
	#[arg(short, long, value_name = "PATH", global = true)]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	/// Print results as JSON
	#[arg(long, global = true)]
	json: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
	/// Sign in and store the issued credentials
	Login {
		#[arg(long)]
		email: String,

		/// Read from THREADLY_PASSWORD when omitted
		#[arg(long)]
		password: Option<String>,
	},
	/// Sign out and forget stored credentials
	Logout,
	/// Show the signed-in account
	Whoami,
	/// Notification inbox
	#[command(subcommand)]
	Notifications(NotificationCommand),
	/// Follow the realtime notification channel until interrupted
	Listen,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum NotificationCommand {
	/// List one page of notifications
	List {
		#[arg(long, default_value_t = threadly_client::DEFAULT_PAGE_LIMIT)]
		limit: u32,

		#[arg(long, value_name = "TIMESTAMP", requires = "cursor_id")]
		cursor_timestamp: Option<String>,

		#[arg(long, value_name = "ID", requires = "cursor_timestamp")]
		cursor_id: Option<String>,
	},
	/// Show one notification
	Show { event_id: String },
	/// Mark one notification read
	Read { event_id: String },
	/// Delete one notification
	Delete { event_id: String },
	/// Mark every notification read
	ReadAll,
	/// Delete every notification
	Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let context = commands::Context::load(args.config.as_deref(), args.json)?;
	context.run(args.command).await
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::fmt::format::FmtSpan;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("threadly=debug,info")
			} else {
				EnvFilter::new("warn")
			}
		})
	};

	if let Some(log_dir) = std::env::var("THREADLY_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("threadly.{}.log", std::process::id()));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_span_events(FmtSpan::CLOSE)
				.with_target(true);

			tracing_subscriber::registry().with(filter()).with(file_layer).init();

			tracing::info!(path = ?log_path, "tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter())
		.with_writer(std::io::stderr)
		.init();
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn command_definition_is_consistent() {
		Args::command().debug_assert();
	}

	#[test]
	fn parses_login_with_global_flags_after_subcommand() {
		let args = Args::try_parse_from(["threadly", "login", "--email", "a@b.c", "--json"]).unwrap();
		assert!(args.json);
		assert_eq!(
			args.command,
			Command::Login {
				email: "a@b.c".into(),
				password: None,
			}
		);
	}

	#[test]
	fn list_defaults_to_standard_page_size() {
		let args = Args::try_parse_from(["threadly", "notifications", "list"]).unwrap();
		assert_eq!(
			args.command,
			Command::Notifications(NotificationCommand::List {
				limit: 20,
				cursor_timestamp: None,
				cursor_id: None,
			})
		);
	}

	#[test]
	fn cursor_parts_are_required_together() {
		let result = Args::try_parse_from(["threadly", "notifications", "list", "--cursor-id", "n1"]);
		assert!(result.is_err());

		let args = Args::try_parse_from([
			"threadly",
			"notifications",
			"list",
			"--cursor-id",
			"n1",
			"--cursor-timestamp",
			"2025-01-01T00:00:00Z",
		])
		.unwrap();
		assert!(matches!(
			args.command,
			Command::Notifications(NotificationCommand::List { cursor_id: Some(_), .. })
		));
	}

	#[test]
	fn mutation_commands_take_event_id() {
		let args = Args::try_parse_from(["threadly", "notifications", "read", "evt-9"]).unwrap();
		assert_eq!(
			args.command,
			Command::Notifications(NotificationCommand::Read { event_id: "evt-9".into() })
		);
		let args = Args::try_parse_from(["threadly", "notifications", "read-all"]).unwrap();
		assert_eq!(args.command, Command::Notifications(NotificationCommand::ReadAll));
	}
}
