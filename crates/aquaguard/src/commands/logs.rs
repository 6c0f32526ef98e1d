//! Change-log handlers.

use tabled::Tabled;
use uuid::Uuid;

use aquaguard_core::{ChangeLogEntry, Command as CoreCommand, CommandResult};

use crate::cli::{GlobalOpts, LogsArgs, LogsCommand};
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Read")]
    read: String,
}

impl From<&ChangeLogEntry> for LogRow {
    fn from(e: &ChangeLogEntry) -> Self {
        Self {
            id: e.id.to_string(),
            time: e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            device: e.device_name.clone(),
            action: e.action.to_string(),
            read: if e.read { "yes" } else { "" }.into(),
        }
    }
}

pub async fn handle(args: LogsArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = &ctx.controller;
    match args.command {
        LogsCommand::List { unread } => {
            let entries: Vec<ChangeLogEntry> = controller
                .log_entries()
                .into_iter()
                .filter(|e| !unread || !e.read)
                .collect();
            let out = output::render_list(&global.output, &entries, |e| LogRow::from(e), |e| e.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LogsCommand::Read { id } => {
            let uuid = Uuid::parse_str(&id).map_err(|e| CliError::Validation {
                field: "id".into(),
                reason: e.to_string(),
            })?;
            match controller.execute(CoreCommand::MarkLogRead { id: uuid }).await? {
                CommandResult::Accepted(true) => Ok(()),
                _ => Err(CliError::NotFound {
                    resource_type: "log entry".into(),
                    identifier: id,
                    list_command: "logs list".into(),
                }),
            }
        }

        LogsCommand::ReadAll => {
            controller.execute(CoreCommand::MarkAllLogsRead).await?;
            Ok(())
        }

        LogsCommand::Clear => {
            controller.execute(CoreCommand::ClearLog).await?;
            if !global.quiet {
                eprintln!("Change log cleared");
            }
            Ok(())
        }
    }
}
