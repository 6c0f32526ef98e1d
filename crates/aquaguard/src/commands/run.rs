//! Foreground polling loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::info;

use aquaguard_core::{Command as CoreCommand, CommandResult, Device, StatusCallback};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

fn status_printer(color: bool) -> StatusCallback {
    Arc::new(move |d: &Device| {
        let status = output::paint_status(&d.status_text(), color);
        println!("{} {}: {status}", Local::now().format("%H:%M:%S"), d.name);
    })
}

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let callback = (!global.quiet).then(|| status_printer(output::should_color(&global.color)));
    let mut ctx = Context::build(global, callback)?;
    let controller = ctx.controller.clone();

    if args.sync {
        if let CommandResult::Count(added) = controller.execute(CoreCommand::SyncCloudDevices).await? {
            info!(added, "cloud devices synced");
            if added > 0 {
                ctx.save()?;
            }
        }
    }

    if let Some(ms) = args.interval {
        if let CommandResult::Interval(effective) = controller.execute(CoreCommand::SetPollInterval { ms }).await? {
            info!(interval_ms = effective, "poll interval set");
        }
    }

    controller.start().await;
    if !global.quiet {
        eprintln!(
            "Polling {} device(s), press Ctrl-C to stop",
            controller.devices().iter().filter(|d| d.visible).count()
        );
    }

    tokio::signal::ctrl_c().await?;

    if !controller.stop(STOP_TIMEOUT).await {
        tracing::warn!("poll loop did not stop in time");
    }
    ctx.save()
}
