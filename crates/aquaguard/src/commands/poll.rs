//! One-shot poll of a single device.

use aquaguard_core::{Command as CoreCommand, CommandResult};

use crate::cli::{GlobalOpts, PollArgs};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

pub async fn handle(args: PollArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let device = util::resolve_device(&ctx.controller, &args.device)?;
    let result = ctx
        .controller
        .execute(CoreCommand::PollNow { id: device.id.clone() })
        .await?;

    let CommandResult::Polled(outcome) = result else {
        return Err(CliError::Internal("poll returned no outcome".into()));
    };
    if let Some(err) = outcome.error {
        return Err(CliError::from_poll(&device.name, err));
    }

    let out = output::render_single(&global.output, outcome.device.as_ref(), util::device_detail, |d| {
        d.status_text()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
