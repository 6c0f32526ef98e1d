//! Power and light control handlers.

use std::str::FromStr;

use aquaguard_api::node::clamp_channel;
use aquaguard_api::{LightMode, Scene};
use aquaguard_core::{Command as CoreCommand, CommandResult};

use crate::cli::{GlobalOpts, LightArgs, LightCommand, PowerArgs, PowerState};
use crate::error::CliError;

use super::{Context, util};

pub async fn power(args: PowerArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let device = util::resolve_device(&ctx.controller, &args.device)?;
    let on = matches!(args.state, PowerState::On);
    let result = ctx
        .controller
        .execute(CoreCommand::SetPower { id: device.id.clone(), on })
        .await?;
    accepted(result, &device.name, "power")?;
    if !global.quiet {
        eprintln!("{} switched {}", device.name, if on { "on" } else { "off" });
    }
    Ok(())
}

pub async fn light(args: LightArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let device = util::resolve_device(&ctx.controller, &args.device)?;
    let id = device.id.clone();
    let (cmd, operation) = match args.command {
        LightCommand::Color { r, g, b } => (
            CoreCommand::SetColor {
                id,
                r: clamp_channel(r),
                g: clamp_channel(g),
                b: clamp_channel(b),
            },
            "color",
        ),
        LightCommand::Mode { mode } => (
            CoreCommand::SetMode {
                id,
                mode: parse_arg::<LightMode>(&mode, "mode")?,
            },
            "mode",
        ),
        LightCommand::Scene { scene } => (
            CoreCommand::ApplyScene {
                id,
                scene: parse_arg::<Scene>(&scene, "scene")?,
            },
            "scene",
        ),
    };

    let result = ctx.controller.execute(cmd).await?;
    accepted(result, &device.name, operation)?;
    if !global.quiet {
        eprintln!("{} {operation} applied", device.name);
    }
    Ok(())
}

fn parse_arg<T>(raw: &str, field: &str) -> Result<T, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| CliError::Validation {
        field: field.into(),
        reason: e.to_string(),
    })
}

fn accepted(result: CommandResult, device: &str, operation: &str) -> Result<(), CliError> {
    match result {
        CommandResult::Accepted(true) => Ok(()),
        _ => Err(CliError::Rejected {
            device: device.into(),
            operation: operation.into(),
        }),
    }
}
