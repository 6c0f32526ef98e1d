//! Device command handlers.

use tabled::Tabled;

use aquaguard_core::{AddDeviceRequest, Command as CoreCommand, CommandResult, Device, DeviceId, DeviceUpdate};

use crate::cli::{AddDeviceArgs, DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Visible")]
    visible: String,
}

impl DeviceRow {
    fn new(d: &Device, color: bool) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            kind: d.kind.to_string(),
            address: d
                .address
                .clone()
                .or_else(|| d.external_id.clone())
                .unwrap_or_else(|| "-".into()),
            status: output::paint_status(&d.status_text(), color),
            visible: if d.visible { "yes" } else { "no" }.into(),
        }
    }
}

fn device_result(result: CommandResult) -> Result<Device, CliError> {
    match result {
        CommandResult::Device(d) => Ok((*d).clone()),
        other => Err(CliError::Internal(format!("unexpected result: {other:?}"))),
    }
}

fn print_device(d: &Device, global: &GlobalOpts) {
    let out = output::render_single(&global.output, d, util::device_detail, |d| d.id.to_string());
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DevicesArgs, ctx: &mut Context, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = ctx.controller.clone();
    match args.command {
        DevicesCommand::List { no_poll } => {
            if !no_poll {
                controller.refresh().await;
            }
            let color = output::should_color(&global.color);
            let snap: Vec<Device> = controller.devices().iter().map(|d| (**d).clone()).collect();
            let out = output::render_list(&global.output, &snap, |d| DeviceRow::new(d, color), |d| d.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Show { device } => {
            let found = util::resolve_device(&controller, &device)?;
            let shown = match controller.execute(CoreCommand::PollNow { id: found.id.clone() }).await? {
                CommandResult::Polled(outcome) => {
                    if let Some(err) = &outcome.error {
                        tracing::warn!(device = %found.name, error = %err, "poll failed");
                    }
                    outcome.device
                }
                _ => found,
            };
            print_device(&shown, global);
            Ok(())
        }

        DevicesCommand::Add(add) => {
            let request = add_request(add)?;
            let added = device_result(controller.execute(CoreCommand::AddDevice(request)).await?)?;
            ctx.save()?;
            print_device(&added, global);
            Ok(())
        }

        DevicesCommand::Remove { device } => {
            let id = util::resolve_device(&controller, &device)?.id.clone();
            let removed = device_result(controller.execute(CoreCommand::RemoveDevice { id }).await?)?;
            ctx.save()?;
            if !global.quiet {
                eprintln!("Removed {}", removed.name);
            }
            Ok(())
        }

        DevicesCommand::Rename { device, name } => {
            let id = util::resolve_device(&controller, &device)?.id.clone();
            let update = DeviceUpdate {
                name: Some(name),
                ..DeviceUpdate::default()
            };
            let renamed = device_result(controller.execute(CoreCommand::UpdateDevice { id, update }).await?)?;
            ctx.save()?;
            if !global.quiet {
                eprintln!("Renamed to {}", renamed.name);
            }
            Ok(())
        }

        DevicesCommand::Visible { device, visible } => {
            let id = util::resolve_device(&controller, &device)?.id.clone();
            let update = DeviceUpdate {
                visible: Some(visible),
                ..DeviceUpdate::default()
            };
            controller.execute(CoreCommand::UpdateDevice { id, update }).await?;
            ctx.save()?;
            Ok(())
        }

        DevicesCommand::Sync => {
            let added = match controller.execute(CoreCommand::SyncCloudDevices).await? {
                CommandResult::Count(n) => n,
                _ => 0,
            };
            if added > 0 {
                ctx.save()?;
            }
            if !global.quiet {
                eprintln!("Added {added} cloud device(s)");
            }
            Ok(())
        }
    }
}

fn add_request(args: AddDeviceArgs) -> Result<AddDeviceRequest, CliError> {
    let (address, external_id) = if args.kind.is_cloud() {
        (None, Some(required(args.did, "did")?))
    } else {
        (Some(required(args.ip, "ip")?), None)
    };
    Ok(AddDeviceRequest {
        id: args.id.map(DeviceId::from),
        name: args.name,
        kind: args.kind,
        address,
        external_id,
        model: args.model,
        visible: !args.hidden,
    })
}

fn required(value: Option<String>, field: &str) -> Result<String, CliError> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| CliError::Validation {
        field: field.into(),
        reason: format!("--{field} is required for this device type"),
    })
}
