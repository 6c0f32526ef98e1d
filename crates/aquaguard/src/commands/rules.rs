//! Notification rule handlers.

use serde::Serialize;
use tabled::Tabled;

use aquaguard_core::{Command as CoreCommand, NotificationRule};

use crate::cli::{GlobalOpts, RulesArgs, RulesCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

#[derive(Serialize)]
struct RuleView {
    device_id: String,
    device: String,
    on: bool,
    off: bool,
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "On")]
    on: String,
    #[tabled(rename = "Off")]
    off: String,
}

fn mark(flag: bool) -> String {
    let text = if flag { "notify" } else { "-" };
    text.into()
}

pub async fn handle(args: RulesArgs, ctx: &mut Context, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        RulesCommand::List => {
            let rules = ctx.controller.notification_rules();
            let mut views: Vec<RuleView> = rules
                .iter()
                .map(|(id, rule)| RuleView {
                    device_id: id.to_string(),
                    device: ctx
                        .controller
                        .device(id)
                        .map_or_else(|| id.to_string(), |d| d.name.clone()),
                    on: rule.notify_on,
                    off: rule.notify_off,
                })
                .collect();
            views.sort_by(|a, b| a.device.cmp(&b.device));

            let out = output::render_list(
                &global.output,
                &views,
                |v| RuleRow {
                    device: v.device.clone(),
                    on: mark(v.on),
                    off: mark(v.off),
                },
                |v| v.device_id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RulesCommand::Set { device, on, off } => {
            let device = util::resolve_device(&ctx.controller, &device)?;
            let mut rules = (*ctx.controller.notification_rules()).clone();
            if on || off {
                rules.insert(
                    device.id.clone(),
                    NotificationRule {
                        notify_on: on,
                        notify_off: off,
                    },
                );
            } else {
                rules.remove(&device.id);
            }
            ctx.controller
                .execute(CoreCommand::SetNotificationRules { rules })
                .await?;
            ctx.save()?;
            if !global.quiet {
                eprintln!("Rule for {} updated", device.name);
            }
            Ok(())
        }
    }
}
