//! Config subcommand handlers.

use aquaguard_config::{Config, load_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::resolve_config_path;

/// Copy of `cfg` with secrets masked, ready for display.
fn redacted(cfg: &Config) -> Config {
    let mut shown = cfg.clone();
    if shown.notification.token.is_some() {
        shown.notification.token = Some("****".into());
    }
    shown
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = resolve_config_path(global);
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&load_config(&path)?);
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("error: {e}")),
                |_| path.display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
