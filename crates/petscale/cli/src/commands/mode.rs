//! Override mode command

use petscale_engine::ScaleEngine;
use petscale_types::OverrideMode;
use serde::Serialize;

use crate::error::CliResult;
use crate::output::{self, print_info, print_success, OutputFormat};

#[derive(Debug, Serialize)]
struct ModeStatus {
    mode: OverrideMode,
    forced_scale: f32,
}

/// Show the override mode, or set it when one is given
pub fn execute(mode: Option<String>, engine: &mut ScaleEngine, format: OutputFormat) -> CliResult<()> {
    let Some(requested) = mode else {
        return match format {
            OutputFormat::Table => {
                print_info(&format!("Override mode: {}", engine.override_mode()));
                Ok(())
            }
            _ => output::print_single(
                &ModeStatus {
                    mode: engine.override_mode(),
                    forced_scale: engine.config().forced_override_scale,
                },
                format,
            ),
        };
    };

    let mode: OverrideMode = requested.parse()?;
    if engine.set_override_mode(mode)? {
        print_success(&format!("Override mode set to {}", mode));
    } else {
        print_info(&format!("Override mode already {}", mode));
    }
    Ok(())
}
