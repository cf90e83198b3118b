//! Rule table commands

use clap::{Subcommand, ValueEnum};
use petscale_engine::{RuleChange, ScaleEngine};
use petscale_types::{KindTarget, OwnerIdentity, ScaleRule, SizeSelector, SizeTag};
use serde::Serialize;
use tabled::Tabled;

use crate::error::{CliError, CliResult};
use crate::output::{self, print_info, print_success, print_warning, OutputFormat};

/// Size selector argument
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SizeArg {
    Small,
    Medium,
    Large,
    Custom,
}

impl From<SizeArg> for SizeTag {
    fn from(arg: SizeArg) -> Self {
        match arg {
            SizeArg::Small => SizeTag::Small,
            SizeArg::Medium => SizeTag::Medium,
            SizeArg::Large => SizeTag::Large,
            SizeArg::Custom => SizeTag::Custom,
        }
    }
}

/// Rule subcommands
#[derive(Subcommand)]
pub enum RulesCommands {
    /// List rules in resolution order
    List,

    /// Add a rule, or update the size of an existing one
    Add {
        /// Owner display name
        #[arg(long, required_unless_present = "others", conflicts_with = "others")]
        owner: Option<String>,

        /// Apply to every player other than yourself
        #[arg(long)]
        others: bool,

        /// Owner stable id
        #[arg(long, default_value_t = 0)]
        stable_id: u64,

        /// Owner world id
        #[arg(long, default_value_t = 0)]
        world_id: u16,

        /// Companion kind, or AllKinds
        #[arg(long)]
        kind: String,

        /// Size selector
        #[arg(long, value_enum)]
        size: SizeArg,

        /// Scale for the custom selector
        #[arg(long, required_if_eq("size", "custom"))]
        value: Option<f32>,
    },

    /// Remove a rule by index
    Remove {
        /// Index as shown by `rules list`
        index: usize,
    },

    /// Remove every rule
    Clear,
}

/// Table row for rule display
#[derive(Debug, Serialize, Tabled)]
struct RuleDisplayRow {
    index: usize,
    owner: String,
    stable_id: String,
    kind: String,
    size: String,
    status: String,
}

impl RuleDisplayRow {
    fn new(index: usize, rule: &ScaleRule) -> Self {
        let status = if rule.owner.generic {
            "wildcard"
        } else if rule.owner.is_pending() {
            "pending"
        } else {
            "finalized"
        };
        Self {
            index,
            owner: rule.owner.name.clone(),
            stable_id: if rule.owner.content_id == 0 {
                "-".to_string()
            } else {
                format!("{:X}@{}", rule.owner.content_id, rule.owner.world_id)
            },
            kind: rule.target.to_string(),
            size: rule.size.to_string(),
            status: status.to_string(),
        }
    }
}

/// Execute a rules command
pub fn execute(command: RulesCommands, engine: &mut ScaleEngine, format: OutputFormat) -> CliResult<()> {
    match command {
        RulesCommands::List => {
            let rows: Vec<RuleDisplayRow> = engine
                .rules()
                .rules()
                .iter()
                .enumerate()
                .map(|(i, rule)| RuleDisplayRow::new(i, rule))
                .collect();
            output::print_output(rows, format)
        }

        RulesCommands::Add {
            owner,
            others,
            stable_id,
            world_id,
            kind,
            size,
            value,
        } => {
            let identity = match (others, owner) {
                (true, _) => OwnerIdentity::other_players(),
                (false, Some(name)) => OwnerIdentity::new(name, stable_id, world_id),
                (false, None) => {
                    return Err(CliError::InvalidInput("an owner or --others is required".into()))
                }
            };
            let target: KindTarget = kind.parse()?;
            let selector = SizeSelector::from_parts(size.into(), value.unwrap_or_default())?;

            let description = format!("{}, {}, {}", identity, target, selector);
            match engine.add_or_update_rule(identity, target, selector)? {
                RuleChange::Inserted => print_success(&format!("Rule inserted: {}", description)),
                RuleChange::Updated => print_success(&format!("Rule updated: {}", description)),
                RuleChange::Unchanged => print_info(&format!("Rule unchanged: {}", description)),
            }
            Ok(())
        }

        RulesCommands::Remove { index } => {
            let removed = engine.remove_rule(index)?;
            print_success(&format!("Rule removed: {}", removed));
            Ok(())
        }

        RulesCommands::Clear => {
            let count = engine.clear_rules()?;
            if count == 0 {
                print_warning("No rules to clear");
            } else {
                print_success(&format!("Removed {} rules", count));
            }
            Ok(())
        }
    }
}
