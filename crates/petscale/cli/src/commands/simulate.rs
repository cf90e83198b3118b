//! Scenario replay
//!
//! Runs the engine against an in-memory world built from a scenario file.
//! The rule profile is copied into memory first, so a replay never writes to
//! disk even when it migrates rules.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use petscale_engine::{
    spawn_reference_loader, CompanionSheetRow, EngineConfig, EntityKind, EntityRecord,
    InMemoryRuleRepository, InMemoryWorld, JsonFileRepository, RuleRepository, ScaleEngine,
    ScaleProfile, StaticReferenceSource, TickReport,
};
use petscale_types::{CompanionKind, OverrideMode, RuleRow};
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tracing::{debug, info};

use crate::error::{CliError, CliResult};
use crate::output::{self, print_info, OutputFormat};

/// Simulation arguments
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Scenario file (.json, .yaml or .yml)
    #[arg(long)]
    pub scenario: PathBuf,

    /// Number of ticks to run
    #[arg(long, default_value_t = 4)]
    pub ticks: u32,

    /// Simulated time between ticks
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,
}

/// A recorded world plus optional rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub reference: Vec<CompanionSheetRow>,
    pub entities: Vec<EntityRecord>,
    /// Rules to use instead of the stored profile
    #[serde(default)]
    pub rules: Option<Vec<RuleRow>>,
    #[serde(default)]
    pub override_mode: Option<OverrideMode>,
}

impl Scenario {
    pub fn load(path: &Path) -> CliResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&contents)?),
            Some("json") | None => Ok(serde_json::from_str(&contents)?),
            Some(other) => Err(CliError::InvalidInput(format!(
                "unsupported scenario format: .{}",
                other
            ))),
        }
    }
}

/// Table row for tick display
#[derive(Debug, Serialize, Tabled)]
struct TickRow {
    tick: u32,
    refreshed: bool,
    tracked: usize,
    applied: usize,
    forced: usize,
    reverted: usize,
    diverged: usize,
    undecided: usize,
    skipped: usize,
    backfills: usize,
}

impl TickRow {
    fn new(tick: u32, report: &TickReport) -> Self {
        Self {
            tick,
            refreshed: report.refreshed,
            tracked: report.tracked,
            applied: report.applied,
            forced: report.forced,
            reverted: report.reverted,
            diverged: report.diverged,
            undecided: report.undecided,
            skipped: report.skipped,
            backfills: report.backfills,
        }
    }
}

/// Table row for final companion scales
#[derive(Debug, Serialize, Tabled)]
struct ScaleRow {
    companion: String,
    name: String,
    kind: String,
    owner: String,
    scale: f32,
}

#[derive(Debug, Serialize)]
struct SimulationOutput {
    ticks: Vec<TickReport>,
    scales: Vec<ScaleRow>,
}

/// Replay a scenario
pub async fn execute(
    args: SimulateArgs,
    profile_path: &Path,
    config: EngineConfig,
    format: OutputFormat,
) -> CliResult<()> {
    let scenario = Scenario::load(&args.scenario)?;
    info!(
        scenario = %args.scenario.display(),
        entities = scenario.entities.len(),
        ticks = args.ticks,
        "Replaying scenario"
    );

    let mut profile = match scenario.rules.clone() {
        Some(rules) => ScaleProfile::new(OverrideMode::Off, rules),
        None => JsonFileRepository::new(profile_path).load()?,
    };
    if let Some(mode) = scenario.override_mode {
        profile.override_mode = mode;
    }
    let repository = InMemoryRuleRepository::with_profile(profile);

    let (mut reference, loader) =
        spawn_reference_loader(StaticReferenceSource::new(scenario.reference.clone()));
    reference.ready().await;
    loader
        .await
        .map_err(|e| CliError::Config(format!("reference loader failed: {}", e)))?;

    let mut engine = ScaleEngine::open(config, reference, Box::new(repository))?;
    let mut world = InMemoryWorld::new();
    for entity in scenario.entities.iter().cloned() {
        world.insert(entity);
    }

    let start = Instant::now();
    let interval = Duration::from_millis(args.interval_ms);
    let mut reports = Vec::with_capacity(args.ticks as usize);
    for tick in 0..args.ticks {
        let report = engine.tick(&mut world, start + interval * tick);
        debug!(tick, refreshed = report.refreshed, applied = report.applied, "Tick finished");
        reports.push(report);
    }

    let scales: Vec<ScaleRow> = scenario
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::BattleNpc)
        .filter_map(|e| {
            let kind = CompanionKind::from_model_id(e.model_id);
            if !kind.is_tracked() {
                return None;
            }
            let owner = scenario
                .entities
                .iter()
                .find(|p| p.is_player() && p.object_id == e.owner_id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "-".to_string());
            Some(ScaleRow {
                companion: e.object_id.to_string(),
                name: e.name.clone(),
                kind: kind.to_string(),
                owner,
                scale: world
                    .scale_of(e.object_id)
                    .unwrap_or(engine.config().native_scale),
            })
        })
        .collect();

    match format {
        OutputFormat::Table => {
            let rows: Vec<TickRow> = reports
                .iter()
                .enumerate()
                .map(|(i, r)| TickRow::new(i as u32, r))
                .collect();
            output::print_output(rows, format)?;
            output::print_output(scales, format)?;
            print_info(&format!(
                "{} rules, override mode {}",
                engine.rules().len(),
                engine.override_mode()
            ));
            Ok(())
        }
        _ => output::print_single(
            &SimulationOutput {
                ticks: reports,
                scales,
            },
            format,
        ),
    }
}
