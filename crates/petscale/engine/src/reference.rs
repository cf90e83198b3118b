//! Companion reference data.
//!
//! Preset scales come from a read-only sheet the host loads asynchronously
//! once at startup. Until that load publishes, [`ReferenceTables`] are empty
//! and every preset lookup yields nothing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use petscale_types::{CompanionKind, SizeTier};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::EngineResult;

/// One row of the companion reference sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionSheetRow {
    pub row_id: u32,
    pub name: String,
    /// Scales in percent.
    pub small: f32,
    pub medium: f32,
    pub large: f32,
    /// Rows flagged scalable are kept even when their small or medium tier
    /// is not below native size.
    #[serde(default)]
    pub scalable: bool,
}

/// Preset scales for one companion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeScales {
    pub small: f32,
    pub medium: f32,
    pub large: f32,
}

impl SizeScales {
    pub fn for_tier(&self, tier: SizeTier) -> f32 {
        match tier {
            SizeTier::Small => self.small,
            SizeTier::Medium => self.medium,
            SizeTier::Large => self.large,
        }
    }
}

/// Lookup tables built from the reference sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTables {
    scales: HashMap<String, SizeScales>,
    names_by_kind: HashMap<CompanionKind, String>,
}

impl ReferenceTables {
    /// Empty tables, as seen before the loader publishes.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = CompanionSheetRow>) -> Self {
        let mut tables = Self::default();

        for row in rows {
            let kind = CompanionKind::from_row_id(row.row_id);
            if !kind.is_tracked() {
                continue;
            }

            let scales = SizeScales {
                small: row.small / 100.0,
                medium: row.medium / 100.0,
                large: row.large / 100.0,
            };
            if (scales.small >= 1.0 || scales.medium >= 1.0) && !row.scalable {
                debug!(row = row.row_id, name = %row.name, "Skipping non-scalable reference row");
                continue;
            }

            tables.scales.insert(row.name.to_lowercase(), scales);
            tables.names_by_kind.insert(kind, row.name);
        }

        tables
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    /// Display name of a kind, when the sheet provided one.
    pub fn display_name(&self, kind: CompanionKind) -> Option<&str> {
        self.names_by_kind.get(&kind).map(String::as_str)
    }

    /// Scales for a live companion.
    ///
    /// The companion's own name is tried first, then the sheet name of its
    /// kind.
    pub fn scales_for(&self, kind: CompanionKind, companion_name: &str) -> Option<SizeScales> {
        if let Some(scales) = self.scales.get(&companion_name.to_lowercase()) {
            return Some(*scales);
        }
        self.display_name(kind)
            .and_then(|name| self.scales.get(&name.to_lowercase()))
            .copied()
    }
}

/// Where reference rows come from.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn load(&self) -> EngineResult<Vec<CompanionSheetRow>>;
}

/// Source backed by rows already in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceSource {
    rows: Vec<CompanionSheetRow>,
}

impl StaticReferenceSource {
    pub fn new(rows: Vec<CompanionSheetRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl ReferenceSource for StaticReferenceSource {
    async fn load(&self) -> EngineResult<Vec<CompanionSheetRow>> {
        Ok(self.rows.clone())
    }
}

/// Read side of the published reference tables.
#[derive(Debug, Clone)]
pub struct ReferenceHandle {
    receiver: watch::Receiver<Arc<ReferenceTables>>,
}

impl ReferenceHandle {
    /// Handle that always sees the given tables.
    pub fn fixed(tables: ReferenceTables) -> Self {
        let (_sender, receiver) = watch::channel(Arc::new(tables));
        Self { receiver }
    }

    /// Handle that never receives data.
    pub fn unavailable() -> Self {
        Self::fixed(ReferenceTables::empty())
    }

    /// Latest published tables.
    pub fn current(&self) -> Arc<ReferenceTables> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Wait until the loader has published, or has given up.
    pub async fn ready(&mut self) {
        if !self.receiver.borrow().is_empty() {
            return;
        }
        // Errors once the loader finished without publishing.
        let _ = self.receiver.changed().await;
    }
}

/// Start the one-shot background load.
///
/// Must be called from within a tokio runtime. The returned handle is usable
/// immediately; it sees empty tables until the load completes.
pub fn spawn_reference_loader<S>(source: S) -> (ReferenceHandle, JoinHandle<()>)
where
    S: ReferenceSource + 'static,
{
    let (sender, receiver) = watch::channel(Arc::new(ReferenceTables::empty()));

    let task = tokio::spawn(async move {
        match source.load().await {
            Ok(rows) => {
                let tables = ReferenceTables::from_rows(rows);
                info!(companions = tables.len(), "Reference data loaded");
                let _ = sender.send(Arc::new(tables));
            }
            Err(e) => {
                warn!(error = %e, "Reference data unavailable, preset scales disabled");
            }
        }
    });

    (ReferenceHandle { receiver }, task)
}
