// SPDX-License-Identifier: Apache-2.0

//! World-memory context assembly: the bounded read-only retrieval surface.

use std::sync::Arc;

use vigil_proto::{
    ExecutionCounts, FactionSummary, MemoryScope, TownSummary, WorldMemoryContext,
    WorldMemoryRequest, MAX_CONTEXT_CHRONICLE_RECORDS, MAX_CONTEXT_HISTORY_RECORDS,
    MEMORY_CONTEXT_SCHEMA_VERSION, MEMORY_CONTEXT_TYPE,
};
use vigil_proto::{ExecutionResult, ExecutionStatus};
use vigil_store::WorldStore;
use vigil_world::doc::{WorkStatus, WorldDoc};

use crate::store::{ChronicleQuery, ExecError, ExecutionStore, HistoryQuery};

/// Serves `world-memory-request.v1` against a store pair.
pub struct WorldMemoryService {
    world: Arc<WorldStore>,
    exec: Arc<dyn ExecutionStore>,
}

impl WorldMemoryService {
    /// Service over the world store and an execution store.
    #[must_use]
    pub fn new(world: Arc<WorldStore>, exec: Arc<dyn ExecutionStore>) -> Self {
        Self { world, exec }
    }

    /// Build the bounded context for one request.
    pub fn get_context(
        &self,
        request: &WorldMemoryRequest,
    ) -> Result<WorldMemoryContext, ExecError> {
        self.exec.sync_world_memory()?;
        let doc = self.world.snapshot();
        let scope = request.scope.clone();

        let chronicle_limit = scope
            .chronicle_limit
            .unwrap_or(MAX_CONTEXT_CHRONICLE_RECORDS)
            .min(MAX_CONTEXT_CHRONICLE_RECORDS);
        let history_limit = scope
            .history_limit
            .unwrap_or(MAX_CONTEXT_HISTORY_RECORDS)
            .min(MAX_CONTEXT_HISTORY_RECORDS);

        let recent_chronicle = self.exec.list_chronicle_records(&ChronicleQuery {
            town_id: scope.town_id.clone(),
            faction_id: scope.faction_id.clone(),
            search: scope.search.clone(),
            limit: chronicle_limit,
        })?;

        let town_filter = self.resolve_town_filter(&doc, &scope);
        let recent_history = self.exec.list_history(&HistoryQuery {
            town_ids: town_filter.clone(),
            limit: Some(history_limit),
        })?;

        let town_summary = match &scope.town_id {
            Some(town_id) => Some(self.town_summary(&doc, town_id)?),
            None => None,
        };
        let faction_summary = match &scope.faction_id {
            Some(faction_id) => Some(self.faction_summary(&doc, faction_id)?),
            None => None,
        };

        Ok(WorldMemoryContext {
            kind: MEMORY_CONTEXT_TYPE.to_owned(),
            schema_version: MEMORY_CONTEXT_SCHEMA_VERSION,
            scope,
            recent_chronicle,
            recent_history,
            town_summary,
            faction_summary,
        })
    }

    /// Faction scoping resolves to the faction's town set; town scoping to
    /// the single town. Both named: intersect.
    fn resolve_town_filter(&self, doc: &WorldDoc, scope: &MemoryScope) -> Option<Vec<String>> {
        let faction_towns = scope.faction_id.as_ref().map(|faction_id| {
            doc.world
                .factions
                .get(faction_id)
                .map(|f| f.towns.iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        });
        match (&scope.town_id, faction_towns) {
            (Some(town), Some(towns)) => {
                Some(towns.into_iter().filter(|t| t == town).collect())
            }
            (Some(town), None) => Some(vec![town.clone()]),
            (None, Some(towns)) => Some(towns),
            (None, None) => None,
        }
    }

    fn town_summary(&self, doc: &WorldDoc, town_id: &str) -> Result<TownSummary, ExecError> {
        let history = self.exec.list_history(&HistoryQuery {
            town_ids: Some(vec![town_id.to_owned()]),
            limit: None,
        })?;
        let chronicle_count = self
            .exec
            .list_chronicle_records(&ChronicleQuery {
                town_id: Some(town_id.to_owned()),
                faction_id: None,
                search: None,
                limit: usize::MAX,
            })?
            .len() as i64;
        let (hope, dread) = doc
            .world
            .towns
            .get(town_id)
            .map_or((0, 0), |t| (t.hope, t.dread));
        let active_project_count = doc
            .world
            .projects
            .iter()
            .filter(|p| p.town == town_id && p.status == WorkStatus::Active)
            .count() as i64;
        let factions = doc
            .world
            .factions
            .iter()
            .filter(|(_, f)| f.towns.contains(town_id))
            .map(|(id, _)| id.clone())
            .collect();
        Ok(TownSummary {
            town_id: town_id.to_owned(),
            history_count: history.len() as i64,
            chronicle_count,
            execution_counts: count_by_status(&history),
            active_project_count,
            hope,
            dread,
            factions,
        })
    }

    fn faction_summary(
        &self,
        doc: &WorldDoc,
        faction_id: &str,
    ) -> Result<FactionSummary, ExecError> {
        let towns: Vec<String> = doc
            .world
            .factions
            .get(faction_id)
            .map(|f| f.towns.iter().cloned().collect())
            .unwrap_or_default();
        let history = self.exec.list_history(&HistoryQuery {
            town_ids: Some(towns.clone()),
            limit: None,
        })?;
        let chronicle_count = self
            .exec
            .list_chronicle_records(&ChronicleQuery {
                town_id: None,
                faction_id: Some(faction_id.to_owned()),
                search: None,
                limit: usize::MAX,
            })?
            .len() as i64;
        Ok(FactionSummary {
            faction_id: faction_id.to_owned(),
            history_count: history.len() as i64,
            chronicle_count,
            execution_counts: count_by_status(&history),
            towns,
        })
    }
}

fn count_by_status(history: &[ExecutionResult]) -> ExecutionCounts {
    let mut counts = ExecutionCounts::default();
    for result in history {
        match result.status {
            ExecutionStatus::Executed => counts.executed += 1,
            ExecutionStatus::Rejected => counts.rejected += 1,
            ExecutionStatus::Stale => counts.stale += 1,
            ExecutionStatus::Duplicate => counts.duplicate += 1,
            ExecutionStatus::Failed => counts.failed += 1,
        }
    }
    counts
}
