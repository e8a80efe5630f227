// SPDX-License-Identifier: Apache-2.0

//! Town projects and salvage runs.
//!
//! `start` is dedup-aware: starting a type (or focus) already underway in
//! the town answers with the existing record instead of creating a second
//! one. Stage/terminal verbs follow the same shape for both families.

use vigil_world::doc::{IdCounters, Project, SalvageRun, WorkStatus, WorldDoc};

use crate::ctx::CmdCtx;
use crate::feed;

/// Salvage focuses the towns know how to work.
pub const SALVAGE_FOCUSES: [&str; 3] = ["metal", "wood", "relics"];

/// `project start <town> <type>`
pub fn project_start(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town: &str, kind: &str) -> bool {
    if !doc.world.towns.contains_key(town) {
        return ctx.refuse(format!("unknown town: {town}"));
    }
    if let Some(existing) = doc
        .world
        .projects
        .iter()
        .find(|p| p.town == town && p.kind == kind && p.status == WorkStatus::Active)
    {
        let id = existing.id.clone();
        return ctx.refuse(format!("existing: {kind} already underway in {town} ({id})"));
    }
    let ordinal = IdCounters::take(&mut doc.world.ids.project);
    let id = format!("p{ordinal:04}");
    doc.world.projects.push(Project {
        id: id.clone(),
        town: town.to_owned(),
        kind: kind.to_owned(),
        stage: 1,
        status: WorkStatus::Active,
        started_day: doc.world.clock.day,
    });
    feed::chronicle(
        &mut doc.world,
        ctx,
        "project",
        Some(town),
        None,
        "project",
        format!("{town} breaks ground on {kind}"),
    );
    ctx.say(format!("project {id} started in {town}"));
    true
}

/// `project advance <town> <project_id>`
pub fn project_advance(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    town: &str,
    project_id: &str,
) -> bool {
    let Some(project) = active_project_mut(doc, town, project_id) else {
        return ctx.refuse(format!("no active project {project_id} in {town}"));
    };
    project.stage += 1;
    let stage = project.stage;
    ctx.say(format!("project {project_id} reaches stage {stage}"));
    true
}

/// `project complete <town> <project_id>`
pub fn project_complete(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    town: &str,
    project_id: &str,
) -> bool {
    finish_project(doc, ctx, town, project_id, WorkStatus::Completed)
}

/// `project fail <town> <project_id>`
pub fn project_fail(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    town: &str,
    project_id: &str,
) -> bool {
    finish_project(doc, ctx, town, project_id, WorkStatus::Failed)
}

fn finish_project(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    town: &str,
    project_id: &str,
    terminal: WorkStatus,
) -> bool {
    let Some(project) = active_project_mut(doc, town, project_id) else {
        return ctx.refuse(format!("no active project {project_id} in {town}"));
    };
    project.status = terminal;
    let kind = project.kind.clone();
    let (verb, hope_delta) = match terminal {
        WorkStatus::Completed => ("completed", 4),
        _ => ("abandoned", -3),
    };
    if let Some(town_rec) = doc.world.towns.get_mut(town) {
        town_rec.hope = (town_rec.hope + hope_delta).clamp(0, 100);
    }
    feed::chronicle(
        &mut doc.world,
        ctx,
        "project",
        Some(town),
        None,
        "project",
        format!("{kind} {verb} in {town}"),
    );
    feed::impact(&mut doc.world, town, "project", hope_delta, &kind);
    ctx.say(format!("project {project_id} {verb}"));
    true
}

fn active_project_mut<'a>(
    doc: &'a mut WorldDoc,
    town: &str,
    project_id: &str,
) -> Option<&'a mut Project> {
    doc.world
        .projects
        .iter_mut()
        .find(|p| p.town == town && p.id == project_id && p.status == WorkStatus::Active)
}

/// `project list` — read-only.
pub fn project_list(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if doc.world.projects.is_empty() && doc.world.salvage_runs.is_empty() {
        ctx.say("no projects or salvage runs");
        return false;
    }
    for project in &doc.world.projects {
        ctx.say(format!(
            "{} {} in {} stage {} ({:?})",
            project.id, project.kind, project.town, project.stage, project.status
        ));
    }
    for run in &doc.world.salvage_runs {
        ctx.say(format!(
            "{} salvage:{} in {} stage {} ({:?})",
            run.id, run.focus, run.town, run.stage, run.status
        ));
    }
    false
}

/// `salvage start <town> <focus>`
pub fn salvage_start(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town: &str, focus: &str) -> bool {
    if !doc.world.towns.contains_key(town) {
        return ctx.refuse(format!("unknown town: {town}"));
    }
    if !SALVAGE_FOCUSES.contains(&focus) {
        return ctx.refuse(format!("unsupported salvage focus: {focus}"));
    }
    if let Some(existing) = doc
        .world
        .salvage_runs
        .iter()
        .find(|s| s.town == town && s.focus == focus && s.status == WorkStatus::Active)
    {
        let id = existing.id.clone();
        return ctx.refuse(format!(
            "existing: {focus} salvage already underway in {town} ({id})"
        ));
    }
    let ordinal = IdCounters::take(&mut doc.world.ids.salvage);
    let id = format!("s{ordinal:04}");
    doc.world.salvage_runs.push(SalvageRun {
        id: id.clone(),
        town: town.to_owned(),
        focus: focus.to_owned(),
        stage: 1,
        status: WorkStatus::Active,
        started_day: doc.world.clock.day,
    });
    feed::chronicle(
        &mut doc.world,
        ctx,
        "salvage",
        Some(town),
        None,
        "salvage",
        format!("{town} sends a {focus} salvage crew out"),
    );
    ctx.say(format!("salvage run {id} started"));
    true
}

/// `salvage advance <town> <run_id>`
pub fn salvage_advance(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town: &str, run_id: &str) -> bool {
    let Some(run) = active_run_mut(doc, town, run_id) else {
        return ctx.refuse(format!("no active salvage run {run_id} in {town}"));
    };
    run.stage += 1;
    let stage = run.stage;
    ctx.say(format!("salvage run {run_id} reaches stage {stage}"));
    true
}

/// `salvage complete <town> <run_id>`
pub fn salvage_complete(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town: &str, run_id: &str) -> bool {
    finish_salvage(doc, ctx, town, run_id, WorkStatus::Completed)
}

/// `salvage fail <town> <run_id>`
pub fn salvage_fail(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town: &str, run_id: &str) -> bool {
    finish_salvage(doc, ctx, town, run_id, WorkStatus::Failed)
}

fn finish_salvage(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    town: &str,
    run_id: &str,
    terminal: WorkStatus,
) -> bool {
    let Some(run) = active_run_mut(doc, town, run_id) else {
        return ctx.refuse(format!("no active salvage run {run_id} in {town}"));
    };
    run.status = terminal;
    let focus = run.focus.clone();
    let verb = if terminal == WorkStatus::Completed {
        "returned heavy"
    } else {
        "came back empty"
    };
    feed::chronicle(
        &mut doc.world,
        ctx,
        "salvage",
        Some(town),
        None,
        "salvage",
        format!("the {focus} crew {verb} in {town}"),
    );
    ctx.say(format!("salvage run {run_id} settled: {verb}"));
    true
}

fn active_run_mut<'a>(
    doc: &'a mut WorldDoc,
    town: &str,
    run_id: &str,
) -> Option<&'a mut SalvageRun> {
    doc.world
        .salvage_runs
        .iter_mut()
        .find(|s| s.town == town && s.id == run_id && s.status == WorkStatus::Active)
}
