//! Chart editing session
//!
//! Ties the repository, view state and gestures together the way the
//! editor uses them: destructive edits ask the injected confirmer,
//! template loads start from a fresh view, and pan and drag never run
//! at the same time.

use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, instrument};

use crate::application::services::export::{
    ExportArtifact, ExportFormat, ExportMetadata, ExportService, ExportSnapshot,
};
use crate::application::ApplicationResult;
use crate::domain::{
    ChartLayout, CollapseState, DomainError, DragController, DropOutcome, LayoutEngine,
    MoveOutcome, NodeId, NodeRepository, NodeUpdate, OrganizationNode, PointerTarget,
    TemplateCatalog, Vec2, Viewport, ZoomLimits,
};
use crate::infrastructure::traits::{ConfirmRequest, Confirmer};

/// What happened to a requested edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// Valid request that changed nothing
    Unchanged,
    /// The confirmer declined; nothing was touched
    Cancelled,
}

#[derive(Debug)]
struct CachedLayout {
    key: (u64, u64),
    layout: ChartLayout,
}

pub struct ChartSession {
    repo: NodeRepository,
    collapse: CollapseState,
    /// Bumped whenever collapse state changes
    collapse_version: u64,
    viewport: Viewport,
    drag: DragController,
    engine: LayoutEngine,
    catalog: TemplateCatalog,
    confirmer: Arc<dyn Confirmer>,
    cache: Option<CachedLayout>,
}

impl ChartSession {
    /// Session on the default chart.
    pub fn new(
        engine: LayoutEngine,
        limits: ZoomLimits,
        catalog: TemplateCatalog,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        Self {
            repo: NodeRepository::new(),
            collapse: CollapseState::new(),
            collapse_version: 0,
            viewport: Viewport::new(limits),
            drag: DragController::new(),
            engine,
            catalog,
            confirmer,
            cache: None,
        }
    }

    /// Session starting on catalog template `name`, without asking.
    pub fn with_template(
        name: &str,
        engine: LayoutEngine,
        limits: ZoomLimits,
        catalog: TemplateCatalog,
        confirmer: Arc<dyn Confirmer>,
    ) -> ApplicationResult<Self> {
        let tree = catalog.get(name)?.clone();
        let repo = NodeRepository::from_tree(&tree)?;
        let mut session = Self::new(engine, limits, catalog, confirmer);
        session.repo = repo;
        Ok(session)
    }

    pub fn repository(&self) -> &NodeRepository {
        &self.repo
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn collapse_state(&self) -> &CollapseState {
        &self.collapse
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn snapshot(&self) -> OrganizationNode {
        self.repo.snapshot()
    }

    fn bump_collapse(&mut self) {
        self.collapse_version += 1;
    }

    /// Current layout; recomputed only after tree or collapse changes.
    pub fn layout(&mut self) -> &ChartLayout {
        let key = (self.repo.version(), self.collapse_version);
        if self.cache.as_ref().is_some_and(|c| c.key != key) {
            self.cache = None;
        }
        let (engine, repo, collapse) = (&self.engine, &self.repo, &self.collapse);
        let cached = self.cache.get_or_insert_with(|| {
            debug!("layout: recompute for {:?}", key);
            CachedLayout {
                key,
                layout: engine.compute(&repo.snapshot(), collapse),
            }
        });
        &cached.layout
    }

    // ---- tree edits ----------------------------------------------------

    pub fn update(&mut self, id: &str, update: NodeUpdate) -> ApplicationResult<EditOutcome> {
        self.repo.update(id, update)?;
        Ok(EditOutcome::Applied)
    }

    pub fn add_child(&mut self, parent: &str) -> ApplicationResult<NodeId> {
        Ok(self.repo.add_child(parent)?)
    }

    pub fn add_sibling(&mut self, id: &str) -> ApplicationResult<NodeId> {
        Ok(self.repo.add_sibling(id)?)
    }

    /// Delete a subtree after confirmation.
    ///
    /// Root and unknown ids are rejected before the confirmer is asked.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, id: &str) -> ApplicationResult<EditOutcome> {
        let request = {
            let node = self
                .repo
                .find(id)
                .ok_or_else(|| DomainError::NotFound(NodeId::from(id)))?;
            if node.id().is_root() {
                return Err(DomainError::RootImmutable { action: "deleted" }.into());
            }
            ConfirmRequest::DeleteSubtree {
                title: node.title().to_string(),
                subordinates: node.to_tree().count() - 1,
            }
        };
        if !self.confirmer.confirm(&request) {
            info!("delete of {} cancelled", id);
            return Ok(EditOutcome::Cancelled);
        }
        let removed = self.repo.delete(id)?;
        let before = self.collapse.len();
        let repo = &self.repo;
        self.collapse.retain(|n| repo.contains(n.as_str()));
        if self.collapse.len() != before {
            self.bump_collapse();
        }
        if self.drag.dragged().is_some_and(|d| !self.repo.contains(d.as_str())) {
            self.drag.cancel();
        }
        info!("deleted {} position(s)", removed.len());
        Ok(EditOutcome::Applied)
    }

    pub fn move_node(&mut self, source: &str, target: &str) -> ApplicationResult<EditOutcome> {
        Ok(match self.repo.move_node(source, target)? {
            MoveOutcome::Moved => EditOutcome::Applied,
            MoveOutcome::Unchanged => EditOutcome::Unchanged,
        })
    }

    fn replace_chart(&mut self) {
        self.collapse.clear();
        self.bump_collapse();
        self.viewport.reset_view();
        self.drag.cancel();
    }

    /// Replace the chart with catalog template `name` after confirmation.
    #[instrument(level = "debug", skip(self))]
    pub fn load_template(&mut self, name: &str) -> ApplicationResult<EditOutcome> {
        let template = self.catalog.get(name)?.clone();
        if !self.confirmer.confirm(&ConfirmRequest::LoadTemplate {
            name: name.to_string(),
        }) {
            return Ok(EditOutcome::Cancelled);
        }
        self.repo.load_template(name, &template)?;
        self.replace_chart();
        info!("loaded template {}", name);
        Ok(EditOutcome::Applied)
    }

    pub fn reset(&mut self) -> ApplicationResult<EditOutcome> {
        if !self.confirmer.confirm(&ConfirmRequest::Reset) {
            return Ok(EditOutcome::Cancelled);
        }
        self.repo.reset()?;
        self.replace_chart();
        Ok(EditOutcome::Applied)
    }

    // ---- view state ----------------------------------------------------

    /// Flip a node's collapse flag; returns the new state.
    pub fn toggle_collapse(&mut self, id: &str) -> ApplicationResult<bool> {
        let node = self
            .repo
            .find(id)
            .ok_or_else(|| DomainError::NotFound(NodeId::from(id)))?;
        let id = node.id().clone();
        let collapsed = self.collapse.toggle(&id);
        self.bump_collapse();
        Ok(collapsed)
    }

    pub fn set_collapsed(&mut self, id: &str, collapsed: bool) -> ApplicationResult<EditOutcome> {
        let node = self
            .repo
            .find(id)
            .ok_or_else(|| DomainError::NotFound(NodeId::from(id)))?;
        let id = node.id().clone();
        let changed = if collapsed {
            self.collapse.collapse(&id)
        } else {
            self.collapse.expand(id.as_str())
        };
        if !changed {
            return Ok(EditOutcome::Unchanged);
        }
        self.bump_collapse();
        Ok(EditOutcome::Applied)
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.viewport.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.viewport.zoom_out()
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset_view();
    }

    pub fn pan_to(&mut self, pan: Vec2) {
        self.viewport.pan_to(pan);
    }

    // ---- gestures ------------------------------------------------------

    /// Start panning; refused while a drag is in progress.
    pub fn begin_pan(&mut self, pointer: Vec2, target: &PointerTarget) -> bool {
        if self.drag.is_active() {
            return false;
        }
        self.viewport.begin_pan(pointer, target)
    }

    pub fn update_pan(&mut self, pointer: Vec2) -> bool {
        self.viewport.update_pan(pointer)
    }

    pub fn end_pan(&mut self) {
        self.viewport.end_pan();
    }

    /// Start dragging `source`; ends any active pan when accepted.
    pub fn begin_drag(&mut self, source: &str) -> bool {
        let started = self.drag.begin(source, &self.repo);
        if started {
            self.viewport.end_pan();
        }
        started
    }

    pub fn drag_enter(&mut self, target: &str) {
        self.drag.enter(target);
    }

    pub fn drag_leave(&mut self, target: &str) {
        self.drag.leave(target);
    }

    pub fn drop_on(&mut self, target: &str) -> ApplicationResult<DropOutcome> {
        Ok(self.drag.drop(target, &mut self.repo)?)
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    // ---- export --------------------------------------------------------

    /// Copy everything an export needs, captured with the identity view.
    ///
    /// The viewport is frozen for the copy and restored before returning.
    pub fn export_snapshot(&mut self, metadata: ExportMetadata) -> ExportSnapshot {
        let saved = self.viewport.freeze();
        let transform = self.viewport.transform();
        let layout = self.layout().clone();
        let snapshot = ExportSnapshot {
            tree: self.repo.snapshot(),
            layout,
            transform,
            metadata,
            taken_at: Local::now(),
        };
        self.viewport.restore(saved);
        snapshot
    }

    /// Snapshot and export in one step.
    pub fn export_with(
        &mut self,
        service: &ExportService,
        metadata: ExportMetadata,
        format: ExportFormat,
    ) -> ApplicationResult<ExportArtifact> {
        let snapshot = self.export_snapshot(metadata);
        service.export(&snapshot, format)
    }
}
