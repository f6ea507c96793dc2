//! Viewer session: one scene, its highlight and visibility state
//!
//! [`ServiceViewer`] ties the classifier, materializer, highlight engine and
//! visibility controller to the load state of a scene. Every entry point
//! that touches the scene fails with [`ViewerError::SceneNotReady`] until
//! [`ServiceViewer::mark_ready`] has run.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::color::Rgb;
use crate::error::ViewerError;
use crate::highlight::HighlightState;
use crate::materialize::{MaterializeReport, Materializer};
use crate::registry::ServiceRegistry;
use crate::scene::MeshScene;
use crate::visibility::{VisibilityReport, VisibilityState};

/// Load state of the scene behind a viewer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ServiceViewer<N, M> {
    classifier: Classifier,
    materializer: Materializer<N, M>,
    highlight: HighlightState<N, M>,
    visibility: VisibilityState,
    selected_service: Option<String>,
    state: LoadState,
}

impl<N: Copy + Eq + Hash + Debug, M: Clone + Eq + Hash> ServiceViewer<N, M> {
    pub fn new(registry: ServiceRegistry, highlight_opacity: f32) -> Self {
        Self {
            classifier: Classifier::new(registry),
            materializer: Materializer::new(),
            highlight: HighlightState::with_opacity(highlight_opacity),
            visibility: VisibilityState::new(),
            selected_service: None,
            state: LoadState::Loading,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    pub fn registry(&self) -> &ServiceRegistry {
        self.classifier.registry()
    }

    pub fn highlight(&self) -> &HighlightState<N, M> {
        &self.highlight
    }

    /// A new scene is being fetched; drop everything tied to the old one
    ///
    /// The hidden set survives and is re-applied once the scene is ready.
    pub fn begin_loading(&mut self) {
        self.materializer.reset();
        self.highlight.reset();
        self.selected_service = None;
        self.state = LoadState::Loading;
    }

    /// Scene finished loading: materialize it and apply the hidden set
    pub fn mark_ready<S>(&mut self, scene: &mut S) -> MaterializeReport
    where
        S: MeshScene<Node = N, Material = M>,
    {
        self.state = LoadState::Ready;
        let report = self.materializer.materialize(
            scene,
            &mut self.classifier,
            self.highlight.original_materials_mut(),
        );
        self.apply_visibility(scene);
        info!(
            meshes = report.visited,
            overridden = report.overridden,
            "Scene ready"
        );
        report
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(reason = %reason, "Scene load failed");
        self.highlight.reset();
        self.selected_service = None;
        self.state = LoadState::Failed(reason);
    }

    fn ensure_ready(&self) -> Result<(), ViewerError> {
        match &self.state {
            LoadState::Ready => Ok(()),
            LoadState::Loading => Err(ViewerError::SceneNotReady),
            LoadState::Failed(reason) => Err(ViewerError::AssetLoadFailure(reason.clone())),
        }
    }

    /// Run the materializer again; already processed nodes are left alone
    pub fn materialize<S>(&mut self, scene: &mut S) -> Result<MaterializeReport, ViewerError>
    where
        S: MeshScene<Node = N, Material = M>,
    {
        self.ensure_ready()?;
        Ok(self.materializer.materialize(
            scene,
            &mut self.classifier,
            self.highlight.original_materials_mut(),
        ))
    }

    /// Highlight a service's meshes in its own color
    ///
    /// The service's keywords are used as the element list.
    pub fn select_service<S>(&mut self, scene: &mut S, service: &str) -> Result<usize, ViewerError>
    where
        S: MeshScene<Node = N, Material = M>,
    {
        self.ensure_ready()?;
        let definition = self
            .classifier
            .registry()
            .find_service_ignore_case(service)
            .ok_or_else(|| ViewerError::UnknownService(service.to_string()))?;
        let name = definition.service_name.clone();
        let keywords = definition.keywords.clone();
        let tint = definition.color;

        let count = self.highlight.set_selection(scene, &keywords, tint);
        info!(service = %name, highlighted = count, "Service selected");
        self.selected_service = Some(name);
        Ok(count)
    }

    /// Highlight meshes matching arbitrary element fragments
    pub fn select_elements<S, E>(
        &mut self,
        scene: &mut S,
        elements: &[E],
        tint: Rgb,
    ) -> Result<usize, ViewerError>
    where
        S: MeshScene<Node = N, Material = M>,
        E: AsRef<str>,
    {
        self.ensure_ready()?;
        self.selected_service = None;
        Ok(self.highlight.set_selection(scene, elements, tint))
    }

    pub fn clear_selection<S>(&mut self, scene: &mut S) -> Result<(), ViewerError>
    where
        S: MeshScene<Node = N, Material = M>,
    {
        self.ensure_ready()?;
        self.highlight.clear_selection(scene);
        self.selected_service = None;
        Ok(())
    }

    /// Replace the hidden set and apply it
    pub fn set_hidden<S, I, T>(
        &mut self,
        scene: &mut S,
        services: I,
    ) -> Result<VisibilityReport, ViewerError>
    where
        S: MeshScene<Node = N, Material = M>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ensure_ready()?;
        self.visibility.set_hidden(services);
        Ok(self.apply_visibility(scene))
    }

    /// Flip one service's visibility; returns whether it is now hidden
    pub fn toggle_hidden<S>(&mut self, scene: &mut S, service: &str) -> Result<bool, ViewerError>
    where
        S: MeshScene<Node = N, Material = M>,
    {
        self.ensure_ready()?;
        let name = self
            .classifier
            .registry()
            .find_service_ignore_case(service)
            .map(|s| s.service_name.clone())
            .ok_or_else(|| ViewerError::UnknownService(service.to_string()))?;
        let hidden = self.visibility.toggle(&name);
        self.apply_visibility(scene);
        Ok(hidden)
    }

    pub fn show_all<S>(&mut self, scene: &mut S) -> Result<VisibilityReport, ViewerError>
    where
        S: MeshScene<Node = N, Material = M>,
    {
        self.ensure_ready()?;
        self.visibility.show_all();
        Ok(self.apply_visibility(scene))
    }

    fn apply_visibility<S>(&mut self, scene: &mut S) -> VisibilityReport
    where
        S: MeshScene<Node = N, Material = M>,
    {
        let all = self.classifier.registry().service_names();
        self.visibility.apply(scene, &mut self.classifier, &all)
    }

    pub fn hidden_services(&self) -> &BTreeSet<String> {
        self.visibility.hidden()
    }

    pub fn selected_service(&self) -> Option<&str> {
        self.selected_service.as_deref()
    }

    /// Number of mesh nodes claimed by each service, in registry order
    pub fn service_node_counts<S>(
        &mut self,
        scene: &S,
    ) -> Result<Vec<(String, usize)>, ViewerError>
    where
        S: MeshScene<Node = N, Material = M>,
    {
        self.ensure_ready()?;
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for node in scene.mesh_nodes() {
            let index = scene
                .node_name(node)
                .and_then(|n| self.classifier.classify_index(n));
            if let Some(index) = index {
                *counts.entry(index).or_default() += 1;
            }
        }
        Ok(self
            .classifier
            .registry()
            .services()
            .iter()
            .enumerate()
            .map(|(i, s)| (s.service_name.clone(), counts.get(&i).copied().unwrap_or(0)))
            .collect())
    }
}
