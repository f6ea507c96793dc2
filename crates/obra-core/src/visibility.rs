//! Per-service visibility
//!
//! Visibility is always set absolutely from the hidden set; nodes that no
//! service claims are never touched.

use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::classifier::Classifier;
use crate::scene::MeshScene;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityReport {
    pub hidden: usize,
    pub shown: usize,
    pub untouched: usize,
}

/// Hide nodes of services in `hidden`, show nodes of the other `all_services`
///
/// Services that appear in neither list keep whatever visibility they have.
pub fn apply_hidden_set<S, T>(
    scene: &mut S,
    classifier: &mut Classifier,
    hidden: &BTreeSet<String>,
    all_services: &[T],
) -> VisibilityReport
where
    S: MeshScene,
    T: AsRef<str>,
{
    let known: HashSet<&str> = all_services.iter().map(AsRef::as_ref).collect();
    let mut report = VisibilityReport::default();

    for node in scene.mesh_nodes() {
        let service = scene
            .node_name(node)
            .and_then(|name| classifier.service_name(name))
            .map(str::to_string);

        match service {
            Some(service) if hidden.contains(&service) => {
                scene.set_visible(node, false);
                report.hidden += 1;
            }
            Some(service) if known.contains(service.as_str()) => {
                scene.set_visible(node, true);
                report.shown += 1;
            }
            _ => report.untouched += 1,
        }
    }

    debug!(
        hidden = report.hidden,
        shown = report.shown,
        untouched = report.untouched,
        "Visibility applied"
    );
    report
}

/// Set of hidden service names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityState {
    hidden: BTreeSet<String>,
}

impl VisibilityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hidden(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn is_hidden(&self, service: &str) -> bool {
        self.hidden.contains(service)
    }

    /// Replace the hidden set; returns `true` if it changed
    pub fn set_hidden<I, T>(&mut self, services: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let next: BTreeSet<String> = services.into_iter().map(Into::into).collect();
        let changed = next != self.hidden;
        self.hidden = next;
        changed
    }

    /// Flip one service; returns whether it is now hidden
    pub fn toggle(&mut self, service: &str) -> bool {
        if self.hidden.remove(service) {
            false
        } else {
            self.hidden.insert(service.to_string());
            true
        }
    }

    pub fn show_all(&mut self) {
        self.hidden.clear();
    }

    /// Push this state into the scene
    pub fn apply<S, T>(
        &self,
        scene: &mut S,
        classifier: &mut Classifier,
        all_services: &[T],
    ) -> VisibilityReport
    where
        S: MeshScene,
        T: AsRef<str>,
    {
        apply_hidden_set(scene, classifier, &self.hidden, all_services)
    }
}
