//! One-shot material overrides after a scene load
//!
//! Exported models share one material across many meshes, so a profile is
//! never written onto the authored material. Each overridden node gets a
//! derived copy instead, made once per source material and service. A node
//! is only processed once per load, so running the pass again never
//! compounds color or emissive values.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{debug, warn};

use crate::classifier::Classifier;
use crate::highlight::MaterialCapture;
use crate::scene::MeshScene;

/// Counters from one materialize pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Mesh nodes seen
    pub visited: usize,
    /// Nodes switched to a profiled material
    pub overridden: usize,
    /// Nodes without material, or whose material rejected the profile
    pub skipped: usize,
    /// Nodes handled by an earlier pass
    pub already_processed: usize,
    /// Profiled materials created by this pass
    pub derived: usize,
}

#[derive(Debug, Clone)]
pub struct Materializer<N, M> {
    processed: HashSet<N>,
    /// (source material, service index) -> profiled copy
    derived: HashMap<(M, usize), M>,
}

impl<N: Copy + Eq + Hash, M: Clone + Eq + Hash> Default for Materializer<N, M> {
    fn default() -> Self {
        Self {
            processed: HashSet::new(),
            derived: HashMap::new(),
        }
    }
}

impl<N: Copy + Eq + Hash + Debug, M: Clone + Eq + Hash> Materializer<N, M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply registry overrides and shadow flags to every mesh node
    ///
    /// When a node is currently highlighted, `originals` holds its real
    /// material; the profiled copy replaces that entry so clearing the
    /// highlight restores the override, and the highlight stays on screen.
    pub fn materialize<S>(
        &mut self,
        scene: &mut S,
        classifier: &mut Classifier,
        originals: &mut MaterialCapture<N, M>,
    ) -> MaterializeReport
    where
        S: MeshScene<Node = N, Material = M>,
    {
        let mut report = MaterializeReport::default();

        for node in scene.mesh_nodes() {
            report.visited += 1;
            scene.enable_shadows(node);

            if !self.processed.insert(node) {
                report.already_processed += 1;
                continue;
            }

            let Some(name) = scene.node_name(node).map(str::to_string) else {
                continue;
            };
            let Some(index) = classifier.classify_index(&name) else {
                continue;
            };
            let registry = classifier.registry();
            let Some(service) = registry.services().get(index) else {
                continue;
            };
            if !service.overrides_material {
                continue;
            }

            let Some(source) = originals
                .original(node)
                .cloned()
                .or_else(|| scene.material(node))
            else {
                debug!(node = %name, "Skipping override of mesh without material");
                report.skipped += 1;
                continue;
            };

            let key = (source, index);
            let material = match self.derived.get(&key) {
                Some(material) => material.clone(),
                None => match scene.derive_material(&key.0, registry.profile_for(service)) {
                    Ok(material) => {
                        report.derived += 1;
                        self.derived.insert(key, material.clone());
                        material
                    }
                    Err(e) => {
                        warn!(node = %name, error = %e, "Skipping material override");
                        report.skipped += 1;
                        continue;
                    }
                },
            };

            if !originals.replace(node, material.clone()) {
                scene.set_material(node, material);
            }
            report.overridden += 1;
        }

        debug!(
            visited = report.visited,
            overridden = report.overridden,
            derived = report.derived,
            skipped = report.skipped,
            already_processed = report.already_processed,
            "Scene materialized"
        );
        report
    }

    pub fn is_processed(&self, node: N) -> bool {
        self.processed.contains(&node)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Profiled materials alive from earlier passes
    pub fn derived_count(&self) -> usize {
        self.derived.len()
    }

    /// Forget processed nodes and derived materials; call when a new scene
    /// is loaded
    pub fn reset(&mut self) {
        self.processed.clear();
        self.derived.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::builtin_registry;
    use crate::color::Rgb;
    use crate::highlight::HighlightState;
    use crate::scene::{Material, MaterialKind, MaterialRef, NodeId, SceneGraph};

    struct Fixture {
        scene: SceneGraph,
        tomada: NodeId,
        parede: NodeId,
        basic: NodeId,
        bare: NodeId,
        tomada_mat: MaterialRef,
        parede_mat: MaterialRef,
    }

    fn fixture() -> Fixture {
        let mut scene = SceneGraph::new();
        let tomada_id = scene.add_material(Material::named("tomada"));
        let parede_id = scene.add_material(Material {
            color: Rgb::new(0.5, 0.3, 0.2),
            ..Material::named("parede")
        });
        let basic_id = scene.add_material(Material {
            kind: MaterialKind::Basic,
            ..Material::named("luz")
        });
        let root = scene.add_group(None, "Casa");
        let tomada_mat = MaterialRef::Single(tomada_id);
        let parede_mat = MaterialRef::Single(parede_id);
        let tomada = scene.add_mesh(Some(root), Some("Tomada_Cozinha"), Some(tomada_mat.clone()));
        let parede = scene.add_mesh(Some(root), Some("ParedeTerreo_01"), Some(parede_mat.clone()));
        let basic = scene.add_mesh(
            Some(root),
            Some("Luminaria_Sala"),
            Some(MaterialRef::Single(basic_id)),
        );
        let bare = scene.add_mesh(Some(root), Some("Interruptor_01"), None);
        Fixture {
            scene,
            tomada,
            parede,
            basic,
            bare,
            tomada_mat,
            parede_mat,
        }
    }

    fn single(scene: &SceneGraph, material: &MaterialRef) -> Material {
        let MaterialRef::Single(id) = material else { panic!("expected single material") };
        scene.get_material(*id).unwrap().clone()
    }

    #[test]
    fn test_overrides_only_flagged_services() {
        let mut f = fixture();
        let mut classifier = Classifier::new(builtin_registry().unwrap());
        let profile = classifier.registry().profile("Eletrica").clone();
        let mut materializer = Materializer::new();

        let report =
            materializer.materialize(&mut f.scene, &mut classifier, &mut MaterialCapture::new());

        assert_eq!(report.visited, 4);
        assert_eq!(report.overridden, 1);
        assert_eq!(report.derived, 1);
        // Basic material rejects the profile, the bare mesh has none
        assert_eq!(report.skipped, 2);

        let derived = f.scene.material(f.tomada).unwrap();
        assert_ne!(derived, f.tomada_mat);
        let tomada = single(&f.scene, &derived);
        assert_eq!(tomada.color, profile.color);
        assert_eq!(tomada.roughness, profile.roughness);
        assert_eq!(tomada.metalness, profile.metalness);
        assert_eq!(Some(tomada.emissive), profile.emissive);

        // Authored materials are never written to
        assert_eq!(single(&f.scene, &f.tomada_mat).color, Rgb::WHITE);
        assert_eq!(single(&f.scene, &f.parede_mat).color, Rgb::new(0.5, 0.3, 0.2));
        assert_eq!(f.scene.material(f.parede), Some(f.parede_mat.clone()));

        for node in [f.tomada, f.parede, f.basic, f.bare] {
            let n = f.scene.node(node).unwrap();
            assert!(n.cast_shadow && n.receive_shadow);
        }
    }

    #[test]
    fn test_shared_material_only_overridden_on_matched_nodes() {
        let mut scene = SceneGraph::new();
        let authored = Rgb::from_rgb8(0x7f, 0x4c, 0x33);
        let shared_id = scene.add_material(Material {
            color: authored,
            ..Material::named("Material.001")
        });
        let shared = MaterialRef::Single(shared_id);
        let root = scene.add_group(None, "Casa");
        let tomada_1 = scene.add_mesh(Some(root), Some("Tomada_01"), Some(shared.clone()));
        let tomada_2 = scene.add_mesh(Some(root), Some("Tomada_02"), Some(shared.clone()));
        let parede = scene.add_mesh(Some(root), Some("ParedeTerreo_01"), Some(shared.clone()));
        let solto = scene.add_mesh(Some(root), Some("Cadeira"), Some(shared.clone()));

        let mut classifier = Classifier::new(builtin_registry().unwrap());
        let profile = classifier.registry().profile("Eletrica").clone();
        let mut materializer = Materializer::new();
        let report =
            materializer.materialize(&mut scene, &mut classifier, &mut MaterialCapture::new());

        assert_eq!(report.overridden, 2);
        // One copy per source material and service
        assert_eq!(report.derived, 1);
        assert_eq!(scene.material(tomada_1), scene.material(tomada_2));
        let derived = scene.material(tomada_1).unwrap();
        assert_eq!(single(&scene, &derived).color, profile.color);

        // Non-overriding and unclassified nodes keep the authored material
        for node in [parede, solto] {
            assert_eq!(scene.material(node), Some(shared.clone()));
        }
        assert_eq!(single(&scene, &shared).color, authored);
        assert_eq!(scene.live_materials(), 2);
    }

    #[test]
    fn test_materialize_twice_does_not_compound() {
        let mut f = fixture();
        let mut classifier = Classifier::new(builtin_registry().unwrap());
        let profile = classifier.registry().profile("Eletrica").clone();
        let mut materializer = Materializer::new();

        materializer.materialize(&mut f.scene, &mut classifier, &mut MaterialCapture::new());
        let live = f.scene.live_materials();
        let second =
            materializer.materialize(&mut f.scene, &mut classifier, &mut MaterialCapture::new());

        assert_eq!(second.already_processed, 4);
        assert_eq!(second.overridden, 0);
        assert_eq!(f.scene.live_materials(), live);
        let tomada = single(&f.scene, &f.scene.material(f.tomada).unwrap());
        assert_eq!(tomada.color, profile.color);
        assert_eq!(tomada.emissive_intensity, profile.emissive_intensity);
    }

    #[test]
    fn test_materialize_during_highlight_targets_original() {
        let mut f = fixture();
        let mut classifier = Classifier::new(builtin_registry().unwrap());
        let profile = classifier.registry().profile("Eletrica").clone();
        let mut highlight = HighlightState::new();
        highlight.set_selection(&mut f.scene, &["Tomada"], Rgb::new(0.0, 1.0, 0.0));
        let highlight_mat = f.scene.material(f.tomada).unwrap();

        let mut materializer = Materializer::new();
        materializer.materialize(&mut f.scene, &mut classifier, highlight.original_materials_mut());

        // The highlight stays on screen with its tint
        assert_eq!(f.scene.material(f.tomada), Some(highlight_mat.clone()));
        assert_eq!(single(&f.scene, &highlight_mat).color, Rgb::new(0.0, 1.0, 0.0));

        // Clearing puts the profiled copy back, not the authored material
        highlight.clear_selection(&mut f.scene);
        let restored = f.scene.material(f.tomada).unwrap();
        assert_ne!(restored, f.tomada_mat);
        assert_eq!(single(&f.scene, &restored).color, profile.color);
        assert_eq!(single(&f.scene, &f.tomada_mat).color, Rgb::WHITE);
    }

    #[test]
    fn test_reset_allows_reprocessing() {
        let mut f = fixture();
        let mut classifier = Classifier::new(builtin_registry().unwrap());
        let mut materializer = Materializer::new();

        materializer.materialize(&mut f.scene, &mut classifier, &mut MaterialCapture::new());
        assert!(materializer.is_processed(f.tomada));
        assert_eq!(materializer.derived_count(), 1);
        materializer.reset();
        assert_eq!(materializer.processed_count(), 0);
        assert_eq!(materializer.derived_count(), 0);

        let report =
            materializer.materialize(&mut f.scene, &mut classifier, &mut MaterialCapture::new());
        assert_eq!(report.overridden, 1);
    }
}
