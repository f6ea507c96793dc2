//! Orbit camera around the building model (Y up)

use bevy::ecs::message::MessageReader;
use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy_egui::EguiContexts;

use obra_scene::{SceneReady, ServiceModel, ServiceSession};

/// Camera controller settings
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32, // For smooth zoom
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3, // For smooth re-centering
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: 25.0,
            target_distance: 25.0,
            azimuth: 0.8,
            elevation: 0.5,
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
            min_distance: 1.0,
            max_distance: 500.0,
        }
    }
}

impl CameraSettings {
    /// Aim at the center of `min..max` from far enough to see all of it
    pub fn frame_bounds(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(self.min_distance);
        self.target_focus = center;
        self.target_distance = (radius * 2.2).clamp(self.min_distance, self.max_distance);
    }

    /// Camera position for the current orbit state
    pub fn eye(&self) -> Vec3 {
        let x = self.distance * self.azimuth.cos() * self.elevation.cos();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.azimuth.sin() * self.elevation.cos();
        self.target + Vec3::new(x, y, z)
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .add_systems(Startup, setup_camera)
            .add_systems(Update, (frame_model_on_ready, update_camera).chain());
    }
}

fn setup_camera(mut commands: Commands, settings: Res<CameraSettings>) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.05,
            far: 2000.0,
            ..default()
        }),
        Transform::from_translation(settings.eye()).looking_at(settings.target, Vec3::Y),
        MainCamera,
    ));

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.95, 0.95, 1.0),
        brightness: 400.0,
        ..default()
    });

    // Sun
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(20.0, 40.0, 15.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Center the orbit on the model once its scene is spawned
fn frame_model_on_ready(
    ready: Query<(), (With<ServiceModel>, Added<SceneReady>)>,
    session: Res<ServiceSession>,
    transforms: Query<&GlobalTransform>,
    mut settings: ResMut<CameraSettings>,
) {
    if ready.is_empty() {
        return;
    }

    let mut bounds: Option<(Vec3, Vec3)> = None;
    for entity in &session.index.order {
        let Ok(transform) = transforms.get(*entity) else {
            continue;
        };
        let p = transform.translation();
        bounds = Some(match bounds {
            Some((min, max)) => (min.min(p), max.max(p)),
            None => (p, p),
        });
    }

    if let Some((min, max)) = bounds {
        settings.frame_bounds(min, max);
        tracing::debug!("Framing model: {:?} .. {:?}", min, max);
    }
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    time: Res<Time>,
    mut contexts: EguiContexts,
) {
    // Don't steal input from the side panel
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }

    // Orbit with left drag
    if mouse_button.pressed(MouseButton::Left) && !egui_wants_pointer {
        settings.azimuth += total_motion.x * settings.sensitivity;
        settings.elevation = (settings.elevation + total_motion.y * settings.sensitivity)
            .clamp(-1.5, 1.5);
    }

    // Pan with right drag, in the camera's ground-aligned frame
    if mouse_button.pressed(MouseButton::Right) && !egui_wants_pointer {
        let right = Vec3::new(-settings.azimuth.sin(), 0.0, settings.azimuth.cos());
        let pan_speed = settings.distance * 0.002;
        settings.target_focus -= right * total_motion.x * pan_speed;
        settings.target_focus += Vec3::Y * total_motion.y * pan_speed;
    }

    if egui_wants_pointer {
        mouse_wheel.clear();
    } else {
        for scroll in mouse_wheel.read() {
            let zoom_factor = 1.0 - scroll.y * settings.zoom_speed;
            settings.target_distance = (settings.target_distance * zoom_factor)
                .clamp(settings.min_distance, settings.max_distance);
        }
    }

    // Smooth interpolation for zoom and target
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;
    settings.target = settings.target + (settings.target_focus - settings.target) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = settings.eye();
        transform.look_at(settings.target, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_bounds_centers_target() {
        let mut settings = CameraSettings::default();
        settings.frame_bounds(Vec3::new(-10.0, 0.0, -4.0), Vec3::new(10.0, 6.0, 4.0));

        assert_eq!(settings.target_focus, Vec3::new(0.0, 3.0, 0.0));
        assert!(settings.target_distance > 10.0);
        assert!(settings.target_distance <= settings.max_distance);
    }

    #[test]
    fn test_eye_is_at_distance() {
        let settings = CameraSettings::default();
        let eye = settings.eye();
        assert!((eye.distance(settings.target) - settings.distance).abs() < 1e-3);
        // Positive elevation puts the camera above the target
        assert!(eye.y > settings.target.y);
    }
}
