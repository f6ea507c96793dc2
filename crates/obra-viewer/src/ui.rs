//! Service panel using bevy_egui

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use obra_core::{LoadState, Rgb, ServiceRegistry, SpreadsheetRow, ViewerError};
use obra_scene::{
    ModelLoad, ModelStatus, PendingServiceActions, ServiceAction, ServiceSession, ServiceTable,
    SpreadsheetAsset, TableStatus,
};

/// Tint used for free-text element searches
#[derive(Debug, Clone, Resource)]
pub struct ElementTint(pub Rgb);

/// Text typed into the element search box
#[derive(Debug, Clone, Resource, Default)]
pub struct ElementQuery(pub String);

/// Grouped system parameters for the panel
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub session: Res<'w, ServiceSession>,
    pub pending: ResMut<'w, PendingServiceActions>,
    pub model: ResMut<'w, ModelLoad>,
    pub table: ResMut<'w, ServiceTable>,
    pub sheets: Res<'w, Assets<SpreadsheetAsset>>,
    pub tint: Res<'w, ElementTint>,
    pub query: ResMut<'w, ElementQuery>,
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ElementQuery>()
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

fn to_egui(rgb: Rgb) -> egui::Color32 {
    let [r, g, b] = rgb.to_rgb8();
    egui::Color32::from_rgb(r, g, b)
}

fn color_swatch(ui: &mut egui::Ui, rgb: Rgb) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
    ui.painter().rect_filled(rect, 2.0, to_egui(rgb));
}

/// Split a search box entry into element fragments
pub fn parse_element_query(query: &str) -> Vec<String> {
    query
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Action for a click on a spreadsheet row, `None` when the row has no model link
pub fn row_click_action(
    row: &SpreadsheetRow,
    registry: &ServiceRegistry,
    selected: Option<&str>,
) -> Option<ServiceAction> {
    let service = row.linked_service(registry)?;
    if selected == Some(service.service_name.as_str()) {
        Some(ServiceAction::ClearSelection)
    } else {
        Some(ServiceAction::SelectService(service.service_name.clone()))
    }
}

fn ui_system(mut params: UiParams) {
    let Ok(ctx) = params.contexts.ctx_mut() else {
        return;
    };

    egui::SidePanel::left("service_panel")
        .default_width(340.0)
        .show(ctx, |ui| {
            ui.heading("Services");
            ui.separator();

            if render_model_status(ui, &params.model, &params.session) {
                params.model.request_reload();
            }
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.collapsing("Spreadsheet", |ui| {
                    let retry = render_spreadsheet(
                        ui,
                        &params.table,
                        &params.sheets,
                        &params.session,
                        &mut params.pending,
                    );
                    if retry {
                        params.table.request_reload();
                    }
                });

                ui.collapsing("Model services", |ui| {
                    render_service_list(ui, &params.session, &mut params.pending);
                });

                ui.collapsing("Element search", |ui| {
                    render_element_search(ui, &mut params.query, &params.tint, &mut params.pending);
                });
            });

            if let Some(error) = &params.session.last_error {
                ui.separator();
                ui.colored_label(egui::Color32::from_rgb(230, 120, 50), error);
            }
        });
}

/// Returns true when a retry was requested
fn render_model_status(ui: &mut egui::Ui, model: &ModelLoad, session: &ServiceSession) -> bool {
    let mut retry = false;
    match &model.status {
        ModelStatus::Idle | ModelStatus::Loading | ModelStatus::Spawned => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading model...");
            });
        }
        ModelStatus::Ready => {
            ui.label(format!("{} meshes indexed", session.index.len()));
            if let Some(service) = session.viewer.selected_service() {
                ui.horizontal(|ui| {
                    if let Some(definition) = session.registry().service(service) {
                        color_swatch(ui, definition.color);
                    }
                    ui.label(format!(
                        "Selected: {} ({} highlighted)",
                        service,
                        session.viewer.highlight().highlighted_count()
                    ));
                });
            }
        }
        ModelStatus::Failed(reason) => {
            let error = ViewerError::AssetLoadFailure(reason.clone());
            ui.colored_label(egui::Color32::from_rgb(220, 60, 60), error.to_string());
            retry = ui.button("Retry").clicked();
        }
    }

    if *session.viewer.state() == LoadState::Loading && model.status == ModelStatus::Ready {
        ui.label("Preparing scene...");
    }
    retry
}

/// Returns true when a retry was requested
fn render_spreadsheet(
    ui: &mut egui::Ui,
    table: &ServiceTable,
    sheets: &Assets<SpreadsheetAsset>,
    session: &ServiceSession,
    pending: &mut PendingServiceActions,
) -> bool {
    match &table.status {
        TableStatus::Idle | TableStatus::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading spreadsheet...");
            });
            return false;
        }
        TableStatus::Failed(reason) => {
            ui.colored_label(
                egui::Color32::from_rgb(220, 60, 60),
                format!("Spreadsheet unavailable: {}", reason),
            );
            return ui.button("Retry").clicked();
        }
        TableStatus::Loaded => {}
    }

    let Some(sheet) = table.spreadsheet(sheets) else {
        return false;
    };
    if sheet.is_empty() {
        ui.label("No rows");
        return false;
    }

    let registry = session.registry();
    let selected = session.viewer.selected_service();
    let model_ready = session.viewer.is_ready();

    egui::Grid::new("spreadsheet_rows")
        .striped(true)
        .num_columns(3)
        .show(ui, |ui| {
            ui.strong("Item");
            ui.strong("Unit");
            ui.strong("Quantity");
            ui.end_row();

            for row in sheet.rows() {
                let linked = row.linked_service(registry);
                match linked {
                    Some(service) => {
                        let is_selected = selected == Some(service.service_name.as_str());
                        let text = egui::RichText::new(&row.item).color(to_egui(service.color));
                        let button = egui::Button::selectable(is_selected, text);
                        let response = ui.add_enabled(model_ready, button);
                        if response.clicked() {
                            if let Some(action) = row_click_action(row, registry, selected) {
                                pending.push(action);
                            }
                        }
                    }
                    None => {
                        ui.label(&row.item);
                    }
                }
                ui.label(&row.unit);
                if row.is_pending() {
                    ui.label(egui::RichText::new("pending").italics().color(egui::Color32::GRAY));
                } else {
                    ui.label(&row.quantity);
                }
                ui.end_row();
            }
        });

    ui.label(
        egui::RichText::new(format!(
            "{} rows, {} linked to the model, {} pending",
            sheet.len(),
            sheet.linked_rows(registry).len(),
            sheet.pending_count()
        ))
        .small()
        .color(egui::Color32::GRAY),
    );
    false
}

fn render_service_list(
    ui: &mut egui::Ui,
    session: &ServiceSession,
    pending: &mut PendingServiceActions,
) {
    let ready = session.viewer.is_ready();
    let hidden = session.viewer.hidden_services();

    for service in session.registry().services() {
        ui.horizontal(|ui| {
            let mut visible = !hidden.contains(&service.service_name);
            if ui
                .add_enabled(ready, egui::Checkbox::without_text(&mut visible))
                .changed()
            {
                pending.push(ServiceAction::ToggleHidden(service.service_name.clone()));
            }
            color_swatch(ui, service.color);

            let is_selected =
                session.viewer.selected_service() == Some(service.service_name.as_str());
            if ui
                .add_enabled(ready, egui::Button::selectable(is_selected, &service.service_name))
                .clicked()
            {
                pending.push(if is_selected {
                    ServiceAction::ClearSelection
                } else {
                    ServiceAction::SelectService(service.service_name.clone())
                });
            }

            ui.label(
                egui::RichText::new(session.node_count(&service.service_name).to_string())
                    .small()
                    .color(egui::Color32::GRAY),
            );
        });
    }

    ui.horizontal(|ui| {
        if ui.add_enabled(ready, egui::Button::new("Clear selection")).clicked() {
            pending.push(ServiceAction::ClearSelection);
        }
        if ui.add_enabled(ready, egui::Button::new("Show all")).clicked() {
            pending.push(ServiceAction::ShowAll);
        }
    });
}

fn render_element_search(
    ui: &mut egui::Ui,
    query: &mut ElementQuery,
    tint: &ElementTint,
    pending: &mut PendingServiceActions,
) {
    ui.label("Element names, separated by commas:");
    let response = ui.text_edit_singleline(&mut query.0);
    let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

    if ui.button("Highlight").clicked() || submitted {
        let elements = parse_element_query(&query.0);
        pending.push(if elements.is_empty() {
            ServiceAction::ClearSelection
        } else {
            ServiceAction::SelectElements {
                elements,
                tint: tint.0,
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obra_core::builtin_registry;

    #[test]
    fn test_parse_element_query() {
        assert_eq!(
            parse_element_query(" Tomada_01, Interruptor ;; "),
            vec!["Tomada_01".to_string(), "Interruptor".to_string()]
        );
        assert!(parse_element_query(" , ").is_empty());
    }

    #[test]
    fn test_row_click_toggles_selection() {
        let registry = builtin_registry().unwrap();
        let row = SpreadsheetRow::new("eletrica", "un", "12");

        assert_eq!(
            row_click_action(&row, &registry, None),
            Some(ServiceAction::SelectService("Eletrica".to_string()))
        );
        assert_eq!(
            row_click_action(&row, &registry, Some("Gas")),
            Some(ServiceAction::SelectService("Eletrica".to_string()))
        );
        assert_eq!(
            row_click_action(&row, &registry, Some("Eletrica")),
            Some(ServiceAction::ClearSelection)
        );

        let unlinked = SpreadsheetRow::new("Limpeza final", "vb", "1");
        assert_eq!(row_click_action(&unlinked, &registry, None), None);
    }
}
