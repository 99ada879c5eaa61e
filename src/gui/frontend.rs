use std::collections::HashMap;
use std::sync::Arc;

use eframe::egui::{self, Color32, PointerButton, Pos2, Rect, Sense, Stroke, Vec2};

use crate::api::Wake;
use crate::api::poll::{self, PollHandle};
use crate::graph_utils::pipeline::{RunState, Snapshot, Sprite};
use crate::persistence::settings::AppSettings;
use super::assets::{AssetLoader, SPRITE_SIZE, SpriteAtlas};
use super::camera::Camera;
use super::connections::ConnectionLayer;
use super::drag::{DragController, Gesture, PointerSample, PressTarget, classify_press};
use super::reconcile::Reconciler;
use super::scene::SceneStore;

const PRESS_BUTTONS: [PointerButton; 3] = [PointerButton::Primary, PointerButton::Secondary, PointerButton::Middle];

pub struct PipelineCanvasApp {
    settings: AppSettings,
    scene: SceneStore,
    reconciler: Reconciler,
    connections: ConnectionLayer,
    camera: Camera,
    drag: DragController,
    // Sprites: pixels for hit-testing, textures for drawing
    atlas: SpriteAtlas,
    textures: HashMap<Sprite, egui::TextureHandle>,
    loader: AssetLoader,
    poll: Option<PollHandle>,
    run_state: RunState,
    pipeline_name: String,
    // Rename dialog
    rename_open: bool,
    rename_buffer: String,
}

impl PipelineCanvasApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let ctx = cc.egui_ctx.clone();
        let wake: Wake = Arc::new(move || ctx.request_repaint());
        let poll = match poll::spawn(&settings, wake.clone()) {
            Ok(h) => Some(h),
            Err(e) => {
                log::error!("could not start polling pipeline {}: {:#}", settings.pipeline_id, e);
                None
            }
        };
        let node_size = Vec2::new(SPRITE_SIZE[0] as f32, SPRITE_SIZE[1] as f32) * settings.node_scale;
        Self {
            scene: SceneStore::new(node_size),
            reconciler: Reconciler::new(),
            connections: ConnectionLayer::new(),
            camera: Camera::new(Vec2::new(800.0, 600.0), settings.grid_size, settings.grid_multiplier),
            drag: DragController::new(),
            atlas: SpriteAtlas::default(),
            textures: HashMap::new(),
            loader: AssetLoader::new().with_wake(wake),
            poll,
            run_state: RunState::Stopped,
            pipeline_name: format!("Pipeline {}", settings.pipeline_id),
            rename_open: false,
            rename_buffer: String::new(),
            settings,
        }
    }

    fn redraw_connections(&mut self) {
        let conns = self.reconciler.previous().map(|s| s.model.connections.as_slice()).unwrap_or(&[]);
        self.connections.render(conns, &self.scene);
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.run_state = snapshot.run_state;
        if let Some(name) = &snapshot.name {
            self.pipeline_name.clone_from(name);
        }
        let delta = self.reconciler.apply(snapshot, &mut self.scene);
        for id in &delta.added {
            let Some(node) = self.scene.get_mut(id) else { continue };
            let sprite = node.sprite();
            if self.atlas.contains(sprite) {
                node.decorated = true;
            } else {
                self.loader.request(sprite);
            }
        }
        if delta.needs_redraw() {
            self.redraw_connections();
        }
    }

    fn receive_sprites(&mut self, ctx: &egui::Context) {
        for (sprite, image) in self.loader.finished() {
            let texture = ctx.load_texture(sprite.asset_name(), image.to_color_image(), egui::TextureOptions::LINEAR);
            self.textures.insert(sprite, texture);
            self.atlas.insert(sprite, image);
            self.scene.decorate(sprite);
        }
    }

    pub fn reset_view(&mut self) { self.camera.reset(); }

    fn toggle_running(&mut self) {
        if let Some(p) = &self.poll {
            p.set_running(!self.run_state.is_running());
        }
    }

    fn teardown(&mut self) {
        if let Some(mut p) = self.poll.take() {
            p.shutdown();
        }
        self.drag = DragController::new();
        self.camera.end_pan();
        self.connections.clear();
        self.scene.clear();
        self.reconciler.reset();
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, resp: &egui::Response) {
        let rect = resp.rect;
        let (pressed, hover, released, primary_down) = ui.input(|i| {
            let pressed: Vec<PointerButton> = PRESS_BUTTONS.into_iter().filter(|b| i.pointer.button_pressed(*b)).collect();
            (pressed, i.pointer.hover_pos(), i.pointer.any_released(), i.pointer.primary_down())
        });
        let inside = hover.filter(|p| rect.contains(*p));
        // False when another layer covers the canvas under the pointer.
        let reachable = resp.contains_pointer();
        let to_viewport = |p: Pos2| p - rect.min.to_vec2();

        if let Some(p) = inside {
            let vp = to_viewport(p);
            let scene_pt = self.camera.viewport_to_scene(vp);
            for button in pressed {
                let target = if !reachable {
                    PressTarget::Covered
                } else if self.scene.node_at(scene_pt).is_some() {
                    PressTarget::Node
                } else {
                    PressTarget::Background
                };
                match classify_press(button, target) {
                    Gesture::NodeDrag => {
                        self.drag.begin(&self.scene, scene_pt, &self.atlas);
                    }
                    Gesture::Pan => self.camera.begin_pan(vp),
                    Gesture::Ignored => {}
                }
            }
            if self.drag.held().is_some() {
                let conns = self.reconciler.previous().map(|s| s.model.connections.as_slice()).unwrap_or(&[]);
                self.drag.drag_to(&mut self.scene, scene_pt, &mut self.connections, conns);
            }
            self.camera.pan_to(vp);
        }

        let sample = PointerSample { released, left_canvas: inside.is_none(), primary_down };
        if let Some(req) = self.drag.end_if(&mut self.scene, sample) {
            log::debug!("persisting '{}' at ({}, {})", req.pipe, req.x, req.y);
            if let Some(p) = self.poll.as_mut() {
                p.persist_move(req);
            }
        }
        if self.camera.is_panning() && sample.ends_pan() {
            self.camera.end_pan();
        }
    }

    fn paint(&self, ui: &egui::Ui, rect: Rect) {
        let painter = ui.painter_at(rect);
        let visuals = ui.visuals();
        painter.rect_filled(rect, 0.0, visuals.extreme_bg_color);

        let grid_stroke = Stroke::new(1.0, visuals.widgets.noninteractive.bg_stroke.color);
        let grid_origin = rect.min.to_vec2() + self.camera.grid_offset();
        for line in self.camera.grid_lines() {
            painter.line_segment(line.translate(grid_origin).points(), grid_stroke);
        }

        let node_origin = rect.min.to_vec2() + self.camera.node_offset();
        let wire = Stroke::new(2.0, visuals.widgets.active.fg_stroke.color);
        for drawn in self.connections.lines() {
            let seg = drawn.segment.translate(node_origin);
            painter.line_segment(seg.points(), wire);
            painter.circle_filled(seg.from, 3.0, wire.color);
            painter.circle_filled(seg.to, 3.0, wire.color);
        }

        let size = self.scene.node_size();
        let full_uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        for node in self.scene.iter() {
            let r = Rect::from_min_size(self.camera.scene_to_viewport(node.position) + rect.min.to_vec2(), size);
            match self.textures.get(&node.sprite()).filter(|_| node.decorated) {
                Some(tex) => {
                    painter.image(tex.id(), r, full_uv, Color32::WHITE);
                }
                None => {
                    painter.rect_stroke(r, 4.0, Stroke::new(1.0, visuals.weak_text_color()), egui::StrokeKind::Inside);
                }
            }
            let label_color = if node.is_being_dragged { visuals.strong_text_color() } else { visuals.text_color() };
            painter.text(
                r.center_bottom() + Vec2::new(0.0, 4.0),
                egui::Align2::CENTER_TOP,
                &node.id,
                egui::FontId::proportional(12.0),
                label_color,
            );
        }

        let border = self.camera.border().translate(rect.min.to_vec2());
        painter.rect_stroke(border, 0.0, Stroke::new(1.0, visuals.text_color()), egui::StrokeKind::Inside);
    }

    fn toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::NONE, egui::Key::Home))) {
                self.reset_view();
            }
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&self.pipeline_name).strong().size(18.0));
                if ui.small_button("✏").on_hover_text("Rename").clicked() {
                    self.rename_buffer.clone_from(&self.pipeline_name);
                    self.rename_open = true;
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let running = self.run_state.is_running();
                    let (text, fill) = if running {
                        ("■ Stop", Color32::from_rgb(200, 40, 40))
                    } else {
                        ("▶ Start", Color32::from_rgb(40, 140, 60))
                    };
                    let toggle = egui::Button::new(egui::RichText::new(text).color(Color32::WHITE)).fill(fill);
                    if ui.add(toggle).clicked() {
                        self.toggle_running();
                    }
                    if ui.button("⌂ Reset view").clicked() {
                        self.reset_view();
                    }
                });
            });
        });
    }

    fn rename_dialog(&mut self, ctx: &egui::Context) {
        if !self.rename_open {
            return;
        }
        let mut open = true;
        let mut close = false;
        egui::Window::new("Edit Pipeline Title")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.text_edit_singleline(&mut self.rename_buffer);
                let trimmed = self.rename_buffer.trim();
                let can_save = !trimmed.is_empty() && trimmed != self.pipeline_name;
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                    if ui.add_enabled(can_save, egui::Button::new("Save")).clicked() {
                        if let Some(p) = &self.poll {
                            p.rename(trimmed.to_string());
                        }
                        close = true;
                    }
                });
            });
        self.rename_open = open && !close;
    }
}

impl eframe::App for PipelineCanvasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snapshots = self.poll.as_ref().map(|p| p.drain()).unwrap_or_default();
        for snapshot in snapshots {
            self.apply_snapshot(snapshot);
        }
        self.receive_sprites(ctx);

        self.toolbar(ctx);
        self.rename_dialog(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_rect_before_wrap();
            if self.camera.resize(available.size()) {
                log::debug!("canvas resized to {:?}", available.size());
            }
            let resp = ui.allocate_rect(available, Sense::click_and_drag());
            self.handle_pointer(ui, &resp);
            self.paint(ui, resp.rect);
            if self.drag.held().is_some() || self.camera.is_panning() {
                ctx.request_repaint();
            }
        });

        // Keep polling results flowing even when nothing is moving.
        ctx.request_repaint_after(self.settings.poll_interval());
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.teardown();
        log::info!("canvas for pipeline {} closed", self.settings.pipeline_id);
    }
}
