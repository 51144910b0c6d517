// egui overlay drawn on top of the shoal.
//
//   F3  stats panel and steering weight sliders
//   F4  target markers

use egui::epaint::Shadow;

use crate::flock::SteeringWeights;

pub struct DebugStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub frame_time_min_ms: f32,
    pub frame_time_max_ms: f32,
    pub agent_count: usize,
    pub cell_count: usize,
    pub largest_cell: usize,
    /// Wall time of the last simulation step (ms).
    pub simulate_ms: f32,
    pub workers: usize,
    pub resolution: (u32, u32),
    pub camera_distance: f32,
    pub world_time: f64,
}

/// One steering target, already projected to egui screen points.
pub struct TargetMarker {
    pub pos: egui::Pos2,
    /// Screen-space size of the marker; shrinks with distance.
    pub radius_px: f32,
}

/// What the overlay should draw this frame. `None` hides a layer.
#[derive(Default)]
pub struct OverlayLayers<'a> {
    pub stats: Option<&'a DebugStats>,
    /// Edited in place by the sliders.
    pub weights: Option<&'a mut SteeringWeights>,
    pub targets: Option<&'a [TargetMarker]>,
}

const PANEL_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 12, 18, 200);
const MARKER: egui::Color32 = egui::Color32::from_rgb(255, 200, 0);
const WEIGHT_RANGE: std::ops::RangeInclusive<f32> = 0.0..=3.0;

fn draw_targets(ctx: &egui::Context, markers: &[TargetMarker]) {
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Background,
        egui::Id::new("target_markers"),
    ));
    for marker in markers {
        painter.circle_stroke(marker.pos, marker.radius_px, egui::Stroke::new(1.5, MARKER));
        painter.circle_filled(marker.pos, 2.0, MARKER);
    }
}

fn stats_panel(ctx: &egui::Context, stats: &DebugStats) {
    let rows = [
        ("fps", stats.fps.to_string()),
        (
            "frame",
            format!(
                "{:.2} ms ({:.1} .. {:.1})",
                stats.frame_time_avg_ms, stats.frame_time_min_ms, stats.frame_time_max_ms
            ),
        ),
        ("simulate", format!("{:.2} ms", stats.simulate_ms)),
        ("workers", stats.workers.to_string()),
        ("agents", stats.agent_count.to_string()),
        ("cells", format!("{} (max {})", stats.cell_count, stats.largest_cell)),
        ("screen", format!("{} x {}", stats.resolution.0, stats.resolution.1)),
        ("camera", format!("{:.1}", stats.camera_distance)),
        ("time", format!("{:.1} s", stats.world_time)),
    ];

    egui::Area::new(egui::Id::new("shoal_stats"))
        .fixed_pos(egui::pos2(10.0, 10.0))
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(PANEL_FILL)
                .inner_margin(egui::Margin::same(8.0))
                .rounding(4.0)
                .show(ui, |ui| {
                    egui::Grid::new("shoal_stats_grid")
                        .num_columns(2)
                        .spacing([12.0, 2.0])
                        .show(ui, |ui| {
                            for (name, value) in rows {
                                ui.label(name);
                                ui.label(value);
                                ui.end_row();
                            }
                        });
                });
        });
}

/// Returns `true` when any slider moved this frame.
fn weight_sliders(ctx: &egui::Context, weights: &mut SteeringWeights) -> bool {
    let mut changed = false;
    egui::Window::new("steering")
        .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            for (name, value) in [
                ("separation", &mut weights.separation),
                ("alignment", &mut weights.alignment),
                ("target", &mut weights.target),
            ] {
                changed |= ui.add(egui::Slider::new(value, WEIGHT_RANGE).text(name)).changed();
            }
        });
    changed
}

pub struct DebugOverlay {
    pub visible: bool,
    pub show_targets: bool,
    ctx: egui::Context,
    winit_state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl DebugOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let ctx = egui::Context::default();
        ctx.set_visuals(egui::Visuals {
            window_fill: PANEL_FILL,
            window_stroke: egui::Stroke::NONE,
            window_shadow: Shadow::NONE,
            override_text_color: Some(egui::Color32::from_rgb(210, 235, 240)),
            ..egui::Visuals::dark()
        });
        ctx.style_mut(|style| style.override_font_id = Some(egui::FontId::monospace(13.0)));

        let winit_state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        // No depth attachment: the overlay pass runs after the shoal pass.
        let renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            visible: false,
            show_targets: false,
            ctx,
            winit_state,
            renderer,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn toggle_targets(&mut self) {
        self.show_targets = !self.show_targets;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.winit_state.on_window_event(window, event)
    }

    /// Run one egui frame over `view`. Returns `true` when a weight slider
    /// moved, in which case `layers.weights` holds the new values.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen: &egui_wgpu::ScreenDescriptor,
        layers: OverlayLayers<'_>,
    ) -> bool {
        let OverlayLayers { stats, mut weights, targets } = layers;
        let mut weights_changed = false;

        let raw_input = self.winit_state.take_egui_input(window);
        let output = self.ctx.run(raw_input, |ctx| {
            if let Some(markers) = targets {
                draw_targets(ctx, markers);
            }
            if let Some(stats) = stats {
                stats_panel(ctx, stats);
            }
            if let Some(w) = weights.as_deref_mut() {
                weights_changed |= weight_sliders(ctx, w);
            }
        });
        self.winit_state
            .handle_platform_output(window, output.platform_output);

        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        for (id, delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &primitives, screen);

        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        self.renderer
            .render(&mut pass.forget_lifetime(), &primitives, screen);

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }

        weights_changed
    }
}
