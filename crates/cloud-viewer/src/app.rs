use crate::{
    data::{
        point_cloud::load_cloud,
        types::{CloudGpu, CloudUniformStd140},
    },
    renderer::{pipelines::points::POINT_SIZE_PX, Renderer},
    ui,
    view::{Projection, ViewState},
};
use anyhow::Result;
use glam::Vec3;
use std::path::Path;
use std::sync::Arc;
use winit::{event::WindowEvent, window::Window};

pub struct App {
    pub renderer: Renderer,
    pub view: ViewState,
    pub projection: Projection,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    pub cloud: CloudGpu,
}

impl App {
    /// Sets up the GPU context and loads the point cloud once. A load
    /// failure is fatal and propagates to `main`.
    pub async fn new(window: Arc<Window>, cloud_path: &Path) -> Result<Self> {
        let renderer = Renderer::new(window.clone()).await?;
        let size = renderer.gfx.size;

        let view = ViewState::new();
        let projection = Projection::new(size.width, size.height);

        let cloud = load_cloud(
            &renderer.gfx.device,
            &renderer.points.cloud_layout,
            cloud_path,
            &view,
            &projection,
            [size.width as f32, size.height as f32],
        )?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        Ok(Self {
            renderer,
            view,
            projection,
            egui_ctx,
            egui_state,
            cloud,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size);
            self.projection.resize(new_size.width, new_size.height);
        }
    }

    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return true;
        }

        if let WindowEvent::Resized(physical_size) = event {
            self.resize(*physical_size);
        }

        false
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let viewport_size = [
            self.renderer.gfx.size.width as f32,
            self.renderer.gfx.size.height as f32,
        ];

        // The angles read here are exactly the ones set by the most
        // recent slider change; no interpolation between frames.
        let ubo_data =
            self.cloud
                .make_uniform(&self.view, &self.projection, viewport_size, POINT_SIZE_PX);

        self.renderer
            .gfx
            .queue
            .write_buffer(&self.cloud.ubo, 0, bytemuck::bytes_of(&ubo_data));

        self.renderer.render(&swap_view, &self.cloud);

        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);

        ui::draw_controls(&self.egui_ctx, &mut self.view);
        ui::draw_hud(&self.egui_ctx, self.cloud.point_count);

        let egui_output = self.egui_ctx.end_frame();
        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.renderer.gfx.config.width,
                self.renderer.gfx.config.height,
            ],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .renderer
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        self.renderer.egui_renderer.update_buffers(
            &self.renderer.gfx.device,
            &self.renderer.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        self.renderer
            .gfx
            .queue
            .submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(())
    }
}

impl CloudGpu {
    /// Builds the per-frame uniform from the current view state.
    pub fn make_uniform(
        &self,
        view: &ViewState,
        projection: &Projection,
        viewport_size: [f32; 2],
        point_size_px: f32,
    ) -> CloudUniformStd140 {
        let mvp = projection.matrix * view.model_matrix(Vec3::from(self.center));

        CloudUniformStd140 {
            mvp: mvp.to_cols_array_2d(),
            viewport_size,
            point_size_px,
            _pad: 0.0,
        }
    }
}
