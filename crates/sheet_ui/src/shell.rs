//! egui integration for the tool window.
//!
//! egui needs a split render because `egui_wgpu::Renderer::render()` wants a
//! `RenderPass<'static>` while `begin_render_pass` borrows the encoder:
//!
//!   1. `prepare()` -- run the UI, produce tessellated primitives
//!   2. `upload()`  -- upload textures and update GPU buffers
//!   3. `paint()`   -- draw into a render pass made with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui no longer references
//!
//! Sprite textures are registered through `ctx()` and reach the GPU in the
//! same `upload()` step as egui's own font atlas. egui learns the device's
//! texture size limit here, so callers can check it via `ctx().input()`.

use winit::window::Window;

use crate::panels::{show_form, show_stage, FormActions, FormInputs, FormView, StageView};

pub struct UiShell {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub inputs: FormInputs,
}

impl UiShell {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
        inputs: FormInputs,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        // Without this egui caps textures at 2048 px.
        let max_texture_side = device.limits().max_texture_dimension_2d as usize;
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            Some(max_texture_side),
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            inputs,
        }
    }

    pub fn ctx(&self) -> &egui::Context {
        &self.egui_ctx
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        if response.repaint {
            window.request_redraw();
        }
        response.consumed
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        form: &FormView<'_>,
        stage: &StageView,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        FormActions,
    ) {
        let mut actions = FormActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let inputs = &mut self.inputs;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            show_form(ctx, inputs, form, &mut actions);
            show_stage(ctx, stage);
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Render into an existing render pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures that egui no longer needs. Call after rendering.
    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
