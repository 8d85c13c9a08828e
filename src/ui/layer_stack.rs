//! Retained layer toolkit
//!
//! Keeps windows, layers, fonts and bitmaps in fixed slot tables and renders
//! the top window of the window stack to any `embedded-graphics` target.
//! Handles are slot indices; a slot is reused once its object is released.

use core::array;

use embedded_graphics::{
    image::Image,
    mono_font::MonoTextStyleBuilder,
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::Rectangle,
};
use embedded_text::{
    alignment::{HorizontalAlignment, VerticalAlignment},
    style::TextBoxStyleBuilder,
    TextBox,
};
use heapless::{String, Vec};

use super::{
    BitmapId, ColorMode, FontId, FontResource, ImageResource, LayerId, LayerKind,
    LayerUpdateProc, TextAlignment, Toolkit, WindowId,
};
use crate::Error;

pub const MAX_WINDOWS: usize = 2;
pub const MAX_LAYERS: usize = 16;
pub const MAX_FONTS: usize = 8;
pub const MAX_BITMAPS: usize = 4;
/// Longest text a text layer keeps
pub const TEXT_CAPACITY: usize = 32;

struct Window {
    root: LayerId,
    background: ColorMode,
}

struct Layer {
    frame: Rectangle,
    kind: LayerKind,
    hidden: bool,
    parent: Option<LayerId>,
    children: Vec<LayerId, MAX_LAYERS>,
    text: String<TEXT_CAPACITY>,
}

pub struct LayerStack {
    size: Size,
    windows: [Option<Window>; MAX_WINDOWS],
    layers: [Option<Layer>; MAX_LAYERS],
    fonts: [Option<FontResource>; MAX_FONTS],
    bitmaps: [Option<ImageResource>; MAX_BITMAPS],
    stack: Vec<WindowId, MAX_WINDOWS>,
    dirty: bool,
}

/// Index of the first free slot
fn vacant<T>(slots: &[Option<T>]) -> Result<u8, Error> {
    slots
        .iter()
        .position(Option::is_none)
        .map(|index| index as u8)
        .ok_or(Error::Exhausted)
}

impl LayerStack {
    /// Create an empty toolkit for a screen of the given size
    pub fn new(size: Size) -> Self {
        Self {
            size,
            windows: array::from_fn(|_| None),
            layers: array::from_fn(|_| None),
            fonts: [None; MAX_FONTS],
            bitmaps: [None; MAX_BITMAPS],
            stack: Vec::new(),
            dirty: false,
        }
    }

    /// Whether anything changed since the last render
    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    pub fn top_window(&self) -> Option<WindowId> {
        self.stack.last().copied()
    }

    pub fn is_hidden(&self, layer: LayerId) -> Result<bool, Error> {
        Ok(self.layer(layer)?.hidden)
    }

    pub fn text(&self, layer: LayerId) -> Result<&str, Error> {
        let layer = self.layer(layer)?;
        match layer.kind {
            LayerKind::Text(_) => Ok(layer.text.as_str()),
            _ => Err(Error::WrongLayerKind),
        }
    }

    pub fn frame(&self, layer: LayerId) -> Result<Rectangle, Error> {
        Ok(self.layer(layer)?.frame)
    }

    pub fn children(&self, layer: LayerId) -> Result<&[LayerId], Error> {
        Ok(&self.layer(layer)?.children)
    }

    /// Number of live layers, fonts and bitmaps
    pub fn live_objects(&self) -> usize {
        self.layers.iter().flatten().count()
            + self.fonts.iter().flatten().count()
            + self.bitmaps.iter().flatten().count()
    }

    /// Draw the top window and clear the dirty flag.
    ///
    /// Children are drawn in the order they were added; hidden layers and
    /// everything below them are skipped. Custom layers are drawn by `procs`.
    pub fn render<D, P>(&mut self, target: &mut D, procs: &P) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = ColorMode>,
        P: LayerUpdateProc,
    {
        let Some((root, background)) = self
            .top_window()
            .and_then(|id| self.window(id).ok())
            .map(|window| (window.root, window.background))
        else {
            return Ok(());
        };
        if let Ok(layer) = self.layer(root) {
            target.fill_solid(&layer.frame, background)?;
        }
        self.draw_layer(root, target, procs)?;
        self.dirty = false;
        Ok(())
    }

    fn draw_layer<D, P>(&self, id: LayerId, target: &mut D, procs: &P) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = ColorMode>,
        P: LayerUpdateProc,
    {
        let Ok(layer) = self.layer(id) else {
            return Ok(());
        };
        if layer.hidden {
            return Ok(());
        }

        match layer.kind {
            LayerKind::Bitmap(bitmap) => {
                if let Some(resource) = self.bitmaps[bitmap.0 as usize] {
                    let image = resource.image();
                    let offset = (layer.frame.size.component_max(image.size()) - image.size()) / 2;
                    let position = layer.frame.top_left + offset;
                    let mut clipped = target.clipped(&layer.frame);
                    let mut converted = clipped.color_converted::<BinaryColor>();
                    Image::new(&image, position).draw(&mut converted)?;
                }
            }
            LayerKind::Text(style) => {
                if let Some(font) = self.fonts[style.font.0 as usize] {
                    let mut character_style = MonoTextStyleBuilder::new()
                        .font(font.font())
                        .text_color(style.color);
                    if let Some(background) = style.background {
                        character_style = character_style.background_color(background);
                    }
                    let textbox_style = TextBoxStyleBuilder::new()
                        .alignment(match style.alignment {
                            TextAlignment::Left => HorizontalAlignment::Left,
                            TextAlignment::Center => HorizontalAlignment::Center,
                            TextAlignment::Right => HorizontalAlignment::Right,
                        })
                        .vertical_alignment(VerticalAlignment::Top)
                        .build();
                    TextBox::with_textbox_style(
                        &layer.text,
                        layer.frame,
                        character_style.build(),
                        textbox_style,
                    )
                    .draw(target)?;
                }
            }
            LayerKind::Custom => procs.update(id, layer.frame, target)?,
        }

        for child in layer.children.iter() {
            self.draw_layer(*child, target, procs)?;
        }
        Ok(())
    }

    fn window(&self, id: WindowId) -> Result<&Window, Error> {
        self.windows
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::StaleHandle)
    }

    fn layer(&self, id: LayerId) -> Result<&Layer, Error> {
        self.layers
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::StaleHandle)
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, Error> {
        self.layers
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(Error::StaleHandle)
    }

    fn new_layer(&mut self, frame: Rectangle, kind: LayerKind) -> Result<LayerId, Error> {
        let id = LayerId(vacant(&self.layers)?);
        self.layers[id.0 as usize] = Some(Layer {
            frame,
            kind,
            hidden: false,
            parent: None,
            children: Vec::new(),
            text: String::new(),
        });
        Ok(id)
    }

    fn remove_layer(&mut self, id: LayerId) -> Result<(), Error> {
        let layer = self
            .layers
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(Error::StaleHandle)?;
        if let Some(parent) = layer.parent {
            if let Ok(parent) = self.layer_mut(parent) {
                parent.children.retain(|child| *child != id);
            }
        }
        for child in layer.children {
            if let Ok(child) = self.layer_mut(child) {
                child.parent = None;
            }
        }
        self.dirty = true;
        Ok(())
    }
}

impl Toolkit for LayerStack {
    fn window_create(&mut self, background: ColorMode) -> Result<WindowId, Error> {
        let id = WindowId(vacant(&self.windows)?);
        let bounds = Rectangle::new(Point::zero(), self.size);
        let root = self.new_layer(bounds, LayerKind::Custom)?;
        self.windows[id.0 as usize] = Some(Window { root, background });
        Ok(id)
    }

    fn window_root_layer(&self, window: WindowId) -> Result<LayerId, Error> {
        Ok(self.window(window)?.root)
    }

    fn window_bounds(&self, window: WindowId) -> Result<Rectangle, Error> {
        let root = self.window(window)?.root;
        Ok(self.layer(root)?.frame)
    }

    fn window_stack_push(&mut self, window: WindowId) -> Result<(), Error> {
        self.window(window)?;
        self.stack.retain(|id| *id != window);
        self.stack.push(window).map_err(|_| Error::Exhausted)?;
        self.dirty = true;
        Ok(())
    }

    fn window_stack_remove(&mut self, window: WindowId) -> Result<(), Error> {
        self.window(window)?;
        self.stack.retain(|id| *id != window);
        self.dirty = true;
        Ok(())
    }

    fn window_destroy(&mut self, window: WindowId) -> Result<(), Error> {
        let root = self.window(window)?.root;
        if self.stack.contains(&window) {
            return Err(Error::WindowOnStack);
        }
        if !self.layer(root)?.children.is_empty() {
            return Err(Error::WindowNotEmpty);
        }
        self.remove_layer(root)?;
        self.windows[window.0 as usize] = None;
        Ok(())
    }

    fn font_load(&mut self, resource: FontResource) -> Result<FontId, Error> {
        let id = FontId(vacant(&self.fonts)?);
        self.fonts[id.0 as usize] = Some(resource);
        debug!("Loaded font {:?} as {}", resource, id.0);
        Ok(id)
    }

    fn font_unload(&mut self, font: FontId) -> Result<(), Error> {
        if self.fonts.get(font.0 as usize).copied().flatten().is_none() {
            return Err(Error::StaleHandle);
        }
        let in_use = self.layers.iter().flatten().any(
            |layer| matches!(layer.kind, LayerKind::Text(style) if style.font == font),
        );
        if in_use {
            return Err(Error::ResourceInUse);
        }
        self.fonts[font.0 as usize] = None;
        Ok(())
    }

    fn bitmap_create(&mut self, resource: ImageResource) -> Result<BitmapId, Error> {
        let id = BitmapId(vacant(&self.bitmaps)?);
        self.bitmaps[id.0 as usize] = Some(resource);
        debug!("Created bitmap {:?} as {}", resource, id.0);
        Ok(id)
    }

    fn bitmap_destroy(&mut self, bitmap: BitmapId) -> Result<(), Error> {
        if self.bitmaps.get(bitmap.0 as usize).copied().flatten().is_none() {
            return Err(Error::StaleHandle);
        }
        let in_use = self
            .layers
            .iter()
            .flatten()
            .any(|layer| layer.kind == LayerKind::Bitmap(bitmap));
        if in_use {
            return Err(Error::ResourceInUse);
        }
        self.bitmaps[bitmap.0 as usize] = None;
        Ok(())
    }

    fn layer_create(&mut self, frame: Rectangle, kind: LayerKind) -> Result<LayerId, Error> {
        let resource_loaded = match kind {
            LayerKind::Bitmap(bitmap) => self.bitmaps.get(bitmap.0 as usize).copied().flatten().is_some(),
            LayerKind::Text(style) => self.fonts.get(style.font.0 as usize).copied().flatten().is_some(),
            LayerKind::Custom => true,
        };
        if !resource_loaded {
            return Err(Error::StaleHandle);
        }
        self.new_layer(frame, kind)
    }

    fn layer_add_child(&mut self, parent: LayerId, child: LayerId) -> Result<(), Error> {
        if parent == child {
            return Err(Error::AlreadyAttached);
        }
        self.layer(parent)?;
        let layer = self.layer_mut(child)?;
        if layer.parent.is_some() {
            return Err(Error::AlreadyAttached);
        }
        layer.parent = Some(parent);
        self.layer_mut(parent)?
            .children
            .push(child)
            .map_err(|_| Error::Exhausted)?;
        self.dirty = true;
        Ok(())
    }

    fn layer_destroy(&mut self, layer: LayerId) -> Result<(), Error> {
        let is_root = self.windows.iter().flatten().any(|window| window.root == layer);
        if is_root {
            return Err(Error::WrongLayerKind);
        }
        self.remove_layer(layer)
    }

    fn layer_set_hidden(&mut self, layer: LayerId, hidden: bool) -> Result<(), Error> {
        let layer = self.layer_mut(layer)?;
        if layer.hidden != hidden {
            layer.hidden = hidden;
            self.dirty = true;
        }
        Ok(())
    }

    fn layer_mark_dirty(&mut self, layer: LayerId) -> Result<(), Error> {
        self.layer(layer)?;
        self.dirty = true;
        Ok(())
    }

    fn text_layer_set_text(&mut self, layer: LayerId, text: &str) -> Result<(), Error> {
        let layer = self.layer_mut(layer)?;
        if !matches!(layer.kind, LayerKind::Text(_)) {
            return Err(Error::WrongLayerKind);
        }
        if layer.text != text {
            layer.text.clear();
            for c in text.chars() {
                if layer.text.push(c).is_err() {
                    break;
                }
            }
            self.dirty = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::TextStyle;
    use embedded_graphics::mock_display::MockDisplay;

    struct FillProc(LayerId);

    impl LayerUpdateProc for FillProc {
        fn update<D>(&self, layer: LayerId, bounds: Rectangle, ctx: &mut D) -> Result<(), D::Error>
        where
            D: DrawTarget<Color = ColorMode>,
        {
            if layer == self.0 {
                ctx.fill_solid(&bounds, ColorMode::RED)?;
            }
            Ok(())
        }
    }

    fn text_style(font: FontId) -> LayerKind {
        LayerKind::Text(TextStyle {
            font,
            color: ColorMode::WHITE,
            background: None,
            alignment: TextAlignment::Center,
        })
    }

    fn frame() -> Rectangle {
        Rectangle::new(Point::new(0, 0), Size::new(20, 10))
    }

    #[test]
    fn font_cannot_be_unloaded_while_a_layer_uses_it() {
        let mut stack = LayerStack::new(Size::new(64, 64));
        let font = stack.font_load(FontResource::Small).unwrap();
        let label = stack.layer_create(frame(), text_style(font)).unwrap();

        assert_eq!(stack.font_unload(font), Err(Error::ResourceInUse));
        stack.layer_destroy(label).unwrap();
        assert_eq!(stack.font_unload(font), Ok(()));
        assert_eq!(stack.font_unload(font), Err(Error::StaleHandle));
    }

    #[test]
    fn bitmap_cannot_be_destroyed_while_shown() {
        let mut stack = LayerStack::new(Size::new(64, 64));
        let bitmap = stack.bitmap_create(ImageResource::BluetoothIcon).unwrap();
        let icon = stack.layer_create(frame(), LayerKind::Bitmap(bitmap)).unwrap();

        assert_eq!(stack.bitmap_destroy(bitmap), Err(Error::ResourceInUse));
        stack.layer_destroy(icon).unwrap();
        assert_eq!(stack.bitmap_destroy(bitmap), Ok(()));
    }

    #[test]
    fn layers_need_loaded_resources() {
        let mut stack = LayerStack::new(Size::new(64, 64));
        assert_eq!(
            stack.layer_create(frame(), text_style(FontId(3))),
            Err(Error::StaleHandle)
        );
        assert_eq!(
            stack.layer_create(frame(), LayerKind::Bitmap(BitmapId(0))),
            Err(Error::StaleHandle)
        );
    }

    #[test]
    fn window_is_destroyed_only_when_empty_and_off_stack() {
        let mut stack = LayerStack::new(Size::new(64, 64));
        let window = stack.window_create(ColorMode::BLACK).unwrap();
        let root = stack.window_root_layer(window).unwrap();
        let child = stack.layer_create(frame(), LayerKind::Custom).unwrap();
        stack.layer_add_child(root, child).unwrap();
        stack.window_stack_push(window).unwrap();

        assert_eq!(stack.window_destroy(window), Err(Error::WindowOnStack));
        stack.window_stack_remove(window).unwrap();
        assert_eq!(stack.window_destroy(window), Err(Error::WindowNotEmpty));

        stack.layer_destroy(child).unwrap();
        assert!(stack.children(root).unwrap().is_empty());
        assert_eq!(stack.window_destroy(window), Ok(()));
        assert_eq!(stack.live_objects(), 0);
    }

    #[test]
    fn root_layer_is_owned_by_its_window() {
        let mut stack = LayerStack::new(Size::new(64, 64));
        let window = stack.window_create(ColorMode::BLACK).unwrap();
        let root = stack.window_root_layer(window).unwrap();
        assert_eq!(stack.layer_destroy(root), Err(Error::WrongLayerKind));
    }

    #[test]
    fn layer_has_a_single_parent() {
        let mut stack = LayerStack::new(Size::new(64, 64));
        let a = stack.layer_create(frame(), LayerKind::Custom).unwrap();
        let b = stack.layer_create(frame(), LayerKind::Custom).unwrap();
        let c = stack.layer_create(frame(), LayerKind::Custom).unwrap();
        stack.layer_add_child(a, c).unwrap();
        assert_eq!(stack.layer_add_child(b, c), Err(Error::AlreadyAttached));
        assert_eq!(stack.layer_add_child(a, a), Err(Error::AlreadyAttached));
    }

    #[test]
    fn slots_run_out() {
        let mut stack = LayerStack::new(Size::new(64, 64));
        for _ in 0..MAX_FONTS {
            stack.font_load(FontResource::Small).unwrap();
        }
        assert_eq!(stack.font_load(FontResource::Small), Err(Error::Exhausted));
    }

    #[test]
    fn text_changes_mark_the_stack_dirty() {
        let mut stack = LayerStack::new(Size::new(64, 64));
        let font = stack.font_load(FontResource::Small).unwrap();
        let label = stack.layer_create(frame(), text_style(font)).unwrap();
        assert!(!stack.needs_redraw());

        stack.text_layer_set_text(label, "12:00").unwrap();
        assert!(stack.needs_redraw());
        assert_eq!(stack.text(label).unwrap(), "12:00");

        let custom = stack.layer_create(frame(), LayerKind::Custom).unwrap();
        assert_eq!(
            stack.text_layer_set_text(custom, "x"),
            Err(Error::WrongLayerKind)
        );
    }

    #[test]
    fn text_longer_than_capacity_is_cut() {
        let mut stack = LayerStack::new(Size::new(64, 64));
        let font = stack.font_load(FontResource::Small).unwrap();
        let label = stack.layer_create(frame(), text_style(font)).unwrap();
        let long = "0123456789".repeat(4);
        stack.text_layer_set_text(label, &long).unwrap();
        assert_eq!(stack.text(label).unwrap(), &long[..TEXT_CAPACITY]);
    }

    #[test]
    fn renders_custom_layers_and_skips_hidden_ones() {
        let mut stack = LayerStack::new(Size::new(4, 2));
        let window = stack.window_create(ColorMode::BLACK).unwrap();
        let root = stack.window_root_layer(window).unwrap();
        let bar = stack
            .layer_create(Rectangle::new(Point::new(1, 0), Size::new(2, 1)), LayerKind::Custom)
            .unwrap();
        stack.layer_add_child(root, bar).unwrap();
        stack.window_stack_push(window).unwrap();

        let mut display = MockDisplay::new();
        display.set_allow_overdraw(true);
        stack.render(&mut display, &FillProc(bar)).unwrap();
        display.assert_pattern(&["KRRK", "KKKK"]);
        assert!(!stack.needs_redraw());

        stack.layer_set_hidden(bar, true).unwrap();
        assert!(stack.needs_redraw());
        let mut display = MockDisplay::new();
        display.set_allow_overdraw(true);
        stack.render(&mut display, &FillProc(bar)).unwrap();
        display.assert_pattern(&["KKKK", "KKKK"]);
    }
}
