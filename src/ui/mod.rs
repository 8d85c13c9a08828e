//! UI definitions module
//!
//! The watchface never draws directly. It builds a tree of layers through a
//! [`Toolkit`] and reacts to host events through the callback interfaces
//! below. The host delivers callbacks one at a time from a single task.

use chrono::NaiveDateTime;
use embedded_graphics::{pixelcolor::Rgb565, prelude::DrawTarget, primitives::Rectangle};

use crate::{system::message::AppMessageResult, Error};

pub mod battery_bar;
pub mod label;
pub mod layer_stack;
pub mod layout;
pub mod resources;
pub mod watchface;

pub use resources::{FontResource, ImageResource};

/// Colour format of the ST7789 panel
pub type ColorMode = Rgb565;

/// Handle to a window created by the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WindowId(pub(crate) u8);

/// Handle to a layer created by the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerId(pub(crate) u8);

/// Handle to a loaded font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FontId(pub(crate) u8);

/// Handle to a loaded bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitmapId(pub(crate) u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlignment {
    Left,
    Center,
    Right,
}

/// Appearance of a text layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub font: FontId,
    pub color: ColorMode,
    /// `None` leaves whatever is below the layer visible
    pub background: Option<ColorMode>,
    pub alignment: TextAlignment,
}

/// What a layer shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Shows a bitmap centred in the layer frame
    Bitmap(BitmapId),
    /// Shows a single line of text
    Text(TextStyle),
    /// Drawn by the [`LayerUpdateProc`] passed to the renderer
    Custom,
}

/// Battery state as reported by the power service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryChargeState {
    /// Charge in percent (0–100)
    pub charge_percent: u8,
    pub is_charging: bool,
}

/// Retained-mode window and layer services.
///
/// Frames are in screen coordinates. Text passed to [`Toolkit::text_layer_set_text`]
/// is copied, so callers may reuse their buffers.
pub trait Toolkit {
    fn window_create(&mut self, background: ColorMode) -> Result<WindowId, Error>;
    fn window_root_layer(&self, window: WindowId) -> Result<LayerId, Error>;
    fn window_bounds(&self, window: WindowId) -> Result<Rectangle, Error>;
    fn window_stack_push(&mut self, window: WindowId) -> Result<(), Error>;
    fn window_stack_remove(&mut self, window: WindowId) -> Result<(), Error>;
    /// Fails while the window is on the stack or its root still has children.
    fn window_destroy(&mut self, window: WindowId) -> Result<(), Error>;

    fn font_load(&mut self, resource: FontResource) -> Result<FontId, Error>;
    /// Fails while a live text layer still uses the font.
    fn font_unload(&mut self, font: FontId) -> Result<(), Error>;

    fn bitmap_create(&mut self, resource: ImageResource) -> Result<BitmapId, Error>;
    /// Fails while a live bitmap layer still shows the bitmap.
    fn bitmap_destroy(&mut self, bitmap: BitmapId) -> Result<(), Error>;

    fn layer_create(&mut self, frame: Rectangle, kind: LayerKind) -> Result<LayerId, Error>;
    fn layer_add_child(&mut self, parent: LayerId, child: LayerId) -> Result<(), Error>;
    fn layer_destroy(&mut self, layer: LayerId) -> Result<(), Error>;
    fn layer_set_hidden(&mut self, layer: LayerId, hidden: bool) -> Result<(), Error>;
    /// Schedule a redraw of the layer; nothing is drawn synchronously.
    fn layer_mark_dirty(&mut self, layer: LayerId) -> Result<(), Error>;
    fn text_layer_set_text(&mut self, layer: LayerId, text: &str) -> Result<(), Error>;
}

/// Draws [`LayerKind::Custom`] layers.
pub trait LayerUpdateProc {
    fn update<D>(&self, layer: LayerId, bounds: Rectangle, ctx: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = ColorMode>;
}

/// Services the runtime offers to the watchface.
pub trait Host {
    type Toolkit: Toolkit;

    fn toolkit(&mut self) -> &mut Self::Toolkit;

    /// User preference for the clock format
    fn clock_is_24h_style(&self) -> bool;

    /// Issue a double-pulse vibration. Must not block.
    fn vibes_double_pulse(&mut self);

    /// Queue a dictionary for the companion app. Delivery is reported later
    /// through [`AppMessageHandlers`].
    fn outbox_send(&mut self, payload: &[u8]) -> Result<(), AppMessageResult>;
}

/// Window load/unload
pub trait WindowHandlers<H: Host> {
    fn load(&mut self, host: &mut H, window: WindowId) -> Result<(), Error>;
    fn unload(&mut self, host: &mut H, window: WindowId) -> Result<(), Error>;
}

/// Minute tick
pub trait TickHandler<H: Host> {
    fn on_tick(&mut self, host: &mut H, now: &NaiveDateTime);
}

/// Companion app messaging
pub trait AppMessageHandlers<H: Host> {
    fn inbox_received(&mut self, host: &mut H, payload: &[u8]);
    fn inbox_dropped(&mut self, reason: AppMessageResult);
    fn outbox_sent(&mut self);
    fn outbox_failed(&mut self, reason: AppMessageResult);
}

/// Battery state changes
pub trait BatteryStateHandler<H: Host> {
    fn on_battery_change(&mut self, host: &mut H, state: BatteryChargeState);
}

/// Phone connectivity changes
pub trait ConnectionHandler<H: Host> {
    fn on_connection_change(&mut self, host: &mut H, connected: bool);
}
