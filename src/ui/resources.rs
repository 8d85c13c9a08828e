//! Font and image resources
//!
//! Fonts are compiled in. The images are 1 bit per pixel and rendered by the
//! build script into the output directory.

use embedded_graphics::{
    image::ImageRaw,
    mono_font::{ascii::FONT_10X20, MonoFont},
    pixelcolor::BinaryColor,
};
use profont::PROFONT_24_POINT;

const BACKGROUND_WIDTH: u32 = 240;
const BT_ICON_WIDTH: u32 = 14;

static BACKGROUND: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/background.raw"));
static BT_ICON: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/bt_icon.raw"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FontResource {
    /// Large digits for the clock
    Large,
    /// Date and weather lines
    Small,
}

impl FontResource {
    pub fn font(self) -> &'static MonoFont<'static> {
        match self {
            FontResource::Large => &PROFONT_24_POINT,
            FontResource::Small => &FONT_10X20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageResource {
    /// Full screen background
    Background,
    /// Shown while the phone is disconnected
    BluetoothIcon,
}

impl ImageResource {
    pub fn image(self) -> ImageRaw<'static, BinaryColor> {
        match self {
            ImageResource::Background => ImageRaw::new(BACKGROUND, BACKGROUND_WIDTH),
            ImageResource::BluetoothIcon => ImageRaw::new(BT_ICON, BT_ICON_WIDTH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::*;

    #[test]
    fn background_covers_the_screen() {
        assert_eq!(ImageResource::Background.image().size(), Size::new(240, 240));
    }

    #[test]
    fn bluetooth_icon_fits_its_layer() {
        let size = ImageResource::BluetoothIcon.image().size();
        assert_eq!(size, Size::new(14, 17));
    }
}
