//! Widget placement for rectangular and round screens

use embedded_graphics::{
    geometry::{Point, Size},
    primitives::Rectangle,
};

const MONTH_TOP: i32 = 0;
const MONTH_TOP_ROUND: i32 = 6;
const MONTH_HEIGHT: u32 = 25;

const DAY_TOP: i32 = 24;
const DAY_TOP_ROUND: i32 = 30;
const DAY_HEIGHT: u32 = 25;

const TIME_TOP: i32 = 52;
const TIME_TOP_ROUND: i32 = 58;
const TIME_HEIGHT: u32 = 50;

const WEATHER_TOP: i32 = 116;
const WEATHER_TOP_ROUND: i32 = 122;
const WEATHER_HEIGHT: u32 = 25;

const BATTERY_TOP: i32 = 53;
const BATTERY_TOP_ROUND: i32 = 59;
pub const BATTERY_WIDTH: u32 = 114;
const BATTERY_HEIGHT: u32 = 2;

const BLUETOOTH_TOP: i32 = 138;
const BLUETOOTH_TOP_ROUND: i32 = 144;
const BLUETOOTH_SIZE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScreenShape {
    Rect,
    Round,
}

impl ScreenShape {
    /// Shape of the screen this build targets
    pub const DEVICE: Self = if cfg!(feature = "round") {
        ScreenShape::Round
    } else {
        ScreenShape::Rect
    };
}

/// Frames of every widget on the watchface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub background: Rectangle,
    pub time: Rectangle,
    pub day: Rectangle,
    pub month: Rectangle,
    pub weather: Rectangle,
    pub battery: Rectangle,
    pub bluetooth: Rectangle,
}

impl Layout {
    /// Place the widgets inside `bounds`.
    ///
    /// Text lines span the full width. The battery bar and the Bluetooth icon
    /// are centred horizontally. Only the vertical offsets depend on `shape`.
    pub fn for_shape(shape: ScreenShape, bounds: Rectangle) -> Self {
        let round = shape == ScreenShape::Round;
        let pick = |rect: i32, round_top: i32| if round { round_top } else { rect };
        let width = bounds.size.width;
        let line = |top: i32, height: u32| {
            Rectangle::new(bounds.top_left + Point::new(0, top), Size::new(width, height))
        };
        let centred = |top: i32, size: Size| {
            let size = Size::new(size.width.min(width), size.height);
            let left = ((width - size.width) / 2) as i32;
            Rectangle::new(bounds.top_left + Point::new(left, top), size)
        };

        Self {
            background: bounds,
            time: line(pick(TIME_TOP, TIME_TOP_ROUND), TIME_HEIGHT),
            day: line(pick(DAY_TOP, DAY_TOP_ROUND), DAY_HEIGHT),
            month: line(pick(MONTH_TOP, MONTH_TOP_ROUND), MONTH_HEIGHT),
            weather: line(pick(WEATHER_TOP, WEATHER_TOP_ROUND), WEATHER_HEIGHT),
            battery: centred(
                pick(BATTERY_TOP, BATTERY_TOP_ROUND),
                Size::new(BATTERY_WIDTH, BATTERY_HEIGHT),
            ),
            bluetooth: centred(
                pick(BLUETOOTH_TOP, BLUETOOTH_TOP_ROUND),
                Size::new(BLUETOOTH_SIZE, BLUETOOTH_SIZE),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Rectangle {
        Rectangle::new(Point::zero(), Size::new(240, 240))
    }

    #[test]
    fn round_preset_only_moves_widgets_down() {
        let rect = Layout::for_shape(ScreenShape::Rect, screen());
        let round = Layout::for_shape(ScreenShape::Round, screen());

        for (a, b) in [
            (rect.time, round.time),
            (rect.day, round.day),
            (rect.month, round.month),
            (rect.weather, round.weather),
            (rect.battery, round.battery),
            (rect.bluetooth, round.bluetooth),
        ] {
            assert_eq!(a.size, b.size);
            assert_eq!(a.top_left.x, b.top_left.x);
            assert_eq!(b.top_left.y - a.top_left.y, 6);
        }
        assert_eq!(rect.background, round.background);
    }

    #[test]
    fn rect_preset_offsets() {
        let layout = Layout::for_shape(ScreenShape::Rect, screen());
        assert_eq!(layout.month, Rectangle::new(Point::new(0, 0), Size::new(240, 25)));
        assert_eq!(layout.day, Rectangle::new(Point::new(0, 24), Size::new(240, 25)));
        assert_eq!(layout.time, Rectangle::new(Point::new(0, 52), Size::new(240, 50)));
        assert_eq!(layout.weather, Rectangle::new(Point::new(0, 116), Size::new(240, 25)));
        assert_eq!(layout.battery, Rectangle::new(Point::new(63, 53), Size::new(114, 2)));
        assert_eq!(layout.bluetooth, Rectangle::new(Point::new(105, 138), Size::new(30, 30)));
    }

    #[test]
    fn narrow_screen_keeps_widgets_inside() {
        let bounds = Rectangle::new(Point::zero(), Size::new(100, 100));
        let layout = Layout::for_shape(ScreenShape::Rect, bounds);
        assert_eq!(layout.battery, Rectangle::new(Point::new(0, 53), Size::new(100, 2)));
        // Narrower than the screen, so still centred
        assert_eq!(layout.bluetooth.top_left.x, 35);
        for widget in [layout.battery, layout.bluetooth] {
            let right = widget.top_left.x + widget.size.width as i32;
            assert!(right <= 100, "{widget:?} ends at x {right}");
        }
    }
}
