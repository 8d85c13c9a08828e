//! Battery bar drawing

use embedded_graphics::{
    pixelcolor::RgbColor,
    prelude::{DrawTarget, Size},
    primitives::Rectangle,
};

use super::ColorMode;

const EMPTY_COLOR: ColorMode = ColorMode::BLACK;
const FILLED_COLOR: ColorMode = ColorMode::WHITE;

/// Width of the filled part of a bar `full_width` pixels wide.
///
/// Percentages above 100 count as full.
pub fn bar_width(percent: u8, full_width: u32) -> u32 {
    u32::from(percent.min(100)) * full_width / 100
}

/// Paint the whole bar empty, then the charged part from the left.
pub fn draw_battery_bar<D>(ctx: &mut D, bounds: Rectangle, percent: u8) -> Result<(), D::Error>
where
    D: DrawTarget<Color = ColorMode>,
{
    ctx.fill_solid(&bounds, EMPTY_COLOR)?;

    let filled = Size::new(bar_width(percent, bounds.size.width), bounds.size.height);
    ctx.fill_solid(&Rectangle::new(bounds.top_left, filled), FILLED_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::{mock_display::MockDisplay, prelude::Point};

    #[test]
    fn width_is_proportional_and_rounded_down() {
        assert_eq!(bar_width(50, 114), 57);
        assert_eq!(bar_width(0, 114), 0);
        assert_eq!(bar_width(100, 114), 114);
        assert_eq!(bar_width(1, 114), 1);
        assert_eq!(bar_width(99, 114), 112);
        assert_eq!(bar_width(33, 10), 3);
    }

    #[test]
    fn width_never_exceeds_the_bar() {
        for percent in 0..=u8::MAX {
            assert!(bar_width(percent, 114) <= 114);
        }
        assert_eq!(bar_width(150, 114), 114);
    }

    #[test]
    fn draws_filled_part_left_aligned() {
        let mut display = MockDisplay::<ColorMode>::new();
        display.set_allow_overdraw(true);

        let bounds = Rectangle::new(Point::new(1, 1), Size::new(10, 2));
        draw_battery_bar(&mut display, bounds, 40).unwrap();

        display.assert_pattern(&[
            "            ",
            " WWWWKKKKKK ",
            " WWWWKKKKKK ",
        ]);
    }

    #[test]
    fn empty_battery_draws_only_background() {
        let mut display = MockDisplay::<ColorMode>::new();
        display.set_allow_overdraw(true);

        draw_battery_bar(&mut display, Rectangle::new(Point::zero(), Size::new(4, 1)), 0).unwrap();

        display.assert_pattern(&["KKKK"]);
    }
}
