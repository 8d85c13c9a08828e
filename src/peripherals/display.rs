//! Display control module for PineTime

use embassy_nrf::{
    gpio::Output,
    peripherals::{P0_18, P0_25, P0_26},
    spim::{self, Spim},
};

use display_interface_spi::SPIInterface;
use embassy_time::Delay;
use mipidsi::{models::ST7789, Builder, Orientation};

use pinetime_watchface::ui::{layer_stack::LayerStack, LayerUpdateProc};

pub const LCD_W: u16 = 240;
pub const LCD_H: u16 = 240;

type Lcd<'a, SPI> = mipidsi::Display<
    SPIInterface<Spim<'a, SPI>, Output<'a, P0_18>, Output<'a, P0_25>>,
    ST7789,
    Output<'a, P0_26>,
>;

/// ST7789 panel driven over SPI
pub struct Display<'a, SPI>
where
    SPI: spim::Instance,
{
    lcd: Lcd<'a, SPI>,
}

impl<'a, SPI> Display<'a, SPI>
where
    SPI: spim::Instance,
{
    /// Reset and configure the panel
    pub fn init(
        spim: Spim<'a, SPI>,
        cs: Output<'a, P0_25>,
        dc: Output<'a, P0_18>,
        rst: Output<'a, P0_26>,
    ) -> Result<Self, Error> {
        let lcd = Builder::st7789(SPIInterface::new(spim, dc, cs))
            .with_display_size(LCD_W, LCD_H)
            .with_orientation(Orientation::Portrait(false))
            .init(&mut Delay, Some(rst))
            .map_err(|_| Error::Init)?;
        Ok(Self { lcd })
    }

    /// Draw the top window of the layer stack
    pub fn render<P: LayerUpdateProc>(
        &mut self,
        stack: &mut LayerStack,
        procs: &P,
    ) -> Result<(), Error> {
        stack.render(&mut self.lcd, procs).map_err(|_| Error::Bus)
    }
}

#[derive(Debug, defmt::Format)]
pub enum Error {
    /// Panel did not accept the init sequence
    Init,
    /// SPI transfer failed while drawing
    Bus,
}
