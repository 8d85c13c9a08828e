//! Default watchface
//!
//! Background, time, day, month, weather line, battery bar and a Bluetooth
//! icon shown while the phone is away.

use chrono::{NaiveDateTime, Timelike};
use embedded_graphics::{pixelcolor::RgbColor, prelude::DrawTarget, primitives::Rectangle};
use heapless::Vec;

use super::{
    battery_bar::draw_battery_bar,
    label::{
        self, ClockStyle, DayText, MonthText, TimeText, WeatherText, DAY_PLACEHOLDER,
        MONTH_PLACEHOLDER, TIME_PLACEHOLDER, WEATHER_PLACEHOLDER,
    },
    layout::{Layout, ScreenShape},
    AppMessageHandlers, BatteryChargeState, BatteryStateHandler, BitmapId, ColorMode,
    ConnectionHandler, FontId, FontResource, Host, ImageResource, LayerId, LayerKind,
    LayerUpdateProc, TextAlignment, TextStyle, TickHandler, Toolkit, WindowHandlers, WindowId,
};
use crate::{
    system::{
        config::WatchfaceConfig,
        message::{self, AppMessageResult, Dictionary, KEY_CONDITIONS, KEY_TEMPERATURE, OUTBOX_SIZE},
    },
    Error,
};

/// Most handles acquired while loading the window
const MAX_ACQUIRED: usize = 16;

/// Something acquired during load that unload has to give back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Acquired {
    Font(FontId),
    Bitmap(BitmapId),
    Layer(LayerId),
}

/// Layers the event handlers update
#[derive(Debug, Clone, Copy)]
struct Widgets {
    time: LayerId,
    day: LayerId,
    month: LayerId,
    weather: LayerId,
    battery: LayerId,
    bluetooth: LayerId,
}

/// Outcome of an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WeatherUpdate {
    /// Both fields were present and the weather line changed
    Updated,
    /// A field was missing; the weather line is unchanged
    Ignored,
    /// The payload was not a dictionary
    Malformed,
}

/// Whether a tick at `minute` should ask the phone for weather
pub fn weather_due(minute: u32, refresh_minutes: u32) -> bool {
    refresh_minutes != 0 && minute % refresh_minutes == 0
}

pub struct Watchface {
    config: WatchfaceConfig,
    shape: ScreenShape,
    window: Option<WindowId>,
    widgets: Option<Widgets>,
    /// Load order; unload walks it backwards
    acquired: Vec<Acquired, MAX_ACQUIRED>,
    battery_level: u8,
    connected: Option<bool>,
    time_text: TimeText,
    day_text: DayText,
    month_text: MonthText,
    weather_text: WeatherText,
}

impl Watchface {
    pub fn new(config: WatchfaceConfig, shape: ScreenShape) -> Self {
        Self {
            config,
            shape,
            window: None,
            widgets: None,
            acquired: Vec::new(),
            battery_level: 0,
            connected: None,
            time_text: label::bounded(format_args!("{}", TIME_PLACEHOLDER)),
            day_text: label::bounded(format_args!("{}", DAY_PLACEHOLDER)),
            month_text: label::bounded(format_args!("{}", MONTH_PLACEHOLDER)),
            weather_text: label::bounded(format_args!("{}", WEATHER_PLACEHOLDER)),
        }
    }

    /// Create and show the main window, then sync it with the current state.
    ///
    /// Fails if any font or image cannot be loaded.
    pub fn init<H: Host>(
        host: &mut H,
        config: WatchfaceConfig,
        now: &NaiveDateTime,
        battery: BatteryChargeState,
        connected: bool,
    ) -> Result<Self, Error> {
        let mut watchface = Self::new(config, ScreenShape::DEVICE);

        let window = host.toolkit().window_create(ColorMode::BLACK)?;
        watchface.window = Some(window);
        if let Err(e) = host.toolkit().window_stack_push(window) {
            let _ = host.toolkit().window_destroy(window);
            return Err(e);
        }
        if let Err(e) = watchface.load(host, window) {
            let _ = host.toolkit().window_stack_remove(window);
            let _ = host.toolkit().window_destroy(window);
            return Err(e);
        }

        watchface.update_time(host, now);
        watchface.update_day(host, now);
        watchface.update_month(host, now);
        watchface.on_battery_change(host, battery);
        watchface.sync_connection(host, connected);

        info!("Watchface ready");
        Ok(watchface)
    }

    /// Hide the main window, release everything it holds and destroy it.
    pub fn deinit<H: Host>(mut self, host: &mut H) -> Result<(), Error> {
        let Some(window) = self.window.take() else {
            return Ok(());
        };
        host.toolkit().window_stack_remove(window)?;
        if self.widgets.is_some() {
            self.unload(host, window)?;
        }
        host.toolkit().window_destroy(window)
    }

    pub fn time_text(&self) -> &str {
        &self.time_text
    }

    pub fn day_text(&self) -> &str {
        &self.day_text
    }

    pub fn month_text(&self) -> &str {
        &self.month_text
    }

    pub fn weather_text(&self) -> &str {
        &self.weather_text
    }

    pub fn battery_level(&self) -> u8 {
        self.battery_level
    }

    /// Whether the Bluetooth icon is currently shown
    pub fn bluetooth_icon_visible(&self) -> bool {
        self.connected == Some(false)
    }

    pub fn update_time<H: Host>(&mut self, host: &mut H, now: &NaiveDateTime) {
        let style = ClockStyle::from_24h(host.clock_is_24h_style());
        self.time_text = label::format_time(now, style);
        if let Some(widgets) = self.widgets {
            report(host.toolkit().text_layer_set_text(widgets.time, &self.time_text));
        }
    }

    pub fn update_day<H: Host>(&mut self, host: &mut H, now: &NaiveDateTime) {
        self.day_text = label::format_day(now);
        if let Some(widgets) = self.widgets {
            report(host.toolkit().text_layer_set_text(widgets.day, &self.day_text));
        }
    }

    pub fn update_month<H: Host>(&mut self, host: &mut H, now: &NaiveDateTime) {
        self.month_text = label::format_month(now);
        if let Some(widgets) = self.widgets {
            report(host.toolkit().text_layer_set_text(widgets.month, &self.month_text));
        }
    }

    /// Ask the phone for weather if the tick falls on a refresh minute.
    ///
    /// Returns whether a request was handed to the outbox.
    pub fn update_weather<H: Host>(&mut self, host: &mut H, now: &NaiveDateTime) -> bool {
        if !weather_due(now.minute(), self.config.weather_refresh_minutes) {
            return false;
        }

        let mut buf = [0u8; OUTBOX_SIZE];
        let payload = match message::weather_request(&mut buf) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Cannot encode weather request: {:?}", e);
                return false;
            }
        };
        match host.outbox_send(payload) {
            Ok(()) => {
                debug!("Weather requested");
                true
            }
            Err(reason) => {
                outbox_failed(reason);
                false
            }
        }
    }

    /// Show the weather from an inbound dictionary if it has both fields.
    pub fn receive_weather<H: Host>(&mut self, host: &mut H, payload: &[u8]) -> WeatherUpdate {
        let dictionary = match Dictionary::parse(payload) {
            Ok(dictionary) => dictionary,
            Err(e) => {
                warn!("Inbound message is not a dictionary: {:?}", e);
                inbox_dropped(AppMessageResult::Malformed);
                return WeatherUpdate::Malformed;
            }
        };

        let temperature = dictionary
            .find(KEY_TEMPERATURE)
            .and_then(|tuple| tuple.value.as_i32());
        let conditions = dictionary
            .find(KEY_CONDITIONS)
            .and_then(|tuple| tuple.value.as_str());

        let (Some(temperature), Some(conditions)) = (temperature, conditions) else {
            debug!("Inbound message without weather ignored");
            return WeatherUpdate::Ignored;
        };

        self.weather_text = label::format_weather(temperature, conditions);
        if let Some(widgets) = self.widgets {
            report(host.toolkit().text_layer_set_text(widgets.weather, &self.weather_text));
        }
        info!("Weather: {}", self.weather_text.as_str());
        WeatherUpdate::Updated
    }

    /// Set the icon from the connection state at startup, without alerting.
    pub fn sync_connection<H: Host>(&mut self, host: &mut H, connected: bool) {
        self.show_connection(host, connected);
        self.connected = Some(connected);
    }

    fn show_connection<H: Host>(&mut self, host: &mut H, connected: bool) {
        if let Some(widgets) = self.widgets {
            // Show icon if disconnected
            report(host.toolkit().layer_set_hidden(widgets.bluetooth, connected));
        }
    }

    /// Build the widget tree. Everything acquired is recorded in order.
    fn build<T: Toolkit>(&mut self, toolkit: &mut T, window: WindowId) -> Result<Widgets, Error> {
        let root = toolkit.window_root_layer(window)?;
        let layout = Layout::for_shape(self.shape, toolkit.window_bounds(window)?);

        let background = self.bitmap(toolkit, ImageResource::Background)?;
        self.bitmap_layer(toolkit, root, layout.background, background)?;

        let time = self.text_layer(
            toolkit,
            root,
            layout.time,
            FontResource::Large,
            ColorMode::BLACK,
            &self.time_text.clone(),
        )?;
        let day = self.text_layer(
            toolkit,
            root,
            layout.day,
            FontResource::Small,
            ColorMode::WHITE,
            &self.day_text.clone(),
        )?;
        let month = self.text_layer(
            toolkit,
            root,
            layout.month,
            FontResource::Small,
            ColorMode::WHITE,
            &self.month_text.clone(),
        )?;
        let weather = self.text_layer(
            toolkit,
            root,
            layout.weather,
            FontResource::Small,
            ColorMode::WHITE,
            &self.weather_text.clone(),
        )?;

        let battery = toolkit.layer_create(layout.battery, LayerKind::Custom)?;
        self.record(Acquired::Layer(battery))?;
        toolkit.layer_add_child(root, battery)?;

        let icon = self.bitmap(toolkit, ImageResource::BluetoothIcon)?;
        let bluetooth = self.bitmap_layer(toolkit, root, layout.bluetooth, icon)?;
        // Hidden until the connection state says otherwise
        toolkit.layer_set_hidden(bluetooth, self.connected != Some(false))?;

        Ok(Widgets {
            time,
            day,
            month,
            weather,
            battery,
            bluetooth,
        })
    }

    fn bitmap<T: Toolkit>(&mut self, toolkit: &mut T, image: ImageResource) -> Result<BitmapId, Error> {
        let bitmap = toolkit.bitmap_create(image)?;
        self.record(Acquired::Bitmap(bitmap))?;
        Ok(bitmap)
    }

    fn bitmap_layer<T: Toolkit>(
        &mut self,
        toolkit: &mut T,
        root: LayerId,
        frame: Rectangle,
        bitmap: BitmapId,
    ) -> Result<LayerId, Error> {
        let layer = toolkit.layer_create(frame, LayerKind::Bitmap(bitmap))?;
        self.record(Acquired::Layer(layer))?;
        toolkit.layer_add_child(root, layer)?;
        Ok(layer)
    }

    /// Load the font, then the layer using it, so unload frees them the other way round.
    fn text_layer<T: Toolkit>(
        &mut self,
        toolkit: &mut T,
        root: LayerId,
        frame: Rectangle,
        font: FontResource,
        color: ColorMode,
        text: &str,
    ) -> Result<LayerId, Error> {
        let font = toolkit.font_load(font)?;
        self.record(Acquired::Font(font))?;

        let style = TextStyle {
            font,
            color,
            background: None,
            alignment: TextAlignment::Center,
        };
        let layer = toolkit.layer_create(frame, LayerKind::Text(style))?;
        self.record(Acquired::Layer(layer))?;
        toolkit.text_layer_set_text(layer, text)?;
        toolkit.layer_add_child(root, layer)?;
        Ok(layer)
    }

    fn record(&mut self, acquired: Acquired) -> Result<(), Error> {
        self.acquired.push(acquired).map_err(|_| Error::Exhausted)
    }

    /// Give back everything acquired, newest first.
    fn release_all<T: Toolkit>(&mut self, toolkit: &mut T) -> Result<(), Error> {
        let mut result = Ok(());
        while let Some(acquired) = self.acquired.pop() {
            let released = match acquired {
                Acquired::Layer(layer) => toolkit.layer_destroy(layer),
                Acquired::Font(font) => toolkit.font_unload(font),
                Acquired::Bitmap(bitmap) => toolkit.bitmap_destroy(bitmap),
            };
            if let Err(e) = released {
                error!("Failed to release {:?}: {:?}", acquired, e);
                result = result.and(Err(e));
            }
        }
        result
    }
}

/// Log toolkit failures in event handlers; they must not stop the event loop.
fn report(result: Result<(), Error>) {
    if let Err(e) = result {
        warn!("Toolkit call failed: {:?}", e);
    }
}

fn inbox_dropped(reason: AppMessageResult) {
    error!("Message dropped: {:?}", reason);
}

fn outbox_failed(reason: AppMessageResult) {
    error!("Outbox send failed: {:?}", reason);
}

impl<H: Host> WindowHandlers<H> for Watchface {
    fn load(&mut self, host: &mut H, window: WindowId) -> Result<(), Error> {
        if self.widgets.is_some() {
            return Err(Error::AlreadyLoaded);
        }
        match self.build(host.toolkit(), window) {
            Ok(widgets) => {
                self.widgets = Some(widgets);
                debug!("Window loaded with {} resources", self.acquired.len());
                Ok(())
            }
            Err(e) => {
                error!("Window load failed: {:?}", e);
                // Whatever was acquired before the failure is released again
                let _ = self.release_all(host.toolkit());
                Err(e)
            }
        }
    }

    fn unload(&mut self, host: &mut H, _window: WindowId) -> Result<(), Error> {
        if self.widgets.take().is_none() {
            return Err(Error::NotLoaded);
        }
        self.release_all(host.toolkit())
    }
}

impl<H: Host> TickHandler<H> for Watchface {
    fn on_tick(&mut self, host: &mut H, now: &NaiveDateTime) {
        trace!("Tick at {}:{}", now.hour(), now.minute());
        self.update_time(host, now);
        self.update_weather(host, now);
        self.update_day(host, now);
        self.update_month(host, now);
    }
}

impl<H: Host> AppMessageHandlers<H> for Watchface {
    fn inbox_received(&mut self, host: &mut H, payload: &[u8]) {
        self.receive_weather(host, payload);
    }

    fn inbox_dropped(&mut self, reason: AppMessageResult) {
        inbox_dropped(reason);
    }

    fn outbox_sent(&mut self) {
        info!("Outbox send success");
    }

    fn outbox_failed(&mut self, reason: AppMessageResult) {
        outbox_failed(reason);
    }
}

impl<H: Host> BatteryStateHandler<H> for Watchface {
    fn on_battery_change(&mut self, host: &mut H, state: BatteryChargeState) {
        self.battery_level = state.charge_percent.min(100);
        if let Some(widgets) = self.widgets {
            report(host.toolkit().layer_mark_dirty(widgets.battery));
        }
    }
}

impl<H: Host> ConnectionHandler<H> for Watchface {
    fn on_connection_change(&mut self, host: &mut H, connected: bool) {
        self.show_connection(host, connected);

        if !connected && self.connected != Some(false) {
            // Issue a vibrating alert
            host.vibes_double_pulse();
        }
        self.connected = Some(connected);
    }
}

impl LayerUpdateProc for Watchface {
    fn update<D>(&self, layer: LayerId, bounds: Rectangle, ctx: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = ColorMode>,
    {
        match self.widgets {
            Some(widgets) if widgets.battery == layer => {
                draw_battery_bar(ctx, bounds, self.battery_level)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_is_due_on_the_hour_and_half_hour() {
        for minute in 0..60 {
            assert_eq!(weather_due(minute, 30), minute % 30 == 0, "minute {minute}");
        }
        assert!(weather_due(0, 30));
        assert!(weather_due(30, 30));
        assert!(!weather_due(15, 30));
        assert!(!weather_due(0, 0));
    }

    #[test]
    fn starts_with_placeholders() {
        let watchface = Watchface::new(WatchfaceConfig::DEFAULT, ScreenShape::Rect);
        assert_eq!(watchface.time_text(), "00:00");
        assert_eq!(watchface.day_text(), "Sun 01");
        assert_eq!(watchface.month_text(), "Jan 01");
        assert_eq!(watchface.weather_text(), "Config Needed");
        assert!(!watchface.bluetooth_icon_visible());
    }
}
