#![no_std]
#![no_main]

mod peripherals;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Core
use core::sync::atomic::{AtomicBool, Ordering};

// Device
use embassy_executor::Spawner;
use embassy_futures::select::{select, select3, Either};
use embassy_nrf::{
    bind_interrupts,
    gpio::{Input, Level, Output, OutputDrive, Pull},
    interrupt::{self, InterruptExt, Priority},
    peripherals::SPI2,
    saadc::{self, ChannelConfig, Resolution, Saadc},
    spim,
};
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, channel::Channel, signal::Signal};
use embassy_time::{Instant, Timer};

// BLE
use nrf_softdevice::{
    ble::{gatt_server, peripheral, Connection},
    Softdevice,
};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use peripherals::{backlight::Backlight, battery::Battery, display::Display, vibrator::Vibrator};
use pinetime_watchface::{
    system::{
        bluetooth::{
            softdevice_config, BatteryServiceEvent, CurrentTimeServiceEvent, Server, ServerEvent,
            WatchServiceEvent, ADV_DATA, SCAN_DATA,
        },
        config::{SystemConfig, WatchfaceConfig},
        event::{dispatch, Event},
        message::{AppMessageResult, OUTBOX_SIZE},
        time::{secs_until_next_minute, MinuteTicker, TimeReference},
    },
    ui::{
        label::ClockStyle, layer_stack::LayerStack, watchface::Watchface, BatteryChargeState, Host,
    },
};

// Others
use chrono::{NaiveDateTime, Timelike};

// Include current UTC epoch at compile time
include!(concat!(env!("OUT_DIR"), "/utc.rs"));

type Outbound = heapless::Vec<u8, OUTBOX_SIZE>;

// Communication channels
static EVENTS: Channel<ThreadModeRawMutex, Event, 8> = Channel::new();
static OUTBOX: Channel<ThreadModeRawMutex, Outbound, 2> = Channel::new();
static BATTERY_LEVEL: Signal<ThreadModeRawMutex, u8> = Signal::new();
static NOTIFY: Signal<ThreadModeRawMutex, ()> = Signal::new();
static TIME_SYNC: Signal<ThreadModeRawMutex, TimeReference> = Signal::new();
static CONNECTED: AtomicBool = AtomicBool::new(false);

static SERVER: StaticCell<Server> = StaticCell::new();

/// Runtime services offered to the watchface on the device
struct Board {
    stack: LayerStack,
    clock_style: ClockStyle,
}

impl Host for Board {
    type Toolkit = LayerStack;

    fn toolkit(&mut self) -> &mut LayerStack {
        &mut self.stack
    }

    fn clock_is_24h_style(&self) -> bool {
        self.clock_style == ClockStyle::TwentyFourHour
    }

    fn vibes_double_pulse(&mut self) {
        NOTIFY.signal(());
    }

    fn outbox_send(&mut self, payload: &[u8]) -> Result<(), AppMessageResult> {
        if !CONNECTED.load(Ordering::Relaxed) {
            return Err(AppMessageResult::NotConnected);
        }
        let message = Outbound::from_slice(payload).map_err(|_| AppMessageResult::BufferOverflow)?;
        OUTBOX.try_send(message).map_err(|_| AppMessageResult::Busy)
    }
}

fn uptime_secs() -> u64 {
    Instant::now().as_secs()
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Advertise, then serve one phone at a time.
#[embassy_executor::task]
async fn ble_task(sd: &'static Softdevice, server: &'static Server) {
    let config = peripheral::Config::default();
    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                defmt::warn!("Advertising failed: {:?}", e);
                Timer::after_secs(1).await;
                continue;
            }
        };

        defmt::info!("Phone connected");
        CONNECTED.store(true, Ordering::Relaxed);
        EVENTS.send(Event::ConnectionChanged(true)).await;

        let gatt = gatt_server::run(&conn, server, on_gatt_event);
        select3(gatt, forward_outbox(&conn, server), notify_battery(&conn, server)).await;

        defmt::info!("Phone disconnected");
        CONNECTED.store(false, Ordering::Relaxed);
        EVENTS.send(Event::ConnectionChanged(false)).await;
    }
}

fn on_gatt_event(event: ServerEvent) {
    match event {
        ServerEvent::Bas(BatteryServiceEvent::BatteryLevelCccdWrite { notifications }) => {
            defmt::debug!("Battery notifications: {}", notifications);
        }
        ServerEvent::Cts(CurrentTimeServiceEvent::CurrentTimeWrite(bytes)) => {
            match TimeReference::from_cts_bytes(&bytes, uptime_secs()) {
                Ok(reference) => TIME_SYNC.signal(reference),
                Err(e) => defmt::warn!("Invalid current time: {:?}", e),
            }
        }
        ServerEvent::Watch(WatchServiceEvent::InboxWrite(payload)) => {
            if EVENTS.try_send(Event::InboxReceived(payload)).is_err() {
                defmt::error!("Inbox message dropped: event queue full");
            }
        }
        ServerEvent::Watch(WatchServiceEvent::OutboxCccdWrite { notifications }) => {
            defmt::debug!("Outbox notifications: {}", notifications);
        }
    }
}

/// Notify queued outbound messages and report how delivery went.
async fn forward_outbox(conn: &Connection, server: &Server) {
    loop {
        let message = OUTBOX.receive().await;
        let event = match server.watch.outbox_notify(conn, &message) {
            Ok(()) => Event::OutboxSent,
            Err(e) => {
                defmt::warn!("Outbox notify failed: {:?}", e);
                Event::OutboxFailed(AppMessageResult::NotConnected)
            }
        };
        EVENTS.send(event).await;
    }
}

async fn notify_battery(conn: &Connection, server: &Server) {
    loop {
        let level = BATTERY_LEVEL.wait().await;
        if let Err(e) = server.bas.battery_level_notify(conn, &level) {
            defmt::trace!("Battery notify skipped: {:?}", e);
        }
    }
}

/// Vibrate whenever the watchface asks for it
#[embassy_executor::task]
async fn notify(mut vibrator: Vibrator<'static>) {
    loop {
        NOTIFY.wait().await;
        vibrator.double_pulse().await;
    }
}

/// Fetch the battery status from the hardware every second.
#[embassy_executor::task]
async fn update_battery_status(mut battery: Battery<'static>, server: &'static Server) {
    loop {
        Timer::after_secs(1).await;
        if let Some(state) = battery.update().await {
            defmt::info!(
                "Battery status: {} ({})",
                state.charge_percent,
                if state.is_charging {
                    "charging"
                } else {
                    "discharging"
                }
            );
            if let Err(e) = server.bas.battery_level_set(&state.charge_percent) {
                defmt::warn!("Battery level not stored: {:?}", e);
            }
            BATTERY_LEVEL.signal(state.charge_percent);
            EVENTS.send(Event::BatteryChanged(state)).await;
        }
    }
}

/// Emit a tick at every minute boundary.
#[embassy_executor::task]
async fn update_time(mut reference: TimeReference, timezone_secs: i32) {
    let mut ticker = MinuteTicker::new(&reference.now(uptime_secs(), timezone_secs));
    loop {
        let now = reference.now(uptime_secs(), timezone_secs);
        let wait = secs_until_next_minute(&now);

        match select(Timer::after_secs(wait), TIME_SYNC.wait()).await {
            Either::First(()) => {}
            Either::Second(synced) => {
                reference = synced;
                defmt::info!("Clock set by phone");
            }
        }

        let now = reference.now(uptime_secs(), timezone_secs);
        if let Some(minute) = ticker.tick(&now) {
            defmt::trace!("Tick {}:{}", minute.hour(), minute.minute());
            EVENTS.send(Event::Tick(minute)).await;
        }
    }
}

/// Own the watchface and the layer stack, apply events and redraw.
#[embassy_executor::task]
async fn update_lcd(
    mut display: Display<'static, SPI2>,
    _backlight: Backlight<'static>,
    config: WatchfaceConfig,
    now: NaiveDateTime,
    battery: BatteryChargeState,
) {
    let mut board = Board {
        stack: LayerStack::new(embedded_graphics::geometry::Size::new(240, 240)),
        clock_style: config.clock_style,
    };
    let mut watchface = unwrap!(Watchface::init(
        &mut board,
        config,
        &now,
        battery,
        CONNECTED.load(Ordering::Relaxed)
    ));

    loop {
        if board.stack.needs_redraw() {
            if let Err(e) = display.render(&mut board.stack, &watchface) {
                defmt::warn!("Display update failed: {:?}", e);
            }
        }
        let event = EVENTS.receive().await;
        dispatch(&mut watchface, &mut board, &event);
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(SystemConfig::new());
    defmt::info!("Initializing");

    let config = WatchfaceConfig::DEFAULT;

    // Keep peripheral interrupts off the priorities reserved by the SoftDevice
    interrupt::SAADC.set_priority(Priority::P3);
    interrupt::SPIM2_SPIS2_SPI2.set_priority(Priority::P3);

    // Initialize Bluetooth
    let sd = Softdevice::enable(&softdevice_config());
    let server: &'static Server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(softdevice_task(sd)));

    // Initialize SAADC
    let mut saadc_config = saadc::Config::default();
    // Set resolution to 12bit, necessary for correct battery status calculation
    saadc_config.resolution = Resolution::_12BIT;
    // Pin P0.31: Voltage level
    let channel_config = ChannelConfig::single_ended(p.P0_31);
    let saadc = Saadc::new(p.SAADC, Irqs, saadc_config, [channel_config]);
    saadc.calibrate().await;

    // Initialize battery
    let battery = Battery::init(saadc, Input::new(p.P0_12, Pull::None)).await;
    let battery_state = battery.state();
    unwrap!(server.bas.battery_level_set(&battery_state.charge_percent));

    // Initialize backlight
    let backlight = Backlight::init(
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_22, Level::High, OutputDrive::Standard),
        Output::new(p.P0_23, Level::High, OutputDrive::Standard),
        config.backlight_level,
    );

    // Initialize vibration motor
    let vibrator = Vibrator::init(
        Output::new(p.P0_16, Level::High, OutputDrive::Standard),
        config.vibration_pulse_ms,
    );

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;

    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let display = unwrap!(Display::init(
        spim,
        Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26, Level::Low, OutputDrive::Standard),
    ));

    // Clock starts from the build time until the phone sets it
    let reference = TimeReference::from_epoch(UTC_EPOCH, uptime_secs()).unwrap_or_default();
    let now = reference.now(uptime_secs(), config.timezone_secs);

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(update_lcd(display, backlight, config, now, battery_state)));
    unwrap!(spawner.spawn(update_time(reference, config.timezone_secs)));
    unwrap!(spawner.spawn(update_battery_status(battery, server)));
    unwrap!(spawner.spawn(notify(vibrator)));
    unwrap!(spawner.spawn(ble_task(sd, server)));
}
