//! Flexpad firmware for the Raspberry Pi Pico.
//!
//! Joystick on GP26/GP27, three active-low buttons on GP16..GP18, the flex
//! sensor converter on I2C0 (GP4 SDA, GP5 SCL) and the frame stream on UART0
//! TX (GP0).
#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::{
    adc::{self, Adc},
    bind_interrupts,
    gpio::{Input, Pull},
    i2c::{self, I2c},
    peripherals::{I2C0, UART0},
    uart::{self, BufferedInterruptHandler, BufferedUartTx},
};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use flexpad_lib::{
    AnalogInput, AxisSampler, ButtonId, ButtonSampler, Edge, EdgeDebouncer, FlexFrontEnd,
    FlexSampler, PressSignal, Serializer, SharedEventQueue,
    config::{AxisConfig, MAX_BUTTONS, Polarity},
};
use log::{debug, info};
use panic_halt as _;
use static_cell::StaticCell;

const BAUD_RATE: u32 = 115_200;
const TX_BUFFER_SIZE: usize = 64;

bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => adc::InterruptHandler;
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

type FlexBus = I2c<'static, I2C0, i2c::Async>;

static EVENTS: SharedEventQueue = SharedEventQueue::new();
static PRESSES: [PressSignal; MAX_BUTTONS] = [const { PressSignal::new() }; MAX_BUTTONS];
static JOYSTICK: StaticCell<Mutex<CriticalSectionRawMutex, Joystick>> = StaticCell::new();
static TX_BUFFER: StaticCell<[u8; TX_BUFFER_SIZE]> = StaticCell::new();

const fn button(id: u8) -> ButtonId {
    match ButtonId::new(id) {
        Some(id) => id,
        None => panic!("button id out of range"),
    }
}

/// Converter plus both joystick inputs; one lock covers select and convert.
struct Joystick {
    adc: Adc<'static, adc::Async>,
    channels: [adc::Channel<'static>; 2],
}

#[derive(Clone, Copy)]
struct SharedAdc(&'static Mutex<CriticalSectionRawMutex, Joystick>);

impl AnalogInput for SharedAdc {
    type Error = adc::Error;

    async fn read_channel(&mut self, channel: u8) -> Result<u16, Self::Error> {
        let mut joystick = self.0.lock().await;
        let Joystick { adc, channels } = &mut *joystick;
        match channels.get_mut(usize::from(channel)) {
            Some(input) => adc.read(input).await,
            None => Err(adc::Error::ConversionFailed),
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    rtt_target::rtt_init_log!();
    let p = embassy_rp::init(Default::default());
    info!("flexpad starting");

    let adc = Adc::new(p.ADC, Irqs, adc::Config::default());
    let channels = [
        adc::Channel::new_pin(p.PIN_26, Pull::None),
        adc::Channel::new_pin(p.PIN_27, Pull::None),
    ];
    let joystick = SharedAdc(JOYSTICK.init(Mutex::new(Joystick { adc, channels })));

    let mut i2c_cfg = i2c::Config::default();
    i2c_cfg.frequency = 400_000;
    let i2c = I2c::new_async(p.I2C0, p.PIN_5, p.PIN_4, Irqs, i2c_cfg);

    let mut uart_cfg = uart::Config::default();
    uart_cfg.baudrate = BAUD_RATE;
    let tx_buffer = TX_BUFFER.init([0; TX_BUFFER_SIZE]);
    let tx = BufferedUartTx::new(p.UART0, Irqs, p.PIN_0, tx_buffer, uart_cfg);

    let buttons = [
        Input::new(p.PIN_16, Pull::Up),
        Input::new(p.PIN_17, Pull::Up),
        Input::new(p.PIN_18, Pull::Up),
    ];
    for (pin, signal) in buttons.into_iter().zip(PRESSES.iter()) {
        spawner.must_spawn(edge_watcher_task(
            pin,
            EdgeDebouncer::new(signal, Polarity::ActiveLow),
        ));
    }

    spawner.must_spawn(serializer_task(Serializer::new(tx)));
    spawner.must_spawn(axis_task(AxisSampler::new(AxisConfig::x()), joystick));
    spawner.must_spawn(axis_task(AxisSampler::new(AxisConfig::y_inverted()), joystick));
    spawner.must_spawn(button_task(ButtonSampler::new([
        (button(0), &PRESSES[0]),
        (button(1), &PRESSES[1]),
        (button(2), &PRESSES[2]),
    ])));
    spawner.must_spawn(flex_task(FlexSampler::new(), FlexFrontEnd::new(i2c)));
}

/// Interrupt side of one button: turns GPIO edges into press signal updates.
#[embassy_executor::task(pool_size = MAX_BUTTONS)]
async fn edge_watcher_task(mut pin: Input<'static>, debouncer: EdgeDebouncer<'static>) -> ! {
    loop {
        pin.wait_for_any_edge().await;
        let edge = if pin.is_high() {
            Edge::Rising
        } else {
            Edge::Falling
        };
        debouncer.on_edge(edge);
    }
}

#[embassy_executor::task(pool_size = 2)]
async fn axis_task(sampler: AxisSampler, adc: SharedAdc) -> ! {
    debug!("Starting axis task...");
    sampler.run(adc, &EVENTS).await
}

#[embassy_executor::task]
async fn button_task(sampler: ButtonSampler<'static, MAX_BUTTONS>) -> ! {
    debug!("Starting button task...");
    sampler.run(&EVENTS).await
}

#[embassy_executor::task]
async fn flex_task(sampler: FlexSampler, front_end: FlexFrontEnd<FlexBus>) -> ! {
    debug!("Starting flex task...");
    sampler.run(front_end, &EVENTS).await
}

#[embassy_executor::task]
async fn serializer_task(serializer: Serializer<BufferedUartTx>) -> ! {
    debug!("Starting serializer task...");
    serializer.run(&EVENTS).await
}
