//! Shared pieces of the flexpad controller.
//!
//! The wire protocol (`event`, `frame`) is always available and is what the
//! host receiver links against. The `pipeline` feature adds the firmware side:
//! samplers feeding one bounded [`EventQueue`] drained by a single
//! [`Serializer`].
//!
//! ```text
//! AxisSampler x2 ─┐
//! ButtonSampler  ─┼──▶ EventQueue (10) ──▶ Serializer ──▶ [ch, lo, hi, 0xFF]
//! FlexSampler    ─┘
//! ```
#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

pub mod config;
pub mod event;
pub mod filter;
pub mod frame;

#[cfg(feature = "pipeline")]
pub mod axis;
#[cfg(feature = "pipeline")]
pub mod button;
#[cfg(feature = "pipeline")]
pub mod flex;
#[cfg(feature = "pipeline")]
pub mod queue;
#[cfg(feature = "pipeline")]
pub mod serializer;

#[cfg(all(test, feature = "pipeline"))]
mod testing;

pub use event::{ButtonId, ChannelId, Event, FlexState};
pub use filter::MotionFilter;
pub use frame::{DecodeError, Frame, FrameDecoder};

#[cfg(feature = "pipeline")]
pub use axis::{AnalogInput, AxisSampler, AxisState};
#[cfg(feature = "pipeline")]
pub use button::{ButtonSampler, Edge, EdgeDebouncer, PressSignal};
#[cfg(feature = "pipeline")]
pub use flex::{FlexError, FlexFrontEnd, FlexSampler};
#[cfg(feature = "pipeline")]
pub use queue::{EventQueue, QueueFull, SharedEventQueue};
#[cfg(feature = "pipeline")]
pub use serializer::Serializer;
