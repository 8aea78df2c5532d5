//! Decoder for the serial protocol of Plantower PMSx003 particulate sensors.
//!
//! The sensors stream fixed-size frames over a 9600 baud UART. This crate
//! finds frame starts in that stream, verifies length and checksum, and turns
//! the raw 16-bit fields into output values and named notifications.
//!
//! ```rust,ignore
//! use pmsx003::{BufferedSource, Config, Decoder, OutputSlots, SensorVariant};
//!
//! let mut decoder = Decoder::new(Some(BufferedSource::new()), SensorVariant::Pms5003);
//! let mut slots = OutputSlots::new();
//! let mut events = Vec::new();
//! decoder.source_mut().unwrap().push(&received);
//! if decoder.poll(&Config::default(), &mut slots, &mut events).is_ok() {
//!     println!("pm2.5 = {}", slots[1]);
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod emitter;
pub mod error;
pub mod reader;
pub mod source;
pub mod variant;

pub use config::Config;
pub use decoder::{Decoder, Frame, SIGNATURE};
pub use emitter::{EventMode, EventSink, Notification, OutputProjection, OutputSlots};
pub use error::{ConfigError, DecodeError};
pub use reader::Checksum;
pub use source::{BufferedSource, ByteSource, StreamSource};
pub use variant::{Layout, SensorVariant};
