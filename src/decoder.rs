//! Frame synchronization and decoding.
//!
//! A PMSx003 frame on the wire:
//!
//! ```text
//! +------+------+--------+--------+-----+--------+--------+
//! | 0x42 | 0x4D | len_hi | len_lo | ... fields ...| ck_hi  | ck_lo  |
//! +------+------+--------+--------+-----+--------+--------+
//! ```
//!
//! `len` counts everything after itself (frame size - 4), every field is a
//! big-endian `u16`, and the checksum is the 16-bit sum of all preceding
//! bytes.

use log::{debug, error, warn};

use crate::config::Config;
use crate::emitter::{self, EventSink, OutputSlots};
use crate::error::DecodeError;
use crate::reader::{read_u16, Checksum};
use crate::source::ByteSource;
use crate::variant::{SensorVariant, MAX_FIELDS};

pub const SIGNATURE_1: u8 = 0x42;
pub const SIGNATURE_2: u8 = 0x4D;
pub const SIGNATURE: u16 = (SIGNATURE_1 as u16) << 8 | SIGNATURE_2 as u16;

/// The data fields of one checksum-verified frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    variant: SensorVariant,
    fields: [u16; MAX_FIELDS],
    len: usize,
}

impl Frame {
    /// Builds a frame from already-decoded fields. `fields` must hold exactly
    /// as many values as the variant sends.
    pub fn from_fields(variant: SensorVariant, fields: &[u16]) -> Option<Frame> {
        if fields.len() != variant.field_count() {
            return None;
        }
        let mut frame = Frame {
            variant,
            fields: [0; MAX_FIELDS],
            len: fields.len(),
        };
        frame.fields[..fields.len()].copy_from_slice(fields);
        Some(frame)
    }

    pub fn variant(&self) -> SensorVariant {
        self.variant
    }

    pub fn fields(&self) -> &[u16] {
        &self.fields[..self.len]
    }

    pub fn field(&self, index: usize) -> Option<u16> {
        self.fields().get(index).copied()
    }

    /// PM1.0, PM2.5, PM10 in µg/m³, "CF=1" factory calibration.
    pub fn pm_standard(&self) -> [u16; 3] {
        [self.fields[0], self.fields[1], self.fields[2]]
    }

    /// PM1.0, PM2.5, PM10 in µg/m³ under atmospheric conditions.
    pub fn pm_atmospheric(&self) -> [u16; 3] {
        [self.fields[3], self.fields[4], self.fields[5]]
    }

    /// Particles per 0.1 L above 0.3, 0.5, 1.0, 2.5, 5 and 10 µm.
    pub fn counts(&self) -> Option<[u16; 6]> {
        if !self.variant.layout().has_counts {
            return None;
        }
        let mut c = [0; 6];
        c.copy_from_slice(&self.fields[6..12]);
        Some(c)
    }

    /// Formaldehyde in mg/m³.
    pub fn formaldehyde(&self) -> Option<f32> {
        self.environmental(12, 1000.0)
    }

    /// Temperature in °C.
    pub fn temperature(&self) -> Option<f32> {
        self.environmental(13, 10.0)
    }

    /// Relative humidity in %.
    pub fn humidity(&self) -> Option<f32> {
        self.environmental(14, 10.0)
    }

    fn environmental(&self, index: usize, scale: f32) -> Option<f32> {
        if self.variant.layout().has_environment {
            Some(f32::from(self.fields[index]) / scale)
        } else {
            None
        }
    }
}

/// Decoder state for one attached sensor.
///
/// Owns its byte source for the lifetime of the attachment. A decoder built
/// without a source stays uninitialized and every operation fails.
pub struct Decoder<S> {
    source: Option<S>,
    variant: SensorVariant,
    values_received: bool,
}

impl<S: ByteSource> Decoder<S> {
    /// Attaches to `source`, discarding whatever it had buffered so the
    /// first poll doesn't resync over stale bytes.
    pub fn new(mut source: Option<S>, variant: SensorVariant) -> Self {
        if let Some(src) = source.as_mut() {
            debug!("{}: dropping {} bytes pending at attach", variant, src.available());
            src.flush();
        }
        Decoder {
            source,
            variant,
            values_received: false,
        }
    }

    pub fn initialized(&self) -> bool {
        self.source.is_some()
    }

    pub fn variant(&self) -> SensorVariant {
        self.variant
    }

    pub fn source_mut(&mut self) -> Option<&mut S> {
        self.source.as_mut()
    }

    pub fn into_source(self) -> Option<S> {
        self.source
    }

    /// Realigns the source on a frame start and reports whether a whole
    /// frame is buffered.
    ///
    /// Only bytes in front of the first `0x42` are consumed; the candidate
    /// frame itself is left in place.
    pub fn frame_ready(&mut self) -> bool {
        let size = self.variant.frame_size();
        let src = match self.source.as_mut() {
            Some(src) => src,
            None => return false,
        };
        if src.available() == 0 {
            return false;
        }
        while src.available() > 0 && src.peek() != Some(SIGNATURE_1) {
            src.read();
        }
        src.available() >= size
    }

    /// Consumes one frame. Should follow a `frame_ready()` that returned true.
    ///
    /// On a signature mismatch only the two signature bytes are consumed. On
    /// an invalid length the rest of the frame is left for the caller to
    /// drain. Once the checksum has been read the source is flushed, whatever
    /// the outcome.
    pub fn decode(&mut self) -> Result<Frame, DecodeError> {
        let layout = self.variant.layout();
        let src = self.source.as_mut().ok_or(DecodeError::NotInitialized)?;
        let mut sum = Checksum::new();

        let header = read_u16(src, Some(&mut sum));
        if header != SIGNATURE {
            debug!("not at a frame start: 0x{:04x}", header);
            return Err(DecodeError::FramingMismatch { found: header });
        }

        let declared = read_u16(src, Some(&mut sum));
        let expected = layout.declared_length() as u16;
        if declared != expected {
            error!("invalid frame length - {}", declared);
            return Err(DecodeError::InvalidLength { declared, expected });
        }

        let mut fields = [0u16; MAX_FIELDS];
        for f in fields.iter_mut().take(layout.field_count) {
            *f = read_u16(src, Some(&mut sum));
        }
        let frame = Frame {
            variant: self.variant,
            fields,
            len: layout.field_count,
        };
        log_fields(&frame);

        let transmitted = read_u16(src, None);
        src.flush();

        if sum.value() != transmitted {
            warn!(
                "checksum mismatch: computed 0x{:04x}, transmitted 0x{:04x}",
                sum.value(),
                transmitted
            );
            return Err(DecodeError::ChecksumMismatch {
                computed: sum.value(),
                transmitted,
            });
        }

        self.values_received = true;
        Ok(frame)
    }

    /// One scheduler tick: decode a frame if one is buffered, store the
    /// configured projection in `slots` and send notifications.
    ///
    /// `config` is read on every call, so projection and events can change
    /// between polls. Framing always follows the variant the decoder was
    /// built with. Slots are untouched unless a frame verifies. A frame with
    /// an invalid length is drained from the source before returning.
    pub fn poll<E: EventSink + ?Sized>(
        &mut self,
        config: &Config,
        slots: &mut OutputSlots,
        events: &mut E,
    ) -> Result<Frame, DecodeError> {
        if !self.initialized() {
            return Err(DecodeError::NotInitialized);
        }
        if !self.frame_ready() {
            return Err(DecodeError::NotReady);
        }
        let frame = match self.decode() {
            Ok(frame) => frame,
            Err(e @ DecodeError::InvalidLength { .. }) => {
                if let Some(src) = self.source.as_mut() {
                    src.flush();
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        slots.store(emitter::project(&frame, config.projection));
        if config.events_enabled {
            let notes = emitter::notifications(&frame, config.projection, config.event_mode);
            emitter::emit(events, &config.name, &notes);
        }
        Ok(frame)
    }

    /// True once per successfully decoded frame.
    pub fn check_and_clear_values_received(&mut self) -> bool {
        std::mem::replace(&mut self.values_received, false)
    }
}

fn log_fields(frame: &Frame) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let f = frame.fields();
    debug!(
        "pm1.0={}, pm2.5={}, pm10={}, pm1.0a={}, pm2.5a={}, pm10a={}",
        f[0], f[1], f[2], f[3], f[4], f[5]
    );
    if let Some(c) = frame.counts() {
        debug!(
            "count/0.1L : 0.3um={}, 0.5um={}, 1.0um={}, 2.5um={}, 5.0um={}, 10um={}",
            c[0], c[1], c[2], c[3], c[4], c[5]
        );
    }
    if let (Some(t), Some(h), Some(hcho)) = (
        frame.temperature(),
        frame.humidity(),
        frame.formaldehyde(),
    ) {
        debug!("temp={}, humi={}, hcho={}", t, h, hcho);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferedSource;

    /// Serializes a frame with a correct checksum.
    fn encode(variant: SensorVariant, fields: &[u16]) -> Vec<u8> {
        let mut out = vec![SIGNATURE_1, SIGNATURE_2];
        out.extend_from_slice(&((variant.frame_size() - 4) as u16).to_be_bytes());
        for f in fields {
            out.extend_from_slice(&f.to_be_bytes());
        }
        let sum = out.iter().fold(0u16, |s, &b| s.wrapping_add(u16::from(b)));
        out.extend_from_slice(&sum.to_be_bytes());
        out
    }

    fn decoder_with(bytes: &[u8], variant: SensorVariant) -> Decoder<BufferedSource> {
        let mut d = Decoder::new(Some(BufferedSource::with_capacity(256)), variant);
        if let Some(src) = d.source_mut() {
            src.push(bytes);
        }
        d
    }

    fn available(d: &mut Decoder<BufferedSource>) -> usize {
        d.source_mut().map(|s| s.available()).unwrap_or(0)
    }

    #[test]
    fn uninitialized_is_inert() {
        let mut d: Decoder<BufferedSource> = Decoder::new(None, SensorVariant::Pms5003);
        assert!(!d.initialized());
        assert!(!d.frame_ready());
        assert_eq!(d.decode(), Err(DecodeError::NotInitialized));
        assert!(!d.check_and_clear_values_received());
    }

    #[test]
    fn attach_drops_pending_bytes() {
        let mut src = BufferedSource::new();
        src.push(&encode(SensorVariant::Pms5003, &[1; 13]));
        let mut d = Decoder::new(Some(src), SensorVariant::Pms5003);
        assert_eq!(available(&mut d), 0);
        assert!(!d.frame_ready());
    }

    #[test]
    fn poll_drains_invalid_length_frame() {
        let mut bytes = encode(SensorVariant::Pms5003, &[0; 13]);
        bytes[3] = 0x10;
        let mut d = decoder_with(&bytes, SensorVariant::Pms5003);
        let mut slots = OutputSlots::new();
        let mut events: Vec<String> = Vec::new();
        assert_eq!(
            d.poll(&Config::default(), &mut slots, &mut events),
            Err(DecodeError::InvalidLength {
                declared: 16,
                expected: 28
            })
        );
        assert_eq!(available(&mut d), 0);
    }

    #[test]
    fn empty_source_not_ready() {
        let mut d = decoder_with(&[], SensorVariant::Pms5003);
        assert!(!d.frame_ready());
    }

    #[test]
    fn decodes_base_frame() {
        let mut fields = [0u16; 13];
        fields[3] = 5;
        fields[4] = 10;
        fields[5] = 20;
        let bytes = encode(SensorVariant::Pms5003, &fields);
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[..4], &[0x42, 0x4D, 0x00, 0x1C]);

        let mut d = decoder_with(&bytes, SensorVariant::Pms5003);
        assert!(d.frame_ready());
        let frame = d.decode().unwrap();
        assert_eq!(frame.fields(), &fields[..]);
        assert_eq!(frame.pm_atmospheric(), [5, 10, 20]);
        assert_eq!(frame.temperature(), None);
        assert!(frame.counts().is_some());
    }

    #[test]
    fn decodes_reduced_frame() {
        let fields = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        let bytes = encode(SensorVariant::Pms3003, &fields);
        assert_eq!(bytes.len(), 24);
        let mut d = decoder_with(&bytes, SensorVariant::Pms3003);
        assert!(d.frame_ready());
        let frame = d.decode().unwrap();
        assert_eq!(frame.fields().len(), 9);
        assert_eq!(frame.counts(), None);
    }

    #[test]
    fn environmental_accessors() {
        let mut fields = [0u16; 17];
        fields[12] = 1500;
        fields[13] = 235;
        fields[14] = 601;
        let bytes = encode(SensorVariant::Pms5003St, &fields);
        let mut d = decoder_with(&bytes, SensorVariant::Pms5003St);
        assert!(d.frame_ready());
        let frame = d.decode().unwrap();
        assert_eq!(frame.formaldehyde(), Some(1.5));
        assert_eq!(frame.temperature(), Some(23.5));
        assert_eq!(frame.humidity(), Some(60.1));
    }

    #[test]
    fn partial_frame_not_ready() {
        let bytes = encode(SensorVariant::Pms5003, &[0; 13]);
        let mut d = decoder_with(&bytes[..20], SensorVariant::Pms5003);
        assert!(!d.frame_ready());
        assert_eq!(available(&mut d), 20);
        d.source_mut().unwrap().push(&bytes[20..]);
        assert!(d.frame_ready());
    }

    #[test]
    fn skips_garbage_prefix_only() {
        let mut bytes = vec![0x00, 0x11, 0x4D, 0xFF];
        bytes.extend(encode(SensorVariant::Pms5003, &[7; 13]));
        let mut d = decoder_with(&bytes, SensorVariant::Pms5003);
        assert!(d.frame_ready());
        assert_eq!(available(&mut d), 32);
        // Already aligned, nothing more is discarded.
        assert!(d.frame_ready());
        assert_eq!(available(&mut d), 32);
        assert!(d.decode().is_ok());
    }

    #[test]
    fn all_garbage_drains() {
        let mut d = decoder_with(&[0x01, 0x02, 0x03], SensorVariant::Pms5003);
        assert!(!d.frame_ready());
        assert_eq!(available(&mut d), 0);
    }

    #[test]
    fn wrong_second_signature_byte() {
        let mut bytes = encode(SensorVariant::Pms5003, &[0; 13]);
        bytes[1] = 0x4E;
        let mut d = decoder_with(&bytes, SensorVariant::Pms5003);
        assert!(d.frame_ready());
        assert_eq!(d.decode(), Err(DecodeError::FramingMismatch { found: 0x424E }));
        assert_eq!(available(&mut d), 30);
        assert!(!d.check_and_clear_values_received());
    }

    #[test]
    fn invalid_length_is_not_drained() {
        let mut bytes = encode(SensorVariant::Pms5003, &[0; 13]);
        bytes[3] = 0x10;
        let mut d = decoder_with(&bytes, SensorVariant::Pms5003);
        assert!(d.frame_ready());
        assert_eq!(
            d.decode(),
            Err(DecodeError::InvalidLength {
                declared: 16,
                expected: 28
            })
        );
        assert_eq!(available(&mut d), 28);
    }

    #[test]
    fn length_checked_before_checksum() {
        // A frame with length 0x0010 whose checksum is still right.
        let mut bytes = encode(SensorVariant::Pms5003, &[3; 13]);
        bytes[3] = 0x10;
        let sum = bytes[..30].iter().fold(0u16, |s, &b| s.wrapping_add(u16::from(b)));
        bytes[30..].copy_from_slice(&sum.to_be_bytes());
        let mut d = decoder_with(&bytes, SensorVariant::Pms5003);
        assert!(d.frame_ready());
        assert!(matches!(d.decode(), Err(DecodeError::InvalidLength { .. })));
    }

    #[test]
    fn checksum_mismatch_flushes() {
        let mut bytes = encode(SensorVariant::Pms5003, &[100; 13]);
        bytes[10] ^= 0x01;
        bytes.extend(encode(SensorVariant::Pms5003, &[1; 13]));
        let mut d = decoder_with(&bytes, SensorVariant::Pms5003);
        assert!(d.frame_ready());
        assert!(matches!(d.decode(), Err(DecodeError::ChecksumMismatch { .. })));
        assert_eq!(available(&mut d), 0);
        assert!(!d.check_and_clear_values_received());
    }

    #[test]
    fn success_flushes_trailing_bytes() {
        let mut bytes = encode(SensorVariant::Pms5003, &[1; 13]);
        bytes.extend_from_slice(&[0x42, 0x4D, 0x00]);
        let mut d = decoder_with(&bytes, SensorVariant::Pms5003);
        assert!(d.frame_ready());
        assert!(d.decode().is_ok());
        assert_eq!(available(&mut d), 0);
    }

    #[test]
    fn values_received_is_check_and_clear() {
        let bytes = encode(SensorVariant::Pms5003, &[1; 13]);
        let mut d = decoder_with(&bytes, SensorVariant::Pms5003);
        assert!(!d.check_and_clear_values_received());
        assert!(d.frame_ready());
        d.decode().unwrap();
        assert!(d.check_and_clear_values_received());
        assert!(!d.check_and_clear_values_received());
    }

    #[test]
    fn from_fields_checks_count() {
        assert!(Frame::from_fields(SensorVariant::Pms5003, &[0; 12]).is_none());
        assert!(Frame::from_fields(SensorVariant::Pms5003, &[0; 13]).is_some());
        assert!(Frame::from_fields(SensorVariant::Pms5003St, &[0; 13]).is_none());
    }
}
