//! The information-element catalogue: one variant per standardised
//! measurement/command field, each knowing its own fixed wire width.
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::common::{MeasuredQuality, QualityDescriptor};
use crate::error::{IecError, IecResult};

/// Double-point value: the two-bit DPI/DCO encoding shared by
/// single/double indications and commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoublePointValue {
    /// Intermediate state, e.g. a breaker in transit (00).
    Indeterminate = 0,
    /// Determined OFF/open (01).
    Off = 1,
    /// Determined ON/closed (10).
    On = 2,
    /// Indeterminate or faulty (11).
    IndeterminateOrFaulty = 3,
}

impl DoublePointValue {
    /// Decode from the low 2 bits of a DIQ/DCO byte.
    pub const fn from_bits(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Indeterminate,
            1 => Self::Off,
            2 => Self::On,
            _ => Self::IndeterminateOrFaulty,
        }
    }

    /// Encode to the low 2 bits of a DIQ/DCO byte.
    pub const fn to_bits(self) -> u8 {
        self as u8
    }
}

/// Regulating step command direction (RCO, bits 1..2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepCommandValue {
    /// Not permitted / reserved (00).
    NotPermittedLow = 0,
    /// Step down (01).
    Lower = 1,
    /// Step up (10).
    Higher = 2,
    /// Not permitted / reserved (11).
    NotPermittedHigh = 3,
}

impl StepCommandValue {
    /// Decode from the low 2 bits of an RCO byte.
    pub const fn from_bits(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::NotPermittedLow,
            1 => Self::Lower,
            2 => Self::Higher,
            _ => Self::NotPermittedHigh,
        }
    }

    /// Encode to the low 2 bits of an RCO byte.
    pub const fn to_bits(self) -> u8 {
        self as u8
    }
}

/// Counter-interrogation freeze/reset qualifier (QCC, bits 6..7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterFreeze {
    /// Read the counter without freezing it.
    Read = 0,
    /// Freeze without resetting.
    FreezeNoReset = 1,
    /// Freeze and reset.
    FreezeWithReset = 2,
    /// Reset only.
    CounterReset = 3,
}

impl CounterFreeze {
    /// Decode from bits 6..7 of a QCC byte.
    pub const fn from_bits(value: u8) -> Self {
        match (value >> 6) & 0x03 {
            0 => Self::Read,
            1 => Self::FreezeNoReset,
            2 => Self::FreezeWithReset,
            _ => Self::CounterReset,
        }
    }

    /// Encode into bits 6..7 of a QCC byte.
    pub const fn to_bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// 2-byte elapsed-time tag (CP16Time2a): milliseconds only, used for
/// relay operating times rather than absolute time-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cp16Time2a {
    /// Elapsed milliseconds, 0..=59999.
    pub milliseconds: u16,
}

impl Cp16Time2a {
    const LEN: usize = 2;

    fn decode(data: &[u8]) -> IecResult<Self> {
        if data.len() < Self::LEN {
            return Err(IecError::MalformedPayload("CP16Time2a truncated".into()));
        }
        Ok(Self {
            milliseconds: LittleEndian::read_u16(&data[0..2]),
        })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, self.milliseconds);
        out.extend_from_slice(&buf);
    }
}

/// 3-byte time tag (CP24Time2a): milliseconds-in-minute plus the minute
/// and its invalid flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cp24Time2a {
    /// Milliseconds within the current minute, 0..=59999.
    pub milliseconds: u16,
    /// Minute, 0..=59.
    pub minutes: u8,
    /// Invalid flag (IV).
    pub invalid: bool,
}

impl Cp24Time2a {
    const LEN: usize = 3;

    fn decode(data: &[u8]) -> IecResult<Self> {
        if data.len() < Self::LEN {
            return Err(IecError::MalformedPayload("CP24Time2a truncated".into()));
        }
        Ok(Self {
            milliseconds: LittleEndian::read_u16(&data[0..2]),
            minutes: data[2] & 0x3F,
            invalid: (data[2] & 0x80) != 0,
        })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, self.milliseconds);
        out.extend_from_slice(&buf);
        out.push((self.minutes & 0x3F) | if self.invalid { 0x80 } else { 0 });
    }
}

/// 7-byte absolute time tag (CP56Time2a).
///
/// Milliseconds live in the low two bytes, LSB first; this is the exact
/// field the predecessor library's v0.9 `IeTime56` got backwards, losing
/// sub-second precision on decode. Every other field is a single byte
/// sharing its top bits with a flag (invalid on the minute byte, summer
/// time on the hour byte, day-of-week on the day byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cp56Time2a {
    /// Milliseconds within the current minute, 0..=59999.
    pub milliseconds: u16,
    /// Minute, 0..=59.
    pub minutes: u8,
    /// Invalid flag (IV).
    pub invalid: bool,
    /// Hour, 0..=23.
    pub hours: u8,
    /// Summer time flag (SU).
    pub summer_time: bool,
    /// Day of month, 1..=31.
    pub day: u8,
    /// Day of week, 1..=7 (1 = Monday), 0 if not used.
    pub day_of_week: u8,
    /// Month, 1..=12.
    pub month: u8,
    /// Year, 0..=99 (last two digits).
    pub year: u8,
}

impl Cp56Time2a {
    /// Encoded width in bytes.
    pub const LEN: usize = 7;

    /// Parse from exactly 7 bytes.
    pub fn decode(data: &[u8]) -> IecResult<Self> {
        if data.len() < Self::LEN {
            return Err(IecError::MalformedPayload("CP56Time2a truncated".into()));
        }
        let milliseconds = LittleEndian::read_u16(&data[0..2]);
        let minutes = data[2] & 0x3F;
        let invalid = (data[2] & 0x80) != 0;
        let hours = data[3] & 0x1F;
        let summer_time = (data[3] & 0x80) != 0;
        let day = data[4] & 0x1F;
        let day_of_week = (data[4] >> 5) & 0x07;
        let month = data[5] & 0x0F;
        let year = data[6] & 0x7F;

        Ok(Self {
            milliseconds,
            minutes,
            invalid,
            hours,
            summer_time,
            day,
            day_of_week,
            month,
            year,
        })
    }

    /// Encode to exactly 7 bytes.
    pub fn encode_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        LittleEndian::write_u16(&mut out[0..2], self.milliseconds);
        out[2] = (self.minutes & 0x3F) | if self.invalid { 0x80 } else { 0 };
        out[3] = (self.hours & 0x1F) | if self.summer_time { 0x80 } else { 0 };
        out[4] = (self.day & 0x1F) | ((self.day_of_week & 0x07) << 5);
        out[5] = self.month & 0x0F;
        out[6] = self.year & 0x7F;
        out
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.encode_bytes());
    }

    /// Build a `Cp56Time2a` from a UTC `chrono` timestamp, truncating to
    /// millisecond precision. `day_of_week` follows ISO 8601 (1 = Monday).
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        use chrono::{Datelike, Timelike};
        let millis_in_minute = dt.second() as u16 * 1000 + (dt.nanosecond() / 1_000_000) as u16;
        Self {
            milliseconds: millis_in_minute,
            minutes: dt.minute() as u8,
            invalid: false,
            hours: dt.hour() as u8,
            summer_time: false,
            day: dt.day() as u8,
            day_of_week: dt.weekday().number_from_monday() as u8,
            month: dt.month() as u8,
            year: (dt.year() % 100) as u8,
        }
    }

    /// Reconstruct an approximate UTC timestamp, assuming the two-digit
    /// year belongs to the 1970-2069 window (years 70-99 map to 1970s-90s,
    /// 00-69 map to 2000-2069), which keeps every value in the
    /// standard's stated [1970, 2099) validity range unambiguous for the
    /// common case. Returns `None` if the fields don't form a valid date.
    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        use chrono::{NaiveDate, TimeZone};
        let full_year = if self.year >= 70 {
            1900 + self.year as i32
        } else {
            2000 + self.year as i32
        };
        let date = NaiveDate::from_ymd_opt(full_year, self.month as u32, self.day as u32)?;
        let seconds = (self.milliseconds / 1000) as u32;
        let millis_remainder = (self.milliseconds % 1000) as u32;
        let time = date.and_hms_milli_opt(
            self.hours as u32,
            self.minutes as u32,
            seconds,
            millis_remainder,
        )?;
        Some(chrono::Utc.from_utc_datetime(&time))
    }
}

/// A single standardised information-element variant.
///
/// Every variant's encoded width is fixed by its position in the schema of
/// the enclosing [`crate::asdu::TypeId`] (see
/// [`crate::asdu::TypeId::element_schema`]); `InformationElement::wire_len`
/// returns that width for a constructed value, and `decode` is driven by
/// the schema's [`ElementKind`] rather than by a type tag on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InformationElement {
    /// Single-point information with quality (SIQ, 1 byte).
    SinglePointInfo { value: bool, quality: QualityDescriptor },
    /// Double-point information with quality (DIQ, 1 byte).
    DoublePointInfo {
        value: DoublePointValue,
        quality: QualityDescriptor,
    },
    /// Step position information (VTI + QDS, 2 bytes).
    StepPosition {
        value: i8,
        transient: bool,
        quality: MeasuredQuality,
    },
    /// Bitstring of 32 bits with quality (BSI + QDS, 5 bytes).
    Bitstring32 { value: u32, quality: MeasuredQuality },
    /// Normalised measured value with quality (NVA + QDS, 3 bytes).
    NormalizedValue { raw: i16, quality: MeasuredQuality },
    /// Scaled measured value with quality (SVA + QDS, 3 bytes).
    ScaledValue { raw: i16, quality: MeasuredQuality },
    /// Short floating-point measured value with quality (4+1 bytes).
    ShortFloat { value: f32, quality: MeasuredQuality },
    /// Binary counter reading (BCR, 5 bytes: 4-byte counter + 1 flags byte).
    BinaryCounterReading {
        value: i32,
        sequence: u8,
        carry: bool,
        adjusted: bool,
        invalid: bool,
    },
    /// Single command (SCO, 1 byte).
    SingleCommand { on: bool, qualifier: u8, select: bool },
    /// Double command (DCO, 1 byte).
    DoubleCommand {
        value: DoublePointValue,
        qualifier: u8,
        select: bool,
    },
    /// Regulating step command (RCO, 1 byte).
    RegulatingStepCommand {
        step: StepCommandValue,
        qualifier: u8,
        select: bool,
    },
    /// Setpoint command, normalised value (NVA + QOS, 3 bytes).
    SetpointNormalized { raw: i16, qualifier: u8 },
    /// Setpoint command, scaled value (SVA + QOS, 3 bytes).
    SetpointScaled { raw: i16, qualifier: u8 },
    /// Setpoint command, short float (4+1 bytes).
    SetpointShortFloat { value: f32, qualifier: u8 },
    /// Bitstring-of-32 command (4 bytes, no trailing quality byte).
    Bitstring32Command { value: u32 },
    /// Qualifier of interrogation (QOI, 1 byte). 20 = station interrogation.
    QualifierOfInterrogation(u8),
    /// Qualifier of counter interrogation (QCC, 1 byte).
    QualifierOfCounterInterrogation { request: u8, freeze: CounterFreeze },
    /// Test sequence counter (2 bytes), used by the test command.
    TestSequenceCounter(u16),
    /// File name (NOF, 2 bytes) used by file-transfer ASDUs.
    FileName(u16),
    /// Raw segment bytes; always the last element of a file-transfer
    /// object, so its width is "the rest of the object".
    SegmentData(Vec<u8>),
    /// 2-byte elapsed-time tag.
    Cp16(Cp16Time2a),
    /// 3-byte time tag.
    Cp24(Cp24Time2a),
    /// 7-byte absolute time tag.
    Cp56(Cp56Time2a),
}

/// The wire shape of a single element, used to drive decoding from an
/// enclosing `TypeId`'s schema without a runtime tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    SinglePointInfo,
    DoublePointInfo,
    StepPosition,
    Bitstring32,
    NormalizedValue,
    ScaledValue,
    ShortFloat,
    BinaryCounterReading,
    SingleCommand,
    DoubleCommand,
    RegulatingStepCommand,
    SetpointNormalized,
    SetpointScaled,
    SetpointShortFloat,
    Bitstring32Command,
    QualifierOfInterrogation,
    QualifierOfCounterInterrogation,
    TestSequenceCounter,
    FileName,
    /// Consumes every remaining byte of the enclosing object.
    SegmentData,
    Cp16,
    Cp24,
    Cp56,
}

impl ElementKind {
    /// Fixed wire width, or `None` for [`ElementKind::SegmentData`] whose
    /// width depends on how much of the object is left.
    pub const fn fixed_len(self) -> Option<usize> {
        match self {
            ElementKind::SinglePointInfo => Some(1),
            ElementKind::DoublePointInfo => Some(1),
            ElementKind::StepPosition => Some(2),
            ElementKind::Bitstring32 => Some(5),
            ElementKind::NormalizedValue => Some(3),
            ElementKind::ScaledValue => Some(3),
            ElementKind::ShortFloat => Some(5),
            ElementKind::BinaryCounterReading => Some(5),
            ElementKind::SingleCommand => Some(1),
            ElementKind::DoubleCommand => Some(1),
            ElementKind::RegulatingStepCommand => Some(1),
            ElementKind::SetpointNormalized => Some(3),
            ElementKind::SetpointScaled => Some(3),
            ElementKind::SetpointShortFloat => Some(5),
            ElementKind::Bitstring32Command => Some(4),
            ElementKind::QualifierOfInterrogation => Some(1),
            ElementKind::QualifierOfCounterInterrogation => Some(1),
            ElementKind::TestSequenceCounter => Some(2),
            ElementKind::FileName => Some(2),
            ElementKind::SegmentData => None,
            ElementKind::Cp16 => Some(Cp16Time2a::LEN),
            ElementKind::Cp24 => Some(Cp24Time2a::LEN),
            ElementKind::Cp56 => Some(Cp56Time2a::LEN),
        }
    }
}

impl InformationElement {
    /// The number of bytes this value occupies on the wire.
    pub fn wire_len(&self) -> usize {
        match self {
            InformationElement::SegmentData(bytes) => bytes.len(),
            other => other
                .kind()
                .fixed_len()
                .expect("only SegmentData has a variable width"),
        }
    }

    /// The [`ElementKind`] this value was built from.
    pub fn kind(&self) -> ElementKind {
        match self {
            InformationElement::SinglePointInfo { .. } => ElementKind::SinglePointInfo,
            InformationElement::DoublePointInfo { .. } => ElementKind::DoublePointInfo,
            InformationElement::StepPosition { .. } => ElementKind::StepPosition,
            InformationElement::Bitstring32 { .. } => ElementKind::Bitstring32,
            InformationElement::NormalizedValue { .. } => ElementKind::NormalizedValue,
            InformationElement::ScaledValue { .. } => ElementKind::ScaledValue,
            InformationElement::ShortFloat { .. } => ElementKind::ShortFloat,
            InformationElement::BinaryCounterReading { .. } => ElementKind::BinaryCounterReading,
            InformationElement::SingleCommand { .. } => ElementKind::SingleCommand,
            InformationElement::DoubleCommand { .. } => ElementKind::DoubleCommand,
            InformationElement::RegulatingStepCommand { .. } => ElementKind::RegulatingStepCommand,
            InformationElement::SetpointNormalized { .. } => ElementKind::SetpointNormalized,
            InformationElement::SetpointScaled { .. } => ElementKind::SetpointScaled,
            InformationElement::SetpointShortFloat { .. } => ElementKind::SetpointShortFloat,
            InformationElement::Bitstring32Command { .. } => ElementKind::Bitstring32Command,
            InformationElement::QualifierOfInterrogation(_) => ElementKind::QualifierOfInterrogation,
            InformationElement::QualifierOfCounterInterrogation { .. } => {
                ElementKind::QualifierOfCounterInterrogation
            }
            InformationElement::TestSequenceCounter(_) => ElementKind::TestSequenceCounter,
            InformationElement::FileName(_) => ElementKind::FileName,
            InformationElement::SegmentData(_) => ElementKind::SegmentData,
            InformationElement::Cp16(_) => ElementKind::Cp16,
            InformationElement::Cp24(_) => ElementKind::Cp24,
            InformationElement::Cp56(_) => ElementKind::Cp56,
        }
    }

    /// Append this element's bytes to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            InformationElement::SinglePointInfo { value, quality } => {
                out.push((*value as u8) | quality.to_bits());
            }
            InformationElement::DoublePointInfo { value, quality } => {
                out.push(value.to_bits() | quality.to_bits());
            }
            InformationElement::StepPosition {
                value,
                transient,
                quality,
            } => {
                let vti = (*value as u8 & 0x7F) | if *transient { 0x80 } else { 0 };
                out.push(vti);
                out.push(quality.to_byte());
            }
            InformationElement::Bitstring32 { value, quality } => {
                let mut buf = [0u8; 4];
                LittleEndian::write_u32(&mut buf, *value);
                out.extend_from_slice(&buf);
                out.push(quality.to_byte());
            }
            InformationElement::NormalizedValue { raw, quality } => {
                let mut buf = [0u8; 2];
                LittleEndian::write_i16(&mut buf, *raw);
                out.extend_from_slice(&buf);
                out.push(quality.to_byte());
            }
            InformationElement::ScaledValue { raw, quality } => {
                let mut buf = [0u8; 2];
                LittleEndian::write_i16(&mut buf, *raw);
                out.extend_from_slice(&buf);
                out.push(quality.to_byte());
            }
            InformationElement::ShortFloat { value, quality } => {
                let mut buf = [0u8; 4];
                LittleEndian::write_f32(&mut buf, *value);
                out.extend_from_slice(&buf);
                out.push(quality.to_byte());
            }
            InformationElement::BinaryCounterReading {
                value,
                sequence,
                carry,
                adjusted,
                invalid,
            } => {
                let mut buf = [0u8; 4];
                LittleEndian::write_i32(&mut buf, *value);
                out.extend_from_slice(&buf);
                let mut flags = sequence & 0x1F;
                if *carry {
                    flags |= 0x20;
                }
                if *adjusted {
                    flags |= 0x40;
                }
                if *invalid {
                    flags |= 0x80;
                }
                out.push(flags);
            }
            InformationElement::SingleCommand {
                on,
                qualifier,
                select,
            } => {
                let mut byte = if *on { 0x01 } else { 0x00 };
                byte |= (qualifier & 0x1F) << 2;
                if *select {
                    byte |= 0x80;
                }
                out.push(byte);
            }
            InformationElement::DoubleCommand {
                value,
                qualifier,
                select,
            } => {
                let mut byte = value.to_bits();
                byte |= (qualifier & 0x1F) << 2;
                if *select {
                    byte |= 0x80;
                }
                out.push(byte);
            }
            InformationElement::RegulatingStepCommand {
                step,
                qualifier,
                select,
            } => {
                let mut byte = step.to_bits();
                byte |= (qualifier & 0x1F) << 2;
                if *select {
                    byte |= 0x80;
                }
                out.push(byte);
            }
            InformationElement::SetpointNormalized { raw, qualifier } => {
                let mut buf = [0u8; 2];
                LittleEndian::write_i16(&mut buf, *raw);
                out.extend_from_slice(&buf);
                out.push(*qualifier);
            }
            InformationElement::SetpointScaled { raw, qualifier } => {
                let mut buf = [0u8; 2];
                LittleEndian::write_i16(&mut buf, *raw);
                out.extend_from_slice(&buf);
                out.push(*qualifier);
            }
            InformationElement::SetpointShortFloat { value, qualifier } => {
                let mut buf = [0u8; 4];
                LittleEndian::write_f32(&mut buf, *value);
                out.extend_from_slice(&buf);
                out.push(*qualifier);
            }
            InformationElement::Bitstring32Command { value } => {
                let mut buf = [0u8; 4];
                LittleEndian::write_u32(&mut buf, *value);
                out.extend_from_slice(&buf);
            }
            InformationElement::QualifierOfInterrogation(qoi) => out.push(*qoi),
            InformationElement::QualifierOfCounterInterrogation { request, freeze } => {
                out.push((request & 0x3F) | freeze.to_bits());
            }
            InformationElement::TestSequenceCounter(seq) => {
                let mut buf = [0u8; 2];
                LittleEndian::write_u16(&mut buf, *seq);
                out.extend_from_slice(&buf);
            }
            InformationElement::FileName(nof) => {
                let mut buf = [0u8; 2];
                LittleEndian::write_u16(&mut buf, *nof);
                out.extend_from_slice(&buf);
            }
            InformationElement::SegmentData(bytes) => out.extend_from_slice(bytes),
            InformationElement::Cp16(v) => v.encode(out),
            InformationElement::Cp24(v) => v.encode(out),
            InformationElement::Cp56(v) => v.encode(out),
        }
    }

    /// Decode a single element of the given `kind` from the front of
    /// `data`. `remaining_in_object` is the number of bytes left in the
    /// enclosing object, used only by [`ElementKind::SegmentData`].
    pub fn decode(kind: ElementKind, data: &[u8], remaining_in_object: usize) -> IecResult<Self> {
        let need = kind.fixed_len().unwrap_or(remaining_in_object);
        if data.len() < need {
            return Err(IecError::MalformedPayload(format!(
                "{:?} needs {} bytes, got {}",
                kind,
                need,
                data.len()
            )));
        }
        Ok(match kind {
            ElementKind::SinglePointInfo => InformationElement::SinglePointInfo {
                value: (data[0] & 0x01) != 0,
                quality: QualityDescriptor::from_bits(data[0]),
            },
            ElementKind::DoublePointInfo => InformationElement::DoublePointInfo {
                value: DoublePointValue::from_bits(data[0]),
                quality: QualityDescriptor::from_bits(data[0]),
            },
            ElementKind::StepPosition => {
                let raw = data[0] & 0x7F;
                let value = if raw & 0x40 != 0 {
                    raw as i8 - 128
                } else {
                    raw as i8
                };
                InformationElement::StepPosition {
                    value,
                    transient: (data[0] & 0x80) != 0,
                    quality: MeasuredQuality::from_byte(data[1]),
                }
            }
            ElementKind::Bitstring32 => InformationElement::Bitstring32 {
                value: LittleEndian::read_u32(&data[0..4]),
                quality: MeasuredQuality::from_byte(data[4]),
            },
            ElementKind::NormalizedValue => InformationElement::NormalizedValue {
                raw: LittleEndian::read_i16(&data[0..2]),
                quality: MeasuredQuality::from_byte(data[2]),
            },
            ElementKind::ScaledValue => InformationElement::ScaledValue {
                raw: LittleEndian::read_i16(&data[0..2]),
                quality: MeasuredQuality::from_byte(data[2]),
            },
            ElementKind::ShortFloat => InformationElement::ShortFloat {
                value: LittleEndian::read_f32(&data[0..4]),
                quality: MeasuredQuality::from_byte(data[4]),
            },
            ElementKind::BinaryCounterReading => InformationElement::BinaryCounterReading {
                value: LittleEndian::read_i32(&data[0..4]),
                sequence: data[4] & 0x1F,
                carry: (data[4] & 0x20) != 0,
                adjusted: (data[4] & 0x40) != 0,
                invalid: (data[4] & 0x80) != 0,
            },
            ElementKind::SingleCommand => InformationElement::SingleCommand {
                on: (data[0] & 0x01) != 0,
                qualifier: (data[0] >> 2) & 0x1F,
                select: (data[0] & 0x80) != 0,
            },
            ElementKind::DoubleCommand => InformationElement::DoubleCommand {
                value: DoublePointValue::from_bits(data[0]),
                qualifier: (data[0] >> 2) & 0x1F,
                select: (data[0] & 0x80) != 0,
            },
            ElementKind::RegulatingStepCommand => InformationElement::RegulatingStepCommand {
                step: StepCommandValue::from_bits(data[0]),
                qualifier: (data[0] >> 2) & 0x1F,
                select: (data[0] & 0x80) != 0,
            },
            ElementKind::SetpointNormalized => InformationElement::SetpointNormalized {
                raw: LittleEndian::read_i16(&data[0..2]),
                qualifier: data[2],
            },
            ElementKind::SetpointScaled => InformationElement::SetpointScaled {
                raw: LittleEndian::read_i16(&data[0..2]),
                qualifier: data[2],
            },
            ElementKind::SetpointShortFloat => InformationElement::SetpointShortFloat {
                value: LittleEndian::read_f32(&data[0..4]),
                qualifier: data[4],
            },
            ElementKind::Bitstring32Command => InformationElement::Bitstring32Command {
                value: LittleEndian::read_u32(&data[0..4]),
            },
            ElementKind::QualifierOfInterrogation => {
                InformationElement::QualifierOfInterrogation(data[0])
            }
            ElementKind::QualifierOfCounterInterrogation => {
                InformationElement::QualifierOfCounterInterrogation {
                    request: data[0] & 0x3F,
                    freeze: CounterFreeze::from_bits(data[0]),
                }
            }
            ElementKind::TestSequenceCounter => {
                InformationElement::TestSequenceCounter(LittleEndian::read_u16(&data[0..2]))
            }
            ElementKind::FileName => InformationElement::FileName(LittleEndian::read_u16(&data[0..2])),
            ElementKind::SegmentData => {
                InformationElement::SegmentData(data[..remaining_in_object].to_vec())
            }
            ElementKind::Cp16 => InformationElement::Cp16(Cp16Time2a::decode(data)?),
            ElementKind::Cp24 => InformationElement::Cp24(Cp24Time2a::decode(data)?),
            ElementKind::Cp56 => InformationElement::Cp56(Cp56Time2a::decode(data)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cp56_roundtrip_v09_regression() {
        // Regression guard: milliseconds must occupy the low two bytes,
        // LSB first, independent of the minute/invalid byte.
        let t = Cp56Time2a {
            milliseconds: 45_678,
            minutes: 30,
            invalid: false,
            hours: 12,
            summer_time: true,
            day: 15,
            day_of_week: 3,
            month: 6,
            year: 24,
        };
        let bytes = t.encode_bytes();
        assert_eq!(bytes[0], (45_678u16 & 0xFF) as u8);
        assert_eq!(bytes[1], (45_678u16 >> 8) as u8);
        let decoded = Cp56Time2a::decode(&bytes).unwrap();
        assert_eq!(decoded, t);
    }

    #[test]
    fn cp56_roundtrip_via_chrono() {
        use chrono::TimeZone;
        let dt = chrono::Utc.with_ymd_and_hms(2035, 7, 4, 8, 15, 27).unwrap()
            + chrono::Duration::milliseconds(123);
        let tag = Cp56Time2a::from_datetime(dt);
        let bytes = tag.encode_bytes();
        let decoded = Cp56Time2a::decode(&bytes).unwrap();
        assert_eq!(decoded, tag);
        let back = decoded.to_datetime().unwrap();
        assert_eq!(back.timestamp_millis(), dt.timestamp_millis());
    }

    #[test]
    fn scaled_value_roundtrip() {
        let e = InformationElement::ScaledValue {
            raw: -1234,
            quality: MeasuredQuality::new(),
        };
        let mut buf = Vec::new();
        e.encode(&mut buf);
        assert_eq!(buf.len(), 3);
        let decoded = InformationElement::decode(ElementKind::ScaledValue, &buf, 0).unwrap();
        assert_eq!(decoded, e);
    }

    #[test]
    fn single_command_bits() {
        let e = InformationElement::SingleCommand {
            on: true,
            qualifier: 5,
            select: true,
        };
        let mut buf = Vec::new();
        e.encode(&mut buf);
        assert_eq!(buf[0], 0x80 | (5 << 2) | 0x01);
        let decoded = InformationElement::decode(ElementKind::SingleCommand, &buf, 0).unwrap();
        assert_eq!(decoded, e);
    }

    #[test]
    fn segment_data_consumes_remainder() {
        let raw = vec![1u8, 2, 3, 4];
        let e = InformationElement::decode(ElementKind::SegmentData, &raw, raw.len()).unwrap();
        assert_eq!(e.wire_len(), 4);
    }

    #[test]
    fn truncated_element_is_malformed_payload() {
        let err = InformationElement::decode(ElementKind::ShortFloat, &[0, 1], 0).unwrap_err();
        assert!(matches!(err, IecError::MalformedPayload(_)));
    }
}
