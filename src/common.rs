//! Cause-of-transmission and quality-descriptor types shared by every
//! information element and ASDU header.
use serde::{Deserialize, Serialize};

/// Cause of Transmission (COT).
///
/// Packed on the wire together with the `test` and `negative_confirm` flags
/// into a single byte (bits 5..0 carry the cause code; see
/// [`crate::asdu::AsduHeader`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CauseOfTransmission {
    /// Periodic, cyclic
    Periodic = 1,
    /// Background scan
    Background = 2,
    /// Spontaneous
    Spontaneous = 3,
    /// Initialized
    Initialized = 4,
    /// Request or requested
    Request = 5,
    /// Activation
    Activation = 6,
    /// Activation confirmation
    ActivationConfirmation = 7,
    /// Deactivation
    Deactivation = 8,
    /// Deactivation confirmation
    DeactivationConfirmation = 9,
    /// Activation termination
    ActivationTermination = 10,
    /// Return information caused by a remote command
    RemoteCommand = 11,
    /// Return information caused by a local command
    LocalCommand = 12,
    /// File transfer
    FileTransfer = 13,
    /// Authentication
    Authentication = 14,
    /// Maintenance of auth. session key
    SessionKey = 15,
    /// Maintenance of user role and its auth. key
    UserRoleAndAuthKey = 16,
    /// Interrogated by station interrogation
    StationInterrogation = 20,
    /// Interrogated by group 1 interrogation
    Group1Interrogation = 21,
    /// Interrogated by group 2 interrogation
    Group2Interrogation = 22,
    /// Interrogated by group 3 interrogation
    Group3Interrogation = 23,
    /// Interrogated by group 4 interrogation
    Group4Interrogation = 24,
    /// Interrogated by group 5 interrogation
    Group5Interrogation = 25,
    /// Interrogated by group 6 interrogation
    Group6Interrogation = 26,
    /// Interrogated by group 7 interrogation
    Group7Interrogation = 27,
    /// Interrogated by group 8 interrogation
    Group8Interrogation = 28,
    /// Interrogated by group 9 interrogation
    Group9Interrogation = 29,
    /// Interrogated by group 10 interrogation
    Group10Interrogation = 30,
    /// Interrogated by group 11 interrogation
    Group11Interrogation = 31,
    /// Interrogated by group 12 interrogation
    Group12Interrogation = 32,
    /// Interrogated by group 13 interrogation
    Group13Interrogation = 33,
    /// Interrogated by group 14 interrogation
    Group14Interrogation = 34,
    /// Interrogated by group 15 interrogation
    Group15Interrogation = 35,
    /// Interrogated by group 16 interrogation
    Group16Interrogation = 36,
    /// Requested by general counter request
    GeneralCounterRequest = 37,
    /// Requested by group 1 counter request
    Group1CounterRequest = 38,
    /// Requested by group 2 counter request
    Group2CounterRequest = 39,
    /// Requested by group 3 counter request
    Group3CounterRequest = 40,
    /// Requested by group 4 counter request
    Group4CounterRequest = 41,
    /// Unknown type identification
    UnknownTypeIdentification = 44,
    /// Unknown cause of transmission
    UnknownCauseOfTransmission = 45,
    /// Unknown common address of ASDU
    UnknownCommonAddress = 46,
    /// Unknown information object address
    UnknownInfoObjAddress = 47,
}

impl CauseOfTransmission {
    /// Parse a COT from its 6-bit wire code (bits 5..0 of the COT byte).
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Periodic),
            2 => Some(Self::Background),
            3 => Some(Self::Spontaneous),
            4 => Some(Self::Initialized),
            5 => Some(Self::Request),
            6 => Some(Self::Activation),
            7 => Some(Self::ActivationConfirmation),
            8 => Some(Self::Deactivation),
            9 => Some(Self::DeactivationConfirmation),
            10 => Some(Self::ActivationTermination),
            11 => Some(Self::RemoteCommand),
            12 => Some(Self::LocalCommand),
            13 => Some(Self::FileTransfer),
            14 => Some(Self::Authentication),
            15 => Some(Self::SessionKey),
            16 => Some(Self::UserRoleAndAuthKey),
            20 => Some(Self::StationInterrogation),
            21 => Some(Self::Group1Interrogation),
            22 => Some(Self::Group2Interrogation),
            23 => Some(Self::Group3Interrogation),
            24 => Some(Self::Group4Interrogation),
            25 => Some(Self::Group5Interrogation),
            26 => Some(Self::Group6Interrogation),
            27 => Some(Self::Group7Interrogation),
            28 => Some(Self::Group8Interrogation),
            29 => Some(Self::Group9Interrogation),
            30 => Some(Self::Group10Interrogation),
            31 => Some(Self::Group11Interrogation),
            32 => Some(Self::Group12Interrogation),
            33 => Some(Self::Group13Interrogation),
            34 => Some(Self::Group14Interrogation),
            35 => Some(Self::Group15Interrogation),
            36 => Some(Self::Group16Interrogation),
            37 => Some(Self::GeneralCounterRequest),
            38 => Some(Self::Group1CounterRequest),
            39 => Some(Self::Group2CounterRequest),
            40 => Some(Self::Group3CounterRequest),
            41 => Some(Self::Group4CounterRequest),
            44 => Some(Self::UnknownTypeIdentification),
            45 => Some(Self::UnknownCauseOfTransmission),
            46 => Some(Self::UnknownCommonAddress),
            47 => Some(Self::UnknownInfoObjAddress),
            _ => None,
        }
    }

    /// Encode to the 6-bit wire code.
    pub fn to_byte(&self) -> u8 {
        *self as u8
    }
}

/// Quality descriptor attached to single- and double-point information
/// (SIQ/DIQ): no overflow bit, unlike [`MeasuredQuality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityDescriptor {
    /// Blocked (BL): value is blocked for transmission by a local lock.
    pub blocked: bool,
    /// Substituted (SB): value has been provided by the operator.
    pub substituted: bool,
    /// Not topical (NT): value is outdated.
    pub not_topical: bool,
    /// Invalid (IV): value is invalid.
    pub invalid: bool,
}

impl QualityDescriptor {
    /// A quality descriptor with every flag clear.
    pub const fn new() -> Self {
        Self {
            blocked: false,
            substituted: false,
            not_topical: false,
            invalid: false,
        }
    }

    /// Extract the quality bits from a SIQ/DIQ byte (bits 4,5,6,7).
    pub const fn from_bits(value: u8) -> Self {
        Self {
            blocked: (value & 0x10) != 0,
            substituted: (value & 0x20) != 0,
            not_topical: (value & 0x40) != 0,
            invalid: (value & 0x80) != 0,
        }
    }

    /// Pack the quality bits back into their SIQ/DIQ byte positions.
    pub const fn to_bits(&self) -> u8 {
        let mut value = 0u8;
        if self.blocked {
            value |= 0x10;
        }
        if self.substituted {
            value |= 0x20;
        }
        if self.not_topical {
            value |= 0x40;
        }
        if self.invalid {
            value |= 0x80;
        }
        value
    }

    /// `true` when every flag is clear.
    pub const fn is_good(&self) -> bool {
        !self.blocked && !self.substituted && !self.not_topical && !self.invalid
    }
}

/// Quality descriptor attached to measured values and counters (QDS): adds
/// the overflow (OV) bit that SIQ/DIQ don't carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeasuredQuality {
    /// Overflow (OV).
    pub overflow: bool,
    /// Blocked (BL).
    pub blocked: bool,
    /// Substituted (SB).
    pub substituted: bool,
    /// Not topical (NT).
    pub not_topical: bool,
    /// Invalid (IV).
    pub invalid: bool,
}

impl MeasuredQuality {
    /// A quality descriptor with every flag clear.
    pub const fn new() -> Self {
        Self {
            overflow: false,
            blocked: false,
            substituted: false,
            not_topical: false,
            invalid: false,
        }
    }

    /// Parse a full QDS byte.
    pub const fn from_byte(value: u8) -> Self {
        Self {
            overflow: (value & 0x01) != 0,
            blocked: (value & 0x10) != 0,
            substituted: (value & 0x20) != 0,
            not_topical: (value & 0x40) != 0,
            invalid: (value & 0x80) != 0,
        }
    }

    /// Encode to a QDS byte.
    pub const fn to_byte(&self) -> u8 {
        let mut value = 0u8;
        if self.overflow {
            value |= 0x01;
        }
        if self.blocked {
            value |= 0x10;
        }
        if self.substituted {
            value |= 0x20;
        }
        if self.not_topical {
            value |= 0x40;
        }
        if self.invalid {
            value |= 0x80;
        }
        value
    }

    /// `true` when every flag is clear.
    pub const fn is_good(&self) -> bool {
        !self.overflow && !self.blocked && !self.substituted && !self.not_topical && !self.invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cot_roundtrip() {
        for code in [1u8, 3, 6, 7, 20, 36, 47] {
            let cot = CauseOfTransmission::from_byte(code).unwrap();
            assert_eq!(cot.to_byte(), code);
        }
        assert!(CauseOfTransmission::from_byte(0).is_none());
        assert!(CauseOfTransmission::from_byte(63).is_none());
    }

    #[test]
    fn quality_descriptor_bits() {
        let q = QualityDescriptor::from_bits(0x90);
        assert!(q.blocked);
        assert!(q.invalid);
        assert!(!q.substituted);
        assert_eq!(q.to_bits(), 0x90);
        assert!(!q.is_good());
        assert!(QualityDescriptor::new().is_good());
    }

    #[test]
    fn measured_quality_byte() {
        let q = MeasuredQuality::from_byte(0xF1);
        assert!(q.overflow);
        assert!(q.blocked);
        assert!(q.substituted);
        assert!(q.not_topical);
        assert!(q.invalid);
        assert_eq!(q.to_byte(), 0xF1);
    }
}
