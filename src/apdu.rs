//! APCI framing: the `0x68`-prefixed length-delimited frame carrying an
//! I/S/U-format control field and, for I-frames, an [`Asdu`].
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::asdu::{Asdu, WireFormat};
use crate::error::{IecError, IecResult};

/// Start character of every APDU.
pub const START_BYTE: u8 = 0x68;
/// An APDU's length byte (excluding the two framing bytes) must fit here.
pub const MAX_APDU_LENGTH: usize = 253;

/// U-format function codes, one bit pair per STARTDT/STOPDT/TESTFR
/// activation/confirmation.
pub const STARTDT_ACT: u8 = 0x07;
pub const STARTDT_CON: u8 = 0x0B;
pub const STOPDT_ACT: u8 = 0x13;
pub const STOPDT_CON: u8 = 0x23;
pub const TESTFR_ACT: u8 = 0x43;
pub const TESTFR_CON: u8 = 0x83;

/// An unnumbered-frame function. Exactly one of these may be set in a
/// U-frame's control byte; any other combination of the six function bits
/// is a framing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UFrameFunction {
    StartDtActivation,
    StartDtConfirmation,
    StopDtActivation,
    StopDtConfirmation,
    TestFrActivation,
    TestFrConfirmation,
}

impl UFrameFunction {
    fn from_control_byte(byte: u8) -> IecResult<Self> {
        match byte {
            STARTDT_ACT => Ok(Self::StartDtActivation),
            STARTDT_CON => Ok(Self::StartDtConfirmation),
            STOPDT_ACT => Ok(Self::StopDtActivation),
            STOPDT_CON => Ok(Self::StopDtConfirmation),
            TESTFR_ACT => Ok(Self::TestFrActivation),
            TESTFR_CON => Ok(Self::TestFrConfirmation),
            other => Err(IecError::MalformedApdu(format!(
                "control byte {:#04X} does not set exactly one U-frame function bit",
                other
            ))),
        }
    }

    fn to_control_byte(self) -> u8 {
        match self {
            Self::StartDtActivation => STARTDT_ACT,
            Self::StartDtConfirmation => STARTDT_CON,
            Self::StopDtActivation => STOPDT_ACT,
            Self::StopDtConfirmation => STOPDT_CON,
            Self::TestFrActivation => TESTFR_ACT,
            Self::TestFrConfirmation => TESTFR_CON,
        }
    }
}

/// The Application Protocol Control Information: which of the three frame
/// formats this APDU is, and its sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    /// Information transfer format: carries an ASDU and both sequence
    /// counters.
    IFrame { send_seq: u16, recv_seq: u16 },
    /// Supervisory format: acknowledges received I-frames without
    /// incrementing the send counter.
    SFrame { recv_seq: u16 },
    /// Unnumbered control format: connection lifecycle handshakes.
    UFrame(UFrameFunction),
}

/// A full Application Protocol Data Unit: the APCI plus, for I-frames,
/// its ASDU.
#[derive(Debug, Clone, PartialEq)]
pub struct Apdu {
    pub apci: Apci,
    pub asdu: Option<Asdu>,
}

impl Apdu {
    /// Build an I-frame.
    pub fn i_frame(send_seq: u16, recv_seq: u16, asdu: Asdu) -> Self {
        Self {
            apci: Apci::IFrame { send_seq, recv_seq },
            asdu: Some(asdu),
        }
    }

    /// Build an S-frame.
    pub fn s_frame(recv_seq: u16) -> Self {
        Self {
            apci: Apci::SFrame { recv_seq },
            asdu: None,
        }
    }

    /// Build a U-frame.
    pub fn u_frame(function: UFrameFunction) -> Self {
        Self {
            apci: Apci::UFrame(function),
            asdu: None,
        }
    }

    /// Encode the full frame, including the `0x68` start byte and length
    /// byte.
    pub fn encode(&self, format: WireFormat) -> IecResult<Vec<u8>> {
        let mut body = [0u8; 4];
        match self.apci {
            Apci::IFrame { send_seq, recv_seq } => {
                LittleEndian::write_u16(&mut body[0..2], send_seq << 1);
                LittleEndian::write_u16(&mut body[2..4], recv_seq << 1);
            }
            Apci::SFrame { recv_seq } => {
                body[0] = 0x01;
                body[1] = 0x00;
                LittleEndian::write_u16(&mut body[2..4], recv_seq << 1);
            }
            Apci::UFrame(function) => {
                body[0] = function.to_control_byte();
            }
        }

        let mut asdu_bytes = Vec::new();
        if let Some(asdu) = &self.asdu {
            asdu_bytes = asdu.encode(format)?;
        }

        let length = 4 + asdu_bytes.len();
        if length > MAX_APDU_LENGTH {
            return Err(IecError::MalformedApdu(format!(
                "encoded APDU length {} exceeds {}",
                length, MAX_APDU_LENGTH
            )));
        }

        let mut out = Vec::with_capacity(2 + length);
        out.push(START_BYTE);
        out.push(length as u8);
        out.extend_from_slice(&body);
        out.extend_from_slice(&asdu_bytes);
        Ok(out)
    }

    /// Decode a complete frame (start byte, length byte, control field,
    /// and ASDU bytes all present in `data`).
    pub fn decode(data: &[u8], format: WireFormat) -> IecResult<Self> {
        if data.len() < 6 {
            return Err(IecError::MalformedApdu("frame shorter than the 6-byte minimum".into()));
        }
        if data[0] != START_BYTE {
            return Err(IecError::MalformedApdu(format!(
                "expected start byte {:#04X}, got {:#04X}",
                START_BYTE, data[0]
            )));
        }
        let length = data[1] as usize;
        if length < 4 {
            return Err(IecError::MalformedApdu(format!(
                "length byte {} is below the 4-byte control field", length
            )));
        }
        if data.len() < 2 + length {
            return Err(IecError::MalformedApdu(format!(
                "frame declares {} body bytes but only {} are present",
                length,
                data.len() - 2
            )));
        }

        let control = &data[2..6];
        let rest = &data[6..2 + length];

        if (control[0] & 0x01) == 0 {
            let send_seq = (((control[1] as u16) << 7) | (control[0] as u16 >> 1)) & 0x7FFF;
            let recv_seq = (((control[3] as u16) << 7) | (control[2] as u16 >> 1)) & 0x7FFF;
            let asdu = if rest.is_empty() {
                None
            } else {
                Some(Asdu::decode(rest, format)?)
            };
            Ok(Self {
                apci: Apci::IFrame { send_seq, recv_seq },
                asdu,
            })
        } else if (control[0] & 0x03) == 0x01 {
            let recv_seq = (((control[3] as u16) << 7) | (control[2] as u16 >> 1)) & 0x7FFF;
            Ok(Self {
                apci: Apci::SFrame { recv_seq },
                asdu: None,
            })
        } else {
            let function = UFrameFunction::from_control_byte(control[0])?;
            Ok(Self {
                apci: Apci::UFrame(function),
                asdu: None,
            })
        }
    }

    /// Read one complete APDU off an async byte stream, bounding the wait
    /// for a fragmented frame by `fragment_timeout`.
    ///
    /// The first two bytes (start + length) are read with no deadline —
    /// that wait is governed by the connection's idle timer (t3) — but
    /// once a length byte has been seen, the remaining body must arrive
    /// within `fragment_timeout` or the read fails with
    /// [`IecError::FragmentTimeout`].
    pub async fn read_from<R>(
        reader: &mut R,
        format: WireFormat,
        fragment_timeout: Duration,
    ) -> IecResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; 2];
        reader.read_exact(&mut header).await?;
        if header[0] != START_BYTE {
            return Err(IecError::MalformedApdu(format!(
                "expected start byte {:#04X}, got {:#04X}",
                START_BYTE, header[0]
            )));
        }
        let length = header[1] as usize;
        if length < 4 {
            return Err(IecError::MalformedApdu(format!(
                "length byte {} is below the 4-byte control field", length
            )));
        }

        let mut body = vec![0u8; length];
        timeout(fragment_timeout, reader.read_exact(&mut body))
            .await
            .map_err(|_| IecError::FragmentTimeout)??;

        let mut frame = Vec::with_capacity(2 + length);
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&body);
        Self::decode(&frame, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use crate::asdu::{Asdu, TypeId};
    use crate::common::CauseOfTransmission;
    use crate::asdu::InformationObject;
    use crate::elements::InformationElement;

    #[test]
    fn scenario_s1_startdt_activation_bytes() {
        let apdu = Apdu::u_frame(UFrameFunction::StartDtActivation);
        let encoded = apdu.encode(WireFormat::default()).unwrap();
        assert_eq!(encoded, vec![0x68, 0x04, 0x07, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn i_frame_sequence_numbers_roundtrip() {
        let asdu = Asdu::new(
            TypeId::CIcNa1,
            false,
            CauseOfTransmission::Activation,
            0,
            1,
            vec![InformationObject::new(0, vec![InformationElement::QualifierOfInterrogation(20)])],
        );
        let apdu = Apdu::i_frame(12345, 6789, asdu);
        let format = WireFormat::default();
        let encoded = apdu.encode(format).unwrap();
        let decoded = Apdu::decode(&encoded, format).unwrap();
        match decoded.apci {
            Apci::IFrame { send_seq, recv_seq } => {
                assert_eq!(send_seq, 12345);
                assert_eq!(recv_seq, 6789);
            }
            _ => panic!("expected I-frame"),
        }
        assert!(decoded.asdu.is_some());
    }

    #[test]
    fn sequence_number_wraps_at_15_bits() {
        let asdu = Asdu::new(
            TypeId::CIcNa1,
            false,
            CauseOfTransmission::Activation,
            0,
            1,
            vec![InformationObject::new(0, vec![InformationElement::QualifierOfInterrogation(20)])],
        );
        let apdu = Apdu::i_frame(0x7FFF, 0, asdu);
        let encoded = apdu.encode(WireFormat::default()).unwrap();
        let decoded = Apdu::decode(&encoded, WireFormat::default()).unwrap();
        match decoded.apci {
            Apci::IFrame { send_seq, .. } => assert_eq!(send_seq, 0x7FFF),
            _ => panic!("expected I-frame"),
        }
    }

    #[test]
    fn s_frame_roundtrip() {
        let apdu = Apdu::s_frame(42);
        let encoded = apdu.encode(WireFormat::default()).unwrap();
        let decoded = Apdu::decode(&encoded, WireFormat::default()).unwrap();
        assert_eq!(decoded.apci, Apci::SFrame { recv_seq: 42 });
        assert!(decoded.asdu.is_none());
    }

    #[test]
    fn bad_start_byte_is_malformed() {
        let err = Apdu::decode(&[0x00, 0x04, 0x07, 0x00, 0x00, 0x00], WireFormat::default()).unwrap_err();
        assert!(matches!(err, IecError::MalformedApdu(_)));
    }

    #[test]
    fn ambiguous_u_frame_control_byte_is_malformed() {
        // bits 2..7 set no recognised single function.
        let err = Apdu::decode(&[0x68, 0x04, 0xFF, 0x00, 0x00, 0x00], WireFormat::default()).unwrap_err();
        assert!(matches!(err, IecError::MalformedApdu(_)));
    }

    #[test]
    fn truncated_frame_body_is_malformed() {
        let err = Apdu::decode(&[0x68, 0x08, 0x07, 0x00, 0x00, 0x00], WireFormat::default()).unwrap_err();
        assert!(matches!(err, IecError::MalformedApdu(_)));
    }

    #[tokio::test]
    async fn read_from_times_out_on_a_stalled_fragment() {
        // Only the header arrives; the body never does.
        let (mut writer, mut reader) = tokio::io::duplex(64);
        writer.write_all(&[0x68, 0x04]).await.unwrap();
        let result = Apdu::read_from(
            &mut reader,
            WireFormat::default(),
            Duration::from_millis(20),
        )
        .await;
        assert!(matches!(result, Err(IecError::FragmentTimeout)));
        drop(writer);
    }
}
