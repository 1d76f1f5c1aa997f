//! # Wired Frame Layer
//!
//! Parses and packs the three EN 13757-2 frame shapes: the single character
//! acknowledgment (0xE5), the short frame (0x10) and the long frame (0x68).
//! Parsing validates the envelope geometry: both length fields, the repeated
//! start marker and the total length. The additive checksum and the stop
//! byte are a transport concern and are checked separately by
//! [`Frame::verify_checksum`], so a header-consistent frame always parses.

use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::IResult;
use serde::Serialize;

use crate::constants::{
    FRAME_SINGLE_CHAR, FRAME_START_LONG, FRAME_START_SHORT, FRAME_STOP,
};
use crate::error::FrameError;

/// A validated data-link frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Frame {
    /// Single character acknowledgment.
    Ack,
    /// Short frame: control and address, no payload.
    Short { control: u8, address: u8 },
    /// Long frame: the payload starts at the CI field.
    Long {
        control: u8,
        address: u8,
        payload: Vec<u8>,
    },
}

impl Frame {
    /// Parses a complete frame from `buffer`. The buffer must hold exactly
    /// one frame; trailing bytes are a length error, not ignored.
    pub fn parse(buffer: &[u8]) -> Result<Frame, FrameError> {
        let start = *buffer.first().ok_or(FrameError::Truncated {
            needed: 1,
            actual: 0,
        })?;
        match start {
            FRAME_SINGLE_CHAR => {
                if buffer.len() != 1 {
                    return Err(FrameError::LengthMismatch {
                        declared: 1,
                        actual: buffer.len(),
                    });
                }
                Ok(Frame::Ack)
            }
            FRAME_START_SHORT => parse_short(buffer),
            FRAME_START_LONG => parse_long(buffer),
            byte => Err(FrameError::UnknownStartByte(byte)),
        }
    }

    /// Validates the additive checksum and the stop byte of the raw
    /// telegram this frame was parsed from. Kept out of [`Frame::parse`] so
    /// that callers relaying frames from checksummed transports are not
    /// forced to re-verify; [`crate::decode_telegram`] always verifies.
    pub fn verify_checksum(&self, buffer: &[u8]) -> Result<(), FrameError> {
        let (summed, checksum_pos) = match self {
            Frame::Ack => return Ok(()),
            Frame::Short { .. } => (1..3, 3),
            Frame::Long { payload, .. } => (4..6 + payload.len(), 6 + payload.len()),
        };
        if buffer.len() < checksum_pos + 2 {
            return Err(FrameError::Truncated {
                needed: checksum_pos + 2,
                actual: buffer.len(),
            });
        }
        let stop = buffer[checksum_pos + 1];
        if stop != FRAME_STOP {
            return Err(FrameError::MissingStopByte(stop));
        }
        let calculated = checksum_over(&buffer[summed]);
        if buffer[checksum_pos] != calculated {
            return Err(FrameError::InvalidChecksum {
                expected: buffer[checksum_pos],
                calculated,
            });
        }
        Ok(())
    }

    /// The application payload: empty except for long frames, where it
    /// starts at the CI field.
    pub fn payload(&self) -> &[u8] {
        match self {
            Frame::Long { payload, .. } => payload,
            _ => &[],
        }
    }

    /// Packs the frame back into wire bytes, checksum included.
    pub fn pack(&self) -> Vec<u8> {
        match self {
            Frame::Ack => vec![FRAME_SINGLE_CHAR],
            Frame::Short { control, address } => vec![
                FRAME_START_SHORT,
                *control,
                *address,
                control.wrapping_add(*address),
                FRAME_STOP,
            ],
            Frame::Long {
                control,
                address,
                payload,
            } => {
                let length = payload.len() as u8 + 2;
                let mut out = Vec::with_capacity(payload.len() + 8);
                out.extend_from_slice(&[FRAME_START_LONG, length, length, FRAME_START_LONG]);
                out.push(*control);
                out.push(*address);
                out.extend_from_slice(payload);
                out.push(checksum_over(&out[4..]));
                out.push(FRAME_STOP);
                out
            }
        }
    }
}

fn checksum_over(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

fn parse_short(buffer: &[u8]) -> Result<Frame, FrameError> {
    if buffer.len() < 5 {
        return Err(FrameError::Truncated {
            needed: 5,
            actual: buffer.len(),
        });
    }
    if buffer.len() != 5 {
        return Err(FrameError::LengthMismatch {
            declared: 5,
            actual: buffer.len(),
        });
    }
    Ok(Frame::Short {
        control: buffer[1],
        address: buffer[2],
    })
}

fn parse_long(buffer: &[u8]) -> Result<Frame, FrameError> {
    if buffer.len() < 9 {
        return Err(FrameError::Truncated {
            needed: 9,
            actual: buffer.len(),
        });
    }
    let (length1, length2) = (buffer[1], buffer[2]);
    if length1 != length2 {
        return Err(FrameError::LengthFieldMismatch { length1, length2 });
    }
    if length1 < 3 {
        return Err(FrameError::InvalidLengthField(length1));
    }
    if buffer[3] != FRAME_START_LONG {
        return Err(FrameError::MissingStartMarker {
            offset: 3,
            byte: buffer[3],
        });
    }
    let length = usize::from(length1);
    if buffer.len() != length + 6 {
        return Err(FrameError::LengthMismatch {
            declared: length,
            actual: buffer.len().saturating_sub(6),
        });
    }
    let (_, (control, address, payload)) =
        long_frame_body(&buffer[4..], length).map_err(|_| FrameError::Truncated {
            needed: length + 6,
            actual: buffer.len(),
        })?;
    Ok(Frame::Long {
        control,
        address,
        payload: payload.to_vec(),
    })
}

fn long_frame_body(input: &[u8], length: usize) -> IResult<&[u8], (u8, u8, &[u8])> {
    let (input, control) = be_u8(input)?;
    let (input, address) = be_u8(input)?;
    let (input, payload) = take(length - 2)(input)?;
    Ok((input, (control, address, payload)))
}
