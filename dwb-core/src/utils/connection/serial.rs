//! Host Command Frames
//!
//! The navigation host drives the bot over a serial link with fixed 14-byte
//! little-endian packets:
//!
//! | byte  | field                 |
//! |-------|-----------------------|
//! | 0     | command id            |
//! | 1     | wheel index           |
//! | 2..6  | `p1` (`f32`)          |
//! | 6..10 | `p2` (`f32`)          |
//! | 10..14| `p3` (`f32`, unused)  |
//!
//! Frames starting with `{` are parsed as JSON `DriveCommand`s instead.

use crate::utils::controllers::{drivetrain::WheelPosition, DriveCommand};

/// Size of a binary command packet.
pub const PACKET_LEN: usize = 14;

/// Command ids of the binary packet.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    TurnWheel = 0,
    TurnWhileMoving = 1,
    TurnInPlace = 2,
    DriveStraight = 3,
    DriveMeters = 4,
    Reverse = 5,
}

impl TryFrom<u8> for CommandId {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => CommandId::TurnWheel,
            1 => CommandId::TurnWhileMoving,
            2 => CommandId::TurnInPlace,
            3 => CommandId::DriveStraight,
            4 => CommandId::DriveMeters,
            5 => CommandId::Reverse,
            other => return Err(DecodeError::UnknownCommand(other)),
        })
    }
}

/// Errors produced while decoding a host frame.
#[derive(Debug)]
pub enum DecodeError {
    Length { expected: usize, actual: usize },
    UnknownCommand(u8),
    UnknownWheel(u8),
    Json(serde_json::Error),
}

/// Decode one binary command packet.
pub fn decode_packet(bytes: &[u8]) -> Result<DriveCommand, DecodeError> {
    let packet: &[u8; PACKET_LEN] = bytes.try_into().map_err(|_| DecodeError::Length {
        expected: PACKET_LEN,
        actual: bytes.len(),
    })?;

    let param = |i: usize| {
        let at = 2 + 4 * i;
        f32::from_le_bytes([packet[at], packet[at + 1], packet[at + 2], packet[at + 3]])
    };
    let (p1, p2) = (param(0), param(1));

    Ok(match CommandId::try_from(packet[0])? {
        CommandId::TurnWheel => DriveCommand::TurnWheel {
            wheel: WheelPosition::from_index(packet[1])
                .ok_or(DecodeError::UnknownWheel(packet[1]))?,
            angle: p1,
            speed: p2,
        },
        CommandId::TurnWhileMoving => DriveCommand::TurnWhileMoving {
            radius: p1,
            speed: p2,
        },
        CommandId::TurnInPlace => DriveCommand::TurnInPlace {
            theta: p1,
            speed: p2,
        },
        CommandId::DriveStraight => DriveCommand::DriveStraight { velocity: p1 },
        CommandId::DriveMeters => DriveCommand::DriveMeters {
            displacement: p1,
            speed: p2,
        },
        CommandId::Reverse => DriveCommand::Reverse { velocity: p1 },
    })
}

/// Decode a host frame, either a binary packet or a JSON command.
pub fn decode_frame(bytes: &[u8]) -> Result<DriveCommand, DecodeError> {
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'{') {
        return serde_json::from_slice(bytes).map_err(DecodeError::Json);
    }
    decode_packet(bytes)
}
