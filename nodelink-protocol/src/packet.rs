//! Command packets
//!
//! A [`Packet`] is the logical content of one received frame: a command
//! code and a borrowed view of the payload. It points into the receive
//! buffer, so it cannot outlive the next call that feeds the parser. Use
//! [`Packet::to_frame`] to keep a copy.

use crate::frame::{Frame, FrameError};

/// Node board classes sharing the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Board {
    /// Commands every node answers
    Common,
    /// Drive system and accelerometer board
    SensorActuator,
    /// Power switches, charger and USB interface board
    PowerManagement,
    /// Lift actuator, electromagnet, range finders, NFC, remote I2C
    Manipulator,
}

/// Command/telemetry type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    GetUptime = 0x00,
    GetBattLvl = 0x01,

    // Sensor/actuator: differential drive system
    SetDdsEnable = 0x10,
    SetDdsSpeed = 0x11,
    GetDdsSpeed = 0x13,
    SetDdsParams = 0x14,
    GetDdsParams = 0x15,
    // Sensor/actuator: accelerometer
    GetAccelReading = 0x20,

    // Power management: switches
    SetSystemPowerEnable = 0x39,
    SetActuatorPowerEnable = 0x40,
    SetActuatorInputLimitOverride = 0x41,
    SetUsbifEnable = 0x42,
    // Power management: other
    ReqSoftPwdn = 0x43,
    GetPmStatus = 0x44,
    GetUsbStatus = 0x45,

    // Manipulator
    GetChargerStatus = 0x60,
    // Lift actuator
    SetLiftActuatorPosition = 0x70,
    GetLiftActuatorPosition = 0x71,
    SetLiftActuatorSpeed = 0x72,
    GetLimitSwitchState = 0x73,
    CalibrateLiftActuator = 0x74,
    EmerStopLiftActuator = 0x75,
    GetLiftActuatorState = 0x76,
    // Electromagnet
    SetEmChargeEnable = 0x80,
    SetEmDischargeMode = 0x81,
    GetEmAccumVoltage = 0x82,
    // Range finders
    GetRfRange = 0x90,
    GetRfAmbient = 0x91,
    // NFC
    ReadNfc = 0xA0,
    WriteNfc = 0xA1,
    // Remote I2C (SMBus)
    ReadSmbusByte = 0xC0,
    ReadSmbusByteData = 0xC1,
    ReadSmbusWordData = 0xC2,
    ReadSmbusBlockData = 0xC3,
    ReadSmbusI2cBlockData = 0xC4,
    WriteSmbusByte = 0xD0,
    WriteSmbusByteData = 0xD1,
    WriteSmbusWordData = 0xD2,
    WriteSmbusBlockData = 0xD3,
    WriteSmbusI2cBlockData = 0xD4,

    /// Sentinel for undefined codes
    Invalid = 0xFF,
}

impl PacketType {
    /// Every defined command, in code order
    pub const ALL: [PacketType; 40] = [
        PacketType::GetUptime,
        PacketType::GetBattLvl,
        PacketType::SetDdsEnable,
        PacketType::SetDdsSpeed,
        PacketType::GetDdsSpeed,
        PacketType::SetDdsParams,
        PacketType::GetDdsParams,
        PacketType::GetAccelReading,
        PacketType::SetSystemPowerEnable,
        PacketType::SetActuatorPowerEnable,
        PacketType::SetActuatorInputLimitOverride,
        PacketType::SetUsbifEnable,
        PacketType::ReqSoftPwdn,
        PacketType::GetPmStatus,
        PacketType::GetUsbStatus,
        PacketType::GetChargerStatus,
        PacketType::SetLiftActuatorPosition,
        PacketType::GetLiftActuatorPosition,
        PacketType::SetLiftActuatorSpeed,
        PacketType::GetLimitSwitchState,
        PacketType::CalibrateLiftActuator,
        PacketType::EmerStopLiftActuator,
        PacketType::GetLiftActuatorState,
        PacketType::SetEmChargeEnable,
        PacketType::SetEmDischargeMode,
        PacketType::GetEmAccumVoltage,
        PacketType::GetRfRange,
        PacketType::GetRfAmbient,
        PacketType::ReadNfc,
        PacketType::WriteNfc,
        PacketType::ReadSmbusByte,
        PacketType::ReadSmbusByteData,
        PacketType::ReadSmbusWordData,
        PacketType::ReadSmbusBlockData,
        PacketType::ReadSmbusI2cBlockData,
        PacketType::WriteSmbusByte,
        PacketType::WriteSmbusByteData,
        PacketType::WriteSmbusWordData,
        PacketType::WriteSmbusBlockData,
        PacketType::WriteSmbusI2cBlockData,
    ];

    /// Look up a wire code
    ///
    /// Undefined codes map to [`PacketType::Invalid`].
    pub fn from_u8(code: u8) -> Self {
        use PacketType::*;

        match code {
            0x00 => GetUptime,
            0x01 => GetBattLvl,
            0x10 => SetDdsEnable,
            0x11 => SetDdsSpeed,
            0x13 => GetDdsSpeed,
            0x14 => SetDdsParams,
            0x15 => GetDdsParams,
            0x20 => GetAccelReading,
            0x39 => SetSystemPowerEnable,
            0x40 => SetActuatorPowerEnable,
            0x41 => SetActuatorInputLimitOverride,
            0x42 => SetUsbifEnable,
            0x43 => ReqSoftPwdn,
            0x44 => GetPmStatus,
            0x45 => GetUsbStatus,
            0x60 => GetChargerStatus,
            0x70 => SetLiftActuatorPosition,
            0x71 => GetLiftActuatorPosition,
            0x72 => SetLiftActuatorSpeed,
            0x73 => GetLimitSwitchState,
            0x74 => CalibrateLiftActuator,
            0x75 => EmerStopLiftActuator,
            0x76 => GetLiftActuatorState,
            0x80 => SetEmChargeEnable,
            0x81 => SetEmDischargeMode,
            0x82 => GetEmAccumVoltage,
            0x90 => GetRfRange,
            0x91 => GetRfAmbient,
            0xA0 => ReadNfc,
            0xA1 => WriteNfc,
            0xC0 => ReadSmbusByte,
            0xC1 => ReadSmbusByteData,
            0xC2 => ReadSmbusWordData,
            0xC3 => ReadSmbusBlockData,
            0xC4 => ReadSmbusI2cBlockData,
            0xD0 => WriteSmbusByte,
            0xD1 => WriteSmbusByteData,
            0xD2 => WriteSmbusWordData,
            0xD3 => WriteSmbusBlockData,
            0xD4 => WriteSmbusI2cBlockData,
            _ => Invalid,
        }
    }

    /// Wire code
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Board class that implements this command
    pub fn board(self) -> Option<Board> {
        match self.as_u8() {
            0xFF => None,
            0x00..=0x0F => Some(Board::Common),
            0x10..=0x2F => Some(Board::SensorActuator),
            0x30..=0x5F => Some(Board::PowerManagement),
            _ => Some(Board::Manipulator),
        }
    }

    /// True for commands that read state back from the node
    pub fn is_query(self) -> bool {
        use PacketType::*;

        matches!(
            self,
            GetUptime
                | GetBattLvl
                | GetDdsSpeed
                | GetDdsParams
                | GetAccelReading
                | GetPmStatus
                | GetUsbStatus
                | GetChargerStatus
                | GetLiftActuatorPosition
                | GetLimitSwitchState
                | GetLiftActuatorState
                | GetEmAccumVoltage
                | GetRfRange
                | GetRfAmbient
                | ReadNfc
                | ReadSmbusByte
                | ReadSmbusByteData
                | ReadSmbusWordData
                | ReadSmbusBlockData
                | ReadSmbusI2cBlockData
        )
    }
}

impl From<u8> for PacketType {
    fn from(code: u8) -> Self {
        PacketType::from_u8(code)
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> Self {
        packet_type.as_u8()
    }
}

/// A validated packet borrowed from a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet<'a> {
    type_id: u8,
    data: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Create a packet view over a payload
    ///
    /// Fails if the payload cannot be described by the 1-byte LENGTH field.
    pub fn new(type_id: u8, data: &'a [u8]) -> Result<Self, FrameError> {
        if data.len() > u8::MAX as usize {
            return Err(FrameError::PayloadTooLarge);
        }
        Ok(Self { type_id, data })
    }

    /// Length is already known to fit in a byte
    pub(crate) fn from_parts(type_id: u8, data: &'a [u8]) -> Self {
        Self { type_id, data }
    }

    /// Typed command code
    pub fn packet_type(&self) -> PacketType {
        PacketType::from_u8(self.type_id)
    }

    /// Raw command code as received
    pub fn type_id(&self) -> u8 {
        self.type_id
    }

    /// Whether the packet carries any payload
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Payload length (the LENGTH field)
    pub fn data_length(&self) -> u8 {
        self.data.len() as u8
    }

    /// Payload bytes; empty when the length is zero
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// First payload byte, for single-argument commands
    pub fn first_byte(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Copy the packet out of the receive buffer
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        Frame::new(self.type_id, self.data)
    }
}
