use chrono::{DateTime, Datelike, Local, Offset, TimeZone, Timelike};
use num_enum::IntoPrimitive;
use uuid::Uuid;

/// GoPro primary service, advertised while the camera is awake.
pub const CAMERA_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000fea6_0000_1000_8000_00805f9b34fb);

/// All camera characteristics share one 128-bit template with a 16-bit short
/// code in the first field: `b5f9xxxx-aa8d-11e3-9046-0002a5d5c51b`.
pub const fn characteristic_uuid(short: u16) -> Uuid {
    Uuid::from_u128(0xb5f90000_aa8d_11e3_9046_0002a5d5c51b | ((short as u128) << 96))
}

/// Short codes for the seven characteristics the session uses.
pub const CHAR_AP_SSID: u16 = 0x0002;
pub const CHAR_AP_PASSWORD: u16 = 0x0003;
pub const CHAR_AP_STATE: u16 = 0x0005;
pub const CHAR_COMMAND_REQ: u16 = 0x0072;
pub const CHAR_COMMAND_RES: u16 = 0x0073;
pub const CHAR_KEEPALIVE_REQ: u16 = 0x0074;
pub const CHAR_KEEPALIVE_RES: u16 = 0x0075;

/// Fixed keepalive payload sent on the heartbeat channel.
pub const KEEPALIVE_PAYLOAD: [u8; 3] = [0x5B, 0x01, 0x42];

/// Command opcodes understood by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Sleep = 0x05,
    SetLocalDate = 0x0F,
    SetApState = 0x17,
    GetHardwareInfo = 0x3C,
}

/// Wall-clock snapshot in the layout the set-date command expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// UTC offset in device units, see [`encode_utc_offset`].
    pub tz: u16,
    /// 1 when daylight saving is in effect.
    pub dst: u8,
}

impl LocalDate {
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    fn from_datetime(now: &DateTime<Local>) -> Self {
        // Offset in the UTC-minus-local convention: negative east of UTC.
        let offset_min = -(now.offset().fix().local_minus_utc() / 60);
        let jan = reference_offset_min(now.year(), 1);
        let jul = reference_offset_min(now.year(), 7);
        LocalDate {
            year: now.year() as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
            tz: encode_utc_offset(offset_min),
            dst: dst_flag(offset_min, jan, jul),
        }
    }
}

/// UTC-minus-local offset on the first of `month`, in minutes.
fn reference_offset_min(year: i32, month: u32) -> i32 {
    Local
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .earliest()
        .map(|dt| -(dt.offset().fix().local_minus_utc() / 60))
        .unwrap_or(0)
}

/// Encode a UTC-minus-local offset (minutes) into the camera's 16-bit unit.
///
/// The two's-complement negation is applied exactly when the offset is
/// positive (local behind UTC). Kept bit-for-bit with the behavior the real
/// device accepts; the sign convention must not be changed without verifying
/// against hardware.
pub fn encode_utc_offset(utc_minus_local_min: i32) -> u16 {
    let tz = utc_minus_local_min.unsigned_abs() as u16;
    if utc_minus_local_min > 0 { 1u16.wrapping_add(!tz) } else { tz }
}

/// Daylight saving is in effect when the current offset is further ahead of
/// UTC than both the January-1 and July-1 reference offsets.
pub fn dst_flag(current_min: i32, jan_min: i32, jul_min: i32) -> u8 {
    if current_min < jan_min.max(jul_min) { 1 } else { 0 }
}

/// Control commands issued on the Command endpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Turn the camera's access point on or off.
    SetApState(bool),
    /// Set the camera's local date, time and timezone.
    SetLocalDate(LocalDate),
    /// Power the camera down.
    Sleep,
    /// Query hardware identity; answered in five packets.
    GetHardwareInfo,
}

impl Command {
    /// Payload bytes, before the channel adds its length-byte framing.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Command::SetApState(enabled) => {
                vec![Opcode::SetApState.into(), 0x01, *enabled as u8]
            }
            Command::SetLocalDate(date) => {
                let mut payload = Vec::with_capacity(12);
                payload.push(Opcode::SetLocalDate.into());
                payload.push(0x0A);
                payload.extend_from_slice(&date.year.to_be_bytes());
                payload.extend_from_slice(&[
                    date.month,
                    date.day,
                    date.hour,
                    date.minute,
                    date.second,
                ]);
                payload.extend_from_slice(&date.tz.to_be_bytes());
                payload.push(date.dst);
                payload
            }
            Command::Sleep => vec![Opcode::Sleep.into()],
            Command::GetHardwareInfo => vec![Opcode::GetHardwareInfo.into()],
        }
    }

    /// Number of notification packets the camera answers with.
    pub fn response_packets(&self) -> usize {
        match self {
            Command::GetHardwareInfo => 5,
            _ => 1,
        }
    }
}
