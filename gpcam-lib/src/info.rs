use bytes::Bytes;

use crate::error::GpError;

/// Hardware identity reported by the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    /// Model id, rendered as colon-separated hex byte pairs.
    pub model: String,
    pub board: String,
    pub firmware: String,
    pub serial: String,
    /// SSID the camera's access point will advertise.
    pub ssid: String,
    /// BSSID (AP MAC) as the camera reports it.
    pub bssid: String,
}

/// Fields start at this offset in the reassembled buffer.
const FIELDS_OFFSET: usize = 3;

impl DeviceInfo {
    /// Reassemble the five-packet hardware info response and decode its
    /// length-prefixed fields.
    ///
    /// Each packet leads with a continuation marker that is not part of the
    /// stream; the remainders are concatenated and parsed in the fixed order
    /// model, name, board, firmware, serial, ap-ssid, ap-bssid.
    pub fn decode(packets: &[Bytes]) -> Result<Self, GpError> {
        let mut buffer = Vec::new();
        for packet in packets {
            if packet.is_empty() {
                return Err(GpError::Protocol("empty hardware info packet".to_string()));
            }
            buffer.extend_from_slice(&packet[1..]);
        }

        let mut cursor = FieldCursor::new(&buffer, FIELDS_OFFSET);
        let model = cursor
            .take()?
            .iter()
            .map(|b| hex::encode([*b]))
            .collect::<Vec<_>>()
            .join(":");
        let name = cursor.take_utf8()?;
        let board = cursor.take_utf8()?;
        let firmware = cursor.take_utf8()?;
        let serial = cursor.take_utf8()?;
        let ssid = cursor.take_utf8()?;
        let bssid = cursor.take_utf8()?;

        Ok(DeviceInfo {
            name,
            model,
            board,
            firmware,
            serial,
            ssid,
            bssid,
        })
    }
}

/// Reads consecutive length-prefixed fields: one length byte followed by that
/// many payload bytes.
struct FieldCursor<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(buffer: &'a [u8], position: usize) -> Self {
        Self { buffer, position }
    }

    fn take(&mut self) -> Result<&'a [u8], GpError> {
        let len = *self.buffer.get(self.position).ok_or_else(|| {
            GpError::Protocol(format!("field length missing at offset {}", self.position))
        })? as usize;
        self.position += 1;
        let end = self.position + len;
        let field = self.buffer.get(self.position..end).ok_or_else(|| {
            GpError::Protocol(format!("field truncated at offset {}", self.position))
        })?;
        self.position = end;
        Ok(field)
    }

    fn take_utf8(&mut self) -> Result<String, GpError> {
        Ok(String::from_utf8_lossy(self.take()?).into_owned())
    }
}
