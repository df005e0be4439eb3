//! Tests for characteristic addressing, command encoding and clock math.

use gpcam_lib::protocol::{
    CAMERA_SERVICE_UUID, Command, KEEPALIVE_PAYLOAD, LocalDate, characteristic_uuid,
    dst_flag, encode_utc_offset,
};

#[test]
fn characteristic_uuids_follow_the_template() {
    assert_eq!(
        characteristic_uuid(0x0072).to_string(),
        "b5f90072-aa8d-11e3-9046-0002a5d5c51b"
    );
    assert_eq!(
        characteristic_uuid(0x0002).to_string(),
        "b5f90002-aa8d-11e3-9046-0002a5d5c51b"
    );
    assert_eq!(
        CAMERA_SERVICE_UUID.to_string(),
        "0000fea6-0000-1000-8000-00805f9b34fb"
    );
}

#[test]
fn fixed_commands_encode_their_opcode_table_payloads() {
    assert_eq!(Command::SetApState(true).payload(), [0x17, 0x01, 0x01]);
    assert_eq!(Command::SetApState(false).payload(), [0x17, 0x01, 0x00]);
    assert_eq!(Command::Sleep.payload(), [0x05]);
    assert_eq!(Command::GetHardwareInfo.payload(), [0x3C]);
    assert_eq!(KEEPALIVE_PAYLOAD, [0x5B, 0x01, 0x42]);
}

#[test]
fn only_the_info_command_expects_a_multi_packet_response() {
    assert_eq!(Command::GetHardwareInfo.response_packets(), 5);
    assert_eq!(Command::Sleep.response_packets(), 1);
    assert_eq!(Command::SetApState(true).response_packets(), 1);
}

#[test]
fn set_date_payload_has_the_fixed_ten_byte_layout() {
    let date = LocalDate {
        year: 2024,
        month: 7,
        day: 15,
        hour: 13,
        minute: 5,
        second: 42,
        tz: 120,
        dst: 0,
    };
    assert_eq!(
        Command::SetLocalDate(date).payload(),
        [0x0F, 0x0A, 0x07, 0xE8, 7, 15, 13, 5, 42, 0x00, 0x78, 0]
    );
}

#[test]
fn utc_offset_keeps_the_device_sign_convention() {
    // Two hours east of UTC: plain magnitude.
    assert_eq!(encode_utc_offset(-120), 120);
    // Five hours west of UTC: two's-complement form.
    assert_eq!(encode_utc_offset(300), (300u16).wrapping_neg());
    assert_eq!(encode_utc_offset(0), 0);
}

#[test]
fn dst_flag_is_set_only_when_ahead_of_both_references() {
    // Central Europe: summer vs winter.
    assert_eq!(dst_flag(-120, -60, -120), 1);
    assert_eq!(dst_flag(-60, -60, -120), 0);
    // Eastern US: summer vs winter.
    assert_eq!(dst_flag(240, 300, 240), 1);
    assert_eq!(dst_flag(300, 300, 240), 0);
    // Southern hemisphere: DST lands in January.
    assert_eq!(dst_flag(-660, -660, -600), 1);
}
