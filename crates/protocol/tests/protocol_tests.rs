//! Integration tests for the value codec, datasets and container framing
//!
//! Run with: `cargo test -p protocol --test protocol_tests`

use protocol::codes::{container as kind, operation, response};
use protocol::container::{
    ContainerKind, HEADER_LEN, decode_header, decode_params, encode_command, encode_data,
};
use protocol::{
    CodecError, DataType, DevicePropDesc, PropForm, Request, Response, Value, decode_value,
    encode_value, read_value,
};

// ============================================================================
// Value codec
// ============================================================================

#[test]
fn test_scalar_round_trip_boundaries() {
    let cases: &[(&str, DataType, Value)] = &[
        ("-128", DataType::Int8, Value::Int8(i8::MIN)),
        ("255", DataType::UInt8, Value::UInt8(u8::MAX)),
        ("-32768", DataType::Int16, Value::Int16(i16::MIN)),
        ("65535", DataType::UInt16, Value::UInt16(u16::MAX)),
        ("2147483647", DataType::Int32, Value::Int32(i32::MAX)),
        ("0", DataType::UInt32, Value::UInt32(0)),
        ("-9223372036854775808", DataType::Int64, Value::Int64(i64::MIN)),
        ("18446744073709551615", DataType::UInt64, Value::UInt64(u64::MAX)),
    ];

    for (text, data_type, expected) in cases {
        let bytes = encode_value(text, *data_type).unwrap();
        assert_eq!(bytes.len(), data_type.scalar_width().unwrap());
        assert_eq!(&decode_value(&bytes, *data_type).unwrap(), expected);
        assert_eq!(expected.to_string(), *text);
    }
}

#[test]
fn test_overflow_is_invalid_value() {
    assert_eq!(
        encode_value("65536", DataType::UInt16),
        Err(CodecError::InvalidValue {
            value: "65536".to_string(),
            data_type: DataType::UInt16,
        })
    );
}

#[test]
fn test_read_value_advances_reader() {
    let bytes = [0x01, 0x00, 0x02, 0x00];
    let mut reader = &bytes[..];
    assert_eq!(read_value(&mut reader, DataType::UInt16).unwrap(), Value::UInt16(1));
    assert_eq!(read_value(&mut reader, DataType::UInt16).unwrap(), Value::UInt16(2));
    assert!(reader.is_empty());
}

#[test]
fn test_array_decode_only() {
    let bytes = [1, 0, 0, 0, 7, 0];
    assert_eq!(
        decode_value(&bytes, DataType::AUInt16).unwrap(),
        Value::UInt16Array(vec![7])
    );
    assert_eq!(
        encode_value("7", DataType::AUInt16),
        Err(CodecError::UnsupportedDataType(DataType::AUInt16))
    );
}

// ============================================================================
// Datasets
// ============================================================================

#[test]
fn test_prop_desc_with_trailing_form_missing() {
    // code, type, get_set, default, current and no form flag at all
    let bytes = [0x05, 0x50, 0x04, 0x00, 0x01, 0x02, 0x00, 0x04, 0x00];
    let desc = DevicePropDesc::parse(&bytes).unwrap();
    assert_eq!(desc.data_type, DataType::UInt16);
    assert_eq!(desc.get_set, 1);
    assert_eq!(desc.factory_default, Value::UInt16(2));
    assert_eq!(desc.current, Value::UInt16(4));
    assert_eq!(desc.form, PropForm::None);
}

#[test]
fn test_prop_desc_unknown_type_code() {
    let bytes = [0x05, 0x50, 0x34, 0x12, 0x01];
    assert_eq!(
        DevicePropDesc::parse(&bytes),
        Err(CodecError::UnknownDataType(0x1234))
    );
}

// ============================================================================
// Container framing
// ============================================================================

#[test]
fn test_command_then_response_parse() {
    let command = encode_command(operation::GET_DEVICE_PROP_VALUE, 3, &[0x5005]).unwrap();
    let header = decode_header(&command).unwrap();
    assert_eq!(header.kind, ContainerKind::Command);
    assert_eq!(header.length as usize, HEADER_LEN + 4);
    assert_eq!(decode_params(&command[HEADER_LEN..]), vec![0x5005]);

    let mut reply = vec![12, 0, 0, 0];
    reply.extend_from_slice(&kind::RESPONSE.to_le_bytes());
    reply.extend_from_slice(&response::OK.to_le_bytes());
    reply.extend_from_slice(&3u32.to_le_bytes());
    let header = decode_header(&reply).unwrap();
    assert_eq!(header.kind, ContainerKind::Response);
    assert_eq!(header.code, response::OK);
    assert_eq!(header.payload_len(), 0);
}

#[test]
fn test_data_container_carries_payload() {
    let payload = vec![0xAB; 600];
    let data = encode_data(operation::SEND_CONFIG_OBJECT, 9, &payload).unwrap();
    assert_eq!(data.len(), HEADER_LEN + 600);
    let header = decode_header(&data).unwrap();
    assert_eq!(header.payload_len(), 600);
}

#[test]
fn test_request_builders() {
    let request = Request::write(operation::SEND_CONFIG_OBJECT, vec![1, 3, 0], b"abc".to_vec());
    assert_eq!(request.params, vec![1, 3, 0]);
    assert!(matches!(request.data, protocol::DataPhase::Write(ref p) if p == b"abc"));

    let response = Response {
        code: response::GENERAL_ERROR,
        ..Default::default()
    };
    assert!(!response.is_ok());
}
