//! Full decodes of captured telegrams: a wired Qundis WTT16 readout and a
//! wireless demo message from the same manufacturer.

use chrono::NaiveDate;
use mbus_telegram::{
    decode_telegram, decode_wmbus, Description, DeviceType, EncryptionMode, FunctionField,
    KeyStore, TimePoint, Unit, Value,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const QUNDIS_WTT16_HEX: &str = concat!(
    "68404068080072712223106532180E17000000",
    "0C2222370000",
    "046D3010DA19",
    "06FD0C18000E002203",
    "0DFD0B053631545457",
    "326CFFFF",
    "02FA3D0001",
    "017C06545441422025",
    "61",
    "4316",
);

const WMBUS_DEMO_HEX: &str = concat!(
    "2C44653282185158",
    "2C067AE1000000",
    "046D1906D918",
    "0C1334120000",
    "426CBF1C",
    "4C1300000000",
    "326CFFFF",
    "01FD7300",
);

#[test]
fn qundis_wired_telegram() {
    init_logger();
    let telegram = hex::decode(QUNDIS_WTT16_HEX).unwrap();
    let data = decode_telegram(&telegram, &KeyStore::new()).unwrap();

    let address = data.secondary_address.as_ref().unwrap();
    assert_eq!(address.device_id().to_i64(), 10_23_22_71);
    assert_eq!(address.manufacturer(), "LSE");
    assert_eq!(address.version(), 0x18);
    assert_eq!(address.device_type(), DeviceType::BusSystemComponent);

    let header = data.short_header.unwrap();
    assert_eq!(header.access_number, 0x17);
    assert_eq!(header.status, 0x00);
    assert_eq!(header.encryption_mode, EncryptionMode::None);
    assert_eq!(header.encrypted_blocks, 0);

    assert_eq!(data.records.len(), 7);
    assert!(data.manufacturer_data.is_none());
    assert!(!data.more_records_follow);

    let on_time = &data.records[0];
    assert_eq!(on_time.description, Description::OnTime);
    assert_eq!(on_time.unit, Some(Unit::Hour));
    assert_eq!(on_time.exponent, 0);
    match &on_time.value {
        Value::Bcd(bcd) => assert_eq!(bcd.to_i64(), 3722),
        other => panic!("expected BCD on-time, got {:?}", other),
    }

    assert_eq!(
        data.records[1].value,
        Value::Timestamp(TimePoint::DateTime(
            NaiveDate::from_ymd_opt(2014, 9, 26)
                .unwrap()
                .and_hms_opt(16, 48, 0)
                .unwrap()
        ))
    );

    let model = &data.records[2];
    assert_eq!(model.description, Description::ModelVersion);
    assert_eq!(model.value, Value::Integer(3_444_564_688_920));

    let parameter_set = &data.records[3];
    assert_eq!(parameter_set.description, Description::ParameterSetId);
    assert_eq!(parameter_set.value, Value::Text("WTT16".into()));

    let error_date = &data.records[4];
    assert_eq!(error_date.function, FunctionField::Error);
    assert_eq!(error_date.description, Description::Date);
    assert_eq!(error_date.value, Value::None);

    let device_address = &data.records[5];
    assert_eq!(device_address.description, Description::Address);
    assert_eq!(device_address.value, Value::Integer(256));

    let battery = &data.records[6];
    assert_eq!(battery.description, Description::UserDefined);
    assert_eq!(battery.user_defined_description.as_deref(), Some("% BATT"));
    assert_eq!(battery.value, Value::Integer(97));
}

#[test]
fn wireless_demo_telegram() {
    init_logger();
    let frame = hex::decode(WMBUS_DEMO_HEX).unwrap();
    let message = decode_wmbus(&frame, &KeyStore::new()).unwrap();

    assert_eq!(message.length, 0x2C);
    assert_eq!(message.control, 0x44);
    assert_eq!(message.link_layer_address.manufacturer(), "LSE");
    assert_eq!(message.link_layer_address.device_id().to_i64(), 58_51_18_82);
    assert_eq!(message.link_layer_address.device_type(), DeviceType::WarmWater);

    let data = &message.variable_data;
    let header = data.short_header.unwrap();
    assert_eq!(header.access_number, 0xE1);
    assert_eq!(header.encryption_mode, EncryptionMode::None);

    assert_eq!(data.records.len(), 6);

    assert_eq!(
        data.records[0].value,
        Value::Timestamp(TimePoint::DateTime(
            NaiveDate::from_ymd_opt(2014, 8, 25)
                .unwrap()
                .and_hms_opt(6, 25, 0)
                .unwrap()
        ))
    );

    let volume = &data.records[1];
    assert_eq!(volume.description, Description::Volume);
    assert_eq!(volume.unit, Some(Unit::CubicMetre));
    assert_eq!(volume.scaled_value(), Some(1.234));

    let stored_date = &data.records[2];
    assert_eq!(stored_date.storage_number, 1);
    assert_eq!(
        stored_date.value,
        Value::Timestamp(TimePoint::Date(
            NaiveDate::from_ymd_opt(2013, 12, 31).unwrap()
        ))
    );

    let stored_volume = &data.records[3];
    assert_eq!(stored_volume.storage_number, 1);
    assert_eq!(stored_volume.scaled_value(), Some(0.0));

    assert_eq!(data.records[4].value, Value::None);

    let unsupported = &data.records[5];
    assert_eq!(unsupported.description, Description::NotSupported);
    assert_eq!(unsupported.value, Value::Integer(0));
}

#[test]
fn identical_input_decodes_identically() {
    let telegram = hex::decode(QUNDIS_WTT16_HEX).unwrap();
    let first = decode_telegram(&telegram, &KeyStore::new()).unwrap();
    let second = decode_telegram(&telegram, &KeyStore::new()).unwrap();
    assert_eq!(first, second);
}
