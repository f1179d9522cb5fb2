use super::*;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn round_trip(field: &Field, external: Value) {
    let internal = field
        .format(external.clone())
        .expect("format should accept a value of the field's kind");
    let back = field.parse(internal).expect("parse should accept formatted output");
    assert_eq!(back, external, "parse(format(x)) must return x");
}

#[test]
fn null_maps_to_null_for_every_codec() {
    for field in [
        Field::integer(),
        Field::int_boolean(),
        Field::string_boolean(),
        Field::string_integer(),
        Field::string_decimal(),
        Field::iso_date(),
        Field::iso_time(),
        Field::iso_timestamp(),
        Field::string_duration(),
        Field::string_blob(),
    ] {
        assert_eq!(field.parse(Value::Null), Ok(Value::Null));
        assert_eq!(field.format(Value::Null), Ok(Value::Null));
    }
}

#[test]
fn string_boolean_accepts_common_spellings() {
    let field = Field::string_boolean();
    for text in ["y", "YES", "t", "true", "On", "1"] {
        assert_eq!(field.parse(Value::Text(text.into())), Ok(Value::Boolean(true)));
    }
    for text in ["n", "no", "F", "false", "off", "0"] {
        assert_eq!(field.parse(Value::Text(text.into())), Ok(Value::Boolean(false)));
    }
    assert_eq!(field.format(Value::Boolean(true)), Ok(Value::Text("TRUE".into())));
}

#[test]
fn malformed_input_is_an_error_not_null() {
    let failure = Field::iso_date()
        .parse(Value::Text("not-a-date".into()))
        .expect_err("malformed dates must fail");
    assert_eq!(failure.value, "'not-a-date'");

    let err = failure.for_column("born");
    assert_eq!(err.column, "born");
    assert_eq!(err.expected, "ISO date");

    assert!(Field::string_boolean().parse(Value::Text("maybe".into())).is_err());
    assert!(Field::string_blob().parse(Value::Text("zz".into())).is_err());
    assert!(Field::integer().format(Value::Text("3".into())).is_err());
}

#[test]
fn float_field_widens_integers() {
    assert_eq!(Field::float().parse(Value::Integer(3)), Ok(Value::Float(3.0)));
}

#[test]
fn timestamps_normalise_to_utc() {
    let field = Field::iso_timestamp();
    let parsed = field
        .parse(Value::Text("2024-01-02T05:04:05+02:00".into()))
        .expect("offset timestamp should parse");
    let expected = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
        .expect("literal should parse")
        .to_utc();
    assert_eq!(parsed, Value::Timestamp(expected));

    let naive = field
        .parse(Value::Text("2024-01-02T03:04:05".into()))
        .expect("naive timestamp should parse as UTC");
    assert_eq!(naive, Value::Timestamp(expected));
    assert_eq!(
        field.format(naive),
        Ok(Value::Text("2024-01-02T03:04:05Z".into()))
    );
}

#[test]
fn durations_use_day_clock_notation() {
    let field = Field::string_duration();
    let value = Value::Duration(TimeDelta::seconds(86_400 + 3_723) + TimeDelta::microseconds(500_000));

    assert_eq!(
        field.format(value.clone()),
        Ok(Value::Text("1 day, 1:02:03.500000".into()))
    );
    assert_eq!(field.parse(Value::Text("1 day, 1:02:03.5".into())), Ok(value));
    assert_eq!(
        field.format(Value::Duration(TimeDelta::seconds(-1))),
        Ok(Value::Text("-1 day, 23:59:59".into()))
    );
    assert!(field.parse(Value::Text("1:75:00".into())).is_err());
}

#[test]
fn sub_microsecond_durations_are_refused() {
    let field = Field::string_duration();

    let err = field
        .format(Value::Duration(TimeDelta::nanoseconds(1_500)))
        .expect_err("nanoseconds do not fit the text form");
    assert_eq!(err.expected, "duration in whole microseconds");
    assert!(field.format(Value::Duration(TimeDelta::nanoseconds(-2_001))).is_err());
    assert_eq!(
        field.format(Value::Duration(TimeDelta::nanoseconds(2_000))),
        Ok(Value::Text("0:00:00.000002".into()))
    );
}

#[test]
fn quoting_follows_literal_rules() {
    assert_eq!(Field::text().quote(&Value::Null), "NULL");
    assert_eq!(Field::text().quote(&Value::Text("it's".into())), "'it''s'");
    assert_eq!(Field::blob().quote(&Value::Blob(vec![0xab, 0x01])), "X'ab01'");
    assert_eq!(Field::boolean().quote(&Value::Boolean(false)), "FALSE");
    assert_eq!(Field::integer().quote(&Value::Integer(-4)), "-4");
    assert_eq!(Field::string_decimal().quote(&Value::Text("1.25".into())), "1.25");
    assert_eq!(
        Field::date().quote(&Value::Date(
            NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date")
        )),
        "'2024-02-29'"
    );
}

#[test]
fn columns_report_conversion_with_column_name() {
    let columns = Columns::new()
        .with("id", Field::integer())
        .with("born", Field::iso_date());

    assert_eq!(columns.position("born"), Some(1));
    let err = columns
        .parse_value("born", Value::Text("31/12/2020".into()))
        .expect_err("bad date should fail");
    assert_eq!(err.column, "born");
    assert_eq!(columns.names().collect::<Vec<_>>(), vec!["id", "born"]);
}

proptest! {
    #[test]
    fn int_boolean_round_trips(v in any::<bool>()) {
        round_trip(&Field::int_boolean(), Value::Boolean(v));
        round_trip(&Field::string_boolean(), Value::Boolean(v));
    }

    #[test]
    fn string_integer_round_trips(v in any::<i64>()) {
        round_trip(&Field::string_integer(), Value::Integer(v));
        round_trip(&Field::integer(), Value::Integer(v));
    }

    #[test]
    fn string_decimal_round_trips(mantissa in -1_000_000_000i64..1_000_000_000, scale in 0u32..8) {
        round_trip(&Field::string_decimal(), Value::Decimal(Decimal::new(mantissa, scale)));
    }

    #[test]
    fn iso_date_round_trips(days in -100_000i64..100_000) {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch");
        let date = epoch + TimeDelta::days(days);
        round_trip(&Field::iso_date(), Value::Date(date));
    }

    #[test]
    fn iso_time_round_trips(secs in 0u32..86_400, micros in 0u32..1_000_000) {
        let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, micros * 1_000)
            .expect("valid time");
        round_trip(&Field::iso_time(), Value::Time(time));
    }

    #[test]
    fn iso_timestamp_round_trips(secs in -2_000_000_000i64..4_000_000_000, micros in 0u32..1_000_000) {
        let ts = DateTime::from_timestamp(secs, micros * 1_000).expect("valid timestamp");
        round_trip(&Field::iso_timestamp(), Value::Timestamp(ts));
    }

    #[test]
    fn string_duration_round_trips(micros in -10_000_000_000_000i64..10_000_000_000_000) {
        round_trip(&Field::string_duration(), Value::Duration(TimeDelta::microseconds(micros)));
    }

    #[test]
    fn string_duration_never_drops_nanoseconds(
        micros in -10_000_000_000_000i64..10_000_000_000_000,
        nanos in 0i64..1_000,
    ) {
        let field = Field::string_duration();
        let delta = TimeDelta::microseconds(micros) + TimeDelta::nanoseconds(nanos);

        match field.format(Value::Duration(delta)) {
            Ok(internal) => {
                prop_assert_eq!(nanos, 0);
                prop_assert_eq!(field.parse(internal), Ok(Value::Duration(delta)));
            }
            Err(_) => prop_assert_ne!(nanos, 0),
        }
    }

    #[test]
    fn string_blob_round_trips(bytes in prop::collection::vec(any::<u8>(), 0..32)) {
        round_trip(&Field::string_blob(), Value::Blob(bytes));
    }
}
