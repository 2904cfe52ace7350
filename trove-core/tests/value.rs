#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::{borrow::Cow, str::FromStr};
    use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
    use trove_core::{AsValue, TypeCategory, Value};
    use uuid::Uuid;

    #[test]
    fn value_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Null, Value::Varchar(None));
        assert_eq!(Value::Int32(None), Value::Int64(None));
        assert_ne!(Value::Float32(Some(1.0)), Value::Null);
        assert!(Value::Decimal(None, 10, 2).is_null());
        assert_eq!(Option::<i32>::None.as_value(), Value::Int32(None));
        let var: Option<String> = AsValue::try_from_value(Value::Null).unwrap();
        assert_eq!(var, None);
    }

    #[test]
    fn value_bool() {
        let val: Value = true.into();
        assert_eq!(val, Value::Boolean(Some(true)));
        assert_ne!(val, Value::Boolean(Some(false)));
        assert_ne!(val, Value::Varchar(Some("true".into())));
        assert!(bool::try_from_value(Value::Int64(Some(1))).unwrap());
        assert!(!bool::try_from_value(Value::Int8(Some(0))).unwrap());
        assert!(bool::try_from_value(Value::Varchar(Some("TRUE".into()))).unwrap());
        assert!(bool::try_from_value(Value::Float32(Some(0.5))).is_err());
    }

    #[test]
    fn value_integers() {
        let val: Value = (-32768 as i16).into();
        assert_eq!(val, Value::Int16(Some(-32768)));
        assert_ne!(val, Value::Int32(Some(-32768)));
        assert_eq!(i16::try_from_value(val).unwrap(), -32768);

        // Sqlite returns every integer as i64
        assert_eq!(i32::try_from_value(Value::Int64(Some(42))).unwrap(), 42);
        assert_eq!(u8::try_from_value(Value::Int64(Some(255))).unwrap(), 255);
        let error = i8::try_from_value(Value::Int64(Some(128))).unwrap_err();
        assert!(error.to_string().contains("out of range"));
        assert!(u32::try_from_value(Value::Int32(Some(-1))).is_err());
        assert_eq!(u64::try_from_value(Value::Int64(Some(7))).unwrap(), 7);
        assert_eq!(i64::try_from_value(Value::Varchar(Some(" 12 ".into()))).unwrap(), 12);
        assert!(i64::try_from_value(Value::Float64(Some(1.0))).is_err());
    }

    #[test]
    fn value_decimal_keys() {
        // Generated keys reported as arbitrary precision numbers
        let key = Value::Decimal(Some(Decimal::from(1234)), 19, 0);
        assert_eq!(i64::try_from_value(key.clone()).unwrap(), 1234);
        assert_eq!(i32::try_from_value(key).unwrap(), 1234);
        let error = i32::try_from_value(Value::Decimal(Some(Decimal::new(15, 1)), 2, 1)).unwrap_err();
        assert!(format!("{error:#}").contains("not a integer"));
        assert!(i8::try_from_value(Value::Decimal(Some(Decimal::from(300)), 3, 0)).is_err());
    }

    #[test]
    fn value_floats() {
        assert_eq!(f64::try_from_value(Value::Int64(Some(3))).unwrap(), 3.0);
        assert_eq!(f64::try_from_value(Value::Float32(Some(1.5))).unwrap(), 1.5);
        assert_eq!(f32::try_from_value(Value::Float64(Some(2.25))).unwrap(), 2.25);
        assert!(f32::try_from_value(Value::Float64(Some(1e300))).is_err());
        assert_eq!(
            f64::try_from_value(Value::Decimal(Some(Decimal::new(125, 2)), 3, 2)).unwrap(),
            1.25
        );
    }

    #[test]
    fn value_decimal() {
        let var = Decimal::from_str("12.50").unwrap();
        let val = var.as_value();
        assert_eq!(val, Value::Decimal(Some(var), 0, 2));
        // Scale does not take part in the comparison
        assert_eq!(val, Value::Decimal(Some(Decimal::from_str("12.5").unwrap()), 4, 1));
        assert_eq!(
            Decimal::try_from_value(Value::Int64(Some(3))).unwrap(),
            Decimal::from(3)
        );
        assert_eq!(
            Decimal::try_from_value(Value::Varchar(Some("1e3".into()))).unwrap(),
            Decimal::from(1000)
        );
        assert!(Decimal::try_from_value(Value::Varchar(Some("abc".into()))).is_err());
    }

    #[test]
    fn value_text() {
        let val: Value = "hello".into();
        assert_eq!(val, Value::Varchar(Some("hello".into())));
        assert_eq!(val.text_len(), Some(5));
        assert_eq!(Value::Varchar(Some("àèìòù".into())).text_len(), Some(5));
        assert_eq!(Value::Int32(Some(12345)).text_len(), None);
        assert_eq!(String::try_from_value(Value::Char(Some('x'))).unwrap(), "x");
        assert_eq!(String::try_from_value(Value::Int64(Some(7))).unwrap(), "7");
        let cow: Cow<str> = AsValue::try_from_value(val).unwrap();
        assert_eq!(cow, "hello");
        assert_eq!(char::try_from_value(Value::Varchar(Some("z".into()))).unwrap(), 'z');
        assert!(char::try_from_value(Value::Varchar(Some("zz".into()))).is_err());
        assert!(String::try_from_value(Value::Boolean(Some(true))).is_err());
    }

    #[test]
    fn value_blob() {
        let val = vec![1u8, 2, 3].as_value();
        assert_eq!(val, Value::Blob(Some([1, 2, 3].into())));
        let back: Vec<u8> = AsValue::try_from_value(val).unwrap();
        assert_eq!(back, [1, 2, 3]);
        let text: Box<[u8]> = AsValue::try_from_value(Value::Varchar(Some("ab".into()))).unwrap();
        assert_eq!(&*text, b"ab");
    }

    #[test]
    fn value_uuid() {
        let id = Uuid::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            Uuid::try_from_value(Value::Varchar(Some(id.to_string()))).unwrap(),
            id
        );
        assert_eq!(
            Uuid::try_from_value(Value::Blob(Some(id.as_bytes().to_vec().into()))).unwrap(),
            id
        );
        assert!(Uuid::try_from_value(Value::Varchar(Some("67e55044".into()))).is_err());
    }

    #[test]
    fn value_temporal() {
        let date = Date::from_calendar_date(2025, Month::March, 14).unwrap();
        assert_eq!(
            Date::try_from_value(Value::Varchar(Some("2025-03-14".into()))).unwrap(),
            date
        );
        let time = Time::from_hms_milli(8, 5, 3, 250).unwrap();
        assert_eq!(
            Time::try_from_value(Value::Varchar(Some("08:05:03.25".into()))).unwrap(),
            time
        );
        assert_eq!(
            Time::try_from_value(Value::Varchar(Some("08:05".into()))).unwrap(),
            Time::from_hms(8, 5, 0).unwrap()
        );
        let timestamp = PrimitiveDateTime::new(date, time);
        assert_eq!(
            PrimitiveDateTime::try_from_value(Value::Varchar(Some(
                "2025-03-14 08:05:03.25".into()
            )))
            .unwrap(),
            timestamp
        );
        assert_eq!(
            PrimitiveDateTime::try_from_value(Value::Date(Some(date))).unwrap(),
            date.midnight()
        );
        assert_eq!(
            Date::try_from_value(Value::Timestamp(Some(timestamp))).unwrap(),
            date
        );
        let offset = OffsetDateTime::try_from_value(Value::Varchar(Some(
            "2025-03-14T08:05:03+02:00".into(),
        )))
        .unwrap();
        assert_eq!(offset.offset(), UtcOffset::from_hms(2, 0, 0).unwrap());
        assert_eq!(offset.hour(), 8);
        assert!(Date::try_from_value(Value::Varchar(Some("14/03/2025".into()))).is_err());
    }

    #[test]
    fn categories() {
        assert_eq!(Value::Int8(None).category(), Some(TypeCategory::TinyInt));
        assert_eq!(Value::UInt32(None).category(), Some(TypeCategory::Integer));
        assert_eq!(Value::Varchar(None).category(), Some(TypeCategory::Varchar));
        assert_eq!(Value::Blob(None).category(), Some(TypeCategory::Binary));
        assert_eq!(Value::Null.category(), None);
        assert!(Value::UInt64(Some(1)).is_integral());
        assert!(!Value::Decimal(Some(Decimal::ONE), 1, 0).is_integral());
        assert!(Value::Int32(Some(1)).same_type(&Value::Int32(None)));
        assert!(!Value::Int32(Some(1)).same_type(&Value::Int64(Some(1))));
        assert_eq!(Value::Varchar(Some("x".into())).as_null(), Value::Varchar(None));
    }
}
