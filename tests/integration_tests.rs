//! Integration tests for CSV decoding and encoding
//!
//! Tests the full flow: record declaration → schema → session → CSV text

use chrono::{DateTime, TimeZone, Utc};
use csvtag::{
    csv_record, decode, decode_with, encode, encode_with, BoxError, CsvOptions, Decoder, Encoder,
    Error, FieldType, HeaderOutcome, MarshalCsv, Shape, UnmarshalCsv,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

csv_record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Employee {
        pub id: i64 => "id",
        pub name: String => "name",
        pub age: u32 => "age",
        pub salary: f64 => "salary",
        pub is_manager: bool => "is_manager",
    }
}

fn john() -> Employee {
    Employee {
        id: 1,
        name: "John Doe".to_string(),
        age: 30,
        salary: 5500.0,
        is_manager: true,
    }
}

fn jane() -> Employee {
    Employee {
        id: 2,
        name: "Jane Roe".to_string(),
        age: 41,
        salary: 7250.5,
        is_manager: false,
    }
}

const HEADER: &str = "id,name,age,salary,is_manager\n";

fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap()
}

// ============================================================================
// Single Record Decoding
// ============================================================================

#[test]
fn test_decode_record() {
    let mut employee = Employee::default();
    decode(b"id,name,age,salary,is_manager\n1,John Doe,30,5500,true\n", &mut employee).unwrap();
    assert_eq!(employee, john());
}

#[test]
fn test_decode_invalid_number() {
    let mut employee = Employee::default();
    let err = decode(b"id,name,age,salary,is_manager\n1,John Doe,thirty,5500,true\n", &mut employee)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::FieldParse {
            row: 2,
            column: 3,
            ..
        }
    ));
    assert_eq!(err.field(), Some("age"));
}

#[test]
fn test_decode_invalid_bool_is_false() {
    let mut employee = Employee::default();
    decode(b"id,name,age,salary,is_manager\n1,John Doe,30,5500,unknown\n", &mut employee).unwrap();
    assert_eq!(
        employee,
        Employee {
            is_manager: false,
            ..john()
        }
    );
}

#[test]
fn test_decode_without_header() {
    let mut employee = Employee::default();
    decode(b"1,John Doe,30,5500,true\n", &mut employee).unwrap();
    assert_eq!(employee, john());
}

#[test]
fn test_decode_reordered_and_unknown_columns() {
    let mut employee = Employee::default();
    decode(b"name,extra,id\nJohn Doe,x,1\n", &mut employee).unwrap();
    assert_eq!(
        employee,
        Employee {
            id: 1,
            name: "John Doe".to_string(),
            ..Employee::default()
        }
    );
}

#[test]
fn test_decode_empty_input() {
    let mut employee: Option<Employee> = None;
    decode(b"", &mut employee).unwrap();
    assert_eq!(employee, None);

    let mut employee = Employee::default();
    decode(b"", &mut employee).unwrap();
    assert_eq!(employee, Employee::default());
}

#[test]
fn test_decode_into_pointer() {
    let mut employee: Option<Box<Employee>> = None;
    decode(b"id,name,age,salary,is_manager\n1,John Doe,30,5500,true\n", &mut employee).unwrap();
    assert_eq!(employee, Some(Box::new(john())));
}

// ============================================================================
// Sequence Decoding
// ============================================================================

const TWO_ROWS: &[u8] = b"id,name,age,salary,is_manager\n1,John Doe,30,5500,true\n2,Jane Roe,41,7250.5,false\n";

#[test]
fn test_decode_vec() {
    let mut employees: Vec<Employee> = Vec::new();
    decode(TWO_ROWS, &mut employees).unwrap();
    assert_eq!(employees, vec![john(), jane()]);
}

#[test]
fn test_decode_vec_without_header() {
    let mut employees: Vec<Employee> = Vec::new();
    decode(b"1,John Doe,30,5500,true\n2,Jane Roe,41,7250.5,false\n", &mut employees).unwrap();
    assert_eq!(employees, vec![john(), jane()]);
}

#[test]
fn test_decode_vec_of_pointers() {
    let mut employees: Vec<Option<Employee>> = Vec::new();
    decode(TWO_ROWS, &mut employees).unwrap();
    assert_eq!(employees, vec![Some(john()), Some(jane())]);
}

#[test]
fn test_decode_array() {
    let mut employees: [Employee; 2] = Default::default();
    decode(TWO_ROWS, &mut employees).unwrap();
    assert_eq!(employees, [john(), jane()]);
}

#[test]
fn test_decode_array_smaller_than_input() {
    let mut employees: [Employee; 1] = Default::default();
    decode(TWO_ROWS, &mut employees).unwrap();
    assert_eq!(employees, [john()]);
}

#[test]
fn test_decode_records_iterator() {
    let mut decoder = Decoder::new(TWO_ROWS).unwrap();
    let names: Vec<String> = decoder
        .records::<Employee>()
        .map(|employee| employee.unwrap().name)
        .collect();
    assert_eq!(names, vec!["John Doe", "Jane Roe"]);
    assert_eq!(
        decoder.header_outcome(),
        Some(HeaderOutcome::Matched { columns: 5 })
    );
}

// ============================================================================
// Pointer Fields
// ============================================================================

csv_record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct OptionalEmployee {
        pub id: Option<i64> => "id",
        pub name: Option<String> => "name",
        pub age: Option<u32> => "age",
        pub salary: Option<f64> => "salary",
        pub is_manager: Option<bool> => "is_manager",
    }
}

#[test]
fn test_decode_pointer_fields() {
    let mut employee = OptionalEmployee::default();
    decode(b"id,name,age,salary,is_manager\n1,John Doe,30,5500,true\n", &mut employee).unwrap();
    assert_eq!(
        employee,
        OptionalEmployee {
            id: Some(1),
            name: Some("John Doe".to_string()),
            age: Some(30),
            salary: Some(5500.0),
            is_manager: Some(true),
        }
    );
}

#[test]
fn test_decode_empty_pointer_fields() {
    let mut employee = OptionalEmployee::default();
    decode(b"id,name,age,salary,is_manager\n,,,,\n", &mut employee).unwrap();
    assert_eq!(
        employee,
        OptionalEmployee {
            name: Some(String::new()),
            ..OptionalEmployee::default()
        }
    );
}

#[test]
fn test_encode_pointer_fields() {
    let employee = OptionalEmployee {
        id: Some(1),
        name: Some("John Doe".to_string()),
        age: Some(30),
        salary: Some(5500.0),
        is_manager: Some(true),
    };
    assert_eq!(
        text(encode(&employee).unwrap()),
        format!("{HEADER}1,John Doe,30,5500,true\n")
    );

    let empty = OptionalEmployee::default();
    assert_eq!(text(encode(&empty).unwrap()), format!("{HEADER},,,,\n"));
}

// ============================================================================
// Custom Codecs
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Location {
    pub country: String,
    pub zip_code: i32,
}

impl MarshalCsv for Location {
    fn marshal_csv(&self) -> Result<Vec<u8>, BoxError> {
        if self.zip_code <= 0 {
            return Err("invalid zipcode".into());
        }
        Ok(format!("{} ({})", self.country, self.zip_code).into_bytes())
    }
}

impl UnmarshalCsv for Location {
    fn unmarshal_csv(&mut self, data: &[u8]) -> Result<(), BoxError> {
        let text = std::str::from_utf8(data)?;
        let (country, rest) = text.split_once(" (").ok_or("missing zipcode")?;
        let zip = rest.strip_suffix(')').ok_or("unterminated zipcode")?;
        self.country = country.to_string();
        self.zip_code = zip.parse()?;
        Ok(())
    }
}

impl FieldType for Location {
    fn shape() -> Shape {
        Shape::opaque::<Self>().decode_csv().encode_csv().build()
    }
}

csv_record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Office {
        pub city: String => "city",
        pub location: Location => "location",
    }
}

csv_record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct RemoteOffice {
        pub city: String => "city",
        pub location: Option<Location> => "location",
    }
}

fn usa() -> Location {
    Location {
        country: "USA".to_string(),
        zip_code: 10001,
    }
}

#[test]
fn test_marshal_field() {
    let office = Office {
        city: "New York".to_string(),
        location: usa(),
    };
    assert_eq!(
        text(encode(&office).unwrap()),
        "city,location\nNew York,USA (10001)\n"
    );

    let broken = Office {
        city: "Unknown".to_string(),
        location: Location {
            country: "Unknown".to_string(),
            zip_code: -1,
        },
    };
    let err = encode(&broken).unwrap_err();
    match err {
        Error::CustomCodec { field, source } => {
            assert_eq!(field, "location");
            assert_eq!(source.to_string(), "invalid zipcode");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_marshal_optional_field() {
    let office = RemoteOffice {
        city: "New York".to_string(),
        location: Some(usa()),
    };
    assert_eq!(
        text(encode(&office).unwrap()),
        "city,location\nNew York,USA (10001)\n"
    );

    let office = RemoteOffice {
        city: "New York".to_string(),
        location: None,
    };
    assert_eq!(text(encode(&office).unwrap()), "city,location\nNew York,\n");
}

#[test]
fn test_unmarshal_field() {
    let mut office = Office::default();
    decode(b"city,location\nNew York,USA (10001)\n", &mut office).unwrap();
    assert_eq!(office.location, usa());

    let mut office = RemoteOffice::default();
    decode(b"city,location\nNew York,USA (10001)\n", &mut office).unwrap();
    assert_eq!(office.location, Some(usa()));
}

#[test]
fn test_unmarshal_failure_keeps_source() {
    let mut office = Office::default();
    let err = decode(b"city,location\nNew York,USA\n", &mut office).unwrap_err();
    assert!(matches!(err, Error::CustomCodec { .. }));
    assert_eq!(office.city, "New York");
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Region {
    pub country: String,
    pub zip_code: i32,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.country, self.zip_code)
    }
}

impl FromStr for Region {
    type Err = BoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (country, rest) = s.split_once(" [").ok_or("missing zipcode")?;
        let zip = rest.strip_suffix(']').ok_or("unterminated zipcode")?;
        Ok(Region {
            country: country.to_string(),
            zip_code: zip.parse()?,
        })
    }
}

impl FieldType for Region {
    fn shape() -> Shape {
        Shape::opaque::<Self>().decode_text().encode_text().build()
    }
}

csv_record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Branch {
        pub city: String => "city",
        pub region: Region => "location",
        pub backup: Option<Region> => "backup",
    }
}

#[test]
fn test_text_codec_fields() {
    let branch = Branch {
        city: "New York".to_string(),
        region: Region {
            country: "USA".to_string(),
            zip_code: 10001,
        },
        backup: None,
    };
    let out = text(encode(&branch).unwrap());
    assert_eq!(out, "city,location,backup\nNew York,USA [10001],\n");

    let mut decoded = Branch::default();
    decode(out.as_bytes(), &mut decoded).unwrap();
    assert_eq!(decoded, branch);

    decode(b"city,backup\nBoston,USA [02108]\n", &mut decoded).unwrap();
    assert_eq!(decoded.backup.map(|region| region.zip_code), Some(2108));
}

// ============================================================================
// Field Selection
// ============================================================================

csv_record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Contact {
        pub id: i64 => "id",
        name: String => "name",
        pub email: String => "email",
    }
}

csv_record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Untagged {
        pub id: i64,
        pub name: String,
    }
}

csv_record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Filtered {
        pub id: i64 => "id",
        pub name: String => "-",
        pub email: String => "email",
    }
}

#[test]
fn test_private_fields_are_not_mapped() {
    let mut contact = Contact::default();
    decode(b"id,name,email\n1,John Doe,john@example.com\n", &mut contact).unwrap();
    assert_eq!(contact.id, 1);
    assert_eq!(contact.name, "");
    assert_eq!(contact.email, "john@example.com");

    assert_eq!(
        text(encode(&contact).unwrap()),
        "id,email\n1,john@example.com\n"
    );
}

#[test]
fn test_untagged_fields_use_identifier() {
    let mut record = Untagged::default();
    decode(b"id,name\n1,John Doe\n", &mut record).unwrap();
    assert_eq!(
        record,
        Untagged {
            id: 1,
            name: "John Doe".to_string(),
        }
    );
}

#[test]
fn test_skipped_fields() {
    let mut record = Filtered::default();
    decode(b"id,name,email\n1,John Doe,john@example.com\n", &mut record).unwrap();
    assert_eq!(record.name, "");
    assert_eq!(record.email, "john@example.com");

    assert_eq!(text(encode(&record).unwrap()), "id,email\n1,john@example.com\n");
}

csv_record! {
    #[derive(Debug, Default)]
    pub struct Unsupported {
        pub data: HashMap<String, String> => "Data",
        pub b: String => "b",
    }
}

#[test]
fn test_unsupported_field_type() {
    let mut record = Unsupported::default();
    let err = decode(b"Data,b\n1,b\n", &mut record).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFieldType { .. }));

    let err = encode(&Unsupported::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFieldType { .. }));
}

// ============================================================================
// Date/Time
// ============================================================================

csv_record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Schedule {
        pub no_fmt_time: DateTime<Utc> => "no_fmt_time",
        pub fmt_time: DateTime<Utc> => "fmt_time,format=%Y-%m-%dT%H:%M:%S",
        pub no_fmt_time_ptr: Option<DateTime<Utc>> => "no_fmt_time_ptr",
        pub fmt_time_ptr: Option<DateTime<Utc>> => "fmt_time_ptr,format=%Y-%m-%dT%H:%M:%S",
    }
}

const SCHEDULE: &str = "no_fmt_time,fmt_time,no_fmt_time_ptr,fmt_time_ptr\n\
    2025-10-01T11:30:00Z,2025-10-01T11:30:00,2025-10-01T11:30:00Z,2025-10-01T11:30:00\n";

#[test]
fn test_decode_time_fields() {
    let tm = Utc.with_ymd_and_hms(2025, 10, 1, 11, 30, 0).unwrap();
    let mut schedule = Schedule::default();
    decode(SCHEDULE.as_bytes(), &mut schedule).unwrap();
    assert_eq!(
        schedule,
        Schedule {
            no_fmt_time: tm,
            fmt_time: tm,
            no_fmt_time_ptr: Some(tm),
            fmt_time_ptr: Some(tm),
        }
    );
}

#[test]
fn test_time_fields_round_trip() {
    let mut schedule = Schedule::default();
    decode(SCHEDULE.as_bytes(), &mut schedule).unwrap();
    assert_eq!(text(encode(&schedule).unwrap()), SCHEDULE);
}

#[test]
fn test_empty_time_fields() {
    let mut schedule = Schedule::default();
    decode(
        b"no_fmt_time,fmt_time,no_fmt_time_ptr,fmt_time_ptr\n,,,\n",
        &mut schedule,
    )
    .unwrap();
    assert_eq!(schedule, Schedule::default());
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_encode_record() {
    assert_eq!(
        text(encode(&john()).unwrap()),
        format!("{HEADER}1,John Doe,30,5500,true\n")
    );
}

#[test]
fn test_encode_zero_values() {
    assert_eq!(
        text(encode(&Employee::default()).unwrap()),
        format!("{HEADER}0,,0,0,false\n")
    );
}

#[test]
fn test_encode_none_record() {
    assert_eq!(text(encode(&None::<Employee>).unwrap()), format!("{HEADER},,,,\n"));
}

#[test]
fn test_encode_sequences() {
    let expected = format!("{HEADER}1,John Doe,30,5500,true\n2,Jane Roe,41,7250.5,false\n");

    assert_eq!(text(encode(&vec![john(), jane()]).unwrap()), expected);
    assert_eq!(text(encode(&[john(), jane()]).unwrap()), expected);
    assert_eq!(
        text(encode(&vec![Some(Box::new(john())), Some(Box::new(jane()))]).unwrap()),
        expected
    );
    assert_eq!(text(encode(&Vec::<Employee>::new()).unwrap()), HEADER);
}

#[test]
fn test_round_trip() {
    let employees = vec![john(), jane()];
    let mut decoded: Vec<Employee> = Vec::new();
    decode(&encode(&employees).unwrap(), &mut decoded).unwrap();
    assert_eq!(decoded, employees);
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_custom_delimiter_and_crlf() {
    let options = CsvOptions::new().with_delimiter('\t').crlf();
    let out = text(encode_with(&[john()], &options).unwrap());
    assert_eq!(
        out,
        "id\tname\tage\tsalary\tis_manager\r\n1\tJohn Doe\t30\t5500\ttrue\r\n"
    );

    let mut decoded: Vec<Employee> = Vec::new();
    decode_with(out.as_bytes(), &mut decoded, &options).unwrap();
    assert_eq!(decoded, vec![john()]);
}

#[test]
fn test_options_from_json() {
    let options: CsvOptions = serde_json::from_str(r#"{"delimiter": ";", "header": false}"#).unwrap();
    let out = text(encode_with(&john(), &options).unwrap());
    assert_eq!(out, "1;John Doe;30;5500;true\n");

    let mut decoded = Employee::default();
    decode_with(out.as_bytes(), &mut decoded, &options).unwrap();
    assert_eq!(decoded, john());
}

#[test]
fn test_quoted_values() {
    let employee = Employee {
        name: "Doe, \"JD\" John".to_string(),
        ..john()
    };
    let out = text(encode(&employee).unwrap());
    assert_eq!(out, format!("{HEADER}1,\"Doe, \"\"JD\"\" John\",30,5500,true\n"));

    let mut decoded = Employee::default();
    decode(out.as_bytes(), &mut decoded).unwrap();
    assert_eq!(decoded, employee);
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("employees.csv");
    let options = CsvOptions::default();

    let mut encoder = Encoder::to_path(&path, &options).unwrap();
    encoder.encode(&vec![john(), jane()]).unwrap();
    drop(encoder.into_inner().unwrap());

    let mut decoder = Decoder::from_path(&path, &options).unwrap();
    let mut employees: Vec<Employee> = Vec::new();
    decoder.decode(&mut employees).unwrap();
    assert_eq!(employees, vec![john(), jane()]);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Decoder::from_path(dir.path().join("missing.csv"), &CsvOptions::default());
    assert!(matches!(result, Err(Error::Csv(_))));
}
