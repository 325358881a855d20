//! Field validation for fatality records.
//!
//! CPF checking implements the standard mod-11 double check digit. The
//! 120-year bound on birth dates divides by 365.25 on purpose, which is NOT
//! the floor-by-365 rule used to derive the age column; the two have always
//! disagreed by design and reports depend on the derived column staying as
//! it is.

use chrono::{Local, NaiveDate};

use crate::calc::valid_time_text;
use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::schema::Column;

/// Check a CPF against its two mod-11 check digits
///
/// Non-digit characters are stripped first. Strings of eleven identical
/// digits pass the checksum arithmetically but are always invalid.
#[must_use]
pub fn valid_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 11 {
        return false;
    }

    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let first = check_digit(&digits[..9], 10);
    if digits[9] != first {
        return false;
    }

    let second = check_digit(&digits[..10], 11);
    digits[10] == second
}

/// Compute one mod-11 check digit with descending weights from `start`
fn check_digit(digits: &[u32], start: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| d * (start - i as u32))
        .sum();

    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

/// Format a CPF as `XXX.XXX.XXX-XX`
///
/// Anything that does not strip down to eleven digits is returned as the
/// stripped digit string, unformatted.
#[must_use]
pub fn format_cpf(cpf: &str) -> String {
    let digits: String = cpf.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 11 {
        return digits;
    }

    format!(
        "{}.{}.{}-{}",
        &digits[..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..]
    )
}

/// Required columns that are empty on this record, in declared order
#[must_use]
pub fn missing_required_fields(record: &Record) -> Vec<Column> {
    Column::REQUIRED
        .iter()
        .filter(|column| record.field_is_blank(**column))
        .copied()
        .collect()
}

/// Reject coordinates outside the valid geographic ranges
///
/// Latitude is checked first, so a record failing both reports latitude.
pub fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<()> {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(StoreError::ValidationFailed {
                field: Column::Latitude.label().to_string(),
                reason: "latitude must be between -90 and 90".to_string(),
            });
        }
    }

    if let Some(long) = longitude {
        if !(-180.0..=180.0).contains(&long) {
            return Err(StoreError::ValidationFailed {
                field: Column::Longitude.label().to_string(),
                reason: "longitude must be between -180 and 180".to_string(),
            });
        }
    }

    Ok(())
}

/// Reject dates after the current local date
pub fn validate_not_future(date: NaiveDate, column: Column) -> Result<()> {
    if date > Local::now().date_naive() {
        return Err(StoreError::ValidationFailed {
            field: column.label().to_string(),
            reason: "date cannot be in the future".to_string(),
        });
    }
    Ok(())
}

/// Validate the birth date against the clock and the death date
///
/// The birth date may not be in the future, may not put the victim over 120
/// years old (counting calendar days over 365.25) and must precede the death
/// date when one is present.
pub fn validate_birth_date(birth: NaiveDate, death: Option<NaiveDate>) -> Result<()> {
    let today = Local::now().date_naive();

    if birth > today {
        return Err(StoreError::ValidationFailed {
            field: Column::BirthDate.label().to_string(),
            reason: "birth date cannot be in the future".to_string(),
        });
    }

    let years = (today - birth).num_days() as f64 / 365.25;
    if years > 120.0 {
        return Err(StoreError::ValidationFailed {
            field: Column::BirthDate.label().to_string(),
            reason: "birth date implies an age above 120 years".to_string(),
        });
    }

    if let Some(death) = death {
        if birth >= death {
            return Err(StoreError::ValidationFailed {
                field: Column::BirthDate.label().to_string(),
                reason: "birth date must precede the death date".to_string(),
            });
        }
    }

    Ok(())
}

/// Validate a derived age value
pub fn validate_age_value(age: i64) -> Result<()> {
    if !(0..=120).contains(&age) {
        return Err(StoreError::ValidationFailed {
            field: Column::Age.label().to_string(),
            reason: "age must be between 0 and 120".to_string(),
        });
    }
    Ok(())
}

/// Validate the report count field, which must be blank or exactly 1
///
/// Additional victims of an already registered incident leave it blank so
/// the incident is not double counted.
pub fn validate_report_count(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Ok(());
    }

    match value.trim().parse::<f64>() {
        Ok(v) if v == 1.0 => Ok(()),
        Ok(_) => Err(StoreError::ValidationFailed {
            field: Column::ReportCount.label().to_string(),
            reason: "must be blank or exactly 1".to_string(),
        }),
        Err(_) => Err(StoreError::ValidationFailed {
            field: Column::ReportCount.label().to_string(),
            reason: "must be a number or blank".to_string(),
        }),
    }
}

/// Run every field-level check on a record
///
/// Required-field presence is NOT checked here; callers report missing
/// fields as a batch through [`missing_required_fields`] first.
pub fn validate_record(record: &Record) -> Result<()> {
    if !record.cpf.trim().is_empty() && !valid_cpf(&record.cpf) {
        return Err(StoreError::ValidationFailed {
            field: Column::Cpf.label().to_string(),
            reason: "CPF check digits do not match".to_string(),
        });
    }

    validate_coordinates(record.latitude, record.longitude)?;
    validate_report_count(&record.report_count)?;

    if let Some(date) = record.incident_date {
        validate_not_future(date, Column::IncidentDate)?;
    }
    if let Some(date) = record.death_date {
        validate_not_future(date, Column::DeathDate)?;
    }
    if let Some(birth) = record.birth_date {
        validate_birth_date(birth, record.death_date)?;
    }

    if !record.incident_time.trim().is_empty() && !valid_time_text(record.incident_time.trim()) {
        return Err(StoreError::ValidationFailed {
            field: Column::IncidentTime.label().to_string(),
            reason: "time must be HH:MM".to_string(),
        });
    }

    if let Some(age) = record.age {
        validate_age_value(age)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    #[test]
    fn test_valid_cpf_accepts_correct_checksums() {
        assert!(valid_cpf("52998224725"));
        assert!(valid_cpf("529.982.247-25"));
        assert!(valid_cpf("11144477735"));
    }

    #[test]
    fn test_valid_cpf_rejects_repeated_digits() {
        for digit in 0..=9 {
            let cpf: String = std::iter::repeat_n(char::from_digit(digit, 10).unwrap(), 11).collect();
            assert!(!valid_cpf(&cpf), "repeated digit {digit} must be invalid");
        }
    }

    #[test]
    fn test_valid_cpf_rejects_every_single_digit_mutation() {
        let valid = "52998224725";
        for position in 0..11 {
            for replacement in '0'..='9' {
                let mut mutated: Vec<char> = valid.chars().collect();
                if mutated[position] == replacement {
                    continue;
                }
                mutated[position] = replacement;
                let mutated: String = mutated.into_iter().collect();
                assert!(!valid_cpf(&mutated), "mutation {mutated} must be invalid");
            }
        }
    }

    #[test]
    fn test_valid_cpf_rejects_wrong_lengths() {
        assert!(!valid_cpf(""));
        assert!(!valid_cpf("5299822472"));
        assert!(!valid_cpf("529982247255"));
    }

    #[test]
    fn test_format_cpf() {
        assert_eq!(format_cpf("52998224725"), "529.982.247-25");
        assert_eq!(format_cpf("529.982.247-25"), "529.982.247-25");
        assert_eq!(format_cpf("1234"), "1234");
    }

    #[test]
    fn test_missing_required_fields_in_declared_order() {
        // victim and incident date left blank
        let record = Record {
            occurrence_nature: "Acidente de Trânsito".to_string(),
            report_number: "123/2024".to_string(),
            accident_type: "Colisão".to_string(),
            death_date: NaiveDate::from_ymd_opt(2024, 1, 10),
            sex: "Masculino".to_string(),
            municipality: "Teresina".to_string(),
            ..Record::default()
        };

        let missing = missing_required_fields(&record);
        assert_eq!(missing, vec![Column::Victim, Column::IncidentDate]);
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(Some(-5.09), Some(-42.8)).is_ok());
        assert!(validate_coordinates(Some(0.0), Some(0.0)).is_ok());
        assert!(validate_coordinates(None, None).is_ok());
        assert!(validate_coordinates(Some(91.0), Some(0.0)).is_err());
        assert!(validate_coordinates(Some(0.0), Some(-181.0)).is_err());
    }

    #[test]
    fn test_coordinates_report_latitude_first() {
        let error = validate_coordinates(Some(99.0), Some(999.0)).unwrap_err();
        match error {
            StoreError::ValidationFailed { field, .. } => assert_eq!(field, "Lat"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_not_future() {
        let today = Local::now().date_naive();
        assert!(validate_not_future(today, Column::IncidentDate).is_ok());
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap();
        assert!(validate_not_future(tomorrow, Column::IncidentDate).is_err());
    }

    #[test]
    fn test_validate_birth_date_bounds() {
        let today = Local::now().date_naive();

        let recent = today.checked_sub_days(Days::new(365 * 30)).unwrap();
        assert!(validate_birth_date(recent, None).is_ok());

        let tomorrow = today.checked_add_days(Days::new(1)).unwrap();
        assert!(validate_birth_date(tomorrow, None).is_err());

        let ancient = today.checked_sub_days(Days::new(45_000)).unwrap();
        assert!(validate_birth_date(ancient, None).is_err());
    }

    #[test]
    fn test_validate_birth_date_against_death() {
        let birth = NaiveDate::from_ymd_opt(1990, 5, 1).unwrap();
        let death = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(validate_birth_date(birth, Some(death)).is_ok());
        assert!(validate_birth_date(death, Some(birth)).is_err());
        assert!(validate_birth_date(birth, Some(birth)).is_err());
    }

    #[test]
    fn test_validate_report_count() {
        assert!(validate_report_count("").is_ok());
        assert!(validate_report_count("  ").is_ok());
        assert!(validate_report_count("1").is_ok());
        assert!(validate_report_count("1.0").is_ok());
        assert!(validate_report_count("2").is_err());
        assert!(validate_report_count("abc").is_err());
    }

    #[test]
    fn test_validate_age_value() {
        assert!(validate_age_value(0).is_ok());
        assert!(validate_age_value(120).is_ok());
        assert!(validate_age_value(-1).is_err());
        assert!(validate_age_value(121).is_err());
    }

    #[test]
    fn test_validate_record_rejects_bad_cpf() {
        let mut record = Record {
            cpf: "52998224726".to_string(),
            ..Record::default()
        };
        assert!(validate_record(&record).is_err());

        record.cpf = String::new();
        assert!(validate_record(&record).is_ok());
    }
}
