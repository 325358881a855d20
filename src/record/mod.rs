//! Typed fatality record and its mapping to sheet rows.
//!
//! A [`Record`] carries one victim of one incident. Dates and coordinates
//! are typed; everything else stays as the text the form collected. The
//! sheet side always works with canonical 33-column rows of display
//! strings, so the mapping lives here next to the fields.

use chrono::NaiveDate;

use crate::calc::{self, parse_sheet_date};
use crate::schema::{Column, ColumnKind};

/// One victim record in canonical column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Natureza da Ocorrência
    pub occurrence_nature: String,
    /// Nº do BO
    pub report_number: String,
    /// Nº de BOS, blank for additional victims of a registered incident
    pub report_count: String,
    /// Nº de Vítimas
    pub victim_count: String,
    /// Tipo de Acidente
    pub accident_type: String,
    /// Nº Laudo IML
    pub autopsy_report_number: String,
    /// Natureza do Laudo
    pub autopsy_nature: String,
    /// Data do Óbito
    pub death_date: Option<NaiveDate>,
    /// Vítima
    pub victim_name: String,
    /// Sexo
    pub sex: String,
    /// Filiação
    pub parentage: String,
    /// Data de Nascimento
    pub birth_date: Option<NaiveDate>,
    /// Idade, recomputed before persistence
    pub age: Option<i64>,
    /// CPF
    pub cpf: String,
    /// Possui CNH
    pub has_license: String,
    /// Condutor
    pub is_driver: String,
    /// Realizado Exame Alcoolemia
    pub alcohol_test: String,
    /// Estava usando Capacete
    pub helmet_use: String,
    /// Município do Fato
    pub municipality: String,
    /// Logradouro
    pub street: String,
    /// Subtipo do Local
    pub site_subtype: String,
    /// Lat
    pub latitude: Option<f64>,
    /// Long
    pub longitude: Option<f64>,
    /// Data do Fato
    pub incident_date: Option<NaiveDate>,
    /// Hora do fato as `HH:MM` text
    pub incident_time: String,
    /// Dia da Semana, recomputed before persistence
    pub weekday: String,
    /// Mês, recomputed before persistence
    pub month: String,
    /// Local da Morte
    pub death_location: String,
    /// Veículo Vítima Ou Outros
    pub victim_vehicle: String,
    /// Veículo Envolvido Ou Outros
    pub involved_vehicle: String,
    /// Região
    pub region: String,
    /// Território de Desenvolvimento
    pub territory: String,
    /// OBS:
    pub notes: String,
}

impl Record {
    /// Recompute the derived columns from their source fields
    ///
    /// Age comes from birth and death dates, weekday and month from the
    /// incident date. When a source is missing the derived field is left
    /// empty rather than zeroed.
    pub fn recompute_derived(&mut self) {
        self.age = calc::age(self.birth_date, self.death_date);

        match self.incident_date {
            Some(date) => {
                self.weekday = calc::weekday_name(date).to_string();
                self.month = calc::month_name(date).to_string();
            }
            None => {
                self.weekday.clear();
                self.month.clear();
            }
        }
    }

    /// Display string of one column, as it is written into the sheet
    #[must_use]
    pub fn value_of(&self, column: Column) -> String {
        match column {
            Column::OccurrenceNature => self.occurrence_nature.clone(),
            Column::ReportNumber => self.report_number.clone(),
            Column::ReportCount => self.report_count.clone(),
            Column::VictimCount => self.victim_count.clone(),
            Column::AccidentType => self.accident_type.clone(),
            Column::AutopsyReportNumber => self.autopsy_report_number.clone(),
            Column::AutopsyNature => self.autopsy_nature.clone(),
            Column::DeathDate => self.death_date.map(calc::format_date).unwrap_or_default(),
            Column::Victim => self.victim_name.clone(),
            Column::Sex => self.sex.clone(),
            Column::Parentage => self.parentage.clone(),
            Column::BirthDate => self.birth_date.map(calc::format_date).unwrap_or_default(),
            Column::Age => self.age.map(|a| a.to_string()).unwrap_or_default(),
            Column::Cpf => self.cpf.clone(),
            Column::HasLicense => self.has_license.clone(),
            Column::IsDriver => self.is_driver.clone(),
            Column::AlcoholTest => self.alcohol_test.clone(),
            Column::HelmetUse => self.helmet_use.clone(),
            Column::Municipality => self.municipality.clone(),
            Column::Street => self.street.clone(),
            Column::SiteSubtype => self.site_subtype.clone(),
            Column::Latitude => self.latitude.map(display_decimal).unwrap_or_default(),
            Column::Longitude => self.longitude.map(display_decimal).unwrap_or_default(),
            Column::IncidentDate => self.incident_date.map(calc::format_date).unwrap_or_default(),
            Column::IncidentTime => self.incident_time.clone(),
            Column::Weekday => self.weekday.clone(),
            Column::Month => self.month.clone(),
            Column::DeathLocation => self.death_location.clone(),
            Column::VictimVehicle => self.victim_vehicle.clone(),
            Column::InvolvedVehicle => self.involved_vehicle.clone(),
            Column::Region => self.region.clone(),
            Column::Territory => self.territory.clone(),
            Column::Notes => self.notes.clone(),
        }
    }

    /// True when the column holds no value on this record
    #[must_use]
    pub fn field_is_blank(&self, column: Column) -> bool {
        self.value_of(column).trim().is_empty()
    }

    /// Render the record as a canonical 33-column row of display strings
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        Column::ALL.iter().map(|c| self.value_of(*c)).collect()
    }

    /// Build a record from a canonical 33-column row
    ///
    /// Cells that fail to parse for their kind come back as `None` or empty
    /// text; nothing is rejected here.
    #[must_use]
    pub fn from_row(row: &[String]) -> Self {
        let cell = |column: Column| -> String {
            row.get(column.index())
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let date = |column: Column| parse_sheet_date(&cell(column));
        let decimal = |column: Column| parse_decimal(&cell(column));

        Self {
            occurrence_nature: cell(Column::OccurrenceNature),
            report_number: cell(Column::ReportNumber),
            report_count: cell(Column::ReportCount),
            victim_count: cell(Column::VictimCount),
            accident_type: cell(Column::AccidentType),
            autopsy_report_number: cell(Column::AutopsyReportNumber),
            autopsy_nature: cell(Column::AutopsyNature),
            death_date: date(Column::DeathDate),
            victim_name: cell(Column::Victim),
            sex: cell(Column::Sex),
            parentage: cell(Column::Parentage),
            birth_date: date(Column::BirthDate),
            age: parse_integer(&cell(Column::Age)),
            cpf: cell(Column::Cpf),
            has_license: cell(Column::HasLicense),
            is_driver: cell(Column::IsDriver),
            alcohol_test: cell(Column::AlcoholTest),
            helmet_use: cell(Column::HelmetUse),
            municipality: cell(Column::Municipality),
            street: cell(Column::Street),
            site_subtype: cell(Column::SiteSubtype),
            latitude: decimal(Column::Latitude),
            longitude: decimal(Column::Longitude),
            incident_date: date(Column::IncidentDate),
            incident_time: cell(Column::IncidentTime),
            weekday: cell(Column::Weekday),
            month: cell(Column::Month),
            death_location: cell(Column::DeathLocation),
            victim_vehicle: cell(Column::VictimVehicle),
            involved_vehicle: cell(Column::InvolvedVehicle),
            region: cell(Column::Region),
            territory: cell(Column::Territory),
            notes: cell(Column::Notes),
        }
    }

    /// Label and display value of every column, for confirmation views
    #[must_use]
    pub fn labeled_values(&self) -> Vec<(&'static str, String)> {
        Column::ALL
            .iter()
            .map(|c| (c.label(), self.value_of(*c)))
            .collect()
    }
}

/// Render a decimal without a trailing `.0` when it is integer-valued
#[must_use]
pub fn display_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Format a raw cell for display according to the column kind
///
/// Dates and times stored as spreadsheet serial numbers come out as
/// `dd/mm/yyyy` and `HH:MM`; integer-valued numbers lose their `.0`; text
/// passes through trimmed.
#[must_use]
pub fn format_cell(raw: &str, kind: ColumnKind) -> String {
    let value = raw.trim();
    if value.is_empty() {
        return String::new();
    }

    match kind {
        ColumnKind::Date => {
            if let Ok(serial) = value.parse::<f64>() {
                if let Some(date) = calc::date_from_serial(serial) {
                    return calc::format_date(date);
                }
            }
            if let Some(date) = parse_sheet_date(value) {
                return calc::format_date(date);
            }
            value.to_string()
        }
        ColumnKind::Time => {
            if let Ok(serial) = value.parse::<f64>() {
                if let Some(time) = calc::time_from_serial(serial) {
                    return calc::format_time(time);
                }
            }
            if let Some(time) = calc::parse_sheet_time(value) {
                return calc::format_time(time);
            }
            value.to_string()
        }
        ColumnKind::Integer => match value.parse::<f64>() {
            Ok(number) if number.fract() == 0.0 => display_decimal(number),
            _ => value.to_string(),
        },
        ColumnKind::Decimal | ColumnKind::Text => value.to_string(),
    }
}

fn parse_decimal(value: &str) -> Option<f64> {
    let cleaned = value.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

fn parse_integer(value: &str) -> Option<i64> {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(v) = cleaned.parse::<i64>() {
        return Some(v);
    }
    cleaned.parse::<f64>().ok().map(|v| v as i64)
}
