//! Column schema for the fatality record sheet.
//!
//! The canonical layout has 33 columns in a fixed order. Older flat files
//! carry only the 29-column core and legacy worksheet tabs carry 32 columns,
//! so loading accepts those layouts and maps them onto the canonical order.
//! Column labels are the exact Portuguese headers from the sheet; headers
//! with embedded line breaks compare equal to their single-space form.

pub mod domains;

use crate::error::{Result, StoreError};

/// One column of the fatality record sheet, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Natureza da Ocorrência
    OccurrenceNature,
    /// Nº do BO
    ReportNumber,
    /// Nº de BOS
    ReportCount,
    /// Nº de Vítimas
    VictimCount,
    /// Tipo de Acidente
    AccidentType,
    /// Nº Laudo IML
    AutopsyReportNumber,
    /// Natureza do Laudo
    AutopsyNature,
    /// Data do Óbito
    DeathDate,
    /// Vítima
    Victim,
    /// Sexo
    Sex,
    /// Filiação
    Parentage,
    /// Data de Nascimento
    BirthDate,
    /// Idade (derived)
    Age,
    /// CPF
    Cpf,
    /// Possui CNH
    HasLicense,
    /// Condutor
    IsDriver,
    /// Realizado Exame Alcoolemia
    AlcoholTest,
    /// Estava usando Capacete
    HelmetUse,
    /// Município do Fato
    Municipality,
    /// Logradouro
    Street,
    /// Subtipo do Local
    SiteSubtype,
    /// Lat
    Latitude,
    /// Long
    Longitude,
    /// Data do Fato
    IncidentDate,
    /// Hora do fato
    IncidentTime,
    /// Dia da Semana (derived)
    Weekday,
    /// Mês (derived)
    Month,
    /// Local da Morte
    DeathLocation,
    /// Veículo Vítima Ou Outros
    VictimVehicle,
    /// Veículo Envolvido Ou Outros
    InvolvedVehicle,
    /// Região
    Region,
    /// Território de Desenvolvimento
    Territory,
    /// OBS:
    Notes,
}

/// Semantic kind of a column, used for cell formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free text
    Text,
    /// Whole number, rendered without a trailing `.0`
    Integer,
    /// Decimal number (coordinates)
    Decimal,
    /// Date rendered as `dd/mm/yyyy`
    Date,
    /// Time of day rendered as `HH:MM`
    Time,
}

impl Column {
    /// Every column in canonical sheet order
    pub const ALL: [Self; 33] = [
        Self::OccurrenceNature,
        Self::ReportNumber,
        Self::ReportCount,
        Self::VictimCount,
        Self::AccidentType,
        Self::AutopsyReportNumber,
        Self::AutopsyNature,
        Self::DeathDate,
        Self::Victim,
        Self::Sex,
        Self::Parentage,
        Self::BirthDate,
        Self::Age,
        Self::Cpf,
        Self::HasLicense,
        Self::IsDriver,
        Self::AlcoholTest,
        Self::HelmetUse,
        Self::Municipality,
        Self::Street,
        Self::SiteSubtype,
        Self::Latitude,
        Self::Longitude,
        Self::IncidentDate,
        Self::IncidentTime,
        Self::Weekday,
        Self::Month,
        Self::DeathLocation,
        Self::VictimVehicle,
        Self::InvolvedVehicle,
        Self::Region,
        Self::Territory,
        Self::Notes,
    ];

    /// Columns that must be filled before a record is accepted
    pub const REQUIRED: [Self; 8] = [
        Self::OccurrenceNature,
        Self::ReportNumber,
        Self::AccidentType,
        Self::DeathDate,
        Self::Victim,
        Self::Sex,
        Self::Municipality,
        Self::IncidentDate,
    ];

    /// The three date columns that get normalized and date-formatted
    pub const DATES: [Self; 3] = [Self::DeathDate, Self::BirthDate, Self::IncidentDate];

    /// Position of this column in the canonical order
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Sheet header label for this column
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OccurrenceNature => "Natureza da Ocorrência",
            Self::ReportNumber => "Nº do BO",
            Self::ReportCount => "Nº de BOS",
            Self::VictimCount => "Nº de Vítimas",
            Self::AccidentType => "Tipo de Acidente",
            Self::AutopsyReportNumber => "Nº Laudo IML",
            Self::AutopsyNature => "Natureza do Laudo",
            Self::DeathDate => "Data do Óbito",
            Self::Victim => "Vítima",
            Self::Sex => "Sexo",
            Self::Parentage => "Filiação",
            Self::BirthDate => "Data de Nascimento",
            Self::Age => "Idade",
            Self::Cpf => "CPF",
            Self::HasLicense => "Possui CNH",
            Self::IsDriver => "Condutor",
            Self::AlcoholTest => "Realizado Exame Alcoolemia",
            Self::HelmetUse => "Estava usando Capacete",
            Self::Municipality => "Município do Fato",
            Self::Street => "Logradouro",
            Self::SiteSubtype => "Subtipo do Local",
            Self::Latitude => "Lat",
            Self::Longitude => "Long",
            Self::IncidentDate => "Data do Fato",
            Self::IncidentTime => "Hora do fato",
            Self::Weekday => "Dia da Semana",
            Self::Month => "Mês",
            Self::DeathLocation => "Local da Morte",
            Self::VictimVehicle => "Veículo Vítima Ou Outros",
            Self::InvolvedVehicle => "Veículo Envolvido Ou Outros",
            Self::Region => "Região",
            Self::Territory => "Território de Desenvolvimento",
            Self::Notes => "OBS:",
        }
    }

    /// Semantic kind of this column
    #[must_use]
    pub const fn kind(self) -> ColumnKind {
        match self {
            Self::ReportCount | Self::VictimCount | Self::Age => ColumnKind::Integer,
            Self::Latitude | Self::Longitude => ColumnKind::Decimal,
            Self::DeathDate | Self::BirthDate | Self::IncidentDate => ColumnKind::Date,
            Self::IncidentTime => ColumnKind::Time,
            _ => ColumnKind::Text,
        }
    }

    /// Find the column matching a header label, tolerating embedded
    /// line breaks and stray whitespace
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = normalize_header(label);
        Self::ALL
            .iter()
            .find(|col| col.label() == normalized)
            .copied()
    }
}

/// Collapse runs of whitespace (including line breaks) to single spaces
#[must_use]
pub fn normalize_header(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accepted column layouts of a backing sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// All 33 canonical columns
    Full,
    /// 29-column core carried by older flat files (no occurrence header block)
    LegacyCore,
    /// 32-column worksheet tabs missing `Natureza da Ocorrência`
    PartitionLegacy,
}

/// `Column::ALL` without `Natureza da Ocorrência`, the shape of legacy tabs
const PARTITION_LEGACY_COLUMNS: [Column; 32] = {
    let mut cols = [Column::Notes; 32];
    let mut i = 1;
    while i < 33 {
        cols[i - 1] = Column::ALL[i];
        i += 1;
    }
    cols
};

/// `Column::ALL` without the four occurrence-header columns, the shape of
/// the oldest flat files
const LEGACY_CORE_COLUMNS: [Column; 29] = {
    let mut cols = [Column::Notes; 29];
    let mut i = 4;
    while i < 33 {
        cols[i - 4] = Column::ALL[i];
        i += 1;
    }
    cols
};

impl Layout {
    /// Columns of this layout, in the order a matching sheet carries them
    #[must_use]
    pub const fn columns(self) -> &'static [Column] {
        match self {
            Self::Full => &Column::ALL,
            Self::LegacyCore => &LEGACY_CORE_COLUMNS,
            Self::PartitionLegacy => &PARTITION_LEGACY_COLUMNS,
        }
    }

    /// Number of columns in this layout
    #[must_use]
    pub const fn width(self) -> usize {
        self.columns().len()
    }

    /// Match a header row against the allowed layouts
    ///
    /// Header labels are whitespace-normalized before comparison. The first
    /// layout whose column count matches is checked label by label; a count
    /// that matches no allowed layout or a diverging label is rejected.
    pub fn match_headers(headers: &[String], allowed: &[Self]) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        for layout in allowed {
            let columns = layout.columns();
            if normalized.len() != columns.len() {
                continue;
            }
            for (header, column) in normalized.iter().zip(columns.iter()) {
                if header != column.label() {
                    return Err(StoreError::InvalidFormat(format!(
                        "column \"{header}\" does not match expected \"{}\"",
                        column.label()
                    )));
                }
            }
            return Ok(*layout);
        }

        let expected: Vec<String> = allowed.iter().map(|l| l.width().to_string()).collect();
        Err(StoreError::InvalidFormat(format!(
            "sheet has {} columns, expected {}",
            normalized.len(),
            expected.join(" or ")
        )))
    }

    /// Map a row in this layout onto the canonical 33-column order
    ///
    /// Short rows are padded with empty cells first; columns absent from the
    /// layout come out empty.
    #[must_use]
    pub fn widen_row(self, row: &[String]) -> Vec<String> {
        let mut canonical = vec![String::new(); Column::ALL.len()];
        for (i, column) in self.columns().iter().enumerate() {
            if let Some(value) = row.get(i) {
                canonical[column.index()] = value.clone();
            }
        }
        canonical
    }

    /// Project a canonical 33-column row down to this layout's columns
    #[must_use]
    pub fn project_row(self, canonical: &[String]) -> Vec<String> {
        self.columns()
            .iter()
            .map(|column| canonical.get(column.index()).cloned().unwrap_or_default())
            .collect()
    }

    /// Header labels of this layout, for writing a header row
    #[must_use]
    pub fn header_row(self) -> Vec<String> {
        self.columns()
            .iter()
            .map(|column| column.label().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_of(layout: Layout) -> Vec<String> {
        layout.header_row()
    }

    #[test]
    fn test_canonical_column_count() {
        assert_eq!(Column::ALL.len(), 33);
        assert_eq!(Layout::Full.width(), 33);
        assert_eq!(Layout::LegacyCore.width(), 29);
        assert_eq!(Layout::PartitionLegacy.width(), 32);
    }

    #[test]
    fn test_index_follows_declaration_order() {
        for (i, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.index(), i);
        }
    }

    #[test]
    fn test_from_label_accepts_line_break_headers() {
        assert_eq!(
            Column::from_label("Data de\nNascimento"),
            Some(Column::BirthDate)
        );
        assert_eq!(Column::from_label("Possui\nCNH"), Some(Column::HasLicense));
        assert_eq!(
            Column::from_label("Território de\nDesenvolvimento"),
            Some(Column::Territory)
        );
        assert_eq!(Column::from_label("  Vítima  "), Some(Column::Victim));
        assert_eq!(Column::from_label("Sem Correspondência"), None);
    }

    #[test]
    fn test_match_headers_full_layout() {
        let headers = labels_of(Layout::Full);
        let layout = Layout::match_headers(&headers, &[Layout::Full, Layout::LegacyCore]).unwrap();
        assert_eq!(layout, Layout::Full);
    }

    #[test]
    fn test_match_headers_legacy_core() {
        let headers = labels_of(Layout::LegacyCore);
        let layout = Layout::match_headers(&headers, &[Layout::Full, Layout::LegacyCore]).unwrap();
        assert_eq!(layout, Layout::LegacyCore);
    }

    #[test]
    fn test_match_headers_rejects_unknown_count() {
        let headers = vec!["A".to_string(), "B".to_string()];
        let result = Layout::match_headers(&headers, &[Layout::Full, Layout::LegacyCore]);
        assert!(result.is_err());
    }

    #[test]
    fn test_match_headers_rejects_diverging_label() {
        let mut headers = labels_of(Layout::Full);
        headers[8] = "Vitima sem acento".to_string();
        let result = Layout::match_headers(&headers, &[Layout::Full]);
        assert!(result.is_err());
    }

    #[test]
    fn test_partition_legacy_misses_occurrence_nature() {
        let columns = Layout::PartitionLegacy.columns();
        assert_eq!(columns.len(), 32);
        assert!(!columns.contains(&Column::OccurrenceNature));
        assert_eq!(columns[0], Column::ReportNumber);
        assert_eq!(columns[31], Column::Notes);
    }

    #[test]
    fn test_legacy_core_drops_occurrence_header_block() {
        let columns = Layout::LegacyCore.columns();
        assert_eq!(columns.len(), 29);
        assert!(!columns.contains(&Column::ReportNumber));
        assert_eq!(columns[0], Column::AccidentType);
        assert_eq!(columns[28], Column::Notes);
    }

    #[test]
    fn test_widen_and_project_round_trip() {
        let row: Vec<String> = (0..32).map(|i| format!("v{i}")).collect();
        let canonical = Layout::PartitionLegacy.widen_row(&row);
        assert_eq!(canonical.len(), 33);
        assert_eq!(canonical[Column::OccurrenceNature.index()], "");
        assert_eq!(canonical[Column::ReportNumber.index()], "v0");

        let projected = Layout::PartitionLegacy.project_row(&canonical);
        assert_eq!(projected, row);
    }

    #[test]
    fn test_widen_pads_ragged_rows() {
        let row = vec!["only".to_string()];
        let canonical = Layout::Full.widen_row(&row);
        assert_eq!(canonical.len(), 33);
        assert_eq!(canonical[0], "only");
        assert!(canonical[1..].iter().all(String::is_empty));
    }

    #[test]
    fn test_required_labels_in_declared_order() {
        let labels: Vec<&str> = Column::REQUIRED.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Natureza da Ocorrência",
                "Nº do BO",
                "Tipo de Acidente",
                "Data do Óbito",
                "Vítima",
                "Sexo",
                "Município do Fato",
                "Data do Fato",
            ]
        );
    }
}
