//! Fixed domain values offered by the data-entry form.
//!
//! These mirror the drop-down contents of the sheet exactly, including the
//! `NI` (não informado) and `Outro` escape values. Dynamic domains such as
//! municipalities come from the loaded sheet instead, via
//! `RecordStore::unique_values`.

/// Accident types
pub const ACCIDENT_TYPES: &[&str] = &[
    "Atropelamento",
    "Atropelamento com Animais",
    "Capotamento",
    "Choque",
    "Colisão",
    "Colisão/Animal",
    "Queda",
    "Tombamento",
    "NI",
    "Outro",
];

/// Autopsy report natures
pub const AUTOPSY_NATURES: &[&str] = &[
    "Exame cadavérico - Acidente de Tráfego",
    "Exame cadavérico - Outros",
    "Exame Pericial em Local de Ocorrência",
    "Exame em Local de Oc. Tráfego",
    "Carbonização",
    "NI",
    "Outro",
];

/// Victim sex values
pub const SEXES: &[&str] = &["Masculino", "Feminino"];

/// Driver's licence answers
pub const LICENSE_ANSWERS: &[&str] = &["Sim", "Não", "NI"];

/// Driver-role answers
pub const DRIVER_ANSWERS: &[&str] = &["Sim", "Não", "NI"];

/// Blood alcohol examination answers
pub const ALCOHOL_TEST_ANSWERS: &[&str] = &["Sim", "NI"];

/// Helmet usage answers
pub const HELMET_ANSWERS: &[&str] = &["Sim", "Não", "NI"];

/// Site subtypes
pub const SITE_SUBTYPES: &[&str] = &[
    "Rua",
    "Avenida",
    "Rodovia Federal",
    "Rodovia Estadual",
    "Estrada de Terra",
    "Estrada Vicinal",
    "Zona Rural",
    "Povoado",
    "Via Pública",
    "Praça",
    "NI",
    "Outro",
];

/// Vehicles a victim may have been in or on
pub const VICTIM_VEHICLES: &[&str] = &[
    "Motocicleta",
    "Carro/Automóvel",
    "Pedestre",
    "Bicicleta",
    "Caminhão",
    "Ônibus",
    "Carroça",
    "Animal/Cavalo",
    "NI",
    "Outro",
];

/// Vehicles, obstacles and animals on the involved side
pub const INVOLVED_VEHICLES: &[&str] = &[
    "Motocicleta",
    "Carro/Automóvel",
    "Caminhão",
    "Ônibus",
    "Bicicleta",
    "Van",
    "Trator",
    "Choque/Poste",
    "Choque/Árvore",
    "Choque/Muro",
    "Colisão/Ponte",
    "Animal/Cavalo",
    "Animal/Gado",
    "Animal/Cachorro",
    "Capotamento",
    "Queda",
    "Tombamento",
    "NI",
];

/// State regions
pub const REGIONS: &[&str] = &["Capital", "Metropolitana", "Interior", "Litoral", "NI"];

/// Weekday names as written into the sheet, Monday first
pub const WEEKDAY_NAMES: [&str; 7] = [
    "SEGUNDA-FEIRA",
    "TERÇA-FEIRA",
    "QUARTA-FEIRA",
    "QUINTA-FEIRA",
    "SEXTA-FEIRA",
    "SÁBADO",
    "DOMINGO",
];

/// Month names as written into the sheet, January first
pub const MONTH_NAMES: [&str; 12] = [
    "JANEIRO",
    "FEVEREIRO",
    "MARÇO",
    "ABRIL",
    "MAIO",
    "JUNHO",
    "JULHO",
    "AGOSTO",
    "SETEMBRO",
    "OUTUBRO",
    "NOVEMBRO",
    "DEZEMBRO",
];
