//! Static field table for the feature record
//!
//! Every field the model knows about is declared once here as an
//! `(internal identifier, external alias)` pair. Deserialization, alias-keyed
//! serialization and the `/schema` endpoint all walk this table.

use serde::Serialize;

/// Scalar type accepted for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Integer with optional inclusive bounds
    Int {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    /// Floating point number
    Float,
    /// Boolean flag
    Bool,
}

/// Named set of flags where at most one may be true
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExclusiveGroup {
    Island,
    AgeBracket,
    EducationLevel,
}

impl ExclusiveGroup {
    /// Groups in the order their rules are evaluated
    pub const ALL: [ExclusiveGroup; 3] = [
        ExclusiveGroup::Island,
        ExclusiveGroup::AgeBracket,
        ExclusiveGroup::EducationLevel,
    ];

    /// Message reported when more than one member is selected
    pub fn violation_message(&self) -> &'static str {
        match self {
            ExclusiveGroup::Island => "No puedes seleccionar más de una isla a la vez.",
            ExclusiveGroup::AgeBracket => {
                "No puedes seleccionar ambos rangos de edad al mismo tiempo."
            }
            ExclusiveGroup::EducationLevel => {
                "No puedes seleccionar más de un nivel de estudios (N_V) a la vez."
            }
        }
    }

    /// Members of this group, in table order
    pub fn members(&self) -> impl Iterator<Item = (usize, &'static FieldSpec)> + '_ {
        FIELDS
            .iter()
            .enumerate()
            .filter(move |(_, spec)| spec.group == Some(*self))
    }
}

/// One row of the field table
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    /// Simplified identifier used internally
    pub name: &'static str,
    /// Canonical external key (may contain spaces and accents)
    pub alias: &'static str,
    pub kind: FieldKind,
    /// `None` means the field must be supplied
    pub default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<ExclusiveGroup>,
}

impl FieldSpec {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

const fn flag(
    name: &'static str,
    alias: &'static str,
    group: ExclusiveGroup,
) -> FieldSpec {
    FieldSpec {
        name,
        alias,
        kind: FieldKind::Bool,
        default: Some(false),
        group: Some(group),
    }
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        alias: name,
        kind,
        default: None,
        group: None,
    }
}

use ExclusiveGroup::{AgeBracket, EducationLevel, Island};

/// Internal identifier of the year field
pub const YEAR: &str = "AÑO";
/// Internal identifier of the month field
pub const MONTH: &str = "MES";
/// Internal identifier of the GDP field
pub const GDP_TOTAL: &str = "PIB_TOTAL";
pub const CRISIS: &str = "CRISIS";
pub const COVID: &str = "COVID";

/// The full field table in declaration order
pub static FIELDS: [FieldSpec; 26] = [
    required(YEAR, FieldKind::Int { min: None, max: None }),
    required(MONTH, FieldKind::Int { min: Some(1), max: Some(12) }),
    flag("I_El_Hierro", "I_El Hierro", Island),
    flag("I_Fuerteventura", "I_Fuerteventura", Island),
    flag("I_Gran_Canaria", "I_Gran Canaria", Island),
    flag("I_La_Gomera", "I_La Gomera", Island),
    flag("I_La_Palma", "I_La Palma", Island),
    flag("I_Lanzarote", "I_Lanzarote", Island),
    flag("I_Tenerife", "I_Tenerife", Island),
    flag("E_25_años_o_más", "E_25 años o más", AgeBracket),
    flag("E_Menor_de_25_años", "E_Menor de 25 años", AgeBracket),
    flag("N_V_Educación_general", "N_V_Educación general", EducationLevel),
    flag(
        "N_V_Estudios_post_secundarios",
        "N_V_Estudios post-secundarios",
        EducationLevel,
    ),
    flag("N_V_Estudios_primarios", "N_V_Estudios primarios", EducationLevel),
    flag(
        "N_V_Estudios_primarios_completos",
        "N_V_Estudios primarios completos",
        EducationLevel,
    ),
    flag(
        "N_V_Estudios_primarios_incompletos",
        "N_V_Estudios primarios incompletos",
        EducationLevel,
    ),
    flag("N_V_Estudios_secundarios", "N_V_Estudios secundarios", EducationLevel),
    flag("N_V_Formación_profesional", "N_V_Formación profesional", EducationLevel),
    flag("N_V_Primer_ciclo", "N_V_Primer ciclo", EducationLevel),
    flag(
        "N_V_Resto_de_estudios_post_secundarios",
        "N_V_Resto de estudios post-secundarios",
        EducationLevel,
    ),
    flag("N_V_Segundo_y_tercer_ciclo", "N_V_Segundo y tercer ciclo", EducationLevel),
    flag("N_V_Sin_estudios", "N_V_Sin estudios", EducationLevel),
    flag(
        "N_V_Técnico_profesional_superior",
        "N_V_Técnico profesional superior",
        EducationLevel,
    ),
    required(GDP_TOTAL, FieldKind::Float),
    required(CRISIS, FieldKind::Bool),
    required(COVID, FieldKind::Bool),
];

/// Position of a field in the table, matched by alias or internal name
pub fn position(key: &str) -> Option<usize> {
    FIELDS
        .iter()
        .position(|spec| spec.alias == key)
        .or_else(|| FIELDS.iter().position(|spec| spec.name == key))
}

/// Look up a field by alias first, then by internal name
pub fn lookup(key: &str) -> Option<&'static FieldSpec> {
    position(key).map(|idx| &FIELDS[idx])
}

/// Aliases in declaration order
pub fn aliases() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|spec| spec.alias)
}
