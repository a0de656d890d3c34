//! Per-line status records and snapshots.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{AppError, Result};

/// A monitored Metrobus line, numbered 1 through 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId(u8);

impl LineId {
    /// Number of monitored lines.
    pub const COUNT: u8 = 7;

    /// Create a line id, rejecting numbers outside 1..=7.
    pub fn new(number: u8) -> Result<Self> {
        if (1..=Self::COUNT).contains(&number) {
            Ok(Self(number))
        } else {
            Err(AppError::InvalidLine(number))
        }
    }

    /// All monitored lines in ascending order.
    pub fn all() -> impl DoubleEndedIterator<Item = LineId> {
        (1..=Self::COUNT).map(LineId)
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Expected `estado` when a line runs normally.
pub const BASELINE_ESTADO: &str = "Servicio Regular";

/// Expected `estaciones_afectadas` when a line runs normally.
pub const BASELINE_ESTACIONES: &str = "Ninguna";

/// One of the three text fields of a [`LineStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    Estado,
    EstacionesAfectadas,
    InfoAdicional,
}

impl StatusField {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusField::Estado => "estado",
            StatusField::EstacionesAfectadas => "estaciones_afectadas",
            StatusField::InfoAdicional => "info_adicional",
        }
    }
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service status of a single line as shown on the status page.
///
/// Fields are opaque text, compared only for equality. A field missing from
/// the page is stored as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStatus {
    /// Operational status (e.g. "Servicio Regular")
    pub estado: String,

    /// Affected stations (e.g. "Ninguna")
    pub estaciones_afectadas: String,

    /// Additional information, often empty
    pub info_adicional: String,
}

impl LineStatus {
    pub fn new(
        estado: impl Into<String>,
        estaciones_afectadas: impl Into<String>,
        info_adicional: impl Into<String>,
    ) -> Self {
        Self {
            estado: estado.into(),
            estaciones_afectadas: estaciones_afectadas.into(),
            info_adicional: info_adicional.into(),
        }
    }

    /// Build a record from possibly-missing fields, defaulting each to "".
    pub fn from_parts(
        estado: Option<String>,
        estaciones_afectadas: Option<String>,
        info_adicional: Option<String>,
    ) -> Self {
        Self {
            estado: estado.unwrap_or_default(),
            estaciones_afectadas: estaciones_afectadas.unwrap_or_default(),
            info_adicional: info_adicional.unwrap_or_default(),
        }
    }

    /// The record of a line running normally.
    pub fn baseline() -> Self {
        Self::new(BASELINE_ESTADO, BASELINE_ESTACIONES, "")
    }

    pub fn field(&self, field: StatusField) -> &str {
        match field {
            StatusField::Estado => &self.estado,
            StatusField::EstacionesAfectadas => &self.estaciones_afectadas,
            StatusField::InfoAdicional => &self.info_adicional,
        }
    }

    /// Fields that deviate from the normal-service baseline.
    ///
    /// `info_adicional` is trimmed before the emptiness check; the other two
    /// fields must match exactly.
    pub fn anomalies(&self) -> Vec<StatusField> {
        let mut fields = Vec::new();
        if self.estado != BASELINE_ESTADO {
            fields.push(StatusField::Estado);
        }
        if self.estaciones_afectadas != BASELINE_ESTACIONES {
            fields.push(StatusField::EstacionesAfectadas);
        }
        if !self.info_adicional.trim().is_empty() {
            fields.push(StatusField::InfoAdicional);
        }
        fields
    }

    /// Fields whose raw text differs from `other`.
    pub fn changed_fields(&self, other: &LineStatus) -> Vec<StatusField> {
        [
            StatusField::Estado,
            StatusField::EstacionesAfectadas,
            StatusField::InfoAdicional,
        ]
        .into_iter()
        .filter(|&field| self.field(field) != other.field(field))
        .collect()
    }
}

/// Status of every monitored line captured by one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    lines: BTreeMap<LineId, LineStatus>,
}

impl Snapshot {
    /// Build a snapshot, requiring a record for each of the seven lines.
    pub fn from_lines(lines: impl IntoIterator<Item = (LineId, LineStatus)>) -> Result<Self> {
        let lines: BTreeMap<LineId, LineStatus> = lines.into_iter().collect();
        let missing: Vec<u8> = LineId::all()
            .filter(|line| !lines.contains_key(line))
            .map(LineId::number)
            .collect();

        if !missing.is_empty() {
            return Err(AppError::IncompleteSnapshot { missing });
        }
        Ok(Self { lines })
    }

    /// A snapshot in which every line matches the baseline.
    pub fn baseline() -> Self {
        Self {
            lines: LineId::all().map(|l| (l, LineStatus::baseline())).collect(),
        }
    }

    pub fn get(&self, line: LineId) -> Option<&LineStatus> {
        self.lines.get(&line)
    }

    /// Iterate lines in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (LineId, &LineStatus)> {
        self.lines.iter().map(|(&line, status)| (line, status))
    }

    /// Return a copy with one line's record replaced.
    pub fn with_line(mut self, line: LineId, status: LineStatus) -> Self {
        self.lines.insert(line, status);
        self
    }
}
