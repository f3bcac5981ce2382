//! Roster normalization
//!
//! Operators name their phone column in many ways ("Teléfono Celular",
//! "WhatsApp", "Número"). Column matching strips diacritics, case and
//! separators, then maps any known alias onto the canonical `phone` header.
//! Tracking columns are appended when missing, so a bare roster export
//! becomes a full contact table on first import.

use rollcall_core::store::flatfile::TRACKING_COLUMNS;
use rollcall_core::text::strip_diacritics;
use rollcall_core::{normalize_phone, Table};
use tracing::debug;

use crate::error::{Result, SyncError};

/// Header spellings that mean "the display name column", in normalized form
const NAME_ALIASES: &[&str] = &[
    "displayname",
    "nombre",
    "nombrecompleto",
    "nombredelestudiante",
    "name",
    "fullname",
    "estudiante",
    "alumno",
];

/// Header spellings that mean "the phone column", in normalized form
const PHONE_ALIASES: &[&str] = &[
    "phone",
    "phonenumber",
    "telefono",
    "telefonocelular",
    "telefonoe164",
    "telefonodelestudiante",
    "telefonoestudiante",
    "celular",
    "cel",
    "movil",
    "whatsapp",
    "contacto",
    "numero",
];

/// Collapse a header to its comparable form: lowercase, diacritics stripped,
/// spaces/underscores/hyphens removed.
#[must_use]
pub fn normalize_column_name(name: &str) -> String {
    strip_diacritics(&name.to_lowercase())
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect()
}

fn map_alias_column(table: &mut Table, canonical: &str, aliases: &[&str]) -> bool {
    if table.column(canonical).is_some() {
        return true;
    }
    let found = table.headers.iter().find_map(|header| {
        let normalized = normalize_column_name(header);
        aliases
            .contains(&normalized.as_str())
            .then(|| header.clone())
    });
    match found {
        Some(original) => {
            debug!(column = %original, canonical = %canonical, "mapped roster column");
            table.rename_column(&original, canonical);
            true
        }
        None => false,
    }
}

/// Normalize a downloaded roster in place:
/// - rename the first recognized phone-alias column to `phone` and the first
///   name-alias column to `display_name`
/// - clean phone cells down to digits
/// - append missing tracking columns
///
/// Fails with [`SyncError::MissingPhoneColumn`] when no phone alias matches.
pub fn normalize_roster(table: &mut Table) -> Result<()> {
    if !map_alias_column(table, "phone", PHONE_ALIASES) {
        return Err(SyncError::MissingPhoneColumn);
    }
    map_alias_column(table, "display_name", NAME_ALIASES);

    let phone_col = table
        .column("phone")
        .ok_or(SyncError::MissingPhoneColumn)?;
    for row in 0..table.rows.len() {
        let cleaned = normalize_phone(table.cell(row, phone_col));
        table.set_cell(row, phone_col, cleaned);
    }

    for column in TRACKING_COLUMNS {
        table.ensure_column(column);
    }

    Ok(())
}

/// Parse raw CSV text and normalize it into a contact table
pub fn parse_roster(content: &str) -> Result<Table> {
    let mut table =
        Table::parse(content).map_err(|e| SyncError::Parse(e.to_string()))?;
    normalize_roster(&mut table)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("Teléfono Celular"), "telefonocelular");
        assert_eq!(normalize_column_name("phone_number"), "phonenumber");
        assert_eq!(normalize_column_name("NÚMERO"), "numero");
    }

    #[test]
    fn test_phone_alias_is_renamed_and_cleaned() {
        let mut table = Table::parse(
            "Nombre,Teléfono Celular\nAna,+57 315 496-3483\nLuis,(57) 311 311 6974\n",
        )
        .unwrap();
        normalize_roster(&mut table).unwrap();

        let col = table.column("phone").unwrap();
        assert_eq!(table.cell(0, col), "573154963483");
        assert_eq!(table.cell(1, col), "573113116974");
    }

    #[test]
    fn test_name_alias_is_renamed() {
        let mut table = Table::parse("Nombre Completo,WhatsApp\nAna,573001112233\n").unwrap();
        normalize_roster(&mut table).unwrap();
        let col = table.column("display_name").unwrap();
        assert_eq!(table.cell(0, col), "Ana");
    }

    #[test]
    fn test_existing_phone_column_wins_over_aliases() {
        let mut table = Table::parse("phone,whatsapp\n111,222\n").unwrap();
        normalize_roster(&mut table).unwrap();
        let col = table.column("phone").unwrap();
        assert_eq!(table.cell(0, col), "111");
        assert!(table.column("whatsapp").is_some());
    }

    #[test]
    fn test_tracking_columns_are_appended() {
        let mut table = Table::parse("Nombre,WhatsApp\nAna,573001112233\n").unwrap();
        normalize_roster(&mut table).unwrap();
        for column in TRACKING_COLUMNS {
            assert!(table.column(column).is_some(), "missing {column}");
        }
    }

    #[test]
    fn test_missing_phone_column_is_an_error() {
        let mut table = Table::parse("Nombre,Correo\nAna,ana@example.com\n").unwrap();
        assert!(matches!(
            normalize_roster(&mut table),
            Err(SyncError::MissingPhoneColumn)
        ));
    }
}
