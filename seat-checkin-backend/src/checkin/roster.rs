use seat_checkin_config::Columns;
use seat_checkin_sheets::Table;

use super::{CheckInError, Lookup};

/// Finds the person and seat for `input` in the roster, refusing anyone who is
/// already registered. Returns `(name, seat)` exactly as the roster has them.
pub fn resolve(
    registered: &Table,
    roster: &Table,
    columns: &Columns,
    input: &str,
    lookup: Lookup,
) -> Result<(String, String), CheckInError> {
    // a sheet without a name column has never been written to
    if registered.has_column(&columns.name) {
        if registered.contains(&columns.name, input) {
            return Err(CheckInError::Duplicate {
                name: input.to_owned(),
            });
        }
        if let Some(person) = roster
            .find(&columns.identifier, input)
            .and_then(|record| record.get(&columns.name))
        {
            if registered.contains(&columns.name, person) {
                return Err(CheckInError::Duplicate {
                    name: person.to_owned(),
                });
            }
        }
    }

    let record = match lookup {
        Lookup::Name => roster
            .find(&columns.name, input)
            .ok_or(CheckInError::NameNotFound)?,
        Lookup::Identifier => roster
            .find(&columns.identifier, input)
            .ok_or(CheckInError::IdentifierNotFound)?,
    };
    let missing_column = |column: &str| CheckInError::MissingColumn {
        column: column.to_owned(),
    };
    let seat = record
        .get(&columns.seat)
        .ok_or_else(|| missing_column(columns.seat.as_str()))?;
    let name = match lookup {
        Lookup::Name => input,
        Lookup::Identifier => record
            .get(&columns.name)
            .ok_or_else(|| missing_column(columns.name.as_str()))?,
    };
    if seat.trim().is_empty() {
        return Err(CheckInError::MissingSeat {
            name: name.to_owned(),
        });
    }
    Ok((name.to_owned(), seat.to_owned()))
}
