use std::collections::HashMap;

use rand::seq::SliceRandom as _;
use rand::Rng;
use seat_checkin_config::Seating;
use seat_checkin_sheets::Table;

use super::CheckInError;

/// Seats of the pool that still have room, ascending.
///
/// Cells of the seat column that are not seat numbers are not counted.
#[must_use]
pub fn eligible_seats(seating: &Seating, registered: &Table, seat_column: &str) -> Vec<u32> {
    let mut occupancy = HashMap::<u32, usize>::new();
    for seat in registered
        .column_values(seat_column)
        .filter_map(|cell| cell.trim().parse::<u32>().ok())
    {
        *occupancy.entry(seat).or_default() += 1;
    }
    seating
        .pool()
        .into_iter()
        .filter(|seat| occupancy.get(seat).copied().unwrap_or_default() < seating.seat_capacity)
        .collect()
}

/// Uniform pick among the seats that still have room.
pub(super) fn draw_seat<R: Rng + ?Sized>(
    seating: &Seating,
    registered: &Table,
    seat_column: &str,
    rng: &mut R,
) -> Result<u32, CheckInError> {
    eligible_seats(seating, registered, seat_column)
        .choose(rng)
        .copied()
        .ok_or(CheckInError::SeatsExhausted)
}
