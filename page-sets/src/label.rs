//! Slot labels as printed on the wallbox key legend
//!
//! Slot `s` carries letter `LETTERS[s % 20]` and digit `(s / 20 + 1) % 10`,
//! so slot 0 is `A1`, slot 19 is `V1`, slot 20 is `A2` and slot 199 is `V0`.

/// Letter keys in wallbox order (no I, no O)
pub const LETTERS: [char; 20] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V',
];

/// Number of slots in a page set
pub const SLOTS: u16 = 200;

/// Label for a slot, or `None` past the last slot
pub fn label_for(slot: u16) -> Option<String> {
    if slot >= SLOTS {
        return None;
    }
    let letter = LETTERS[(slot % 20) as usize];
    let digit = (slot / 20 + 1) % 10;
    Some(format!("{}{}", letter, digit))
}

/// Inverse of [`label_for`]; accepts lower-case letters
pub fn slot_for_label(label: &str) -> Option<u16> {
    let mut chars = label.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let digit = chars.next()?.to_digit(10)? as u16;
    if chars.next().is_some() {
        return None;
    }

    let column = LETTERS.iter().position(|l| *l == letter)? as u16;
    let row = (digit + 9) % 10;
    Some(row * 20 + column)
}
