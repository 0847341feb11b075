//! Add, update and remove for the id-keyed lists inside a record.
//!
//! Every list entry (medications, diseases, media, custom tests and scales)
//! carries an `id`. Edits are addressed by that id and never reorder the list.

use crate::{PatientError, PatientResult};

pub trait Identified {
    fn id(&self) -> &str;
}

/// Appends `entry`.
///
/// # Errors
///
/// Returns [`PatientError::InvalidInput`] if the id is empty or already present.
pub fn add_entry<T: Identified>(list: &mut Vec<T>, entry: T) -> PatientResult<()> {
    if entry.id().trim().is_empty() {
        return Err(PatientError::InvalidInput("entry id must not be empty".into()));
    }
    if list.iter().any(|e| e.id() == entry.id()) {
        return Err(PatientError::InvalidInput(format!(
            "duplicate entry id: {}",
            entry.id()
        )));
    }
    list.push(entry);
    Ok(())
}

/// Replaces the entry with the same id, in place.
///
/// # Errors
///
/// Returns [`PatientError::NotFound`] if no entry has that id.
pub fn update_entry<T: Identified>(list: &mut [T], entry: T) -> PatientResult<()> {
    match list.iter_mut().find(|e| e.id() == entry.id()) {
        Some(slot) => {
            *slot = entry;
            Ok(())
        }
        None => Err(PatientError::NotFound(format!("entry {}", entry.id()))),
    }
}

/// Removes and returns the entry with `id`. The order of the rest is kept.
///
/// # Errors
///
/// Returns [`PatientError::NotFound`] if no entry has that id.
pub fn remove_entry<T: Identified>(list: &mut Vec<T>, id: &str) -> PatientResult<T> {
    let index = list
        .iter()
        .position(|e| e.id() == id)
        .ok_or_else(|| PatientError::NotFound(format!("entry {id}")))?;
    Ok(list.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Medication, PatientRecord};

    #[test]
    fn add_two_medications_then_remove_the_first() {
        let mut record = PatientRecord::template();
        let ibuprofeno = Medication::new("Ibuprofeno", "400mg", "c/8h");
        let omeprazol = Medication::new("Omeprazol", "20mg", "c/24h");
        let first_id = ibuprofeno.id.clone();

        add_entry(&mut record.medications, ibuprofeno).expect("add first");
        add_entry(&mut record.medications, omeprazol).expect("add second");
        let removed = remove_entry(&mut record.medications, &first_id).expect("remove");

        assert_eq!(removed.name, "Ibuprofeno");
        assert_eq!(record.medications.len(), 1);
        assert_eq!(record.medications[0].name, "Omeprazol");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut list = vec![Medication {
            id: "a".into(),
            ..Medication::default()
        }];
        let dup = Medication {
            id: "a".into(),
            name: "otro".into(),
            ..Medication::default()
        };
        assert!(matches!(
            add_entry(&mut list, dup),
            Err(PatientError::InvalidInput(_))
        ));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn update_replaces_in_place_and_reports_missing() {
        let mut list = vec![
            Medication::new("A", "", ""),
            Medication::new("B", "", ""),
            Medication::new("C", "", ""),
        ];
        let mut changed = list[1].clone();
        changed.dose = "1g".into();
        update_entry(&mut list, changed).expect("update");
        assert_eq!(list[1].dose, "1g");
        assert_eq!(list[1].name, "B");

        let stranger = Medication::new("D", "", "");
        assert!(matches!(
            update_entry(&mut list, stranger),
            Err(PatientError::NotFound(_))
        ));
        assert!(matches!(
            remove_entry(&mut list, "missing"),
            Err(PatientError::NotFound(_))
        ));
    }
}
