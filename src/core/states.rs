//! Brazilian federative units (UF) and their geographic regions.
//!
//! Regions drive the interstate ICMS rate bands.

/// Marker used as UF for recipients abroad.
pub const FOREIGN_STATE: &str = "EX";

/// Geographic region of a federative unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    North,
    Northeast,
    CenterWest,
    Southeast,
    South,
}

/// Check whether `code` is a known UF (upper case, two letters).
pub fn is_known_state(code: &str) -> bool {
    STATES.binary_search_by(|(uf, _)| uf.cmp(&code)).is_ok()
}

/// Region of a UF, `None` for unknown codes and for [`FOREIGN_STATE`].
pub fn region_of(code: &str) -> Option<Region> {
    STATES
        .binary_search_by(|(uf, _)| uf.cmp(&code))
        .ok()
        .map(|i| STATES[i].1)
}

/// All 27 UFs with their region. Sorted for binary search.
static STATES: &[(&str, Region)] = &[
    ("AC", Region::North),
    ("AL", Region::Northeast),
    ("AM", Region::North),
    ("AP", Region::North),
    ("BA", Region::Northeast),
    ("CE", Region::Northeast),
    ("DF", Region::CenterWest),
    ("ES", Region::Southeast),
    ("GO", Region::CenterWest),
    ("MA", Region::Northeast),
    ("MG", Region::Southeast),
    ("MS", Region::CenterWest),
    ("MT", Region::CenterWest),
    ("PA", Region::North),
    ("PB", Region::Northeast),
    ("PE", Region::Northeast),
    ("PI", Region::Northeast),
    ("PR", Region::South),
    ("RJ", Region::Southeast),
    ("RN", Region::Northeast),
    ("RO", Region::North),
    ("RR", Region::North),
    ("RS", Region::South),
    ("SC", Region::South),
    ("SE", Region::Northeast),
    ("SP", Region::Southeast),
    ("TO", Region::North),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_states() {
        assert!(is_known_state("MT"));
        assert!(is_known_state("SP"));
        assert!(is_known_state("TO"));
    }

    #[test]
    fn unknown_states() {
        assert!(!is_known_state("XX"));
        assert!(!is_known_state("mt"));
        assert!(!is_known_state(""));
        assert!(!is_known_state(FOREIGN_STATE));
    }

    #[test]
    fn regions() {
        assert_eq!(region_of("MT"), Some(Region::CenterWest));
        assert_eq!(region_of("ES"), Some(Region::Southeast));
        assert_eq!(region_of("SE"), Some(Region::Northeast));
        assert_eq!(region_of("RS"), Some(Region::South));
        assert_eq!(region_of("EX"), None);
    }

    #[test]
    fn list_is_sorted() {
        for window in STATES.windows(2) {
            assert!(
                window[0].0 < window[1].0,
                "states not sorted: {} >= {}",
                window[0].0,
                window[1].0
            );
        }
    }

    #[test]
    fn list_count() {
        assert_eq!(STATES.len(), 27);
    }
}
