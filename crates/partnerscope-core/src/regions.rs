/// Label for states outside the table (or blank).
pub const OTHER_REGION: &str = "Outros";

pub const REGIONS: [&str; 5] = ["Norte", "Nordeste", "Centro-Oeste", "Sudeste", "Sul"];

const STATE_REGIONS: &[(&str, &str)] = &[
    ("AC", "Norte"),
    ("AL", "Nordeste"),
    ("AP", "Norte"),
    ("AM", "Norte"),
    ("BA", "Nordeste"),
    ("CE", "Nordeste"),
    ("DF", "Centro-Oeste"),
    ("ES", "Sudeste"),
    ("GO", "Centro-Oeste"),
    ("MA", "Nordeste"),
    ("MT", "Centro-Oeste"),
    ("MS", "Centro-Oeste"),
    ("MG", "Sudeste"),
    ("PA", "Norte"),
    ("PB", "Nordeste"),
    ("PR", "Sul"),
    ("PE", "Nordeste"),
    ("PI", "Nordeste"),
    ("RJ", "Sudeste"),
    ("RN", "Nordeste"),
    ("RS", "Sul"),
    ("RO", "Norte"),
    ("RR", "Norte"),
    ("SC", "Sul"),
    ("SP", "Sudeste"),
    ("SE", "Nordeste"),
    ("TO", "Norte"),
];

/// Map a two-letter state code onto its macro-region.
pub fn region_for_state(state: &str) -> &'static str {
    let code = state.trim();
    STATE_REGIONS
        .iter()
        .find(|(uf, _)| uf.eq_ignore_ascii_case(code))
        .map(|(_, region)| *region)
        .unwrap_or(OTHER_REGION)
}

/// Every state code in the table, sorted.
pub fn known_states() -> Vec<&'static str> {
    let mut states: Vec<&'static str> = STATE_REGIONS.iter().map(|(uf, _)| *uf).collect();
    states.sort_unstable();
    states
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_for_known_states() {
        assert_eq!(region_for_state("SP"), "Sudeste");
        assert_eq!(region_for_state("rs"), "Sul");
        assert_eq!(region_for_state(" DF "), "Centro-Oeste");
        assert_eq!(region_for_state("AM"), "Norte");
        assert_eq!(region_for_state("BA"), "Nordeste");
    }

    #[test]
    fn test_region_for_unknown_states() {
        assert_eq!(region_for_state(""), OTHER_REGION);
        assert_eq!(region_for_state("XX"), OTHER_REGION);
        assert_eq!(region_for_state("São Paulo"), OTHER_REGION);
    }

    #[test]
    fn test_every_state_maps_to_a_listed_region() {
        assert_eq!(STATE_REGIONS.len(), 27);
        for (_, region) in STATE_REGIONS {
            assert!(REGIONS.contains(region));
        }
    }

    #[test]
    fn test_known_states_sorted() {
        let states = known_states();
        assert_eq!(states.len(), 27);
        assert_eq!(states.first(), Some(&"AC"));
        assert_eq!(states.last(), Some(&"TO"));
        assert!(states.windows(2).all(|w| w[0] < w[1]));
    }
}
