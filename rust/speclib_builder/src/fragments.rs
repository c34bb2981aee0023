use crate::errors::{
    BuildError,
    Result,
};
use crate::models::LibraryRecord;

pub const FRAGMENT_DELIMITER: char = ';';

/// Splits a delimited list, trimming every entry. An empty list has no entries.
pub fn split_fragment_list(list: &str) -> Vec<&str> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(FRAGMENT_DELIMITER).map(str::trim).collect()
}

/// Pairs `masses[i]` with `intensities[i]`.
pub fn parse_fragment_pairs(
    transition_group_id: &str,
    masses: &str,
    intensities: &str,
) -> Result<Vec<(f64, f64)>> {
    let masses = split_fragment_list(masses);
    let intensities = split_fragment_list(intensities);
    if masses.len() != intensities.len() {
        return Err(BuildError::MalformedFragmentList {
            transition_group_id: transition_group_id.to_string(),
            reason: format!(
                "{} masses but {} intensities",
                masses.len(),
                intensities.len()
            ),
        });
    }

    let parse = |kind: &str, v: &str| -> Result<f64> {
        v.parse::<f64>()
            .map_err(|_| BuildError::MalformedFragmentList {
                transition_group_id: transition_group_id.to_string(),
                reason: format!("{} {:?} is not a number", kind, v),
            })
    };

    masses
        .into_iter()
        .zip(intensities)
        .map(|(m, i)| Ok((parse("mass", m)?, parse("intensity", i)?)))
        .collect()
}

/// Expands a precursor-level row into one row per fragment.
///
/// `template` carries all the precursor fields; its fragment fields are overwritten.
pub fn expand_fragments(
    template: &LibraryRecord,
    masses: &str,
    intensities: &str,
) -> Result<Vec<LibraryRecord>> {
    let pairs = parse_fragment_pairs(&template.transition_group_id, masses, intensities)?;
    Ok(pairs
        .into_iter()
        .map(|(product_mz, library_intensity)| LibraryRecord {
            product_mz,
            library_intensity,
            ..template.clone()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> LibraryRecord {
        LibraryRecord {
            transition_group_id: "17".into(),
            precursor_mz: 500.25,
            product_mz: 0.0,
            precursor_charge: 2,
            calibrated_rt: 33.3,
            library_intensity: 0.0,
            peptide_sequence: "PEPTIDEK".into(),
            modified_peptide_sequence: "PEPTIDEK".into(),
            protein_name: "P12345".into(),
            ion_mobility: Some(0.91),
            decoy: false,
            transition_name: String::new(),
        }
    }

    #[test]
    fn test_expand_two_fragments() {
        let rows = expand_fragments(&template(), "100.1; 200.2", "10; 20").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].product_mz, rows[0].library_intensity), (100.1, 10.0));
        assert_eq!((rows[1].product_mz, rows[1].library_intensity), (200.2, 20.0));
        for r in &rows {
            assert_eq!(
                LibraryRecord {
                    product_mz: 0.0,
                    library_intensity: 0.0,
                    ..r.clone()
                },
                template()
            );
        }
    }

    #[test]
    fn test_length_mismatch() {
        let err = expand_fragments(&template(), "100.1;200.2;300.3", "10;20").unwrap_err();
        assert!(matches!(
            err,
            BuildError::MalformedFragmentList { ref transition_group_id, .. } if transition_group_id == "17"
        ));
    }

    #[test]
    fn test_non_numeric_entry() {
        assert!(expand_fragments(&template(), "100.1;abc", "10;20").is_err());
        assert!(expand_fragments(&template(), "100.1;", "10;20").is_err());
    }

    #[test]
    fn test_empty_lists() {
        assert!(split_fragment_list("  ").is_empty());
        assert!(expand_fragments(&template(), "", "").unwrap().is_empty());
    }
}
