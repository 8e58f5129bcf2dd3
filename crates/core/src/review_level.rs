//! Normalization of review-level labels.
//!
//! Historical data and older workflow configurations use several spellings
//! for the same tier of reviewer. Everything that branches on level goes
//! through [`normalize`] first.

/// Advisor tier.
pub const TEACHER: &str = "TEACHER";
/// College (second-tier admin) tier.
pub const LEVEL2: &str = "LEVEL2";
/// School (first-tier admin) tier.
pub const LEVEL1: &str = "LEVEL1";
/// Missing or empty level data.
pub const UNKNOWN: &str = "UNKNOWN";

/// Map a raw review-level label onto its canonical spelling.
///
/// Known aliases collapse onto the tier constants and empty input maps
/// to [`UNKNOWN`]. Any other label is a level this module has never
/// heard of but a configured chain may legitimately use, so it passes
/// through unchanged.
pub fn normalize(raw: &str) -> &str {
    match raw {
        "" => UNKNOWN,
        LEVEL2 | "LEVEL2_ADMIN" | "COLLEGE_ADMIN" => LEVEL2,
        LEVEL1 | "LEVEL1_ADMIN" | "SCHOOL_ADMIN" => LEVEL1,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_labels_pass_through() {
        assert_eq!(normalize("TEACHER"), TEACHER);
        assert_eq!(normalize("LEVEL2"), LEVEL2);
        assert_eq!(normalize("LEVEL1"), LEVEL1);
    }

    #[test]
    fn test_admin_role_aliases_map_to_tiers() {
        assert_eq!(normalize("LEVEL2_ADMIN"), LEVEL2);
        assert_eq!(normalize("COLLEGE_ADMIN"), LEVEL2);
        assert_eq!(normalize("LEVEL1_ADMIN"), LEVEL1);
        assert_eq!(normalize("SCHOOL_ADMIN"), LEVEL1);
    }

    #[test]
    fn test_empty_maps_to_unknown() {
        assert_eq!(normalize(""), UNKNOWN);
    }

    #[test]
    fn test_unrecognized_labels_pass_through() {
        assert_eq!(normalize("PROVINCE_EXPERT"), "PROVINCE_EXPERT");
        assert_eq!(normalize("DEPT_REVIEW"), "DEPT_REVIEW");
    }
}
