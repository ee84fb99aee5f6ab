//! Case suites.
//!
//! The harness core receives cases as opaque data; this module owns the
//! shipped default suite and JSON loading for user-supplied suites.

use std::path::Path;

use lipi::{SizeClass, TestCase};

use crate::error::CliResult;

/// The default ordered suite: positive S/M/L, negative, and UI coverage
#[must_use]
pub fn builtin_suite() -> Vec<TestCase> {
    vec![
        TestCase::positive(
            "pos-s-1",
            "morning greeting",
            SizeClass::S,
            "suba udhaeesanak",
            "සුබ උදෑසනක්",
        ),
        TestCase::positive(
            "pos-s-2",
            "single word greeting",
            SizeClass::S,
            "ayubowan",
            "ආයුබෝවන්",
        ),
        TestCase::positive(
            "pos-m-1",
            "short sentence",
            SizeClass::M,
            "mama dhaen enavaa",
            "මම දැන් එනවා",
        ),
        TestCase::positive(
            "pos-l-1",
            "full sentence",
            SizeClass::L,
            "api heta udhae gedhara yamu",
            "අපි හෙට උදෑ ගෙදර යමු",
        ),
        TestCase::negative(
            "neg-s-1",
            "glued words",
            SizeClass::S,
            "mamadanenawa",
            "words run together cannot map to a meaningful sentence",
        ),
        TestCase::negative(
            "neg-s-2",
            "non-singlish clusters",
            SizeClass::S,
            "xqzw kkjj",
            "consonant clusters with no Singlish reading",
        ),
        TestCase::ui(
            "ui-m-1",
            "output tracks clear",
            SizeClass::M,
            "mama dhaen enavaa",
            "clearing the input drives the output near-empty within the settle window",
        ),
    ]
}

/// Load a suite from a JSON file (an array of case records)
pub fn load_cases(path: &Path) -> CliResult<Vec<TestCase>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lipi::Category;
    use std::io::Write;

    #[test]
    fn test_builtin_suite_covers_all_categories() {
        let suite = builtin_suite();
        assert!(suite.iter().any(|c| c.category == Category::Positive));
        assert!(suite.iter().any(|c| c.category == Category::Negative));
        assert!(suite.iter().any(|c| c.category == Category::Ui));
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let suite = builtin_suite();
        let mut ids: Vec<&str> = suite.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), suite.len());
    }

    #[test]
    fn test_load_cases_round_trip() {
        let suite = builtin_suite();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&suite).unwrap().as_bytes())
            .unwrap();
        let loaded = load_cases(file.path()).unwrap();
        assert_eq!(loaded, suite);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        assert!(load_cases(file.path()).is_err());
    }
}
