/*!
 * Tests for language code handling
 */

use ytcomments::language_utils::{get_language_name, normalize_to_part2t};

/// Test the accepted code forms
#[test]
fn test_getLanguageName_withSupportedForms_shouldResolve() {
    assert_eq!(get_language_name("de").unwrap(), "German");
    assert_eq!(get_language_name("deu").unwrap(), "German");
    assert_eq!(get_language_name("ger").unwrap(), "German");
    assert_eq!(get_language_name("JA").unwrap(), "Japanese");
    assert_eq!(get_language_name("spa").unwrap(), "Spanish");
}

/// Test normalization to 3-letter codes
#[test]
fn test_normalizeToPart2t_shouldReturnThreeLetterCode() {
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
}

/// Test invalid codes
#[test]
fn test_languageUtils_withInvalidCode_shouldFail() {
    for code in ["", "x", "xx", "english", "abcd"] {
        assert!(get_language_name(code).is_err(), "code: {}", code);
        assert!(normalize_to_part2t(code).is_err(), "code: {}", code);
    }
}
