/*!
 * Tests for language utilities
 */

use subsession::language_utils::{self, LanguageCodeType};

#[test]
fn test_validateLanguageCode_shouldClassifyCodes() {
    assert!(matches!(language_utils::validate_language_code("en"), Ok(LanguageCodeType::Part1)));
    assert!(matches!(language_utils::validate_language_code("fra"), Ok(LanguageCodeType::Part2T)));
    assert!(matches!(language_utils::validate_language_code("fre"), Ok(LanguageCodeType::Part2B)));
    assert!(language_utils::validate_language_code("xx").is_err());
    assert!(language_utils::validate_language_code("English").is_err());
}

#[test]
fn test_normalizeToPart2t_shouldMapEveryForm() {
    assert_eq!(language_utils::normalize_to_part2t("EN").unwrap(), "eng");
    assert_eq!(language_utils::normalize_to_part2t("ger").unwrap(), "deu");
    assert_eq!(language_utils::normalize_to_part2t("por").unwrap(), "por");
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(language_utils::get_language_name("es").unwrap(), "Spanish");
    assert_eq!(language_utils::get_language_name("fre").unwrap(), "French");
}

#[test]
fn test_resolveLanguageName_shouldAcceptNamesAndCodes() {
    assert_eq!(language_utils::resolve_language_name("pt").unwrap(), "Portuguese");
    assert_eq!(language_utils::resolve_language_name("Brazilian Portuguese").unwrap(), "Brazilian Portuguese");
    assert_eq!(language_utils::resolve_language_name("fre").unwrap(), "French");
    assert_eq!(language_utils::resolve_language_name("xx").unwrap(), "xx");
    assert!(language_utils::resolve_language_name("").is_err());
}

#[test]
fn test_languageTag_shouldBeFileNameFriendly() {
    assert_eq!(language_utils::language_tag("es"), "es");
    assert_eq!(language_utils::language_tag("deu"), "de");
    assert_eq!(language_utils::language_tag("Brazilian Portuguese"), "brazilian-portuguese");
}
