//! Culture selection for number and date parsing.
//!
//! Step text written by humans follows local conventions: `10,5` is ten and a
//! half in Germany, `3/4/2024` is the third of April in Britain. A [`Culture`]
//! captures the handful of conventions the converter needs. Tags are
//! normalised the same way for every source (explicit configuration,
//! environment, or the host system) so they resolve to the same culture.

use ortho_config::LanguageIdentifier;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable name used to override the binding culture.
pub const STEPBIND_CULTURE_ENV: &str = "STEPBIND_CULTURE";

/// Read-only environment access used for culture resolution.
pub trait EnvProvider {
    /// Fetch the environment variable value for `key`.
    fn var(&self, key: &str) -> Option<String>;
}

/// Environment provider backed by the process environment.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// System locale provider for the current host.
pub trait SystemLocale {
    /// Return the system locale string when available.
    fn system_locale(&self) -> Option<String>;
}

/// System locale provider backed by `sys-locale`.
#[derive(Debug, Default, Copy, Clone)]
pub struct SysLocale;

impl SystemLocale for SysLocale {
    fn system_locale(&self) -> Option<String> {
        sys_locale::get_locale()
    }
}

/// Error raised for culture tags that cannot be normalised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{tag}' is not a valid culture tag")]
pub struct CultureError {
    /// The rejected tag.
    pub tag: String,
}

/// Order of the day, month and year fields in a short date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// `04/03/2024` is April 3rd.
    MonthDayYear,
    /// `03/04/2024` is April 3rd.
    DayMonthYear,
    /// `2024/04/03` is April 3rd.
    YearMonthDay,
}

/// Formatting conventions used when parsing step arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Culture {
    tag: Option<String>,
    decimal_separator: char,
    group_separators: &'static [char],
    date_order: DateOrder,
    date_separator: char,
}

const COMMA_GROUPS: &[char] = &[','];
const DOT_GROUPS: &[char] = &['.'];
const SPACE_GROUPS: &[char] = &[' ', '\u{a0}', '\u{202f}'];
const APOSTROPHE_GROUPS: &[char] = &['\'', '\u{2019}'];

struct Conventions {
    decimal: char,
    groups: &'static [char],
    order: DateOrder,
    date_separator: char,
}

const fn conventions(
    decimal: char,
    groups: &'static [char],
    order: DateOrder,
    date_separator: char,
) -> Conventions {
    Conventions {
        decimal,
        groups,
        order,
        date_separator,
    }
}

/// Region-specific overrides, checked before the language table.
fn region_conventions(language: &str, region: &str) -> Option<Conventions> {
    let found = match (language, region) {
        ("en", "GB" | "IE" | "AU" | "NZ" | "IN" | "ZA") => {
            conventions('.', COMMA_GROUPS, DateOrder::DayMonthYear, '/')
        }
        ("en", "CA") => conventions('.', COMMA_GROUPS, DateOrder::YearMonthDay, '-'),
        ("de" | "fr" | "it", "CH") => {
            conventions('.', APOSTROPHE_GROUPS, DateOrder::DayMonthYear, '.')
        }
        ("pt", "BR") => conventions(',', DOT_GROUPS, DateOrder::DayMonthYear, '/'),
        ("es", "MX" | "US") => conventions('.', COMMA_GROUPS, DateOrder::DayMonthYear, '/'),
        _ => return None,
    };
    Some(found)
}

fn language_conventions(language: &str) -> Option<Conventions> {
    let found = match language {
        "en" => conventions('.', COMMA_GROUPS, DateOrder::MonthDayYear, '/'),
        "de" | "da" | "nb" | "no" | "fi" | "tr" => {
            conventions(',', DOT_GROUPS, DateOrder::DayMonthYear, '.')
        }
        "ru" | "uk" | "pl" | "cs" | "sk" => {
            conventions(',', SPACE_GROUPS, DateOrder::DayMonthYear, '.')
        }
        "fr" => conventions(',', SPACE_GROUPS, DateOrder::DayMonthYear, '/'),
        "es" | "it" | "pt" | "el" => conventions(',', DOT_GROUPS, DateOrder::DayMonthYear, '/'),
        "nl" => conventions(',', DOT_GROUPS, DateOrder::DayMonthYear, '-'),
        "sv" | "lt" => conventions(',', SPACE_GROUPS, DateOrder::YearMonthDay, '-'),
        "hu" => conventions(',', SPACE_GROUPS, DateOrder::YearMonthDay, '.'),
        "ja" | "zh" | "ko" => conventions('.', COMMA_GROUPS, DateOrder::YearMonthDay, '/'),
        _ => return None,
    };
    Some(found)
}

/// Normalise a raw culture or locale string into a BCP 47 tag.
///
/// Encoding suffixes (`.UTF-8`) and variants (`@euro`) are stripped and
/// underscores become hyphens before the tag is validated.
///
/// # Examples
///
/// ```rust
/// use stepbind::culture::normalize_culture_tag;
///
/// assert_eq!(normalize_culture_tag("de_DE.UTF-8"), Some("de-DE".to_string()));
/// assert_eq!(normalize_culture_tag("en-US"), Some("en-US".to_string()));
/// assert_eq!(normalize_culture_tag(""), None);
/// ```
#[must_use]
pub fn normalize_culture_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stripped = trimmed.split(['.', '@']).next().unwrap_or_default().trim();
    if stripped.is_empty() {
        return None;
    }
    let candidate = stripped.replace('_', "-");
    LanguageIdentifier::from_str(&candidate)
        .ok()
        .map(|lang| lang.to_string())
}

impl Culture {
    /// Culture-neutral conventions: `.` decimals, no grouping, ISO dates.
    #[must_use]
    pub const fn invariant() -> Self {
        Self {
            tag: None,
            decimal_separator: '.',
            group_separators: &[],
            date_order: DateOrder::YearMonthDay,
            date_separator: '-',
        }
    }

    /// Resolve a culture from a tag such as `de-DE` or `en_GB.UTF-8`.
    ///
    /// Unknown regions fall back to the language defaults; unknown languages
    /// fall back to invariant conventions while keeping the tag.
    ///
    /// # Errors
    ///
    /// Returns [`CultureError`] when the tag is not a valid language tag.
    pub fn from_tag(raw: &str) -> Result<Self, CultureError> {
        let tag = normalize_culture_tag(raw).ok_or_else(|| CultureError {
            tag: raw.to_owned(),
        })?;
        let mut parts = tag.split('-');
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts
            .find(|part| part.len() == 2 || part.len() == 3)
            .map(str::to_ascii_uppercase);
        let found = region
            .as_deref()
            .and_then(|r| region_conventions(&language, r))
            .or_else(|| language_conventions(&language));
        let Some(conv) = found else {
            return Ok(Self {
                tag: Some(tag),
                ..Self::invariant()
            });
        };
        Ok(Self {
            tag: Some(tag),
            decimal_separator: conv.decimal,
            group_separators: conv.groups,
            date_order: conv.order,
            date_separator: conv.date_separator,
        })
    }

    /// Resolve the culture from `STEPBIND_CULTURE`, then the system locale.
    ///
    /// Invalid candidates are skipped; when none is valid the invariant
    /// culture is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stepbind::culture::{Culture, EnvProvider, SystemLocale};
    ///
    /// struct StubEnv(Option<String>);
    /// impl EnvProvider for StubEnv {
    ///     fn var(&self, key: &str) -> Option<String> {
    ///         (key == "STEPBIND_CULTURE").then(|| self.0.clone()).flatten()
    ///     }
    /// }
    ///
    /// struct StubSystem(Option<String>);
    /// impl SystemLocale for StubSystem {
    ///     fn system_locale(&self) -> Option<String> {
    ///         self.0.clone()
    ///     }
    /// }
    ///
    /// let culture = Culture::resolve(
    ///     &StubEnv(Some("de-DE".into())),
    ///     &StubSystem(Some("en_US".into())),
    /// );
    /// assert_eq!(culture.tag(), Some("de-DE"));
    /// ```
    #[must_use]
    pub fn resolve(env: &impl EnvProvider, system: &impl SystemLocale) -> Self {
        let env_culture = env.var(STEPBIND_CULTURE_ENV);
        let system_culture = system.system_locale();
        [env_culture.as_deref(), system_culture.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|raw| Self::from_tag(raw).ok())
            .unwrap_or_else(Self::invariant)
    }

    /// Normalised tag, or `None` for the invariant culture.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Decimal separator used by this culture.
    #[must_use]
    pub const fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    /// Characters accepted as digit-group separators.
    #[must_use]
    pub const fn group_separators(&self) -> &'static [char] {
        self.group_separators
    }

    /// Field order of short dates.
    #[must_use]
    pub const fn date_order(&self) -> DateOrder {
        self.date_order
    }

    /// Separator between short date fields.
    #[must_use]
    pub const fn date_separator(&self) -> char {
        self.date_separator
    }

    /// Rewrite a culture-formatted number into invariant form.
    ///
    /// Group separators are removed and the decimal separator becomes `.`.
    #[must_use]
    pub fn to_invariant_number(&self, text: &str) -> String {
        text.trim()
            .chars()
            .filter(|c| !self.group_separators.contains(c))
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct StubEnv(Option<&'static str>);

    impl EnvProvider for StubEnv {
        fn var(&self, key: &str) -> Option<String> {
            (key == STEPBIND_CULTURE_ENV)
                .then(|| self.0.map(str::to_owned))
                .flatten()
        }
    }

    struct StubSystem(Option<&'static str>);

    impl SystemLocale for StubSystem {
        fn system_locale(&self) -> Option<String> {
            self.0.map(str::to_owned)
        }
    }

    #[rstest]
    #[case("de-DE", ',', DateOrder::DayMonthYear)]
    #[case("en-US", '.', DateOrder::MonthDayYear)]
    #[case("en_GB.UTF-8", '.', DateOrder::DayMonthYear)]
    #[case("hu", ',', DateOrder::YearMonthDay)]
    #[case("pt-BR", ',', DateOrder::DayMonthYear)]
    fn resolves_known_cultures(
        #[case] tag: &str,
        #[case] decimal: char,
        #[case] order: DateOrder,
    ) {
        let culture = Culture::from_tag(tag).expect("valid tag");
        assert_eq!(culture.decimal_separator(), decimal);
        assert_eq!(culture.date_order(), order);
    }

    #[rstest]
    fn unknown_language_keeps_tag_with_invariant_rules() {
        let culture = Culture::from_tag("haw-US").expect("valid tag");
        assert_eq!(culture.tag(), Some("haw-US"));
        assert_eq!(culture.decimal_separator(), '.');
        assert!(culture.group_separators().is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("not a tag!")]
    fn rejects_invalid_tags(#[case] tag: &str) {
        assert!(Culture::from_tag(tag).is_err());
    }

    #[rstest]
    #[case("de-DE", "1.234,5", "1234.5")]
    #[case("en-US", "1,234.5", "1234.5")]
    #[case("fr-FR", "1\u{202f}234,5", "1234.5")]
    fn rewrites_numbers_to_invariant(#[case] tag: &str, #[case] text: &str, #[case] expected: &str) {
        let culture = Culture::from_tag(tag).expect("valid tag");
        assert_eq!(culture.to_invariant_number(text), expected);
    }

    #[rstest]
    #[case(Some("fr-FR"), Some("en-US"), Some("fr-FR"))]
    #[case(Some("!!"), Some("en_US.UTF-8"), Some("en-US"))]
    #[case(None, None, None)]
    fn resolve_prefers_environment_then_system(
        #[case] env: Option<&'static str>,
        #[case] system: Option<&'static str>,
        #[case] expected: Option<&str>,
    ) {
        let culture = Culture::resolve(&StubEnv(env), &StubSystem(system));
        assert_eq!(culture.tag(), expected);
    }
}
