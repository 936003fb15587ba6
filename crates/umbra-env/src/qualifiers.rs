//! Device-configuration qualifier strings.
//!
//! A qualifier string is a hyphen-delimited token sequence such as
//! `en-rUS-sw360dp-w360dp-land-xhdpi-v23`. Tokens must appear in the
//! platform's canonical order and at most once per kind:
//!
//! | Kind               | Tokens                                             |
//! |--------------------|----------------------------------------------------|
//! | MCC / MNC          | `mcc310`, `mnc004`                                 |
//! | Locale             | `en`, `en-rUS`, `b+sr+Latn+RS`                     |
//! | Layout direction   | `ldltr`, `ldrtl`                                   |
//! | Smallest width     | `sw320dp`                                          |
//! | Available width    | `w320dp`                                           |
//! | Available height   | `h480dp`                                           |
//! | Screen size        | `small`, `normal`, `large`, `xlarge`               |
//! | Screen aspect      | `long`, `notlong`                                  |
//! | Round screen       | `round`, `notround`                                |
//! | Orientation        | `port`, `land`, `square`                           |
//! | UI mode type       | `car`, `desk`, `television`, `appliance`, `watch`, `vrheadset` |
//! | Night mode         | `night`, `notnight`                                |
//! | Density            | `ldpi` .. `xxxhdpi`, `tvdpi`, `nodpi`, `anydpi`, `NNNdpi` |
//! | Touchscreen        | `notouch`, `stylus`, `finger`                      |
//! | Keyboard hidden    | `keysexposed`, `keyshidden`, `keyssoft`            |
//! | Keyboard           | `nokeys`, `qwerty`, `12key`                        |
//! | Navigation hidden  | `navexposed`, `navhidden`                          |
//! | Navigation         | `nonav`, `dpad`, `trackball`, `wheel`              |
//! | Platform version   | `v19`                                              |
//!
//! Set-up resolves the effective qualifiers in layers: whatever the test
//! asked for, then the simulated platform version, then the default
//! smallest-width and width. Each later layer only fills kinds the earlier
//! layers left empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use umbra_types::ApiLevel;

use crate::error::{EnvError, QualifierError};

// ============================================================================
// Token Enums
// ============================================================================

macro_rules! qualifier_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Qualifier token for this value.
            pub fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }

            pub fn from_token(token: &str) -> Option<Self> {
                match token {
                    $($token => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.token())
            }
        }
    };
}

qualifier_enum!(LayoutDirection { Ltr => "ldltr", Rtl => "ldrtl" });

qualifier_enum!(ScreenSize {
    Small => "small",
    Normal => "normal",
    Large => "large",
    XLarge => "xlarge",
});

qualifier_enum!(ScreenLong { Long => "long", NotLong => "notlong" });

qualifier_enum!(ScreenRound { Round => "round", NotRound => "notround" });

qualifier_enum!(Orientation { Portrait => "port", Landscape => "land", Square => "square" });

qualifier_enum!(
    /// UI mode type. The platform's default "normal" type has no token.
    UiModeType {
        Car => "car",
        Desk => "desk",
        Television => "television",
        Appliance => "appliance",
        Watch => "watch",
        VrHeadset => "vrheadset",
    }
);

qualifier_enum!(NightMode { Night => "night", NotNight => "notnight" });

qualifier_enum!(Touchscreen { NoTouch => "notouch", Stylus => "stylus", Finger => "finger" });

qualifier_enum!(KeysHidden {
    Exposed => "keysexposed",
    Hidden => "keyshidden",
    Soft => "keyssoft",
});

qualifier_enum!(Keyboard { NoKeys => "nokeys", Qwerty => "qwerty", TwelveKey => "12key" });

qualifier_enum!(NavHidden { Exposed => "navexposed", Hidden => "navhidden" });

qualifier_enum!(Navigation {
    NoNav => "nonav",
    Dpad => "dpad",
    Trackball => "trackball",
    Wheel => "wheel",
});

// ============================================================================
// Density
// ============================================================================

/// Screen density in dots per inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Density(u16);

impl Density {
    pub const LOW: Density = Density(120);
    pub const MEDIUM: Density = Density(160);
    pub const TV: Density = Density(213);
    pub const HIGH: Density = Density(240);
    pub const XHIGH: Density = Density(320);
    pub const XXHIGH: Density = Density(480);
    pub const XXXHIGH: Density = Density(640);
    /// Density-independent resources; never scaled.
    pub const NONE: Density = Density(0xffff);
    /// Vector resources usable at any density.
    pub const ANY: Density = Density(0xfffe);

    const NAMED: [(Density, &'static str); 9] = [
        (Density::LOW, "ldpi"),
        (Density::MEDIUM, "mdpi"),
        (Density::TV, "tvdpi"),
        (Density::HIGH, "hdpi"),
        (Density::XHIGH, "xhdpi"),
        (Density::XXHIGH, "xxhdpi"),
        (Density::XXXHIGH, "xxxhdpi"),
        (Density::NONE, "nodpi"),
        (Density::ANY, "anydpi"),
    ];

    pub const fn from_dpi(dpi: u16) -> Self {
        Density(dpi)
    }

    pub const fn dpi(self) -> u16 {
        self.0
    }

    /// True for `nodpi` and `anydpi`, which carry no physical density.
    pub fn is_symbolic(self) -> bool {
        self == Density::NONE || self == Density::ANY
    }

    /// Qualifier token: a bucket name where one exists, `NNNdpi` otherwise.
    pub fn token(self) -> String {
        Self::NAMED
            .iter()
            .find(|(density, _)| *density == self)
            .map_or_else(|| format!("{}dpi", self.0), |(_, name)| (*name).to_string())
    }

    fn parse_token(token: &str) -> Option<Result<Self, &'static str>> {
        if let Some((density, _)) = Self::NAMED.iter().find(|(_, name)| *name == token) {
            return Some(Ok(*density));
        }
        let digits = token.strip_suffix("dpi")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(match digits.parse::<u16>() {
            Ok(0) => Err("density must be positive"),
            Ok(dpi) if dpi >= Density::ANY.0 => Err("density out of range"),
            Ok(dpi) => Ok(Density(dpi)),
            Err(_) => Err("density out of range"),
        })
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

// ============================================================================
// Locale
// ============================================================================

/// Language, optional script, optional region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Locale {
    language: String,
    script: Option<String>,
    region: Option<String>,
}

impl Locale {
    /// Builds a locale, normalizing case (`en`, `Latn`, `US`).
    pub fn new(language: &str, script: Option<&str>, region: Option<&str>) -> Result<Self, &'static str> {
        if !(2..=3).contains(&language.len()) || !language.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err("language must be 2 or 3 letters");
        }
        if let Some(script) = script
            && (script.len() != 4 || !script.bytes().all(|b| b.is_ascii_alphabetic()))
        {
            return Err("script must be 4 letters");
        }
        if let Some(region) = region {
            let letters = region.len() == 2 && region.bytes().all(|b| b.is_ascii_alphabetic());
            let digits = region.len() == 3 && region.bytes().all(|b| b.is_ascii_digit());
            if !letters && !digits {
                return Err("region must be 2 letters or 3 digits");
            }
        }

        Ok(Self {
            language: language.to_ascii_lowercase(),
            script: script.map(|s| {
                let mut s = s.to_ascii_lowercase();
                s[..1].make_ascii_uppercase();
                s
            }),
            region: region.map(str::to_ascii_uppercase),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// BCP-47 tag, e.g. `en-US` or `sr-Latn-RS`.
    pub fn to_language_tag(&self) -> String {
        let mut tag = self.language.clone();
        for part in [&self.script, &self.region].into_iter().flatten() {
            tag.push('-');
            tag.push_str(part);
        }
        tag
    }

    /// True for languages written right to left.
    pub fn is_right_to_left(&self) -> bool {
        matches!(
            self.language.as_str(),
            "ar" | "fa" | "he" | "iw" | "ur" | "yi" | "ji" | "ps" | "sd" | "ug" | "dv"
        )
    }

    /// Qualifier tokens: `en`, `en-rUS`, or `b+sr+Latn+RS` when a script is
    /// present.
    fn tokens(&self) -> Vec<String> {
        match (&self.script, &self.region) {
            (None, None) => vec![self.language.clone()],
            (None, Some(region)) => vec![self.language.clone(), format!("r{region}")],
            (Some(_), _) => vec![format!("b+{}", self.to_language_tag().replace('-', "+"))],
        }
    }

    fn parse_bcp47(token: &str) -> Result<Self, &'static str> {
        let mut parts = token.split('+');
        let language = parts.next().unwrap_or_default();
        let mut script = None;
        let mut region = None;
        for part in parts {
            match part.len() {
                4 if script.is_none() && region.is_none() => script = Some(part),
                2 | 3 if region.is_none() => region = Some(part),
                _ => return Err("malformed BCP-47 locale"),
            }
        }
        Locale::new(language, script, region)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_language_tag())
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_language_tag()
    }
}

impl TryFrom<String> for Locale {
    type Error = String;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        Locale::parse_bcp47(&tag.replace('-', "+")).map_err(|reason| format!("{tag}: {reason}"))
    }
}

// ============================================================================
// Qualifier Set
// ============================================================================

/// Token kinds, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Mcc,
    Mnc,
    Locale,
    LayoutDirection,
    SmallestWidth,
    Width,
    Height,
    ScreenSize,
    ScreenLong,
    ScreenRound,
    Orientation,
    UiModeType,
    NightMode,
    Density,
    Touchscreen,
    KeysHidden,
    Keyboard,
    NavHidden,
    Navigation,
    PlatformVersion,
}

/// Parsed qualifiers. `None` means the kind was not specified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifierSet {
    pub mcc: Option<u16>,
    pub mnc: Option<u16>,
    pub locale: Option<Locale>,
    pub layout_direction: Option<LayoutDirection>,
    pub smallest_screen_width_dp: Option<u32>,
    pub screen_width_dp: Option<u32>,
    pub screen_height_dp: Option<u32>,
    pub screen_size: Option<ScreenSize>,
    pub screen_long: Option<ScreenLong>,
    pub screen_round: Option<ScreenRound>,
    pub orientation: Option<Orientation>,
    pub ui_mode_type: Option<UiModeType>,
    pub night_mode: Option<NightMode>,
    pub density: Option<Density>,
    pub touchscreen: Option<Touchscreen>,
    pub keys_hidden: Option<KeysHidden>,
    pub keyboard: Option<Keyboard>,
    pub nav_hidden: Option<NavHidden>,
    pub navigation: Option<Navigation>,
    pub platform_version: Option<ApiLevel>,
}

/// Numeric token body such as the `320` of `sw320dp`.
fn dp_value(body: &str) -> Option<Result<u32, &'static str>> {
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(match body.parse::<u32>() {
        Ok(0) => Err("dimension must be positive"),
        Ok(dp) => Ok(dp),
        Err(_) => Err("dimension out of range"),
    })
}

fn numeric<T: FromStr>(body: &str, reason: &'static str) -> Option<Result<T, &'static str>> {
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(body.parse::<T>().map_err(|_| reason))
}

fn is_language(token: &str) -> bool {
    (2..=3).contains(&token.len())
        && token.bytes().all(|b| b.is_ascii_alphabetic())
        && UiModeType::from_token(token).is_none()
}

/// Region part of an `rUS` / `r419` token. Case-sensitive so that `rUS`
/// is never mistaken for a three-letter language.
fn region_of(token: &str) -> Option<&str> {
    let region = token.strip_prefix('r')?;
    let letters = region.len() == 2 && region.bytes().all(|b| b.is_ascii_uppercase());
    let digits = region.len() == 3 && region.bytes().all(|b| b.is_ascii_digit());
    (letters || digits).then_some(region)
}

impl QualifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a qualifier string. The empty string is the empty set.
    pub fn parse(qualifiers: &str) -> Result<Self, QualifierError> {
        let mut set = QualifierSet::default();
        if qualifiers.trim().is_empty() {
            return Ok(set);
        }

        let tokens: Vec<&str> = qualifiers.split('-').collect();
        let mut last: Option<(Kind, &str)> = None;
        let mut index = 0;

        while index < tokens.len() {
            let raw = tokens[index];
            if raw.is_empty() {
                return Err(QualifierError::EmptyToken { position: index });
            }
            let lower = raw.to_ascii_lowercase();
            let invalid = |reason| QualifierError::InvalidValue {
                token: raw.to_string(),
                reason,
            };

            let kind = set.apply(&lower, raw, &tokens, &mut index).map_err(invalid)?;
            let Some(kind) = kind else {
                return Err(if region_of(raw).is_some() {
                    QualifierError::OutOfOrder {
                        token: raw.to_string(),
                        previous: last.map_or_else(String::new, |(_, token)| token.to_string()),
                    }
                } else {
                    QualifierError::Unknown {
                        token: raw.to_string(),
                    }
                });
            };

            if let Some((previous_kind, previous)) = last
                && kind <= previous_kind
            {
                return Err(QualifierError::OutOfOrder {
                    token: raw.to_string(),
                    previous: previous.to_string(),
                });
            }
            last = Some((kind, raw));
            index += 1;
        }

        Ok(set)
    }

    /// Classifies `lower` and stores its value. Returns `None` for tokens
    /// of no known kind, including a region with no language before it.
    /// A language consumes the region token that follows it.
    fn apply(
        &mut self,
        lower: &str,
        raw: &str,
        tokens: &[&str],
        index: &mut usize,
    ) -> Result<Option<Kind>, &'static str> {
        if let Some(body) = lower.strip_prefix("mcc")
            && let Some(value) = numeric::<u16>(body, "mcc out of range")
        {
            self.mcc = Some(value?);
            return Ok(Some(Kind::Mcc));
        }
        if let Some(body) = lower.strip_prefix("mnc")
            && let Some(value) = numeric::<u16>(body, "mnc out of range")
        {
            self.mnc = Some(value?);
            return Ok(Some(Kind::Mnc));
        }
        if let Some(tag) = lower.strip_prefix("b+") {
            self.locale = Some(Locale::parse_bcp47(tag)?);
            return Ok(Some(Kind::Locale));
        }
        if region_of(raw).is_some() {
            return Ok(None);
        }
        if is_language(lower) {
            let region = tokens.get(*index + 1).and_then(|next| region_of(next));
            if region.is_some() {
                *index += 1;
            }
            self.locale = Some(Locale::new(lower, None, region)?);
            return Ok(Some(Kind::Locale));
        }
        if let Some(value) = LayoutDirection::from_token(lower) {
            self.layout_direction = Some(value);
            return Ok(Some(Kind::LayoutDirection));
        }
        if let Some(body) = lower.strip_prefix("sw").and_then(|rest| rest.strip_suffix("dp"))
            && let Some(dp) = dp_value(body)
        {
            self.smallest_screen_width_dp = Some(dp?);
            return Ok(Some(Kind::SmallestWidth));
        }
        if let Some(body) = lower.strip_prefix('w').and_then(|rest| rest.strip_suffix("dp"))
            && let Some(dp) = dp_value(body)
        {
            self.screen_width_dp = Some(dp?);
            return Ok(Some(Kind::Width));
        }
        if let Some(body) = lower.strip_prefix('h').and_then(|rest| rest.strip_suffix("dp"))
            && let Some(dp) = dp_value(body)
        {
            self.screen_height_dp = Some(dp?);
            return Ok(Some(Kind::Height));
        }
        if let Some(value) = ScreenSize::from_token(lower) {
            self.screen_size = Some(value);
            return Ok(Some(Kind::ScreenSize));
        }
        if let Some(value) = ScreenLong::from_token(lower) {
            self.screen_long = Some(value);
            return Ok(Some(Kind::ScreenLong));
        }
        if let Some(value) = ScreenRound::from_token(lower) {
            self.screen_round = Some(value);
            return Ok(Some(Kind::ScreenRound));
        }
        if let Some(value) = Orientation::from_token(lower) {
            self.orientation = Some(value);
            return Ok(Some(Kind::Orientation));
        }
        if let Some(value) = UiModeType::from_token(lower) {
            self.ui_mode_type = Some(value);
            return Ok(Some(Kind::UiModeType));
        }
        if let Some(value) = NightMode::from_token(lower) {
            self.night_mode = Some(value);
            return Ok(Some(Kind::NightMode));
        }
        if let Some(value) = Density::parse_token(lower) {
            self.density = Some(value?);
            return Ok(Some(Kind::Density));
        }
        if let Some(value) = Touchscreen::from_token(lower) {
            self.touchscreen = Some(value);
            return Ok(Some(Kind::Touchscreen));
        }
        if let Some(value) = KeysHidden::from_token(lower) {
            self.keys_hidden = Some(value);
            return Ok(Some(Kind::KeysHidden));
        }
        if let Some(value) = Keyboard::from_token(lower) {
            self.keyboard = Some(value);
            return Ok(Some(Kind::Keyboard));
        }
        if let Some(value) = NavHidden::from_token(lower) {
            self.nav_hidden = Some(value);
            return Ok(Some(Kind::NavHidden));
        }
        if let Some(value) = Navigation::from_token(lower) {
            self.navigation = Some(value);
            return Ok(Some(Kind::Navigation));
        }
        if let Some(body) = lower.strip_prefix('v')
            && let Some(level) = numeric::<u16>(body, "platform version out of range")
        {
            let level = level?;
            if level == 0 {
                return Err("platform version must be positive");
            }
            self.platform_version = Some(ApiLevel::new(level));
            return Ok(Some(Kind::PlatformVersion));
        }

        Ok(None)
    }

    /// Fills every kind that is unset here from `other`.
    pub fn fill_gaps_from(&mut self, other: &QualifierSet) {
        macro_rules! fill {
            ($($field:ident),+ $(,)?) => {
                $(
                    if self.$field.is_none() {
                        self.$field.clone_from(&other.$field);
                    }
                )+
            };
        }
        fill!(
            mcc,
            mnc,
            locale,
            layout_direction,
            smallest_screen_width_dp,
            screen_width_dp,
            screen_height_dp,
            screen_size,
            screen_long,
            screen_round,
            orientation,
            ui_mode_type,
            night_mode,
            density,
            touchscreen,
            keys_hidden,
            keyboard,
            nav_hidden,
            navigation,
            platform_version,
        );
    }

    pub fn is_empty(&self) -> bool {
        *self == QualifierSet::default()
    }

    /// Tokens in canonical order.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        if let Some(mcc) = self.mcc {
            tokens.push(format!("mcc{mcc:03}"));
        }
        if let Some(mnc) = self.mnc {
            tokens.push(format!("mnc{mnc:03}"));
        }
        if let Some(locale) = &self.locale {
            tokens.extend(locale.tokens());
        }
        if let Some(value) = self.layout_direction {
            tokens.push(value.token().to_string());
        }
        if let Some(dp) = self.smallest_screen_width_dp {
            tokens.push(format!("sw{dp}dp"));
        }
        if let Some(dp) = self.screen_width_dp {
            tokens.push(format!("w{dp}dp"));
        }
        if let Some(dp) = self.screen_height_dp {
            tokens.push(format!("h{dp}dp"));
        }
        let simple = [
            self.screen_size.map(ScreenSize::token),
            self.screen_long.map(ScreenLong::token),
            self.screen_round.map(ScreenRound::token),
            self.orientation.map(Orientation::token),
            self.ui_mode_type.map(UiModeType::token),
            self.night_mode.map(NightMode::token),
        ];
        tokens.extend(simple.into_iter().flatten().map(str::to_string));
        if let Some(density) = self.density {
            tokens.push(density.token());
        }
        let input = [
            self.touchscreen.map(Touchscreen::token),
            self.keys_hidden.map(KeysHidden::token),
            self.keyboard.map(Keyboard::token),
            self.nav_hidden.map(NavHidden::token),
            self.navigation.map(Navigation::token),
        ];
        tokens.extend(input.into_iter().flatten().map(str::to_string));
        if let Some(level) = self.platform_version {
            tokens.push(format!("v{level}"));
        }
        tokens
    }
}

impl fmt::Display for QualifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join("-"))
    }
}

impl FromStr for QualifierSet {
    type Err = QualifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualifierSet::parse(s)
    }
}

// ============================================================================
// Layering
// ============================================================================

/// Source of a qualifier during set-up resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualifierLayer {
    /// Qualifiers the test asked for.
    Explicit,
    /// `vNN` from the simulated API level.
    PlatformVersion,
    /// Default `swNNNdp`.
    SmallestScreenWidth,
    /// Default `wNNNdp`.
    ScreenWidth,
}

impl QualifierLayer {
    pub const ALL: [QualifierLayer; 4] = [
        QualifierLayer::Explicit,
        QualifierLayer::PlatformVersion,
        QualifierLayer::SmallestScreenWidth,
        QualifierLayer::ScreenWidth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            QualifierLayer::Explicit => "explicit",
            QualifierLayer::PlatformVersion => "platform-version",
            QualifierLayer::SmallestScreenWidth => "smallest-screen-width",
            QualifierLayer::ScreenWidth => "screen-width",
        }
    }
}

impl fmt::Display for QualifierLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values the default layers contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifierDefaults {
    pub api_level: ApiLevel,
    pub smallest_screen_width_dp: u32,
    pub screen_width_dp: u32,
}

impl Default for QualifierDefaults {
    fn default() -> Self {
        Self {
            api_level: ApiLevel::KITKAT,
            smallest_screen_width_dp: 320,
            screen_width_dp: 320,
        }
    }
}

/// Outcome of layered resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQualifiers {
    pub qualifiers: QualifierSet,
    /// Default layers that filled at least one gap, in application order.
    pub filled_by: Vec<QualifierLayer>,
}

impl ResolvedQualifiers {
    /// Canonical qualifier string.
    pub fn as_string(&self) -> String {
        self.qualifiers.to_string()
    }
}

/// Resolves the effective qualifiers: `explicit`, then the platform
/// version, then the default smallest width and width.
///
/// # Errors
///
/// [`EnvError::ConfigurationParse`] naming the layer whose contribution
/// could not be parsed.
pub fn resolve_qualifiers(
    explicit: &str,
    defaults: &QualifierDefaults,
) -> Result<ResolvedQualifiers, EnvError> {
    let parse = |layer: QualifierLayer, text: String| {
        QualifierSet::parse(&text).map_err(|source| EnvError::ConfigurationParse {
            layer,
            qualifiers: text,
            source,
        })
    };

    let mut qualifiers = parse(QualifierLayer::Explicit, explicit.to_string())?;
    let mut filled_by = Vec::new();

    let layers = [
        (
            QualifierLayer::PlatformVersion,
            qualifiers.platform_version.is_none(),
            format!("v{}", defaults.api_level),
        ),
        (
            QualifierLayer::SmallestScreenWidth,
            qualifiers.smallest_screen_width_dp.is_none(),
            format!("sw{}dp", defaults.smallest_screen_width_dp),
        ),
        (
            QualifierLayer::ScreenWidth,
            qualifiers.screen_width_dp.is_none(),
            format!("w{}dp", defaults.screen_width_dp),
        ),
    ];

    for (layer, is_gap, token) in layers {
        if !is_gap {
            continue;
        }
        let contribution = parse(layer, token)?;
        qualifiers.fill_gaps_from(&contribution);
        filled_by.push(layer);
    }

    Ok(ResolvedQualifiers {
        qualifiers,
        filled_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("" ; "empty")]
    #[test_case("en" ; "language only")]
    #[test_case("en-rUS" ; "language and region")]
    #[test_case("b+sr+Latn+RS" ; "bcp47 with script")]
    #[test_case("mcc310-mnc004-en-rUS-ldltr-sw360dp-w360dp-h640dp-normal-notlong-notround-port-car-night-xhdpi-finger-keyssoft-nokeys-navhidden-nonav-v23" ; "every kind")]
    #[test_case("land-420dpi" ; "numeric density")]
    #[test_case("es-r419" ; "numeric region")]
    fn canonical_strings_round_trip(qualifiers: &str) {
        let set = QualifierSet::parse(qualifiers).unwrap();
        assert_eq!(set.to_string(), qualifiers);
    }

    #[test]
    fn parse_fills_fields() {
        let set: QualifierSet = "fr-rCA-sw600dp-land-night-hdpi-v26".parse().unwrap();
        let locale = set.locale.as_ref().unwrap();
        assert_eq!(locale.language(), "fr");
        assert_eq!(locale.region(), Some("CA"));
        assert_eq!(set.smallest_screen_width_dp, Some(600));
        assert_eq!(set.orientation, Some(Orientation::Landscape));
        assert_eq!(set.night_mode, Some(NightMode::Night));
        assert_eq!(set.density, Some(Density::HIGH));
        assert_eq!(set.platform_version, Some(ApiLevel::O));
        assert!(set.screen_width_dp.is_none());
    }

    #[test]
    fn bcp47_locale_normalizes_case() {
        let set = QualifierSet::parse("b+SR+latn+rs").unwrap();
        let locale = set.locale.unwrap();
        assert_eq!(locale.to_language_tag(), "sr-Latn-RS");
        assert_eq!(locale.script(), Some("Latn"));
    }

    #[test_case("land-en", "en", "land" ; "locale after orientation")]
    #[test_case("v19-port", "port", "v19" ; "version before orientation")]
    #[test_case("port-land", "land", "port" ; "same kind twice")]
    #[test_case("w320dp-sw320dp", "sw320dp", "w320dp" ; "widths swapped")]
    fn out_of_order_tokens_are_rejected(qualifiers: &str, token: &str, previous: &str) {
        let err = QualifierSet::parse(qualifiers).unwrap_err();
        assert_eq!(
            err,
            QualifierError::OutOfOrder {
                token: token.to_string(),
                previous: previous.to_string(),
            }
        );
    }

    #[test_case("en-bogus" ; "unknown word")]
    #[test_case("sw320" ; "missing dp suffix")]
    #[test_case("xyzzy" ; "long word")]
    fn unknown_tokens_are_rejected(qualifiers: &str) {
        assert!(matches!(
            QualifierSet::parse(qualifiers),
            Err(QualifierError::Unknown { .. })
        ));
    }

    #[test_case("sw0dp" ; "zero width")]
    #[test_case("v0" ; "zero version")]
    #[test_case("0dpi" ; "zero density")]
    #[test_case("b+e" ; "short bcp47 language")]
    fn invalid_values_are_rejected(qualifiers: &str) {
        assert!(matches!(
            QualifierSet::parse(qualifiers),
            Err(QualifierError::InvalidValue { .. })
        ));
    }

    #[test]
    fn region_without_language_is_rejected() {
        assert!(matches!(
            QualifierSet::parse("rUS"),
            Err(QualifierError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert_eq!(
            QualifierSet::parse("en--land"),
            Err(QualifierError::EmptyToken { position: 1 })
        );
    }

    #[test]
    fn car_is_ui_mode_not_language() {
        let set = QualifierSet::parse("car").unwrap();
        assert_eq!(set.ui_mode_type, Some(UiModeType::Car));
        assert!(set.locale.is_none());
    }

    #[test]
    fn explicit_locale_keeps_default_platform_version() {
        let resolved = resolve_qualifiers("en-rUS", &QualifierDefaults::default()).unwrap();

        let qualifiers = &resolved.qualifiers;
        assert_eq!(
            qualifiers.locale.as_ref().map(Locale::to_language_tag).as_deref(),
            Some("en-US")
        );
        assert_eq!(qualifiers.platform_version, Some(ApiLevel::KITKAT));
        assert_eq!(resolved.as_string(), "en-rUS-sw320dp-w320dp-v19");
        assert_eq!(
            resolved.filled_by,
            vec![
                QualifierLayer::PlatformVersion,
                QualifierLayer::SmallestScreenWidth,
                QualifierLayer::ScreenWidth,
            ]
        );
    }

    #[test]
    fn explicit_qualifiers_are_never_overwritten() {
        let resolved =
            resolve_qualifiers("sw411dp-w600dp-v23", &QualifierDefaults::default()).unwrap();

        assert_eq!(resolved.qualifiers.smallest_screen_width_dp, Some(411));
        assert_eq!(resolved.qualifiers.screen_width_dp, Some(600));
        assert_eq!(resolved.qualifiers.platform_version, Some(ApiLevel::M));
        assert!(resolved.filled_by.is_empty());
    }

    #[test]
    fn explicit_parse_failure_names_layer() {
        let err = resolve_qualifiers("port-en", &QualifierDefaults::default()).unwrap_err();
        assert!(matches!(
            err,
            EnvError::ConfigurationParse {
                layer: QualifierLayer::Explicit,
                ..
            }
        ));
        assert!(err.to_string().contains("explicit"));
    }

    #[test]
    fn broken_default_names_its_layer() {
        let defaults = QualifierDefaults {
            screen_width_dp: 0,
            ..QualifierDefaults::default()
        };
        let err = resolve_qualifiers("", &defaults).unwrap_err();
        assert!(matches!(
            err,
            EnvError::ConfigurationParse {
                layer: QualifierLayer::ScreenWidth,
                ..
            }
        ));
    }

    #[test]
    fn fill_gaps_keeps_existing_values() {
        let mut set = QualifierSet::parse("land").unwrap();
        set.fill_gaps_from(&QualifierSet::parse("port-xhdpi").unwrap());
        assert_eq!(set.orientation, Some(Orientation::Landscape));
        assert_eq!(set.density, Some(Density::XHIGH));
    }

    #[test]
    fn locale_serializes_as_language_tag() {
        let locale = Locale::new("EN", None, Some("us")).unwrap();
        assert_eq!(serde_json::to_string(&locale).unwrap(), "\"en-US\"");
        let back: Locale = serde_json::from_str("\"sr-Latn-RS\"").unwrap();
        assert_eq!(back.script(), Some("Latn"));
    }
}
