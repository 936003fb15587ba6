//! Structured device configuration built from resolved qualifiers.
//!
//! Every field the platform introduced after its first release is gated on
//! the simulated API level through [`ConfigField::min_api_level`]. A field
//! whose gate is closed is left at its unset value and recorded in
//! [`DeviceConfiguration::gated_out`], so a test can see exactly which
//! qualifiers had no effect at the simulated level.

use std::fmt;

use serde::{Deserialize, Serialize};
use umbra_types::ApiLevel;

use crate::qualifiers::{
    Density, Keyboard, KeysHidden, LayoutDirection, Locale, NavHidden, Navigation, NightMode,
    Orientation, QualifierSet, ScreenLong, ScreenRound, ScreenSize, Touchscreen, UiModeType,
};

// ============================================================================
// Version Gates
// ============================================================================

/// A configuration field and the API level that introduced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    Mcc,
    Mnc,
    Locale,
    LayoutDirection,
    SmallestScreenWidthDp,
    ScreenWidthDp,
    ScreenHeightDp,
    ScreenSize,
    ScreenLong,
    ScreenRound,
    Orientation,
    UiModeType,
    NightMode,
    DensityDpi,
    Touchscreen,
    KeysHidden,
    Keyboard,
    NavHidden,
    Navigation,
}

impl ConfigField {
    pub const ALL: [ConfigField; 19] = [
        ConfigField::Mcc,
        ConfigField::Mnc,
        ConfigField::Locale,
        ConfigField::LayoutDirection,
        ConfigField::SmallestScreenWidthDp,
        ConfigField::ScreenWidthDp,
        ConfigField::ScreenHeightDp,
        ConfigField::ScreenSize,
        ConfigField::ScreenLong,
        ConfigField::ScreenRound,
        ConfigField::Orientation,
        ConfigField::UiModeType,
        ConfigField::NightMode,
        ConfigField::DensityDpi,
        ConfigField::Touchscreen,
        ConfigField::KeysHidden,
        ConfigField::Keyboard,
        ConfigField::NavHidden,
        ConfigField::Navigation,
    ];

    /// First API level at which the field is applied.
    pub const fn min_api_level(self) -> ApiLevel {
        match self {
            ConfigField::UiModeType | ConfigField::NightMode => ApiLevel::FROYO,
            ConfigField::SmallestScreenWidthDp
            | ConfigField::ScreenWidthDp
            | ConfigField::ScreenHeightDp => ApiLevel::HONEYCOMB_MR2,
            ConfigField::LayoutDirection | ConfigField::DensityDpi => ApiLevel::JELLY_BEAN_MR1,
            ConfigField::ScreenRound => ApiLevel::M,
            ConfigField::Mcc
            | ConfigField::Mnc
            | ConfigField::Locale
            | ConfigField::ScreenSize
            | ConfigField::ScreenLong
            | ConfigField::Orientation
            | ConfigField::Touchscreen
            | ConfigField::KeysHidden
            | ConfigField::Keyboard
            | ConfigField::NavHidden
            | ConfigField::Navigation => ApiLevel::BASE,
        }
    }

    pub const fn applies_at(self, api_level: ApiLevel) -> bool {
        api_level.supports(self.min_api_level())
    }

    pub fn name(self) -> &'static str {
        match self {
            ConfigField::Mcc => "mcc",
            ConfigField::Mnc => "mnc",
            ConfigField::Locale => "locale",
            ConfigField::LayoutDirection => "layout_direction",
            ConfigField::SmallestScreenWidthDp => "smallest_screen_width_dp",
            ConfigField::ScreenWidthDp => "screen_width_dp",
            ConfigField::ScreenHeightDp => "screen_height_dp",
            ConfigField::ScreenSize => "screen_size",
            ConfigField::ScreenLong => "screen_long",
            ConfigField::ScreenRound => "screen_round",
            ConfigField::Orientation => "orientation",
            ConfigField::UiModeType => "ui_mode_type",
            ConfigField::NightMode => "night_mode",
            ConfigField::DensityDpi => "density_dpi",
            ConfigField::Touchscreen => "touchscreen",
            ConfigField::KeysHidden => "keys_hidden",
            ConfigField::Keyboard => "keyboard",
            ConfigField::NavHidden => "nav_hidden",
            ConfigField::Navigation => "navigation",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Device Configuration
// ============================================================================

/// Configuration pushed into resource contexts at set-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfiguration {
    pub api_level: ApiLevel,
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
    pub density_dpi: Option<Density>,
    pub touchscreen: Option<Touchscreen>,
    pub keys_hidden: Option<KeysHidden>,
    pub keyboard: Option<Keyboard>,
    pub nav_hidden: Option<NavHidden>,
    pub navigation: Option<Navigation>,
    /// Fields present in the qualifiers but not applied at `api_level`.
    pub gated_out: Vec<ConfigField>,
}

struct Gate<'a> {
    api_level: ApiLevel,
    gated_out: &'a mut Vec<ConfigField>,
}

impl Gate<'_> {
    fn apply<T: Clone>(&mut self, field: ConfigField, value: &Option<T>) -> Option<T> {
        let value = value.as_ref()?;
        if field.applies_at(self.api_level) {
            Some(value.clone())
        } else {
            self.gated_out.push(field);
            None
        }
    }
}

impl DeviceConfiguration {
    /// Builds the configuration for `api_level`, applying each field only
    /// if its gate is open.
    ///
    /// From [`ApiLevel::JELLY_BEAN_MR1`] on, setting a locale also sets the
    /// layout direction the locale implies unless the qualifiers name one.
    pub fn from_qualifiers(qualifiers: &QualifierSet, api_level: ApiLevel) -> Self {
        let mut gated_out = Vec::new();
        let mut gate = Gate {
            api_level,
            gated_out: &mut gated_out,
        };

        let locale = gate.apply(ConfigField::Locale, &qualifiers.locale);
        let mut layout_direction =
            gate.apply(ConfigField::LayoutDirection, &qualifiers.layout_direction);
        if layout_direction.is_none()
            && ConfigField::LayoutDirection.applies_at(api_level)
            && let Some(locale) = &locale
        {
            layout_direction = Some(if locale.is_right_to_left() {
                LayoutDirection::Rtl
            } else {
                LayoutDirection::Ltr
            });
        }

        let mut configuration = Self {
            api_level,
            mcc: gate.apply(ConfigField::Mcc, &qualifiers.mcc),
            mnc: gate.apply(ConfigField::Mnc, &qualifiers.mnc),
            locale,
            layout_direction,
            smallest_screen_width_dp: gate.apply(
                ConfigField::SmallestScreenWidthDp,
                &qualifiers.smallest_screen_width_dp,
            ),
            screen_width_dp: gate.apply(ConfigField::ScreenWidthDp, &qualifiers.screen_width_dp),
            screen_height_dp: gate.apply(ConfigField::ScreenHeightDp, &qualifiers.screen_height_dp),
            screen_size: gate.apply(ConfigField::ScreenSize, &qualifiers.screen_size),
            screen_long: gate.apply(ConfigField::ScreenLong, &qualifiers.screen_long),
            screen_round: gate.apply(ConfigField::ScreenRound, &qualifiers.screen_round),
            orientation: gate.apply(ConfigField::Orientation, &qualifiers.orientation),
            ui_mode_type: gate.apply(ConfigField::UiModeType, &qualifiers.ui_mode_type),
            night_mode: gate.apply(ConfigField::NightMode, &qualifiers.night_mode),
            density_dpi: gate.apply(ConfigField::DensityDpi, &qualifiers.density),
            touchscreen: gate.apply(ConfigField::Touchscreen, &qualifiers.touchscreen),
            keys_hidden: gate.apply(ConfigField::KeysHidden, &qualifiers.keys_hidden),
            keyboard: gate.apply(ConfigField::Keyboard, &qualifiers.keyboard),
            nav_hidden: gate.apply(ConfigField::NavHidden, &qualifiers.nav_hidden),
            navigation: gate.apply(ConfigField::Navigation, &qualifiers.navigation),
            gated_out: Vec::new(),
        };

        gated_out.sort_unstable();
        configuration.gated_out = gated_out;
        configuration
    }

    pub fn is_applied(&self, field: ConfigField) -> bool {
        field.applies_at(self.api_level) && !self.gated_out.contains(&field)
    }
}

// ============================================================================
// Display Metrics
// ============================================================================

/// Pixel metrics derived from density and screen size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    pub density_dpi: u16,
    /// Scale factor relative to 160 dpi.
    pub density: f32,
    pub scaled_density: f32,
    pub width_pixels: u32,
    pub height_pixels: u32,
}

impl DisplayMetrics {
    pub const DEFAULT_DENSITY_DPI: u16 = 160;

    /// Metrics for `configuration`. Unset or symbolic densities count as
    /// 160 dpi.
    pub fn for_configuration(configuration: &DeviceConfiguration) -> Self {
        let density_dpi = configuration
            .density_dpi
            .filter(|density| !density.is_symbolic())
            .map_or(Self::DEFAULT_DENSITY_DPI, Density::dpi);
        let density = f32::from(density_dpi) / f32::from(Self::DEFAULT_DENSITY_DPI);
        let to_pixels = |dp: Option<u32>| (dp.unwrap_or(0) as f32 * density).round() as u32;

        Self {
            density_dpi,
            density,
            scaled_density: density,
            width_pixels: to_pixels(configuration.screen_width_dp),
            height_pixels: to_pixels(configuration.screen_height_dp),
        }
    }
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            density_dpi: Self::DEFAULT_DENSITY_DPI,
            density: 1.0,
            scaled_density: 1.0,
            width_pixels: 0,
            height_pixels: 0,
        }
    }
}
