//! Widget configuration: a closed union keyed by the persisted `type` tag.
//!
//! Saved reports store each widget as a flat JSON object (`{"type": "bar", "xKey": ..., ...}`).
//! Parsing never fails on an unrecognized tag; it yields [`WidgetConfig::Unknown`] so one bad
//! widget renders a placeholder instead of breaking the whole report. A recognized tag whose
//! payload does not match the expected shape yields [`WidgetConfig::Invalid`].

use crate::aggregate::{Aggregation, SortBy};
use crate::error::{ReportError, ReportResult};
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

macro_rules! tagged_kind {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn tag(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.tag())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let tag = String::deserialize(deserializer)?;
                $name::from_tag(&tag)
                    .ok_or_else(|| D::Error::unknown_variant(&tag, &[$($tag),+]))
            }
        }
    };
}

tagged_kind! {
    /// Aggregation-backed chart widgets.
    ChartKind {
        Bar => "bar",
        Column => "column",
        StackedBar => "stacked_bar",
        Line => "line",
        Area => "area",
        Pie => "pie",
        Donut => "donut",
        Map => "map",
        CardDate => "card_date",
        Text => "text",
        Combo => "combo",
    }
}

tagged_kind! {
    /// Filter controls operating on raw rows.
    SlicerKind {
        List => "slicer_list",
        Dropdown => "slicer_dropdown",
        Date => "slicer_date",
    }
}

tagged_kind! {
    /// Widgets whose numbers come from an external statistics service.
    AnalyticKind {
        KeyDriver => "key_driver",
        WordCloud => "word_cloud",
        StatSig => "stat_sig",
        Pivot => "pivot",
        Anomaly => "anomaly",
        Cohort => "cohort",
        Forecast => "forecast",
        Table => "table",
    }
}

impl ChartKind {
    /// Pie-like charts draw one slice per x-value and never show axes.
    pub fn is_radial(self) -> bool {
        matches!(self, ChartKind::Pie | ChartKind::Donut)
    }

    pub fn has_axes(self) -> bool {
        !matches!(
            self,
            ChartKind::Pie | ChartKind::Donut | ChartKind::Map | ChartKind::CardDate | ChartKind::Text
        )
    }
}

/// Display toggles shared by every chart widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    #[serde(default = "crate::serde_defaults::default_true")]
    pub show_legend: bool,
    #[serde(default = "crate::serde_defaults::default_true")]
    pub show_x_axis: bool,
    #[serde(default = "crate::serde_defaults::default_true")]
    pub show_y_axis: bool,
    #[serde(default)]
    pub show_data_labels: bool,
    #[serde(default = "crate::serde_defaults::default_tick_font_size")]
    pub tick_font_size: u32,
    /// Rotation of x-axis tick labels, in degrees.
    #[serde(default)]
    pub x_tick_rotation: i32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_legend: true,
            show_x_axis: true,
            show_y_axis: true,
            show_data_labels: false,
            tick_font_size: crate::serde_defaults::DEFAULT_TICK_FONT_SIZE,
            x_tick_rotation: 0,
        }
    }
}

/// Configuration of a categorical (aggregation-backed) widget.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_key: Option<String>,
    #[serde(default)]
    pub y_aggregation: Aggregation,
    /// Overlay measure drawn as a line on top of the primary series (combo charts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_y_key: Option<String>,
    #[serde(default)]
    pub secondary_y_aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    /// Legend value to order by when a value sort runs over several series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,
    /// Per-series color overrides, keyed by legend value (or by the y field for the primary
    /// series).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub series_colors: BTreeMap<String, String>,
    /// Body of a `text` widget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub display: DisplayOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlicerConfig {
    /// Field whose distinct values the slicer offers. Older reports stored it as `xKey`.
    #[serde(default, alias = "xKey")]
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Enumerate values from rows filtered by every *other* dimension instead of from all rows.
    #[serde(default)]
    pub respect_other_filters: bool,
    #[serde(default)]
    pub sort_values: bool,
}

impl SlicerConfig {
    /// The filter dimension this slicer writes, trimmed. `None` when no field is set.
    pub fn dimension(&self) -> Option<&str> {
        Some(self.field.trim()).filter(|field| !field.is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Selectors forwarded to an analytic service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    /// Forecast horizon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WidgetConfig {
    Chart { kind: ChartKind, config: ChartConfig },
    Slicer { kind: SlicerKind, config: SlicerConfig },
    Analytic { kind: AnalyticKind, config: AnalyticConfig },
    /// Tag outside the known vocabulary (or no tag at all).
    Unknown { name: String },
    /// Known tag, malformed payload.
    Invalid {
        type_name: String,
        message: String,
        raw: serde_json::Value,
    },
}

impl WidgetConfig {
    /// Parses one persisted widget. Never fails: see the module docs.
    pub fn from_json(value: serde_json::Value) -> Self {
        let name = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        let parsed = if let Some(kind) = ChartKind::from_tag(&name) {
            serde_json::from_value(value.clone()).map(|config| WidgetConfig::Chart { kind, config })
        } else if let Some(kind) = SlicerKind::from_tag(&name) {
            serde_json::from_value(value.clone())
                .map(|config| WidgetConfig::Slicer { kind, config })
        } else if let Some(kind) = AnalyticKind::from_tag(&name) {
            serde_json::from_value(value.clone())
                .map(|config| WidgetConfig::Analytic { kind, config })
        } else {
            return WidgetConfig::Unknown { name };
        };

        parsed.unwrap_or_else(|err| WidgetConfig::Invalid {
            type_name: name,
            message: err.to_string(),
            raw: value,
        })
    }

    /// Strict variant of [`WidgetConfig::from_json`] for callers that want malformed payloads
    /// rejected up front.
    pub fn try_from_json(value: serde_json::Value) -> ReportResult<Self> {
        match Self::from_json(value) {
            WidgetConfig::Invalid {
                type_name, message, ..
            } => Err(ReportError::Config(format!("{type_name}: {message}"))),
            other => Ok(other),
        }
    }

    pub fn chart(kind: ChartKind, config: ChartConfig) -> Self {
        WidgetConfig::Chart { kind, config }
    }

    pub fn slicer(kind: SlicerKind, config: SlicerConfig) -> Self {
        WidgetConfig::Slicer { kind, config }
    }

    pub fn analytic(kind: AnalyticKind, config: AnalyticConfig) -> Self {
        WidgetConfig::Analytic { kind, config }
    }

    pub fn type_name(&self) -> &str {
        match self {
            WidgetConfig::Chart { kind, .. } => kind.tag(),
            WidgetConfig::Slicer { kind, .. } => kind.tag(),
            WidgetConfig::Analytic { kind, .. } => kind.tag(),
            WidgetConfig::Unknown { name } => name,
            WidgetConfig::Invalid { type_name, .. } => type_name,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            WidgetConfig::Chart { config, .. } => config.title.as_deref(),
            WidgetConfig::Slicer { config, .. } => config.title.as_deref(),
            WidgetConfig::Analytic { config, .. } => config.title.as_deref(),
            WidgetConfig::Unknown { .. } | WidgetConfig::Invalid { .. } => None,
        }
    }

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = match self {
            WidgetConfig::Chart { config, .. } => serde_json::to_value(config)?,
            WidgetConfig::Slicer { config, .. } => serde_json::to_value(config)?,
            WidgetConfig::Analytic { config, .. } => serde_json::to_value(config)?,
            WidgetConfig::Unknown { .. } => serde_json::Value::Object(Default::default()),
            WidgetConfig::Invalid { raw, .. } => return Ok(raw.clone()),
        };
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("type".to_string(), self.type_name().into());
        }
        Ok(value)
    }
}

impl Serialize for WidgetConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WidgetConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(D::Error::custom("widget config must be an object"));
        }
        Ok(WidgetConfig::from_json(value))
    }
}
