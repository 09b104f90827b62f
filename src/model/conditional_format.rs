use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalFormatStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum CellValueOperator {
    Between,
    NotBetween,
    EqualTo,
    NotEqualTo,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl CellValueOperator {
    /// Operators that compare against a `formula1..formula2` span.
    pub fn needs_second_formula(self) -> bool {
        matches!(self, Self::Between | Self::NotBetween)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TextComparisonOperator {
    Contains,
    NotContains,
    BeginsWith,
    EndsWith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TopBottomType {
    TopItems,
    TopPercent,
    BottomItems,
    BottomPercent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PresetCriterion {
    Blanks,
    NonBlanks,
    Errors,
    NonErrors,
    Yesterday,
    Today,
    Tomorrow,
    LastSevenDays,
    LastWeek,
    ThisWeek,
    NextWeek,
    LastMonth,
    ThisMonth,
    NextMonth,
    AboveAverage,
    BelowAverage,
    EqualOrAboveAverage,
    EqualOrBelowAverage,
    OneStdDevAboveAverage,
    OneStdDevBelowAverage,
    TwoStdDevAboveAverage,
    TwoStdDevBelowAverage,
    ThreeStdDevAboveAverage,
    ThreeStdDevBelowAverage,
    UniqueValues,
    DuplicateValues,
}

/// Bound/criterion kinds shared by data bars and color scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ConditionalFormatRuleType {
    Automatic,
    LowestValue,
    HighestValue,
    Number,
    Percent,
    Formula,
    Percentile,
}

impl ConditionalFormatRuleType {
    pub fn needs_formula(self) -> bool {
        matches!(
            self,
            Self::Number | Self::Percent | Self::Formula | Self::Percentile
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalBoundRule {
    #[serde(rename = "type")]
    pub rule_type: ConditionalFormatRuleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DataBarDirection {
    Context,
    LeftToRight,
    RightToLeft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColorScaleCriterion {
    #[serde(rename = "type")]
    pub rule_type: ConditionalFormatRuleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColorScaleCriteria {
    pub minimum: ColorScaleCriterion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midpoint: Option<ColorScaleCriterion>,
    pub maximum: ColorScaleCriterion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum IconSetStyle {
    ThreeArrows,
    ThreeArrowsGray,
    ThreeFlags,
    ThreeTrafficLights1,
    ThreeTrafficLights2,
    ThreeSigns,
    ThreeSymbols,
    ThreeSymbols2,
    ThreeStars,
    ThreeTriangles,
    FourArrows,
    FourArrowsGray,
    FourRedToBlack,
    FourRating,
    FourTrafficLights,
    FiveArrows,
    FiveArrowsGray,
    FiveRating,
    FiveQuarters,
    FiveBoxes,
}

impl IconSetStyle {
    pub fn icon_count(self) -> usize {
        match self {
            Self::ThreeArrows
            | Self::ThreeArrowsGray
            | Self::ThreeFlags
            | Self::ThreeTrafficLights1
            | Self::ThreeTrafficLights2
            | Self::ThreeSigns
            | Self::ThreeSymbols
            | Self::ThreeSymbols2
            | Self::ThreeStars
            | Self::ThreeTriangles => 3,
            Self::FourArrows
            | Self::FourArrowsGray
            | Self::FourRedToBlack
            | Self::FourRating
            | Self::FourTrafficLights => 4,
            Self::FiveArrows
            | Self::FiveArrowsGray
            | Self::FiveRating
            | Self::FiveQuarters
            | Self::FiveBoxes => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum IconCriterionType {
    Number,
    Percent,
    Formula,
    Percentile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum IconCriterionOperator {
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IconSetCriterion {
    #[serde(rename = "type")]
    pub criterion_type: IconCriterionType,
    pub operator: IconCriterionOperator,
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ConditionalFormatCriteria {
    Custom {
        formula: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<ConditionalFormatStyle>,
    },
    CellValue {
        operator: CellValueOperator,
        formula1: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        formula2: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<ConditionalFormatStyle>,
    },
    TextComparison {
        operator: TextComparisonOperator,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<ConditionalFormatStyle>,
    },
    TopBottom {
        rank: u32,
        top_bottom_type: TopBottomType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<ConditionalFormatStyle>,
    },
    PresetCriteria {
        criterion: PresetCriterion,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<ConditionalFormatStyle>,
    },
    DataBar {
        lower_bound_rule: ConditionalBoundRule,
        upper_bound_rule: ConditionalBoundRule,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bar_direction: Option<DataBarDirection>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        show_data_bar_only: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        positive_fill_color: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        negative_fill_color: Option<String>,
    },
    ColorScale {
        criteria: ColorScaleCriteria,
    },
    IconSet {
        style: IconSetStyle,
        criteria: Vec<IconSetCriterion>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reverse_icon_order: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        show_icon_only: Option<bool>,
    },
}

impl ConditionalFormatCriteria {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Custom { .. } => "custom",
            Self::CellValue { .. } => "cell_value",
            Self::TextComparison { .. } => "text_comparison",
            Self::TopBottom { .. } => "top_bottom",
            Self::PresetCriteria { .. } => "preset_criteria",
            Self::DataBar { .. } => "data_bar",
            Self::ColorScale { .. } => "color_scale",
            Self::IconSet { .. } => "icon_set",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryConditionalFormatRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_if_true: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(flatten)]
    pub criteria: ConditionalFormatCriteria,
}

/// Every rule whose applies-to range equals `address`, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryConditionalFormatState {
    pub sheet_id: String,
    pub sheet_name: String,
    pub address: String,
    pub rules: Vec<RecoveryConditionalFormatRule>,
}
