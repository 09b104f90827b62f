use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::errors::RecoveryError;
use crate::grid::{CellAddress, CellRange, is_rectangular};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum BorderStyle {
    Thin,
    Medium,
    Thick,
    Hair,
    Dotted,
    Dashed,
    Double,
    DashDot,
    DashDotDot,
    MediumDashed,
    MediumDashDot,
    MediumDashDotDot,
    SlantDashDot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorderEdge {
    pub style: BorderStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum UnderlineStyle {
    None,
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum HorizontalAlignment {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterAcrossSelection,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

/// One toggle of [`RecoveryFormatSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum FormatFacet {
    NumberFormat,
    FillColor,
    FontColor,
    Bold,
    Italic,
    Underline,
    FontName,
    FontSize,
    HorizontalAlignment,
    VerticalAlignment,
    WrapText,
    BorderTop,
    BorderBottom,
    BorderLeft,
    BorderRight,
    BorderInsideHorizontal,
    BorderInsideVertical,
}

impl FormatFacet {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatFacet::NumberFormat => "numberFormat",
            FormatFacet::FillColor => "fillColor",
            FormatFacet::FontColor => "fontColor",
            FormatFacet::Bold => "bold",
            FormatFacet::Italic => "italic",
            FormatFacet::Underline => "underline",
            FormatFacet::FontName => "fontName",
            FormatFacet::FontSize => "fontSize",
            FormatFacet::HorizontalAlignment => "horizontalAlignment",
            FormatFacet::VerticalAlignment => "verticalAlignment",
            FormatFacet::WrapText => "wrapText",
            FormatFacet::BorderTop => "borderTop",
            FormatFacet::BorderBottom => "borderBottom",
            FormatFacet::BorderLeft => "borderLeft",
            FormatFacet::BorderRight => "borderRight",
            FormatFacet::BorderInsideHorizontal => "borderInsideHorizontal",
            FormatFacet::BorderInsideVertical => "borderInsideVertical",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        FormatFacet::iter().find(|facet| facet.as_str() == key)
    }

    /// The cell property this facet touches at `cell`, if any. Outer borders
    /// touch only the matching edge of the area; inside borders touch the
    /// bottom/right edge of every cell except the last row/column.
    pub fn property_at(self, area: &CellRange, cell: CellAddress) -> Option<CellFormatProperty> {
        match self {
            FormatFacet::NumberFormat => Some(CellFormatProperty::NumberFormat),
            FormatFacet::FillColor => Some(CellFormatProperty::FillColor),
            FormatFacet::FontColor => Some(CellFormatProperty::FontColor),
            FormatFacet::Bold => Some(CellFormatProperty::Bold),
            FormatFacet::Italic => Some(CellFormatProperty::Italic),
            FormatFacet::Underline => Some(CellFormatProperty::Underline),
            FormatFacet::FontName => Some(CellFormatProperty::FontName),
            FormatFacet::FontSize => Some(CellFormatProperty::FontSize),
            FormatFacet::HorizontalAlignment => Some(CellFormatProperty::HorizontalAlignment),
            FormatFacet::VerticalAlignment => Some(CellFormatProperty::VerticalAlignment),
            FormatFacet::WrapText => Some(CellFormatProperty::WrapText),
            FormatFacet::BorderTop => {
                (cell.row == area.start.row).then_some(CellFormatProperty::BorderTop)
            }
            FormatFacet::BorderBottom => {
                (cell.row == area.end.row).then_some(CellFormatProperty::BorderBottom)
            }
            FormatFacet::BorderLeft => {
                (cell.col == area.start.col).then_some(CellFormatProperty::BorderLeft)
            }
            FormatFacet::BorderRight => {
                (cell.col == area.end.col).then_some(CellFormatProperty::BorderRight)
            }
            FormatFacet::BorderInsideHorizontal => {
                (cell.row < area.end.row).then_some(CellFormatProperty::BorderBottom)
            }
            FormatFacet::BorderInsideVertical => {
                (cell.col < area.end.col).then_some(CellFormatProperty::BorderRight)
            }
        }
    }
}

/// A property stored on a single cell. Inside borders are expressed as the
/// bottom/right edge of interior cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CellFormatProperty {
    NumberFormat,
    FillColor,
    FontColor,
    Bold,
    Italic,
    Underline,
    FontName,
    FontSize,
    HorizontalAlignment,
    VerticalAlignment,
    WrapText,
    BorderTop,
    BorderBottom,
    BorderLeft,
    BorderRight,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RecoveryFormatSelection {
    pub number_format: bool,
    pub fill_color: bool,
    pub font_color: bool,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_name: bool,
    pub font_size: bool,
    pub horizontal_alignment: bool,
    pub vertical_alignment: bool,
    pub wrap_text: bool,
    pub border_top: bool,
    pub border_bottom: bool,
    pub border_left: bool,
    pub border_right: bool,
    pub border_inside_horizontal: bool,
    pub border_inside_vertical: bool,
}

impl RecoveryFormatSelection {
    pub fn is_selected(&self, facet: FormatFacet) -> bool {
        match facet {
            FormatFacet::NumberFormat => self.number_format,
            FormatFacet::FillColor => self.fill_color,
            FormatFacet::FontColor => self.font_color,
            FormatFacet::Bold => self.bold,
            FormatFacet::Italic => self.italic,
            FormatFacet::Underline => self.underline,
            FormatFacet::FontName => self.font_name,
            FormatFacet::FontSize => self.font_size,
            FormatFacet::HorizontalAlignment => self.horizontal_alignment,
            FormatFacet::VerticalAlignment => self.vertical_alignment,
            FormatFacet::WrapText => self.wrap_text,
            FormatFacet::BorderTop => self.border_top,
            FormatFacet::BorderBottom => self.border_bottom,
            FormatFacet::BorderLeft => self.border_left,
            FormatFacet::BorderRight => self.border_right,
            FormatFacet::BorderInsideHorizontal => self.border_inside_horizontal,
            FormatFacet::BorderInsideVertical => self.border_inside_vertical,
        }
    }

    pub fn select(&mut self, facet: FormatFacet) {
        let slot = match facet {
            FormatFacet::NumberFormat => &mut self.number_format,
            FormatFacet::FillColor => &mut self.fill_color,
            FormatFacet::FontColor => &mut self.font_color,
            FormatFacet::Bold => &mut self.bold,
            FormatFacet::Italic => &mut self.italic,
            FormatFacet::Underline => &mut self.underline,
            FormatFacet::FontName => &mut self.font_name,
            FormatFacet::FontSize => &mut self.font_size,
            FormatFacet::HorizontalAlignment => &mut self.horizontal_alignment,
            FormatFacet::VerticalAlignment => &mut self.vertical_alignment,
            FormatFacet::WrapText => &mut self.wrap_text,
            FormatFacet::BorderTop => &mut self.border_top,
            FormatFacet::BorderBottom => &mut self.border_bottom,
            FormatFacet::BorderLeft => &mut self.border_left,
            FormatFacet::BorderRight => &mut self.border_right,
            FormatFacet::BorderInsideHorizontal => &mut self.border_inside_horizontal,
            FormatFacet::BorderInsideVertical => &mut self.border_inside_vertical,
        };
        *slot = true;
    }

    pub fn facets(&self) -> impl Iterator<Item = FormatFacet> + '_ {
        FormatFacet::iter().filter(|facet| self.is_selected(*facet))
    }

    pub fn is_empty(&self) -> bool {
        self.facets().next().is_none()
    }

    /// Cell properties the selection touches at `cell` inside `area`.
    pub fn properties_at(&self, area: &CellRange, cell: CellAddress) -> Vec<CellFormatProperty> {
        let mut props = Vec::new();
        for facet in self.facets() {
            if let Some(prop) = facet.property_at(area, cell)
                && !props.contains(&prop)
            {
                props.push(prop);
            }
        }
        props
    }
}

/// Prior per-cell values. For a touched property, `None` means default/cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<UnderlineStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_alignment: Option<HorizontalAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_alignment: Option<VerticalAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_text: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_top: Option<BorderEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_bottom: Option<BorderEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_left: Option<BorderEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_right: Option<BorderEdge>,
}

impl CellFormat {
    /// Copy of `self` keeping only `props`.
    pub fn masked(&self, props: &[CellFormatProperty]) -> CellFormat {
        let mut out = CellFormat::default();
        for prop in props {
            out.copy_property(self, *prop);
        }
        out
    }

    pub fn copy_property(&mut self, from: &CellFormat, prop: CellFormatProperty) {
        match prop {
            CellFormatProperty::NumberFormat => self.number_format = from.number_format.clone(),
            CellFormatProperty::FillColor => self.fill_color = from.fill_color.clone(),
            CellFormatProperty::FontColor => self.font_color = from.font_color.clone(),
            CellFormatProperty::Bold => self.bold = from.bold,
            CellFormatProperty::Italic => self.italic = from.italic,
            CellFormatProperty::Underline => self.underline = from.underline,
            CellFormatProperty::FontName => self.font_name = from.font_name.clone(),
            CellFormatProperty::FontSize => self.font_size = from.font_size,
            CellFormatProperty::HorizontalAlignment => {
                self.horizontal_alignment = from.horizontal_alignment
            }
            CellFormatProperty::VerticalAlignment => {
                self.vertical_alignment = from.vertical_alignment
            }
            CellFormatProperty::WrapText => self.wrap_text = from.wrap_text,
            CellFormatProperty::BorderTop => self.border_top = from.border_top.clone(),
            CellFormatProperty::BorderBottom => self.border_bottom = from.border_bottom.clone(),
            CellFormatProperty::BorderLeft => self.border_left = from.border_left.clone(),
            CellFormatProperty::BorderRight => self.border_right = from.border_right.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryFormatAreaState {
    pub address: String,
    pub row_count: u32,
    pub column_count: u32,
    pub cells: Vec<Vec<CellFormat>>,
}

impl RecoveryFormatAreaState {
    pub fn range(&self) -> Result<CellRange, RecoveryError> {
        CellRange::parse(&self.address).ok_or_else(|| {
            RecoveryError::CorruptState(format!("invalid format area address '{}'", self.address))
        })
    }

    pub fn validate(&self) -> Result<CellRange, RecoveryError> {
        let range = self.range()?;
        if !is_rectangular(&self.cells, self.row_count as usize, self.column_count as usize)
            || range.row_count() != self.row_count
            || range.column_count() != self.column_count
        {
            return Err(RecoveryError::CorruptState(format!(
                "format area {} does not match its declared {}x{} extent",
                self.address, self.row_count, self.column_count
            )));
        }
        Ok(range)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryFormatRangeState {
    pub sheet_id: String,
    pub sheet_name: String,
    pub selection: RecoveryFormatSelection,
    pub areas: Vec<RecoveryFormatAreaState>,
}

impl RecoveryFormatRangeState {
    /// Sum of per-area cell counts.
    pub fn changed_count(&self) -> u64 {
        self.areas
            .iter()
            .map(|area| area.row_count as u64 * area.column_count as u64)
            .sum()
    }

    pub fn address(&self) -> String {
        self.areas
            .iter()
            .map(|area| area.address.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}
