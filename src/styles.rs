//! Conversions between umya styles and [`CellFormat`].
//!
//! Properties at their workbook default read back as `None`, so a captured
//! format only carries what differs from a fresh cell.

use umya_spreadsheet::structs::{EnumTrait, HorizontalAlignmentValues, VerticalAlignmentValues};
use umya_spreadsheet::{Border, Fill, PatternValues, Style};

use crate::model::{
    BorderEdge, BorderStyle, CellFormat, CellFormatProperty, ConditionalFormatStyle,
    HorizontalAlignment, UnderlineStyle, VerticalAlignment,
};

const DEFAULT_FONT_NAME: &str = "Calibri";
const DEFAULT_FONT_SIZE: f64 = 11.0;
const DEFAULT_FONT_ARGB: &str = "FF000000";

/// `#RRGGBB` (or `RRGGBB`, or `AARRGGBB`) to ARGB.
pub fn argb_from_hex(color: &str) -> String {
    let hex = color.trim().trim_start_matches('#').to_ascii_uppercase();
    if hex.len() == 6 { format!("FF{hex}") } else { hex }
}

/// ARGB to `#RRGGBB`; empty (theme/auto) colors read as `None`.
pub fn hex_from_argb(argb: &str) -> Option<String> {
    let argb = argb.trim();
    if !argb.is_ascii() {
        return None;
    }
    match argb.len() {
        8 => Some(format!("#{}", &argb[2..].to_ascii_uppercase())),
        6 => Some(format!("#{}", argb.to_ascii_uppercase())),
        _ => None,
    }
}

fn border_style_name(style: BorderStyle) -> &'static str {
    match style {
        BorderStyle::Thin => "thin",
        BorderStyle::Medium => "medium",
        BorderStyle::Thick => "thick",
        BorderStyle::Hair => "hair",
        BorderStyle::Dotted => "dotted",
        BorderStyle::Dashed => "dashed",
        BorderStyle::Double => "double",
        BorderStyle::DashDot => "dashDot",
        BorderStyle::DashDotDot => "dashDotDot",
        BorderStyle::MediumDashed => "mediumDashed",
        BorderStyle::MediumDashDot => "mediumDashDot",
        BorderStyle::MediumDashDotDot => "mediumDashDotDot",
        BorderStyle::SlantDashDot => "slantDashDot",
    }
}

fn border_style_from_name(name: &str) -> Option<BorderStyle> {
    Some(match name {
        "thin" => BorderStyle::Thin,
        "medium" => BorderStyle::Medium,
        "thick" => BorderStyle::Thick,
        "hair" => BorderStyle::Hair,
        "dotted" => BorderStyle::Dotted,
        "dashed" => BorderStyle::Dashed,
        "double" => BorderStyle::Double,
        "dashDot" => BorderStyle::DashDot,
        "dashDotDot" => BorderStyle::DashDotDot,
        "mediumDashed" => BorderStyle::MediumDashed,
        "mediumDashDot" => BorderStyle::MediumDashDot,
        "mediumDashDotDot" => BorderStyle::MediumDashDotDot,
        "slantDashDot" => BorderStyle::SlantDashDot,
        _ => return None,
    })
}

fn underline_name(underline: UnderlineStyle) -> &'static str {
    match underline {
        UnderlineStyle::None => "none",
        UnderlineStyle::Single => "single",
        UnderlineStyle::Double => "double",
        UnderlineStyle::SingleAccounting => "singleAccounting",
        UnderlineStyle::DoubleAccounting => "doubleAccounting",
    }
}

fn underline_from_name(name: &str) -> Option<UnderlineStyle> {
    match name {
        "single" => Some(UnderlineStyle::Single),
        "double" => Some(UnderlineStyle::Double),
        "singleAccounting" => Some(UnderlineStyle::SingleAccounting),
        "doubleAccounting" => Some(UnderlineStyle::DoubleAccounting),
        _ => None,
    }
}

fn horizontal_to_umya(value: HorizontalAlignment) -> HorizontalAlignmentValues {
    match value {
        HorizontalAlignment::General => HorizontalAlignmentValues::General,
        HorizontalAlignment::Left => HorizontalAlignmentValues::Left,
        HorizontalAlignment::Center => HorizontalAlignmentValues::Center,
        HorizontalAlignment::Right => HorizontalAlignmentValues::Right,
        HorizontalAlignment::Fill => HorizontalAlignmentValues::Fill,
        HorizontalAlignment::Justify => HorizontalAlignmentValues::Justify,
        HorizontalAlignment::CenterAcrossSelection => HorizontalAlignmentValues::CenterContinuous,
        HorizontalAlignment::Distributed => HorizontalAlignmentValues::Distributed,
    }
}

fn horizontal_from_name(name: &str) -> Option<HorizontalAlignment> {
    match name {
        "left" => Some(HorizontalAlignment::Left),
        "center" => Some(HorizontalAlignment::Center),
        "right" => Some(HorizontalAlignment::Right),
        "fill" => Some(HorizontalAlignment::Fill),
        "justify" => Some(HorizontalAlignment::Justify),
        "centerContinuous" => Some(HorizontalAlignment::CenterAcrossSelection),
        "distributed" => Some(HorizontalAlignment::Distributed),
        _ => None,
    }
}

fn vertical_to_umya(value: VerticalAlignment) -> VerticalAlignmentValues {
    match value {
        VerticalAlignment::Top => VerticalAlignmentValues::Top,
        VerticalAlignment::Center => VerticalAlignmentValues::Center,
        VerticalAlignment::Bottom => VerticalAlignmentValues::Bottom,
        VerticalAlignment::Justify => VerticalAlignmentValues::Justify,
        VerticalAlignment::Distributed => VerticalAlignmentValues::Distributed,
    }
}

fn vertical_from_name(name: &str) -> Option<VerticalAlignment> {
    match name {
        "top" => Some(VerticalAlignment::Top),
        "center" => Some(VerticalAlignment::Center),
        "justify" => Some(VerticalAlignment::Justify),
        "distributed" => Some(VerticalAlignment::Distributed),
        _ => None,
    }
}

fn edge_from_border(border: &Border) -> Option<BorderEdge> {
    let style = border_style_from_name(border.get_border_style())?;
    Some(BorderEdge {
        style,
        color: hex_from_argb(border.get_color().get_argb()),
    })
}

fn write_edge(border: &mut Border, edge: Option<&BorderEdge>) {
    match edge {
        Some(edge) => {
            border.set_border_style(border_style_name(edge.style));
            if let Some(color) = &edge.color {
                border.get_color_mut().set_argb(argb_from_hex(color));
            }
        }
        None => {
            border.set_border_style("none");
        }
    }
}

/// Every non-default property of `style`.
pub fn cell_format_from_style(style: &Style) -> CellFormat {
    let mut format = CellFormat::default();

    format.number_format = style.get_number_format().and_then(|fmt| {
        let code = fmt.get_format_code();
        (!code.eq_ignore_ascii_case("general")).then(|| code.to_string())
    });

    if let Some(pattern) = style.get_fill().and_then(Fill::get_pattern_fill)
        && !pattern.get_pattern_type().get_value_string().eq_ignore_ascii_case("none")
    {
        format.fill_color = pattern
            .get_foreground_color()
            .and_then(|color| hex_from_argb(color.get_argb()));
    }

    if let Some(font) = style.get_font() {
        format.bold = (*font.get_bold()).then_some(true);
        format.italic = (*font.get_italic()).then_some(true);
        format.underline = underline_from_name(font.get_underline());
        format.font_name = Some(font.get_name().to_string())
            .filter(|name| !name.is_empty() && name != DEFAULT_FONT_NAME);
        format.font_size = Some(*font.get_size()).filter(|size| *size > 0.0 && *size != DEFAULT_FONT_SIZE);
        format.font_color = Some(font.get_color().get_argb())
            .filter(|argb| !argb.eq_ignore_ascii_case(DEFAULT_FONT_ARGB))
            .and_then(hex_from_argb);
    }

    if let Some(alignment) = style.get_alignment() {
        format.horizontal_alignment =
            horizontal_from_name(alignment.get_horizontal().get_value_string());
        format.vertical_alignment = vertical_from_name(alignment.get_vertical().get_value_string());
        format.wrap_text = (*alignment.get_wrap_text()).then_some(true);
    }

    if let Some(borders) = style.get_borders() {
        format.border_top = edge_from_border(borders.get_top_border());
        format.border_bottom = edge_from_border(borders.get_bottom_border());
        format.border_left = edge_from_border(borders.get_left_border());
        format.border_right = edge_from_border(borders.get_right_border());
    }

    format
}

/// Set `properties` on `style` from `format`; `None` resets to default.
pub fn apply_cell_format(style: &mut Style, format: &CellFormat, properties: &[CellFormatProperty]) {
    for property in properties {
        match property {
            CellFormatProperty::NumberFormat => {
                let code = format.number_format.as_deref().unwrap_or("General");
                style.get_number_format_mut().set_format_code(code);
            }
            CellFormatProperty::FillColor => match &format.fill_color {
                Some(color) => {
                    style
                        .get_fill_mut()
                        .get_pattern_fill_mut()
                        .set_pattern_type(PatternValues::Solid)
                        .get_foreground_color_mut()
                        .set_argb(argb_from_hex(color));
                }
                None => {
                    style.set_fill(Fill::default());
                }
            },
            CellFormatProperty::FontColor => {
                let argb = format
                    .font_color
                    .as_deref()
                    .map(argb_from_hex)
                    .unwrap_or_else(|| DEFAULT_FONT_ARGB.to_string());
                style.get_font_mut().get_color_mut().set_argb(argb);
            }
            CellFormatProperty::Bold => {
                style.get_font_mut().set_bold(format.bold.unwrap_or(false));
            }
            CellFormatProperty::Italic => {
                style.get_font_mut().set_italic(format.italic.unwrap_or(false));
            }
            CellFormatProperty::Underline => {
                let name = underline_name(format.underline.unwrap_or(UnderlineStyle::None));
                style.get_font_mut().set_underline(name);
            }
            CellFormatProperty::FontName => {
                let name = format.font_name.as_deref().unwrap_or(DEFAULT_FONT_NAME);
                style.get_font_mut().set_name(name);
            }
            CellFormatProperty::FontSize => {
                style
                    .get_font_mut()
                    .set_size(format.font_size.unwrap_or(DEFAULT_FONT_SIZE));
            }
            CellFormatProperty::HorizontalAlignment => {
                let value = format
                    .horizontal_alignment
                    .unwrap_or(HorizontalAlignment::General);
                style.get_alignment_mut().set_horizontal(horizontal_to_umya(value));
            }
            CellFormatProperty::VerticalAlignment => {
                let value = format.vertical_alignment.unwrap_or(VerticalAlignment::Bottom);
                style.get_alignment_mut().set_vertical(vertical_to_umya(value));
            }
            CellFormatProperty::WrapText => {
                style
                    .get_alignment_mut()
                    .set_wrap_text(format.wrap_text.unwrap_or(false));
            }
            CellFormatProperty::BorderTop => {
                write_edge(style.get_borders_mut().get_top_border_mut(), format.border_top.as_ref());
            }
            CellFormatProperty::BorderBottom => write_edge(
                style.get_borders_mut().get_bottom_border_mut(),
                format.border_bottom.as_ref(),
            ),
            CellFormatProperty::BorderLeft => write_edge(
                style.get_borders_mut().get_left_border_mut(),
                format.border_left.as_ref(),
            ),
            CellFormatProperty::BorderRight => write_edge(
                style.get_borders_mut().get_right_border_mut(),
                format.border_right.as_ref(),
            ),
        }
    }
}

/// Differential (`dxf`) style for a conditional format rule.
///
/// umya deduplicates `dxf` records by style hash at write time, so equal
/// inputs reuse one record.
pub fn dxf_style(format: &ConditionalFormatStyle) -> Style {
    let mut style = Style::default();
    if let Some(fill) = &format.fill_color {
        style
            .get_fill_mut()
            .get_pattern_fill_mut()
            .set_pattern_type(PatternValues::Solid)
            .get_foreground_color_mut()
            .set_argb(argb_from_hex(fill));
    }
    let font = style.get_font_mut();
    if let Some(color) = &format.font_color {
        font.get_color_mut().set_argb(argb_from_hex(color));
    }
    if let Some(bold) = format.bold {
        font.set_bold(bold);
    }
    if let Some(italic) = format.italic {
        font.set_italic(italic);
    }
    if let Some(underline) = format.underline {
        font.set_underline(if underline { "single" } else { "none" });
    }
    if let Some(strikethrough) = format.strikethrough {
        font.set_strikethrough(strikethrough);
    }
    style
}

/// Read a rule's `dxf` back; `None` when it carries nothing we model.
pub fn conditional_style_from_dxf(style: &Style) -> Option<ConditionalFormatStyle> {
    let mut out = ConditionalFormatStyle::default();
    if let Some(pattern) = style.get_fill().and_then(Fill::get_pattern_fill) {
        out.fill_color = pattern
            .get_foreground_color()
            .and_then(|color| hex_from_argb(color.get_argb()));
    }
    if let Some(font) = style.get_font() {
        out.font_color = hex_from_argb(font.get_color().get_argb());
        out.bold = (*font.get_bold()).then_some(true);
        out.italic = (*font.get_italic()).then_some(true);
        out.underline = (!font.get_underline().eq_ignore_ascii_case("none")
            && !font.get_underline().is_empty())
        .then_some(true);
        out.strikethrough = (*font.get_strikethrough()).then_some(true);
    }
    (out != ConditionalFormatStyle::default()).then_some(out)
}
