use serde_json::Value;

use super::{
    Record, field, has_literal, has_positive_u32, has_string, is_literal, optional_bool,
    optional_literal, optional_string, optional_u32,
};
use crate::grid::CellRange;
use crate::model::{
    CellValueOperator, ConditionalFormatRuleType, DataBarDirection, IconCriterionOperator,
    IconCriterionType, IconSetStyle, PresetCriterion, TextComparisonOperator, TopBottomType,
};

fn optional_format(obj: &Record) -> bool {
    field(obj, "format").is_none_or(|format| {
        format.as_object().is_some_and(|style| {
            optional_string(style, "fillColor")
                && optional_string(style, "fontColor")
                && optional_bool(style, "bold")
                && optional_bool(style, "italic")
                && optional_bool(style, "underline")
                && optional_bool(style, "strikethrough")
        })
    })
}

/// Typed bound with a `formula` wherever the type needs one.
fn is_typed_bound(obj: &Record) -> bool {
    let Some(rule_type) = field(obj, "type")
        .filter(|v| is_literal::<ConditionalFormatRuleType>(v))
        .and_then(|v| serde_json::from_value::<ConditionalFormatRuleType>(v.clone()).ok())
    else {
        return false;
    };
    if rule_type.needs_formula() {
        has_string(obj, "formula")
    } else {
        optional_string(obj, "formula")
    }
}

pub fn is_conditional_bound_rule(value: &Value) -> bool {
    value.as_object().is_some_and(is_typed_bound)
}

fn is_color_scale_criterion(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| is_typed_bound(obj) && optional_string(obj, "color"))
}

pub fn is_color_scale_criteria(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    field(obj, "minimum").is_some_and(is_color_scale_criterion)
        && field(obj, "maximum").is_some_and(is_color_scale_criterion)
        && field(obj, "midpoint").is_none_or(is_color_scale_criterion)
}

pub fn is_icon_set_criteria(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    has_literal::<IconCriterionType>(obj, "type")
        && has_literal::<IconCriterionOperator>(obj, "operator")
        && has_string(obj, "formula")
}

fn is_icon_set(obj: &Record) -> bool {
    let Some(style) = field(obj, "style")
        .filter(|v| is_literal::<IconSetStyle>(v))
        .and_then(|v| serde_json::from_value::<IconSetStyle>(v.clone()).ok())
    else {
        return false;
    };
    let Some(criteria) = field(obj, "criteria").and_then(Value::as_array) else {
        return false;
    };
    criteria.len() == style.icon_count()
        && criteria.iter().all(is_icon_set_criteria)
        && optional_bool(obj, "reverseIconOrder")
        && optional_bool(obj, "showIconOnly")
}

fn is_cell_value_rule(obj: &Record) -> bool {
    let Some(operator) = field(obj, "operator")
        .filter(|v| is_literal::<CellValueOperator>(v))
        .and_then(|v| serde_json::from_value::<CellValueOperator>(v.clone()).ok())
    else {
        return false;
    };
    let second = if operator.needs_second_formula() {
        has_string(obj, "formula2")
    } else {
        optional_string(obj, "formula2")
    };
    has_string(obj, "formula1") && second && optional_format(obj)
}

pub fn is_recovery_conditional_format_rule(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if !optional_bool(obj, "stopIfTrue") || !optional_u32(obj, "priority") {
        return false;
    }
    match field(obj, "type").and_then(Value::as_str) {
        Some("custom") => has_string(obj, "formula") && optional_format(obj),
        Some("cell_value") => is_cell_value_rule(obj),
        Some("text_comparison") => {
            has_literal::<TextComparisonOperator>(obj, "operator")
                && has_string(obj, "text")
                && optional_format(obj)
        }
        Some("top_bottom") => {
            has_positive_u32(obj, "rank")
                && has_literal::<TopBottomType>(obj, "topBottomType")
                && optional_format(obj)
        }
        Some("preset_criteria") => {
            has_literal::<PresetCriterion>(obj, "criterion") && optional_format(obj)
        }
        Some("data_bar") => {
            field(obj, "lowerBoundRule").is_some_and(is_conditional_bound_rule)
                && field(obj, "upperBoundRule").is_some_and(is_conditional_bound_rule)
                && optional_literal::<DataBarDirection>(obj, "barDirection")
                && optional_bool(obj, "showDataBarOnly")
                && optional_string(obj, "positiveFillColor")
                && optional_string(obj, "negativeFillColor")
        }
        Some("color_scale") => field(obj, "criteria").is_some_and(is_color_scale_criteria),
        Some("icon_set") => is_icon_set(obj),
        _ => false,
    }
}

pub fn is_recovery_conditional_format_state(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    has_string(obj, "sheetId")
        && has_string(obj, "sheetName")
        && field(obj, "address")
            .and_then(Value::as_str)
            .is_some_and(|address| CellRange::parse(address).is_some())
        && field(obj, "rules")
            .and_then(Value::as_array)
            .is_some_and(|rules| rules.iter().all(is_recovery_conditional_format_rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bound_rules_require_formula_for_valued_types() {
        assert!(is_conditional_bound_rule(&json!({"type": "lowestValue"})));
        assert!(is_conditional_bound_rule(&json!({"type": "percent", "formula": "10"})));
        assert!(!is_conditional_bound_rule(&json!({"type": "percent"})));
        assert!(!is_conditional_bound_rule(&json!({"type": "average"})));
    }

    #[test]
    fn icon_sets_need_one_criterion_per_icon() {
        let criterion = json!({"type": "percent", "operator": "greaterThanOrEqual", "formula": "33"});
        let three = json!({"type": "icon_set", "style": "threeArrows", "criteria": [criterion, criterion, criterion]});
        assert!(is_recovery_conditional_format_rule(&three));

        let four = json!({"type": "icon_set", "style": "fourArrows", "criteria": [criterion, criterion, criterion]});
        assert!(!is_recovery_conditional_format_rule(&four));
    }

    #[test]
    fn color_scales_need_both_ends_with_known_bound_types() {
        let low = json!({"type": "lowestValue", "color": "#F8696B"});
        let high = json!({"type": "highestValue", "color": "#63BE7B"});
        assert!(is_color_scale_criteria(&json!({"minimum": low, "maximum": high})));
        assert!(!is_color_scale_criteria(&json!({"minimum": low})));
        assert!(!is_color_scale_criteria(&json!({
            "minimum": low,
            "maximum": {"type": "top", "color": "#63BE7B"}
        })));
        assert!(!is_color_scale_criteria(&json!({
            "minimum": low,
            "maximum": high,
            "midpoint": {"type": "percentile", "color": 7}
        })));
    }
}
