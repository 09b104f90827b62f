pub mod checkpoint;
pub mod conditional_format;
pub mod format;
pub mod structure;
pub mod values;

pub use checkpoint::{RecoveryCheckpoint, RecoveryRangeValuesState, RecoveryState};
pub use conditional_format::{
    CellValueOperator, ColorScaleCriteria, ColorScaleCriterion, ConditionalBoundRule,
    ConditionalFormatCriteria, ConditionalFormatRuleType, ConditionalFormatStyle,
    DataBarDirection, IconCriterionOperator, IconCriterionType, IconSetCriterion, IconSetStyle,
    PresetCriterion, RecoveryConditionalFormatRule, RecoveryConditionalFormatState,
    TextComparisonOperator, TopBottomType,
};
pub use format::{
    BorderEdge, BorderStyle, CellFormat, CellFormatProperty, FormatFacet, HorizontalAlignment,
    RecoveryFormatAreaState, RecoveryFormatRangeState, RecoveryFormatSelection, UnderlineStyle,
    VerticalAlignment,
};
pub use structure::{RecoveryModifyStructureState, SheetVisibility};
pub use values::{CellValue, DataRangeCapture, RecoveryStructureValueRangeState};
