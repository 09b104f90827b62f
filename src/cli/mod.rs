pub mod commands;
pub mod errors;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

use crate::config::{CliArgs, RecoveryConfig};
use crate::model::SheetVisibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VisibilityArg {
    Visible,
    Hidden,
    #[value(name = "very-hidden", alias = "very_hidden")]
    VeryHidden,
}

impl From<VisibilityArg> for SheetVisibility {
    fn from(value: VisibilityArg) -> Self {
        match value {
            VisibilityArg::Visible => SheetVisibility::Visible,
            VisibilityArg::Hidden => SheetVisibility::Hidden,
            VisibilityArg::VeryHidden => SheetVisibility::VeryHidden,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "spreadsheet-recovery",
    version,
    about = "Edit xlsx workbooks with an undo checkpoint for every change"
)]
pub struct Cli {
    #[command(flatten)]
    pub config: CliArgs,

    #[arg(long, global = true, help = "Print single-line JSON")]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Rename a sheet")]
    RenameSheet {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET", help = "Current sheet name")]
        sheet: String,
        #[arg(value_name = "NEW_NAME")]
        new_name: String,
    },
    #[command(about = "Show or hide a sheet")]
    SetVisibility {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET")]
        sheet: String,
        #[arg(value_enum, value_name = "VISIBILITY")]
        visibility: VisibilityArg,
    },
    #[command(about = "Add an empty sheet")]
    AddSheet {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(long, value_name = "INDEX", help = "0-based tab position (default: last)")]
        position: Option<u32>,
        #[arg(long, value_enum, value_name = "VISIBILITY")]
        visibility: Option<VisibilityArg>,
    },
    #[command(about = "Delete a sheet, refusing when it holds data unless allowed")]
    DeleteSheet {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET")]
        sheet: String,
        #[arg(long, help = "Delete even when the sheet holds values or formulas")]
        allow_data_delete: bool,
    },
    #[command(about = "Insert empty rows before POSITION")]
    InsertRows {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET")]
        sheet: String,
        #[arg(value_name = "POSITION", help = "1-based row number")]
        position: u32,
        #[arg(value_name = "COUNT")]
        count: u32,
    },
    #[command(about = "Delete rows, refusing when they hold data unless allowed")]
    DeleteRows {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET")]
        sheet: String,
        #[arg(value_name = "POSITION", help = "1-based row number")]
        position: u32,
        #[arg(value_name = "COUNT")]
        count: u32,
        #[arg(long, help = "Delete even when the rows hold values or formulas")]
        allow_data_delete: bool,
    },
    #[command(about = "Insert empty columns before POSITION")]
    InsertColumns {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET")]
        sheet: String,
        #[arg(value_name = "POSITION", help = "Column letters or 1-based number")]
        position: String,
        #[arg(value_name = "COUNT")]
        count: u32,
    },
    #[command(about = "Delete columns, refusing when they hold data unless allowed")]
    DeleteColumns {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET")]
        sheet: String,
        #[arg(value_name = "POSITION", help = "Column letters or 1-based number")]
        position: String,
        #[arg(value_name = "COUNT")]
        count: u32,
        #[arg(long, help = "Delete even when the columns hold values or formulas")]
        allow_data_delete: bool,
    },
    #[command(
        about = "Write a grid of values into a range",
        after_long_help = "Examples:\n  spreadsheet-recovery write-values book.xlsx Sheet1 A1:B2 '[[1,\"x\"],[true,\"=A1*2\"]]'"
    )]
    WriteValues {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET")]
        sheet: String,
        #[arg(value_name = "RANGE", help = "A1 range, e.g. B2:D4")]
        range: String,
        #[arg(value_name = "JSON", help = "Row-major JSON grid; text starting with = is a formula")]
        values: String,
    },
    #[command(
        about = "Set format properties on one or more ranges",
        after_long_help = "Examples:\n  spreadsheet-recovery format-range book.xlsx Sheet1 --range A1:C1 --patch '{\"bold\":true,\"fillColor\":\"#FFFF00\"}'"
    )]
    FormatRange {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET")]
        sheet: String,
        #[arg(long = "range", value_name = "RANGE", required = true)]
        ranges: Vec<String>,
        #[arg(long, value_name = "JSON", help = "Format properties to set, camelCase")]
        patch: String,
    },
    #[command(about = "Replace the conditional formats applying to a range")]
    SetConditionalFormats {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "SHEET")]
        sheet: String,
        #[arg(value_name = "RANGE")]
        range: String,
        #[arg(value_name = "JSON", help = "JSON array of rules; [] clears the range")]
        rules: String,
    },
    #[command(about = "List recorded checkpoints, oldest first")]
    ListCheckpoints {
        #[arg(value_name = "FILE", help = "Workbook path")]
        file: PathBuf,
    },
    #[command(about = "Print one checkpoint including its captured state")]
    ShowCheckpoint {
        #[arg(value_name = "FILE", help = "Workbook path")]
        file: PathBuf,
        #[arg(value_name = "ID")]
        id: String,
    },
    #[command(about = "Undo the edit recorded by a checkpoint")]
    Restore {
        #[arg(value_name = "FILE", help = "Workbook path to modify")]
        file: PathBuf,
        #[arg(value_name = "ID")]
        id: String,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let compact = cli.compact;
    let config = match RecoveryConfig::from_args(cli.config) {
        Ok(config) => config,
        Err(error) => errors::emit_error_and_exit(error),
    };
    match run_command(cli.command, &config).await {
        Ok(payload) => {
            if let Err(error) = output::emit_value(&payload, compact) {
                errors::emit_error_and_exit(error);
            }
            Ok(())
        }
        Err(error) => errors::emit_error_and_exit(error),
    }
}

pub async fn run_command(command: Commands, config: &RecoveryConfig) -> Result<Value> {
    use commands::{checkpoints, edit};
    match command {
        Commands::RenameSheet {
            file,
            sheet,
            new_name,
        } => edit::rename_sheet(file, sheet, new_name, config).await,
        Commands::SetVisibility {
            file,
            sheet,
            visibility,
        } => edit::set_visibility(file, sheet, visibility.into(), config).await,
        Commands::AddSheet {
            file,
            name,
            position,
            visibility,
        } => edit::add_sheet(file, name, position, visibility.map(Into::into), config).await,
        Commands::DeleteSheet {
            file,
            sheet,
            allow_data_delete,
        } => edit::delete_sheet(file, sheet, allow_data_delete, config).await,
        Commands::InsertRows {
            file,
            sheet,
            position,
            count,
        } => edit::insert_rows(file, sheet, position, count, config).await,
        Commands::DeleteRows {
            file,
            sheet,
            position,
            count,
            allow_data_delete,
        } => edit::delete_rows(file, sheet, position, count, allow_data_delete, config).await,
        Commands::InsertColumns {
            file,
            sheet,
            position,
            count,
        } => edit::insert_columns(file, sheet, position, count, config).await,
        Commands::DeleteColumns {
            file,
            sheet,
            position,
            count,
            allow_data_delete,
        } => {
            edit::delete_columns(file, sheet, position, count, allow_data_delete, config).await
        }
        Commands::WriteValues {
            file,
            sheet,
            range,
            values,
        } => edit::write_values(file, sheet, range, values, config).await,
        Commands::FormatRange {
            file,
            sheet,
            ranges,
            patch,
        } => edit::format_range(file, sheet, ranges, patch, config).await,
        Commands::SetConditionalFormats {
            file,
            sheet,
            range,
            rules,
        } => edit::set_conditional_formats(file, sheet, range, rules, config).await,
        Commands::ListCheckpoints { file } => checkpoints::list(file, config).await,
        Commands::ShowCheckpoint { file, id } => checkpoints::show(file, id, config).await,
        Commands::Restore { file, id } => checkpoints::restore(file, id, config).await,
    }
}
