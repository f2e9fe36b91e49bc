//! Rendering command output as JSON or terminal tables.

use anyhow::{Context, Result};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use survey_model::{
    CrossTabPivot, CrossTabResult, Filter, FilterCondition, FilterImpact, SimpleTabResult,
};

use crate::commands::{ColumnSummary, ImportSummary, Report, TemplateSummary};

/// How reports are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize report")
        }
        OutputFormat::Table => Ok(render_table(report).to_string()),
    }
}

fn render_table(report: &Report) -> Table {
    match report {
        Report::Columns(columns) => columns_table(columns),
        Report::Simple(result) => simple_table(result),
        Report::Cross(result) => cross_table(result),
        Report::Pivot(pivot) => pivot_table(pivot),
        Report::Filters(filters) => filters_table(filters),
        Report::Impact(impact) => impact_table(impact),
        Report::Templates(templates) => templates_table(templates),
        Report::Imported(summary) => imported_table(summary),
    }
}

fn columns_table(columns: &[ColumnSummary]) -> Table {
    let mut table = styled_table(&["#", "Column", "Type", "Kind"]);
    for column in columns {
        table.add_row(vec![
            Cell::new(column.index),
            Cell::new(&column.name),
            Cell::new(&column.data_type),
            Cell::new(column.marker.unwrap_or_default()),
        ]);
    }
    align_column(&mut table, 0, CellAlignment::Right);
    table
}

fn simple_table(result: &SimpleTabResult) -> Table {
    let mut table = styled_table(&[result.column.as_str(), "Count", "%"]);
    for row in &result.rows {
        table.add_row(vec![
            Cell::new(&row.value),
            Cell::new(row.count),
            Cell::new(format!("{:.1}", row.percentage)),
        ]);
    }
    table.add_row(vec![
        total_cell("Total"),
        total_cell(result.total),
        Cell::new(""),
    ]);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    table
}

fn cross_table(result: &CrossTabResult) -> Table {
    let mut table = styled_table(&[
        result.x_column.as_str(),
        result.y_column.as_str(),
        "Count",
        "%",
    ]);
    for row in &result.rows {
        table.add_row(vec![
            Cell::new(&row.x_value),
            Cell::new(&row.y_value),
            Cell::new(row.count),
            Cell::new(format!("{:.1}", row.percentage)),
        ]);
    }
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    table
}

fn pivot_table(pivot: &CrossTabPivot) -> Table {
    let corner = format!("{} \\ {}", pivot.x_column, pivot.y_column);
    let mut header = vec![corner.as_str()];
    header.extend(pivot.y_values.iter().map(String::as_str));
    header.push("Total");
    let mut table = styled_table(&header);
    for (x_value, cells) in pivot.x_values.iter().zip(&pivot.matrix) {
        let mut row = vec![Cell::new(x_value)];
        row.extend(cells.iter().map(|cell| {
            if cell.exists {
                Cell::new(format!("{} ({:.1}%)", cell.count, cell.percentage))
            } else {
                Cell::new("-")
            }
        }));
        row.push(total_cell(cells.iter().map(|cell| cell.count).sum::<usize>()));
        table.add_row(row);
    }
    for pos in 1..=pivot.y_values.len() + 1 {
        align_column(&mut table, pos, CellAlignment::Right);
    }
    table
}

fn filters_table(filters: &[Filter]) -> Table {
    let mut table = styled_table(&["Filter", "Description", "Conditions"]);
    for filter in filters {
        let conditions = filter
            .conditions
            .iter()
            .map(describe_condition)
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            Cell::new(&filter.name),
            Cell::new(&filter.description),
            Cell::new(conditions),
        ]);
    }
    table
}

fn describe_condition(condition: &FilterCondition) -> String {
    let mut parts = Vec::new();
    if !condition.include_values.is_empty() {
        parts.push(format!("in [{}]", condition.include_values.join(", ")));
    }
    if !condition.exclude_values.is_empty() {
        parts.push(format!("not in [{}]", condition.exclude_values.join(", ")));
    }
    format!("{} {}", condition.column, parts.join(" and "))
}

fn impact_table(impact: &FilterImpact) -> Table {
    let mut table = styled_table(&["Filter", "Total", "Matched", "Excluded"]);
    table.add_row(vec![
        Cell::new(&impact.filter),
        Cell::new(impact.total),
        Cell::new(impact.matched),
        Cell::new(impact.excluded),
    ]);
    for pos in 1..=3 {
        align_column(&mut table, pos, CellAlignment::Right);
    }
    table
}

fn templates_table(templates: &[TemplateSummary]) -> Table {
    let mut table = styled_table(&["#", "Template", "Calculation", "Description"]);
    for template in templates {
        table.add_row(vec![
            Cell::new(template.index),
            Cell::new(&template.name),
            Cell::new(template.calculation.as_str()),
            Cell::new(&template.description),
        ]);
    }
    align_column(&mut table, 0, CellAlignment::Right);
    table
}

fn imported_table(summary: &ImportSummary) -> Table {
    let mut table = styled_table(&["Imported", "Target"]);
    for name in &summary.names {
        table.add_row(vec![Cell::new(name), Cell::new(&summary.target)]);
    }
    table.add_row(vec![total_cell(summary.imported), Cell::new("")]);
    table
}

fn styled_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(header.iter().copied().map(header_cell));
    table
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn total_cell(content: impl ToString) -> Cell {
    Cell::new(content).add_attribute(Attribute::Bold)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
