use crate::download::label::Label;
use crate::ui::label_list::LabelRow;
use crate::ui::row::{DownloadRow, RowStatus};
use serde::Serialize;

#[derive(Serialize)]
struct RowJson<'a> {
    position: usize,
    id: u64,
    title: &'a str,
    uploader: &'a str,
    category: u32,
    rating: f32,
    status: String,
    read_progress: &'a str,
}

/// Status column text for a row
pub fn format_status(status: &RowStatus) -> String {
    match status {
        RowStatus::Text(text) => text.clone(),
        RowStatus::Progress {
            percent_text,
            speed_text,
            ..
        } => match percent_text {
            Some(percent) => format!("{} {}", percent, speed_text),
            None => format!("... {}", speed_text),
        },
    }
}

/// Format download rows for display (human or JSON)
pub fn format_download_rows(title: &str, rows: &[DownloadRow], json: bool) -> String {
    if json {
        let items: Vec<RowJson> = rows
            .iter()
            .enumerate()
            .map(|(position, row)| RowJson {
                position,
                id: row.id,
                title: &row.title,
                uploader: &row.uploader,
                category: row.category,
                rating: row.rating,
                status: format_status(&row.status),
                read_progress: &row.read_progress.text,
            })
            .collect();
        return serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string());
    }

    if rows.is_empty() {
        return format!("{}\n(empty)", title);
    }
    let mut output = String::from(title);
    for (position, row) in rows.iter().enumerate() {
        output.push_str(&format!(
            "\n{:>3}  {:>10}  [{}]  {:>7}  {}",
            position,
            row.id,
            format_status(&row.status),
            row.read_progress.text,
            row.title
        ));
    }
    output
}

pub fn format_labels(labels: &[Label], empty_text: &str) -> String {
    if labels.is_empty() {
        return empty_text.to_string();
    }
    labels
        .iter()
        .map(|l| format!("{:>3}  {}", l.order, l.name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_label_row(row: &LabelRow) -> String {
    let marker = if row.pinned { "*" } else { " " };
    format!("{} {} (slide {:+.1})", marker, row.name, row.slide)
}
