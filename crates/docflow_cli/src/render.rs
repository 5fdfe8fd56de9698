use docflow_core::{ControllerStatus, FieldRowView, PageViewModel, ResultView, SampleFile};

/// One-line progress summary written to stderr whenever the page changes.
pub fn status_line(view: &PageViewModel) -> String {
    let file = view.selected_file.as_deref().unwrap_or("no file");
    match view.status {
        ControllerStatus::Idle => "Idle".to_string(),
        ControllerStatus::FileSelected => format!("Selected {file}"),
        ControllerStatus::Submitting | ControllerStatus::Polling => {
            let label = view.busy_label.as_deref().unwrap_or("Working...");
            if view.poll_attempts > 0 {
                format!("{label} {file} (check #{})", view.poll_attempts)
            } else {
                format!("{label} {file}")
            }
        }
        ControllerStatus::Succeeded => format!("Finished {file}"),
        ControllerStatus::Failed => format!(
            "Failed {file}: {}",
            view.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

pub fn result_lines(view: &PageViewModel) -> Vec<String> {
    match &view.result {
        Some(ResultView::Download {
            filename,
            mime,
            size,
        }) => vec![format!("{filename} ({mime}, {})", format_size(*size))],
        Some(ResultView::Fields(rows)) if rows.is_empty() => {
            vec!["No fields were extracted.".to_string()]
        }
        Some(ResultView::Fields(rows)) => rows.iter().flat_map(field_lines).collect(),
        None => Vec::new(),
    }
}

fn field_lines(row: &FieldRowView) -> Vec<String> {
    let heading = match &row.confidence {
        Some(confidence) => format!("{} [{}]", row.label, confidence),
        None => row.label.clone(),
    };
    let mut lines = vec![heading];
    for line in &row.lines {
        lines.extend(line.lines().map(|part| format!("    {part}")));
    }
    lines
}

pub fn sample_lines(samples: &[SampleFile]) -> Vec<String> {
    samples
        .iter()
        .map(|sample| {
            format!(
                "{}  ({} pages, {})\n    {}",
                sample.name, sample.pages, sample.size_label, sample.description
            )
        })
        .collect()
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let value = bytes as f64;
    if value < KB {
        format!("{bytes} B")
    } else if value < KB * KB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{:.1} MB", value / (KB * KB))
    }
}
