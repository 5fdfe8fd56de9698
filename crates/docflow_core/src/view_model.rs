use crate::{ControllerStatus, Operation, PageState, Phase, ResourceHandle, TaskResult};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageViewModel {
    pub operation: Option<Operation>,
    pub status: ControllerStatus,
    pub selected_file: Option<String>,
    pub preview: Option<ResourceHandle>,
    pub threshold: f64,
    pub use_corrector: bool,
    pub can_start: bool,
    /// Label shown while a task is in flight.
    pub busy_label: Option<String>,
    pub poll_attempts: u32,
    pub error: Option<String>,
    pub result: Option<ResultView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    Download {
        filename: String,
        mime: String,
        size: u64,
    },
    Fields(Vec<FieldRowView>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRowView {
    pub key: String,
    pub label: String,
    pub lines: Vec<String>,
    /// Formatted as `95%` for scored values.
    pub confidence: Option<String>,
}

impl PageViewModel {
    pub(crate) fn from_state(state: &PageState, dirty: bool) -> Self {
        let operation = state.operation();
        let (busy_label, poll_attempts) = match state.phase() {
            Phase::Submitting { .. } => (Some(format!("Starting {operation}...")), 0),
            Phase::Polling { attempts, .. } => {
                (Some(format!("Processing {operation}...")), *attempts)
            }
            _ => (None, 0),
        };
        let params = state.params();

        Self {
            operation: Some(operation),
            status: state.status(),
            selected_file: state.selection().map(|s| s.name().to_string()),
            preview: state.selection().and_then(|s| s.preview()),
            threshold: params.threshold,
            use_corrector: params.use_corrector,
            can_start: state.selection().is_some() && state.in_flight().is_none(),
            busy_label,
            poll_attempts,
            error: state.error().map(|err| err.message().to_string()),
            result: state.result().map(result_view),
            dirty,
        }
    }

    /// Looks up a displayed field row by its original key.
    pub fn field(&self, key: &str) -> Option<&FieldRowView> {
        match &self.result {
            Some(ResultView::Fields(rows)) => rows.iter().find(|row| row.key == key),
            _ => None,
        }
    }
}

fn result_view(result: &TaskResult) -> ResultView {
    match result {
        TaskResult::Binary(binary) => ResultView::Download {
            filename: binary.filename.clone(),
            mime: binary.mime.clone(),
            size: binary.size,
        },
        TaskResult::Structured(fields) => ResultView::Fields(
            fields
                .iter()
                .map(|field| FieldRowView {
                    key: field.key.clone(),
                    label: field.label(),
                    lines: field.value.display_lines(),
                    confidence: field.value.confidence().map(|conf| format!("{conf}%")),
                })
                .collect(),
        ),
    }
}
