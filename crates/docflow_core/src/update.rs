use crate::{
    find_sample, Effect, FileSelection, Msg, Operation, PageError, PageState, Phase,
    SubmitRequest, TaskFailure, TaskResult, Ticket, EXTRACTION_JSON_FILENAME,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// Engine messages are matched against the ticket currently in flight. A
/// message for any other ticket is stale: it never changes the page, and a
/// resource it carries is released immediately.
pub fn update(mut state: PageState, msg: Msg) -> (PageState, Vec<Effect>) {
    let effects = match msg {
        Msg::SampleSelected(name) => {
            let effects = reset_page(&mut state);
            let sample = find_sample(&name).copied().map(FileSelection::Sample);
            state.set_selection(sample);
            effects
        }
        Msg::FileUploaded(file) => {
            let effects = reset_page(&mut state);
            state.set_selection(Some(FileSelection::Upload(file)));
            effects
        }
        Msg::ThresholdChanged(value) => {
            if !value.is_nan() {
                state.params_mut().threshold = value.clamp(0.0, 1.0);
            }
            Vec::new()
        }
        Msg::CorrectorToggled(enabled) => {
            state.params_mut().use_corrector = enabled;
            Vec::new()
        }
        Msg::StartClicked => start(&mut state),
        Msg::ClearClicked => {
            let effects = reset_page(&mut state);
            state.set_selection(None);
            effects
        }
        Msg::DownloadClicked => download(&mut state),
        Msg::TaskSubmitted { ticket, task_id } => {
            if is_submitting(&state, ticket) {
                let operation = state.operation();
                state.set_phase(Phase::Polling {
                    ticket,
                    task_id: task_id.clone(),
                    attempts: 0,
                });
                vec![Effect::StartPolling {
                    ticket,
                    operation,
                    task_id,
                }]
            } else {
                Vec::new()
            }
        }
        Msg::SubmissionFailed { ticket, message } => {
            if is_submitting(&state, ticket) {
                state.set_phase(Phase::Failed(PageError::Submission(message)));
            }
            Vec::new()
        }
        Msg::PollProgress { ticket, attempt } => {
            let mut changed = false;
            if let Phase::Polling {
                ticket: current,
                attempts,
                ..
            } = state.phase_mut()
            {
                if *current == ticket {
                    *attempts = attempt;
                    changed = true;
                }
            }
            if changed {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::TaskSucceeded { ticket, result } => {
            if is_polling(&state, ticket) {
                state.set_phase(Phase::Succeeded(result));
                Vec::new()
            } else {
                result
                    .handle()
                    .map(|handle| Effect::Release { handle })
                    .into_iter()
                    .collect()
            }
        }
        Msg::TaskFailed { ticket, failure } => {
            if is_polling(&state, ticket) {
                let error = match failure {
                    TaskFailure::Backend(message) => PageError::Backend(message),
                    TaskFailure::StatusCheck(detail) => PageError::StatusCheck(format!(
                        "Failed to check {} status: {detail}",
                        state.operation()
                    )),
                };
                state.set_phase(Phase::Failed(error));
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn is_submitting(state: &PageState, ticket: Ticket) -> bool {
    matches!(state.phase(), Phase::Submitting { ticket: current } if *current == ticket)
}

fn is_polling(state: &PageState, ticket: Ticket) -> bool {
    matches!(state.phase(), Phase::Polling { ticket: current, .. } if *current == ticket)
}

/// Drops the task, result and error, and releases everything the page holds.
/// The selection itself is left for the caller to replace.
fn reset_page(state: &mut PageState) -> Vec<Effect> {
    let mut effects = Vec::new();
    if let Phase::Polling { ticket, .. } = state.phase() {
        effects.push(Effect::CancelPolling { ticket: *ticket });
    }
    effects.extend(
        state
            .held_resources()
            .into_iter()
            .map(|handle| Effect::Release { handle }),
    );
    state.set_phase(Phase::Idle);
    state.set_notice(None);
    effects
}

fn start(state: &mut PageState) -> Vec<Effect> {
    if state.in_flight().is_some() {
        state.set_notice(Some(PageError::Validation(format!(
            "A {} task is already in progress",
            state.operation()
        ))));
        return Vec::new();
    }
    let Some(source) = state.selection().cloned() else {
        state.set_notice(Some(PageError::Validation(format!(
            "Please select a PDF file before starting {}",
            state.operation()
        ))));
        return Vec::new();
    };

    let mut effects = Vec::new();
    if let Some(handle) = state.result().and_then(TaskResult::handle) {
        effects.push(Effect::Release { handle });
    }

    let operation = state.operation();
    let params = (operation == Operation::Extraction).then(|| state.params());
    let ticket = state.next_ticket();
    state.set_notice(None);
    state.set_phase(Phase::Submitting { ticket });
    effects.push(Effect::Submit {
        ticket,
        request: SubmitRequest {
            operation,
            source,
            params,
        },
    });
    effects
}

fn download(state: &mut PageState) -> Vec<Effect> {
    let effect = match state.result() {
        Some(TaskResult::Binary(result)) => Effect::SaveResource {
            handle: result.handle,
            filename: result.filename.clone(),
        },
        Some(TaskResult::Structured(fields)) => Effect::SaveJson {
            filename: EXTRACTION_JSON_FILENAME.to_string(),
            contents: fields.to_json_pretty(),
        },
        None => {
            state.set_notice(Some(PageError::Validation(
                "There is no result to download yet".to_string(),
            )));
            return Vec::new();
        }
    };
    vec![effect]
}
