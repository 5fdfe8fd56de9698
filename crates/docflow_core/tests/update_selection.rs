use std::sync::Once;

use docflow_core::{
    update, BinaryResult, ControllerStatus, Effect, FileSelection, Msg, Operation, PageState,
    ResourceHandle, TaskId, TaskResult, UploadedFile, PDF_MIME,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn upload(name: &str, handle: u64) -> Msg {
    Msg::FileUploaded(UploadedFile {
        name: name.to_string(),
        size: 1024,
        preview: ResourceHandle::new(handle),
    })
}

#[test]
fn selecting_a_sample_sets_file_selected() {
    init_logging();
    let state = PageState::new(Operation::Extraction);
    let (mut state, effects) = update(state, Msg::SampleSelected("TTG-970.pdf".into()));

    assert!(effects.is_empty());
    assert_eq!(state.status(), ControllerStatus::FileSelected);
    let view = state.view();
    assert_eq!(view.selected_file.as_deref(), Some("TTG-970.pdf"));
    assert!(view.can_start);
    assert!(view.preview.is_none());
    assert!(state.consume_dirty());
}

#[test]
fn unknown_sample_clears_the_selection() {
    init_logging();
    let state = PageState::new(Operation::Conversion);
    let (state, _) = update(state, Msg::SampleSelected("TTG-970.pdf".into()));
    let (state, effects) = update(state, Msg::SampleSelected("does-not-exist.pdf".into()));

    assert!(effects.is_empty());
    assert!(state.selection().is_none());
    assert_eq!(state.status(), ControllerStatus::Idle);
}

#[test]
fn upload_replaces_sample_and_keeps_preview() {
    init_logging();
    let state = PageState::new(Operation::TextLayer);
    let (state, _) = update(state, Msg::SampleSelected("TTG-970.pdf".into()));
    let (state, effects) = update(state, upload("scan.pdf", 7));

    assert!(effects.is_empty());
    assert!(matches!(state.selection(), Some(FileSelection::Upload(_))));
    assert_eq!(state.view().preview, Some(ResourceHandle::new(7)));
}

#[test]
fn selection_change_releases_previous_preview() {
    init_logging();
    let state = PageState::new(Operation::TextLayer);
    let (state, _) = update(state, upload("first.pdf", 1));
    let (state, effects) = update(state, upload("second.pdf", 2));

    assert_eq!(
        effects,
        vec![Effect::Release {
            handle: ResourceHandle::new(1)
        }]
    );
    assert_eq!(state.held_resources(), vec![ResourceHandle::new(2)]);

    let (state, effects) = update(state, Msg::SampleSelected("Budget Report Q3.pdf".into()));
    assert_eq!(
        effects,
        vec![Effect::Release {
            handle: ResourceHandle::new(2)
        }]
    );
    assert!(state.held_resources().is_empty());
}

/// A text-layer page that finished with a stored PDF under `handle`.
fn succeeded_with_result(handle: u64) -> PageState {
    let state = PageState::new(Operation::TextLayer);
    let (state, _) = update(state, Msg::SampleSelected("TTG-970.pdf".into()));
    let (state, _) = update(state, Msg::StartClicked);
    let (state, _) = update(
        state,
        Msg::TaskSubmitted {
            ticket: 1,
            task_id: TaskId::new("t-1"),
        },
    );
    let (state, _) = update(
        state,
        Msg::TaskSucceeded {
            ticket: 1,
            result: TaskResult::Binary(BinaryResult {
                handle: ResourceHandle::new(handle),
                filename: "TTG-970.pdf".into(),
                mime: PDF_MIME.into(),
                size: 64,
            }),
        },
    );
    assert_eq!(state.status(), ControllerStatus::Succeeded);
    state
}

#[test]
fn any_selection_change_releases_the_previous_result() {
    init_logging();
    let release = vec![Effect::Release {
        handle: ResourceHandle::new(9),
    }];

    for msg in [
        Msg::SampleSelected("Budget Report Q3.pdf".into()),
        upload("other.pdf", 10),
        Msg::ClearClicked,
    ] {
        let (state, effects) = update(succeeded_with_result(9), msg.clone());
        assert_eq!(effects, release, "after {msg:?}");
        assert!(state.result().is_none());
        assert!(state.error().is_none());
        assert!(!state.held_resources().contains(&ResourceHandle::new(9)));
    }
}

#[test]
fn clear_releases_everything_and_returns_to_idle() {
    init_logging();
    let state = PageState::new(Operation::Conversion);
    let (state, _) = update(state, upload("scan.pdf", 3));
    let (state, effects) = update(state, Msg::ClearClicked);

    assert_eq!(
        effects,
        vec![Effect::Release {
            handle: ResourceHandle::new(3)
        }]
    );
    assert_eq!(state.status(), ControllerStatus::Idle);
    assert!(state.held_resources().is_empty());
    assert!(state.view().error.is_none());
}

#[test]
fn threshold_is_clamped_and_nan_is_ignored() {
    init_logging();
    let state = PageState::new(Operation::Extraction);
    assert_eq!(state.params().threshold, 0.5);
    assert!(state.params().use_corrector);

    let (state, _) = update(state, Msg::ThresholdChanged(1.7));
    assert_eq!(state.params().threshold, 1.0);
    let (state, _) = update(state, Msg::ThresholdChanged(-0.2));
    assert_eq!(state.params().threshold, 0.0);
    let (state, _) = update(state, Msg::ThresholdChanged(0.3));
    let (state, _) = update(state, Msg::ThresholdChanged(f64::NAN));
    assert_eq!(state.params().threshold, 0.3);

    let (state, _) = update(state, Msg::CorrectorToggled(false));
    assert!(!state.params().use_corrector);
}
