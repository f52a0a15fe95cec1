#![allow(dead_code)]

use std::sync::Once;

use translator_core::{update, Effect, JobState, JobStatus, Msg, ProgressUpdate};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(translator_logging::initialize_for_tests);
}

pub fn apply(state: JobState, msgs: Vec<Msg>) -> (JobState, Vec<Effect>) {
    msgs.into_iter().fold((state, Vec::new()), |(state, mut all), msg| {
        let (state, effects) = update(state, msg);
        all.extend(effects);
        (state, all)
    })
}

pub fn uploaded(file_id: &str, chapter_count: u32) -> JobState {
    let (state, _) = apply(
        JobState::new(),
        vec![
            Msg::UploadRequested {
                file_name: "book.epub".to_string(),
            },
            Msg::UploadSucceeded {
                file_id: file_id.to_string(),
                file_name: "book.epub".to_string(),
                chapter_count,
            },
        ],
    );
    state
}

pub fn ready_with_model(model: &str) -> JobState {
    let (state, _) = update(uploaded("f1", 12), Msg::ModelSelected(model.to_string()));
    state
}

pub fn translating(job_id: &str) -> JobState {
    let (state, _) = apply(
        ready_with_model("m1"),
        vec![
            Msg::StartRequested,
            Msg::JobStarted {
                job_id: job_id.to_string(),
            },
        ],
    );
    state
}

pub fn frame(job_id: &str, update: ProgressUpdate) -> Msg {
    Msg::ProgressReceived {
        job_id: job_id.to_string(),
        update,
    }
}

pub fn status(status: JobStatus) -> ProgressUpdate {
    ProgressUpdate::status_only(status)
}
