use translator_core::{JobSnapshot, Locale, Phase};

struct Labels {
    chapter: &'static str,
    chunk: &'static str,
    remaining: &'static str,
    download: &'static str,
    warning: &'static str,
    file: &'static str,
}

const EN: Labels = Labels {
    chapter: "chapter",
    chunk: "chunk",
    remaining: "left",
    download: "download",
    warning: "warning",
    file: "file",
};

const KO: Labels = Labels {
    chapter: "챕터",
    chunk: "청크",
    remaining: "남음",
    download: "다운로드",
    warning: "경고",
    file: "파일",
};

fn labels(locale: Locale) -> &'static Labels {
    match locale {
        Locale::En => &EN,
        Locale::Ko => &KO,
    }
}

pub fn phase_label(phase: Phase, locale: Locale) -> &'static str {
    match (locale, phase) {
        (Locale::En, Phase::Idle) => "Idle",
        (Locale::En, Phase::Uploading) => "Uploading",
        (Locale::En, Phase::Ready) => "Ready",
        (Locale::En, Phase::Parsing) => "Parsing",
        (Locale::En, Phase::Translating) => "Translating",
        (Locale::En, Phase::Rebuilding) => "Rebuilding",
        (Locale::En, Phase::Completed) => "Completed",
        (Locale::En, Phase::Failed) => "Failed",
        (Locale::En, Phase::Cancelled) => "Cancelled",
        (Locale::Ko, Phase::Idle) => "대기",
        (Locale::Ko, Phase::Uploading) => "업로드 중",
        (Locale::Ko, Phase::Ready) => "준비됨",
        (Locale::Ko, Phase::Parsing) => "분석 중",
        (Locale::Ko, Phase::Translating) => "번역 중",
        (Locale::Ko, Phase::Rebuilding) => "재구성 중",
        (Locale::Ko, Phase::Completed) => "완료",
        (Locale::Ko, Phase::Failed) => "실패",
        (Locale::Ko, Phase::Cancelled) => "취소됨",
    }
}

/// One status line for the terminal.
pub fn render_status(view: &JobSnapshot, locale: Locale) -> String {
    let text = labels(locale);
    let mut parts = vec![format!("[{}]", phase_label(view.phase, locale))];

    match view.phase {
        Phase::Idle | Phase::Uploading | Phase::Cancelled => {}
        Phase::Ready => {
            if let Some(name) = &view.file_name {
                parts.push(format!(
                    "{} {} ({} {})",
                    text.file, name, view.chapter_count, text.chapter
                ));
            }
        }
        Phase::Parsing | Phase::Translating | Phase::Rebuilding => {
            let progress = &view.progress;
            parts.push(format!("{:.1}%", progress.percentage));
            if progress.chapter_total > 0 {
                let mut chapter = format!(
                    "{} {}/{}",
                    text.chapter, progress.chapter_current, progress.chapter_total
                );
                if !progress.chapter_title.is_empty() {
                    chapter.push_str(&format!(" \"{}\"", progress.chapter_title));
                }
                parts.push(chapter);
            }
            if progress.chunk_total > 0 {
                parts.push(format!(
                    "{} {}/{}",
                    text.chunk, progress.chunk_current, progress.chunk_total
                ));
            }
            if let Some(eta) = format_eta(progress.estimated_time_remaining) {
                parts.push(format!("~{eta} {}", text.remaining));
            }
        }
        Phase::Completed => {
            if let Some(url) = &view.download_url {
                parts.push(format!("{}: {url}", text.download));
            }
        }
        Phase::Failed => {
            if let Some(error) = &view.error {
                parts.push(error.clone());
            }
        }
    }

    if let Some(warning) = &view.channel_warning {
        parts.push(format!("{}: {warning}", text.warning));
    }
    parts.join(" | ")
}

/// `1h 02m`, `3m 05s` or `42s`. `None` when there is no estimate.
pub fn format_eta(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds < 1.0 {
        return None;
    }
    let total = seconds.round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    Some(if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    })
}
