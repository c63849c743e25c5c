//! Property-based tests for the ANSI renderer
//!
//! Output arrives in arbitrary fragments, so rendering must not depend on
//! where the input was cut.

use proptest::prelude::*;
use scanpane::ansi::{AnsiRenderer, SgrState, StyledRun};

/// Text or a CSI sequence
#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Csi(String),
}

fn piece() -> impl Strategy<Value = Piece> {
    prop_oneof![
        "[a-zA-Z0-9 .:\\[\\]\n]{0,20}".prop_map(Piece::Text),
        (
            prop::collection::vec(0u16..300, 0..6),
            prop::sample::select(vec!['m', 'm', 'm', 'K', 'H', 'J']),
        )
            .prop_map(|(params, action)| {
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                Piece::Csi(format!("\x1b[{}{}", params.join(";"), action))
            }),
    ]
}

fn assemble(pieces: &[Piece]) -> (String, String) {
    let mut raw = String::new();
    let mut visible = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => {
                raw.push_str(text);
                visible.push_str(text);
            }
            Piece::Csi(seq) => raw.push_str(seq),
        }
    }
    (raw, visible)
}

/// Feed `raw` cut at the given byte offsets
fn render_chunked(raw: &str, cuts: &[usize], plain: bool) -> Vec<StyledRun> {
    let mut offsets: Vec<usize> = cuts.iter().map(|c| c % (raw.len() + 1)).collect();
    offsets.sort_unstable();
    offsets.dedup();

    let mut renderer = AnsiRenderer::new();
    let mut runs = Vec::new();
    let mut start = 0;
    for end in offsets.into_iter().chain(std::iter::once(raw.len())) {
        if end < start {
            continue;
        }
        runs.extend(renderer.append_text(&raw[start..end], plain));
        start = end;
    }
    runs
}

/// Each visible character paired with its style
fn styled_chars(runs: &[StyledRun]) -> Vec<(char, SgrState)> {
    runs.iter()
        .flat_map(|run| {
            let style = run.style();
            run.text.chars().map(move |c| (c, style))
        })
        .collect()
}

proptest! {
    #[test]
    fn test_renderer_doesnt_panic_on_random_input(s in "\\PC*") {
        let mut renderer = AnsiRenderer::new();
        let _ = renderer.append_text(&s, false);
        let _ = renderer.append_text(&s, true);
    }

    #[test]
    fn test_plain_mode_removes_exactly_the_sequences(
        pieces in prop::collection::vec(piece(), 0..20),
    ) {
        let (raw, visible) = assemble(&pieces);
        let runs = AnsiRenderer::new().append_text(&raw, true);

        let text: String = runs.iter().map(|r| r.text.as_str()).collect();
        prop_assert_eq!(text, visible);
        prop_assert!(runs.iter().all(|r| r.style().is_default()));
    }

    #[test]
    fn test_chunking_does_not_change_rendering(
        pieces in prop::collection::vec(piece(), 0..20),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let (raw, visible) = assemble(&pieces);

        let whole = AnsiRenderer::new().append_text(&raw, false);
        let chunked = render_chunked(&raw, &cuts, false);

        prop_assert_eq!(styled_chars(&whole), styled_chars(&chunked));
        let text: String = chunked.iter().map(|r| r.text.as_str()).collect();
        prop_assert_eq!(text, visible);
    }

    #[test]
    fn test_runs_are_never_empty(
        pieces in prop::collection::vec(piece(), 0..20),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let (raw, _) = assemble(&pieces);
        let runs = render_chunked(&raw, &cuts, false);
        prop_assert!(runs.iter().all(|r| !r.text.is_empty()));
    }

    #[test]
    fn test_reset_after_anything_restores_defaults(
        pieces in prop::collection::vec(piece(), 0..20),
    ) {
        let (raw, _) = assemble(&pieces);
        let mut renderer = AnsiRenderer::new();
        renderer.append_text(&raw, false);
        renderer.append_text("\x1b[0m", false);
        prop_assert!(renderer.state().is_default());
    }
}
