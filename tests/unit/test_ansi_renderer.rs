//! Unit tests for the streaming ANSI renderer

use scanpane::ansi::{strip_ansi, AnsiColor, AnsiRenderer, SgrState, StyledRun};
use scanpane::terminal::{OutputPane, RunBuffer};

fn text_of(runs: &[StyledRun]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

#[cfg(test)]
mod renderer_tests {
    use super::*;

    #[test]
    fn test_plain_text_is_one_default_run() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text("Hello, World!", false);

        assert_eq!(runs, vec![StyledRun::plain("Hello, World!")]);
    }

    #[test]
    fn test_style_persists_across_calls() {
        let mut renderer = AnsiRenderer::new();
        assert!(renderer.append_text("\x1b[31m", false).is_empty());

        let runs = renderer.append_text("red text", false);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "red text");
        assert_eq!(runs[0].foreground, Some(AnsiColor::Red));
    }

    #[test]
    fn test_sequence_split_across_calls() {
        let mut renderer = AnsiRenderer::new();
        let first = renderer.append_text("\x1b[3", false);
        assert!(first.is_empty());

        let runs = renderer.append_text("1mhello", false);
        assert_eq!(text_of(&runs), "hello");
        assert_eq!(runs[0].foreground, Some(AnsiColor::Red));
    }

    #[test]
    fn test_sequence_split_after_escape_byte() {
        let mut renderer = AnsiRenderer::new();
        let first = renderer.append_text("before\x1b", false);
        assert_eq!(text_of(&first), "before");

        let runs = renderer.append_text("[32mafter", false);
        assert_eq!(text_of(&runs), "after");
        assert_eq!(runs[0].foreground, Some(AnsiColor::Green));
    }

    #[test]
    fn test_reset_returns_to_defaults() {
        let mut renderer = AnsiRenderer::new();
        renderer.append_text("\x1b[1;3;4;35;44m", false);
        assert!(!renderer.state().is_default());

        let runs = renderer.append_text("\x1b[0mplain", false);
        assert!(renderer.state().is_default());
        assert_eq!(runs, vec![StyledRun::plain("plain")]);
    }

    #[test]
    fn test_empty_sgr_is_reset() {
        let mut renderer = AnsiRenderer::new();
        renderer.append_text("\x1b[1m", false);
        renderer.append_text("\x1b[m", false);
        assert!(renderer.state().is_default());
    }

    #[test]
    fn test_multi_param_sequence() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text("\x1b[1;31mBOLD RED\x1b[0m", false);

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "BOLD RED");
        assert!(runs[0].bold);
        assert_eq!(runs[0].foreground, Some(AnsiColor::Red));
    }

    #[test]
    fn test_runs_split_at_style_changes() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text("[\x1b[34mINF\x1b[0m] Using template", false);

        assert_eq!(text_of(&runs), "[INF] Using template");
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].foreground, None);
        assert_eq!(runs[1].foreground, Some(AnsiColor::Blue));
        assert_eq!(runs[2].foreground, None);
    }

    #[test]
    fn test_bright_and_extended_colors() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text(
            "\x1b[92ma\x1b[38;5;208mb\x1b[48;2;10;20;30mc\x1b[38:2::1:2:3md",
            false,
        );

        assert_eq!(runs.len(), 4);
        assert_eq!(runs[0].foreground, Some(AnsiColor::BrightGreen));
        assert_eq!(runs[1].foreground, Some(AnsiColor::Indexed(208)));
        assert_eq!(runs[2].background, Some(AnsiColor::Rgb(10, 20, 30)));
        assert_eq!(runs[3].foreground, Some(AnsiColor::Rgb(1, 2, 3)));
        // Extended color arguments are not attributes
        assert!(!runs[1].bold && !runs[1].underline && !runs[1].italic);
    }

    #[test]
    fn test_attribute_off_codes() {
        let mut renderer = AnsiRenderer::new();
        renderer.append_text("\x1b[1;3;4m", false);
        renderer.append_text("\x1b[22;23;24m", false);
        assert_eq!(renderer.state(), SgrState::default());
    }

    #[test]
    fn test_unknown_codes_are_ignored() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text("\x1b[5;31mblink\x1b[2Kx", false);

        assert_eq!(text_of(&runs), "blinkx");
        assert_eq!(runs[0].foreground, Some(AnsiColor::Red));
        assert!(!runs[0].bold);
    }

    #[test]
    fn test_newlines_are_text() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text("a\tb\nc\n", false);
        assert_eq!(text_of(&runs), "a\tb\nc\n");
    }

    #[test]
    fn test_unterminated_osc_ends_at_newline() {
        let mut renderer = AnsiRenderer::new();
        let mut text = String::new();
        for chunk in ["\x1b]0;title\n", "[INF] line two\n", "line three\n"] {
            text.push_str(&text_of(&renderer.append_text(chunk, false)));
        }
        assert_eq!(text, "\n[INF] line two\nline three\n");
    }

    #[test]
    fn test_unterminated_dcs_ends_at_newline() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text("\x1bPq#0;2;0\n\x1b[31mafter\n", false);

        assert_eq!(text_of(&runs), "\nafter\n");
        assert_eq!(runs[1].foreground, Some(AnsiColor::Red));
    }

    #[test]
    fn test_osc_split_across_calls_still_terminates() {
        let mut renderer = AnsiRenderer::new();
        assert!(renderer.append_text("\x1b]0;ti", false).is_empty());
        let runs = renderer.append_text("tle\x07visible", false);
        assert_eq!(text_of(&runs), "visible");
    }

    #[test]
    fn test_style_survives_aborted_string() {
        let mut renderer = AnsiRenderer::new();
        renderer.append_text("\x1b[32m\x1b]8;;http://x\n", false);
        let runs = renderer.append_text("green\n", false);
        assert_eq!(runs[0].foreground, Some(AnsiColor::Green));
    }

    #[test]
    fn test_non_sgr_escapes_are_removed() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text("\x1b]0;title\x07x\x1b(By", false);
        assert_eq!(text_of(&runs), "xy");
    }
}

#[cfg(test)]
mod plain_mode_tests {
    use super::*;

    #[test]
    fn test_plain_mode_strips_and_ignores_style() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text("\x1b[1;31mBOLD RED\x1b[0m rest", true);

        assert_eq!(text_of(&runs), "BOLD RED rest");
        assert!(runs.iter().all(|run| run.style().is_default()));
        assert!(renderer.state().is_default());
    }

    #[test]
    fn test_plain_mode_handles_split_sequences() {
        let mut renderer = AnsiRenderer::new();
        let mut text = text_of(&renderer.append_text("x\x1b[3", true));
        text.push_str(&text_of(&renderer.append_text("3my", true)));
        assert_eq!(text, "xy");
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[32m[INF]\x1b[0m done\n"), "[INF] done\n");
        assert_eq!(strip_ansi("no escapes"), "no escapes");
    }
}

#[cfg(test)]
mod output_pane_tests {
    use super::*;

    #[test]
    fn test_clear_resets_renderer_state() {
        let mut pane = OutputPane::new(RunBuffer::new());
        pane.append_text("\x1b[31mred", false);
        assert_eq!(pane.surface().len(), 1);

        pane.clear();
        assert!(pane.surface().is_empty());

        pane.append_text("after", false);
        assert_eq!(pane.surface().runs(), &[StyledRun::plain("after")]);
    }

    #[test]
    fn test_styled_run_reencodes() {
        let mut renderer = AnsiRenderer::new();
        let runs = renderer.append_text("\x1b[1;31mhit\x1b[0m", false);
        assert_eq!(runs[0].to_ansi_string(), "\x1b[1;31mhit\x1b[0m");
        assert_eq!(StyledRun::plain("x").to_ansi_string(), "x");
    }
}
