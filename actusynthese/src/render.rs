// Terminal presentation of the request state
use common::Theme;

use crate::llm::{Source, SummaryResult};

/// ANSI styles for one theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    accent: &'static str,
    muted: &'static str,
    error: &'static str,
    reset: &'static str,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            // dark text shades on a light background
            Theme::Light => Palette {
                accent: "\x1b[1;34m",
                muted: "\x1b[90m",
                error: "\x1b[1;31m",
                reset: "\x1b[0m",
            },
            Theme::Dark => Palette {
                accent: "\x1b[1;95m",
                muted: "\x1b[37m",
                error: "\x1b[1;91m",
                reset: "\x1b[0m",
            },
        }
    }

    pub fn plain() -> Self {
        Palette {
            accent: "",
            muted: "",
            error: "",
            reset: "",
        }
    }
}

/// Renders snapshots incrementally: each call prints only what is new.
pub struct Renderer {
    palette: Palette,
    printed: usize,
}

impl Renderer {
    pub fn new(palette: Palette) -> Self {
        Self { palette, printed: 0 }
    }

    pub fn loading_line(&self, topic: Option<&str>) -> String {
        let p = &self.palette;
        match topic {
            Some(topic) => format!(
                "{}Recherche : \"{}\"{}\n{}L'IA consulte plusieurs sources web.{}",
                p.accent, topic, p.reset, p.muted, p.reset
            ),
            None => format!("{}Recherche en cours...{}", p.accent, p.reset),
        }
    }

    /// Text of `snapshot` not yet emitted by this renderer
    pub fn text_delta<'a>(&mut self, snapshot: &'a SummaryResult) -> &'a str {
        let text = snapshot.text.as_str();
        let delta = if self.printed <= text.len() && text.is_char_boundary(self.printed) {
            &text[self.printed..]
        } else {
            text
        };
        self.printed = text.len();
        delta
    }

    pub fn sources_block(&self, sources: &[Source]) -> String {
        if sources.is_empty() {
            return String::new();
        }
        let p = &self.palette;
        let mut out = format!("{}Sources vérifiées{}\n", p.muted, p.reset);
        for source in sources {
            out.push_str(&format!(
                "  • {}{}{} {}({}){}\n",
                p.accent,
                source.title,
                p.reset,
                p.muted,
                host_of(&source.uri),
                p.reset
            ));
        }
        out
    }

    pub fn error_block(&self, message: &str) -> String {
        let p = &self.palette;
        format!(
            "{}Erreur de recherche{}\n{}\n{}Réessayez en relançant une recherche.{}",
            p.error, p.reset, message, p.muted, p.reset
        )
    }
}

/// Host of a citation uri, or the uri itself when it does not parse
fn host_of(uri: &str) -> String {
    url::Url::parse(uri)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| uri.to_string())
}
