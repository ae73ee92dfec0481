use crate::scale::format_fixed;
use crate::svg::escape;
use serde::Serialize;

/// Opacity target and fade length of a tooltip transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transition {
    pub opacity: f64,
    pub duration_ms: u64,
}

pub const SHOW: Transition = Transition {
    opacity: 0.9,
    duration_ms: 200,
};

pub const HIDE: Transition = Transition {
    opacity: 0.0,
    duration_ms: 500,
};

/// Offset of the tooltip's top-left corner from the pointer.
pub const POINTER_OFFSET: (f64, f64) = (10.0, -28.0);

/// What a hovered feature shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipContent {
    pub zipcode: String,
    pub neighborhood: Option<String>,
    pub label: String,
    pub value: Option<f64>,
}

impl TooltipContent {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Zip Code: {}", self.zipcode)];
        if let Some(name) = &self.neighborhood {
            lines.push(format!("Neighborhood: {}", name));
        }
        let value = self
            .value
            .map(|v| format_fixed(v, 2))
            .unwrap_or_else(|| "N/A".to_string());
        lines.push(format!("{}: {}", self.label, value));
        lines
    }

    /// Lines escaped and joined with `<br/>`, ready for `innerHTML`.
    pub fn html(&self) -> String {
        self.lines()
            .iter()
            .map(|l| escape(l))
            .collect::<Vec<_>>()
            .join("<br/>")
    }
}

/// State of the single floating tooltip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub html: String,
    pub left: f64,
    pub top: f64,
    pub opacity: f64,
}

impl Default for Tooltip {
    fn default() -> Self {
        Self {
            html: String::new(),
            left: 0.0,
            top: 0.0,
            opacity: HIDE.opacity,
        }
    }
}

impl Tooltip {
    /// Fills the tooltip for `content` next to the pointer and fades it in.
    pub fn hover(&mut self, content: &TooltipContent, page_x: f64, page_y: f64) -> Transition {
        self.html = content.html();
        self.left = page_x + POINTER_OFFSET.0;
        self.top = page_y + POINTER_OFFSET.1;
        self.opacity = SHOW.opacity;
        SHOW
    }

    /// Fades out; content and position are left as they were.
    pub fn unhover(&mut self) -> Transition {
        self.opacity = HIDE.opacity;
        HIDE
    }
}
