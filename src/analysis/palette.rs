//! Line colours and legend entries.

use crate::analysis::ViewState;
use crate::models::GroupSet;
use serde::Serialize;

/// Brand colours for well-known chains.
const KNOWN_COLORS: &[(&str, &str)] = &[
    ("Bitcoin", "#F7931A"),
    ("Ethereum", "#627EEA"),
    ("Solana", "#14F195"),
    ("BNB", "#2b9627"),
    ("Ronin", "#a841f2"),
    ("TON", "#9ebd04"),
    ("Tron", "#FF060A"),
    ("Polygon", "#8247E5"),
];

/// Fallback palette, cycled by first-seen index.
const FALLBACK_COLORS: &[&str] = &[
    "#8884d8", "#82ca9d", "#ffc658", "#ff7c7c", "#a28dd8", "#6dd8d0", "#ff9f40", "#c084fc",
    "#fb923c", "#34d399", "#60a5fa", "#f472b6",
];

const STROKE_WIDTH: u8 = 2;
const HOVERED_STROKE_WIDTH: u8 = 4;
const DIMMED_OPACITY: f32 = 0.2;

/// Colour of a group given its first-seen index.
pub fn color_for(group: &str, index: usize) -> &'static str {
    KNOWN_COLORS
        .iter()
        .find(|(name, _)| *name == group)
        .map(|(_, color)| *color)
        .unwrap_or(FALLBACK_COLORS[index % FALLBACK_COLORS.len()])
}

/// Line styling hint derived from hover focus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineEmphasis {
    pub stroke_width: u8,
    pub opacity: f32,
}

/// One legend item as the renderer shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub group: String,
    pub color: &'static str,
    pub hidden: bool,
    pub emphasis: LineEmphasis,
}

/// Build legend entries in group order.
pub fn legend(groups: &GroupSet, view: &ViewState) -> Vec<LegendEntry> {
    let hovered = view.hovered();

    groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let is_hovered = hovered == Some(group);
            let emphasis = LineEmphasis {
                stroke_width: if is_hovered {
                    HOVERED_STROKE_WIDTH
                } else {
                    STROKE_WIDTH
                },
                opacity: if hovered.is_some() && !is_hovered {
                    DIMMED_OPACITY
                } else {
                    1.0
                },
            };

            LegendEntry {
                group: group.to_string(),
                color: color_for(group, index),
                hidden: view.is_hidden(group),
                emphasis,
            }
        })
        .collect()
}
