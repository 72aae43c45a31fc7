use serde::Deserialize;

use crate::error::WorkbenchError;
use crate::filter::ColorMode;
use crate::model::{CropRect, NumberingConfig, PageId, RotateDirection, StampPosition, WorkspaceState};
use crate::workspace::ExportMode;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

/// One batch session: upload `inputs`, replay `actions`, export to `output`.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub inputs: Vec<String>,
    pub output: String,
    #[serde(default)]
    pub mode: ExportMode,
    #[serde(default)]
    pub actions: Vec<Action>,
    pub numbering: Option<NumberingConfig>,
    pub raster_scale: Option<f32>,
    pub raster_quality: Option<u8>,
    pub compress_streams: Option<bool>,
    pub archive_compression: Option<bool>,
}

/// Workspace actions, tagged by `op`. Page numbers are 1-based positions in
/// the sequence as it stands when the action runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Rotate {
        pages: PageSelector,
        direction: RotateDirection,
    },
    Crop {
        pages: PageSelector,
        rect: Option<CropRect>,
    },
    ColorMode {
        pages: PageSelector,
        mode: ColorMode,
    },
    Watermark {
        pages: PageSelector,
        #[serde(flatten)]
        stamp: WatermarkSpec,
    },
    RemoveWatermark {
        pages: PageSelector,
    },
    Delete {
        pages: PageSelector,
    },
    Duplicate {
        pages: PageSelector,
    },
    Reorder {
        from: usize,
        to: usize,
    },
    AddBlank {
        at: Option<usize>,
    },
    Select {
        pages: PageSelector,
    },
    Numbering(NumberingConfig),
    Undo,
    Redo,
}

/// Watermark as written in a job file: exactly one of `text` or `image`.
#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkSpec {
    pub text: Option<String>,
    /// Image path, relative to the job file.
    pub image: Option<String>,
    pub opacity: Option<f64>,
    pub rotation: Option<f64>,
    pub scale: Option<f64>,
    pub position: Option<StampPosition>,
    pub font_size: Option<f64>,
    pub color: Option<[f64; 3]>,
}

/// Which pages an action targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelector {
    All,
    /// 1-based positions, sorted and deduplicated.
    Positions(Vec<u32>),
}

impl PageSelector {
    /// Ids of the selected pages in `state`.
    pub fn resolve(&self, state: &WorkspaceState) -> crate::error::Result<Vec<PageId>> {
        let pages = state.pages.pages();
        match self {
            PageSelector::All => Ok(pages.iter().map(|p| p.id).collect()),
            PageSelector::Positions(positions) => positions
                .iter()
                .map(|&n| {
                    let index = (n as usize).wrapping_sub(1);
                    pages
                        .get(index)
                        .map(|p| p.id)
                        .ok_or(WorkbenchError::IndexOutOfRange {
                            index,
                            len: pages.len(),
                        })
                })
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for PageSelector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => parse_page_selector(&n.to_string()),
            Raw::Text(s) => parse_page_selector(&s),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// Parses `"all"` or a page range string.
pub fn parse_page_selector(s: &str) -> crate::error::Result<PageSelector> {
    if s.trim().eq_ignore_ascii_case("all") {
        return Ok(PageSelector::All);
    }
    parse_page_range(s).map(PageSelector::Positions)
}

/// Parses a page range string into page numbers.
///
/// Forms:
/// - single page: `"5"`
/// - range: `"5-10"` (5, 6, 7, 8, 9, 10)
/// - mixed, comma separated: `"1, 3, 5-10, 15"`
///
/// The result is sorted and deduplicated. Page 0 is rejected.
pub fn parse_page_range(s: &str) -> crate::error::Result<Vec<u32>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(WorkbenchError::config("Page range cannot be empty"));
    }

    let mut pages = Vec::new();

    for part in trimmed.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start_str, end_str)) = part.split_once('-') {
            let start: u32 = start_str.trim().parse().map_err(|_| {
                WorkbenchError::config(format!("Invalid page number in range: '{start_str}'"))
            })?;
            let end: u32 = end_str.trim().parse().map_err(|_| {
                WorkbenchError::config(format!("Invalid page number in range: '{end_str}'"))
            })?;

            if start > end {
                return Err(WorkbenchError::config(format!(
                    "Invalid page range: start ({start}) > end ({end})"
                )));
            }

            pages.extend(start..=end);
        } else {
            let page: u32 = part
                .parse()
                .map_err(|_| WorkbenchError::config(format!("Invalid page number: '{part}'")))?;
            pages.push(page);
        }
    }

    if pages.is_empty() {
        return Err(WorkbenchError::config("Page range resolved to empty set"));
    }
    if pages.contains(&0) {
        return Err(WorkbenchError::config("Page numbers start at 1"));
    }

    pages.sort();
    pages.dedup();
    Ok(pages)
}
