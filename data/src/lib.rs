pub mod cache;
pub mod color;
pub mod config;
pub mod format;
pub mod interaction;
pub mod log;
pub mod matrix;
pub mod metric;
pub mod raster;
pub mod view;
pub mod viewport;

use std::path::PathBuf;

pub use color::{ColorScheme, RASTERIZATION_LEVEL, SchemeError, build_color_scheme};
pub use config::HeatmapConfig;
pub use interaction::{BrushSelection, Clipboard, ClipboardError, PointerEvent};
pub use matrix::{MatrixError, MetricMatrix};
pub use metric::MetricTag;
pub use raster::{NormalizedBuffer, PixelBuffer, Surface, SurfaceError, composite, normalize};
pub use view::{FetchOutcome, FetchTicket, Fetched, HeatmapHandler, HeatmapView, ViewEvent, ViewState};
pub use viewport::ViewportState;

const APP_DIR: &str = "keyviz";

/// `<user data dir>/keyviz/<path_name>`, falling back to the working directory.
pub fn data_path(path_name: &str) -> PathBuf {
    if let Ok(path) = std::env::var("KEYVIZ_DATA_PATH") {
        return PathBuf::from(path).join(path_name);
    }
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(path_name)
}
