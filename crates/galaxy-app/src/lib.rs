//! Galaxy application: frame driver, window loop, and headless snapshots.

pub mod error;
pub mod frame_driver;
pub mod headless;
pub mod platform;
pub mod scene;
pub mod window;

pub use error::AppError;
pub use frame_driver::{DriverError, FrameClock, FrameDriver, FrameTick, MAX_FRAME_TIME, REFERENCE_RATE};
pub use headless::{SnapshotError, SnapshotSummary, encode_png, render_snapshot, write_snapshot};
pub use platform::{PlatformDirs, PlatformError};
pub use window::{GalaxyApp, run};
