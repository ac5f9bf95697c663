//! REST API server for remote control of the wall.
//!
//! # Purpose
//!
//! Lets a phone or browser on the same network reposition, scale, rotate,
//! and swap the videos on the kiosk display. This layer is thin glue: it
//! translates JSON bodies into typed [`Command`](crate::core::command::Command)s
//! and published snapshots back into JSON. It never touches track or
//! registry state directly.
//!
//! # Architecture
//!
//! - **rouille** - sync HTTP server (simpler than async axum/tokio)
//! - **mpsc channel** - commands from HTTP handlers to the stage thread
//! - **SharedApiState** - read-only snapshots updated by the stage thread
//!
//! Synchronous rejections happen here: an unknown track id (never issued,
//! or already removed) or a missing source path gets its error response
//! before anything is sent down the channel. Id validity is checked against
//! the shared allocator rather than the published snapshot, so an id handed
//! out by `add` is usable immediately, before the stage's next tick
//! publishes the track. The stage re-validates on apply, so a race (e.g.
//! remove landing between the check and the apply) degrades to a logged
//! rejection.
//!
//! # Endpoints
//!
//! | Method | Path                        | Description                      |
//! |--------|-----------------------------|----------------------------------|
//! | GET    | `/`                         | Built-in control page            |
//! | GET    | `/api/health`               | Health check                     |
//! | GET    | `/api/status`               | Full status (videos + viewport)  |
//! | GET    | `/api/videos`               | Track snapshot list              |
//! | GET    | `/api/viewport`             | Render surface size              |
//! | POST   | `/api/videos`               | Add a video (JSON body), returns id |
//! | DELETE | `/api/videos/{id}`          | Remove a track                   |
//! | POST   | `/api/videos/{id}/position` | Set normalized position          |
//! | POST   | `/api/videos/{id}/scale`    | Set scale factors                |
//! | POST   | `/api/videos/{id}/rotation` | Set rotation in degrees          |
//! | POST   | `/api/videos/{id}/swap`     | Swap the media source            |
//! | POST   | `/api/viewport`             | Report a render surface resize   |

mod api;

pub use api::{ApiServer, SharedApiState, publish};
