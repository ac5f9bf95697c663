//! REST API implementation using rouille.
//!
//! # Key types
//!
//! - [`ApiServer`] - HTTP server runner, spawns a background thread
//! - [`SharedApiState`] - thread-safe snapshots updated by the stage thread
//! - [`publish`] - called by the stage after each tick to refresh snapshots
//!
//! # Thread safety
//!
//! - `SharedApiState` uses `RwLock` per field - the stage writes, HTTP
//!   handlers read
//! - `Command` values travel over `mpsc::Sender` - thread-safe, non-blocking
//! - CORS headers added to all responses for browser access

use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, mpsc};
use std::thread;
use uuid::Uuid;

use crate::core::command::Command;
use crate::core::registry::IdAllocator;
use crate::entities::track::TrackInfo;
use crate::entities::viewport::Viewport;

/// Shared state readable by API handlers (updated by the stage thread)
pub struct SharedApiState {
    pub videos: RwLock<Vec<TrackInfo>>,
    pub viewport: RwLock<Viewport>,
}

impl SharedApiState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            videos: RwLock::new(Vec::new()),
            viewport: RwLock::new(viewport),
        }
    }
}

/// Refresh the published snapshots. Called by the stage after each tick.
pub fn publish(state: &SharedApiState, videos: Vec<TrackInfo>, viewport: Viewport) {
    *state.videos.write().expect("lock") = videos;
    *state.viewport.write().expect("lock") = viewport;
}

/// Full status response
#[derive(Debug, Clone, Serialize)]
struct StatusResponse {
    videos: Vec<TrackInfo>,
    viewport: Viewport,
}

/// Request body for adding videos
#[derive(Debug, Deserialize)]
struct AddRequest {
    path: PathBuf,
    #[serde(default)]
    name: String,
}

/// Request body for swapping a track's source
#[derive(Debug, Deserialize)]
struct SwapRequest {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PositionRequest {
    x: f32,
    y: f32,
}

#[derive(Debug, Deserialize)]
struct ScaleRequest {
    sx: f32,
    sy: f32,
}

#[derive(Debug, Deserialize)]
struct RotationRequest {
    degrees: f32,
}

#[derive(Debug, Deserialize)]
struct ResizeRequest {
    width: u32,
    height: u32,
}

/// Generic API response
#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        Self { success: true, message: None, error: None }
    }

    fn ok_msg(msg: &str) -> Self {
        Self { success: true, message: Some(msg.to_string()), error: None }
    }

    fn err(msg: &str) -> Self {
        Self { success: false, message: None, error: Some(msg.to_string()) }
    }
}

/// Response for a successful add: carries the generated track id
#[derive(Serialize)]
struct AddResponse {
    success: bool,
    id: Uuid,
}

/// Minimal built-in control page (the real UI is whatever the installer
/// points at this API)
const CONTROL_PAGE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>vitrine</title></head>
<body style="background:#111;color:#eee;font-family:sans-serif">
<h1>vitrine control</h1>
<p>API root: <code>/api</code>. Try <a href="/api/status" style="color:#8cf">/api/status</a>.</p>
</body></html>"#;

/// REST API server
pub struct ApiServer {
    port: u16,
    state: Arc<SharedApiState>,
    ids: Arc<IdAllocator>,
    command_tx: mpsc::Sender<Command>,
}

impl ApiServer {
    /// Start the API server in a background thread.
    /// Returns the command receiver for the stage thread to drain.
    pub fn start(
        port: u16,
        state: Arc<SharedApiState>,
        ids: Arc<IdAllocator>,
    ) -> mpsc::Receiver<Command> {
        let (tx, rx) = mpsc::channel();

        let server = ApiServer {
            port,
            state,
            ids,
            command_tx: tx,
        };

        thread::spawn(move || {
            server.run();
        });

        rx
    }

    fn run(self) {
        let addr = format!("0.0.0.0:{}", self.port);
        log::info!("API server starting on http://{}", addr);

        let state = self.state;
        let ids = self.ids;
        let tx = self.command_tx;

        rouille::start_server(&addr, move |request| {
            Self::handle_request(request, &state, &ids, &tx)
        });
    }

    fn handle_request(
        request: &Request,
        state: &Arc<SharedApiState>,
        ids: &Arc<IdAllocator>,
        tx: &mpsc::Sender<Command>,
    ) -> Response {
        // Handle preflight
        if request.method() == "OPTIONS" {
            return Response::empty_204()
                .with_additional_header("Access-Control-Allow-Origin", "*")
                .with_additional_header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
                .with_additional_header("Access-Control-Allow-Headers", "Content-Type");
        }

        // Per-track routes carry the id as a path segment; router! doesn't
        // capture typed params well, so parse them manually (same approach
        // the rest of the API family takes)
        let path = request.url();
        if let Some(rest) = path.strip_prefix("/api/videos/") {
            let response = Self::handle_track_route(request, rest, ids, tx);
            return response.with_additional_header("Access-Control-Allow-Origin", "*");
        }

        let response = rouille::router!(request,
            (GET) ["/"] => {
                Response::html(CONTROL_PAGE)
            },

            // Status endpoints
            (GET) ["/api/health"] => {
                Response::json(&ApiResponse::ok_msg("vitrine API server"))
            },
            (GET) ["/api/status"] => {
                Self::get_status(state)
            },
            (GET) ["/api/videos"] => {
                let videos = state.videos.read().expect("lock").clone();
                Response::json(&videos)
            },
            (GET) ["/api/viewport"] => {
                let viewport = *state.viewport.read().expect("lock");
                Response::json(&viewport)
            },

            // Structural mutations
            (POST) ["/api/videos"] => {
                Self::handle_add(request, ids, tx)
            },
            (POST) ["/api/viewport"] => {
                Self::handle_resize(request, tx)
            },

            // Fallback
            _ => {
                Response::json(&ApiResponse::err("Not found")).with_status_code(404)
            }
        );

        // Add CORS headers to response
        response.with_additional_header("Access-Control-Allow-Origin", "*")
    }

    /// Routes of the form `/api/videos/{id}` and `/api/videos/{id}/{action}`
    fn handle_track_route(
        request: &Request,
        rest: &str,
        ids: &Arc<IdAllocator>,
        tx: &mpsc::Sender<Command>,
    ) -> Response {
        let (id_str, action) = match rest.split_once('/') {
            Some((id, action)) => (id, Some(action)),
            None => (rest, None),
        };

        let Ok(id) = id_str.parse::<Uuid>() else {
            return Response::json(&ApiResponse::err("Invalid track id")).with_status_code(400);
        };

        // Synchronous Not-Found against the allocator, not the published
        // snapshot: an id is valid from the moment `add` hands it out, even
        // before the first stage tick publishes the track, and dies on remove
        if !ids.is_active(id) {
            return Response::json(&ApiResponse::err(&format!("no track with id {id}")))
                .with_status_code(404);
        }

        match (request.method(), action) {
            ("DELETE", None) => Self::send_command(tx, Command::RemoveVideo { id }),
            ("POST", Some("position")) => {
                match rouille::input::json_input::<PositionRequest>(request) {
                    Ok(req) => Self::send_command(tx, Command::SetPosition { id, x: req.x, y: req.y }),
                    Err(e) => Self::bad_json(e),
                }
            }
            ("POST", Some("scale")) => {
                match rouille::input::json_input::<ScaleRequest>(request) {
                    // Same guard the registry enforces, so the caller never
                    // sees success for a value the stage will drop
                    Ok(req)
                        if req.sx > 0.0
                            && req.sy > 0.0
                            && req.sx.is_finite()
                            && req.sy.is_finite() =>
                    {
                        Self::send_command(tx, Command::SetScale { id, sx: req.sx, sy: req.sy })
                    }
                    Ok(_) => Response::json(&ApiResponse::err(
                        "Scale factors must be positive and finite",
                    ))
                    .with_status_code(400),
                    Err(e) => Self::bad_json(e),
                }
            }
            ("POST", Some("rotation")) => {
                match rouille::input::json_input::<RotationRequest>(request) {
                    Ok(req) => Self::send_command(tx, Command::SetRotation { id, degrees: req.degrees }),
                    Err(e) => Self::bad_json(e),
                }
            }
            ("POST", Some("swap")) => {
                match rouille::input::json_input::<SwapRequest>(request) {
                    Ok(req) => {
                        if !Path::new(&req.path).is_file() {
                            return Response::json(&ApiResponse::err(&format!(
                                "source does not exist: {}",
                                req.path.display()
                            )))
                            .with_status_code(400);
                        }
                        Self::send_command(tx, Command::SwapVideo { id, path: req.path })
                    }
                    Err(e) => Self::bad_json(e),
                }
            }
            _ => Response::json(&ApiResponse::err("Not found")).with_status_code(404),
        }
    }

    fn get_status(state: &Arc<SharedApiState>) -> Response {
        let videos = state.videos.read().expect("lock").clone();
        let viewport = *state.viewport.read().expect("lock");
        Response::json(&StatusResponse { videos, viewport })
    }

    fn handle_add(
        request: &Request,
        ids: &Arc<IdAllocator>,
        tx: &mpsc::Sender<Command>,
    ) -> Response {
        match rouille::input::json_input::<AddRequest>(request) {
            Ok(req) => {
                // Invalid Source is rejected before touching the registry
                if !req.path.is_file() {
                    return Response::json(&ApiResponse::err(&format!(
                        "source does not exist: {}",
                        req.path.display()
                    )))
                    .with_status_code(400);
                }
                // Id allocation is synchronous and touches no render state,
                // so the response can carry the id immediately
                let id = ids.allocate();
                let name = if req.name.is_empty() {
                    req.path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "video".to_string())
                } else {
                    req.name
                };
                match tx.send(Command::AddVideo { id, path: req.path, name }) {
                    Ok(_) => Response::json(&AddResponse { success: true, id }),
                    Err(e) => Response::json(&ApiResponse::err(&format!(
                        "Failed to send command: {e}"
                    )))
                    .with_status_code(500),
                }
            }
            Err(e) => Self::bad_json(e),
        }
    }

    fn handle_resize(request: &Request, tx: &mpsc::Sender<Command>) -> Response {
        match rouille::input::json_input::<ResizeRequest>(request) {
            Ok(req) if req.width > 0 && req.height > 0 => Self::send_command(
                tx,
                Command::Resize { width: req.width, height: req.height },
            ),
            Ok(_) => Response::json(&ApiResponse::err("Viewport dimensions must be positive"))
                .with_status_code(400),
            Err(e) => Self::bad_json(e),
        }
    }

    fn send_command(tx: &mpsc::Sender<Command>, cmd: Command) -> Response {
        match tx.send(cmd) {
            Ok(_) => Response::json(&ApiResponse::ok()),
            Err(e) => Response::json(&ApiResponse::err(&format!("Failed to send command: {e}")))
                .with_status_code(500),
        }
    }

    fn bad_json(e: rouille::input::json::JsonError) -> Response {
        Response::json(&ApiResponse::err(&format!("Invalid JSON: {e}"))).with_status_code(400)
    }
}
