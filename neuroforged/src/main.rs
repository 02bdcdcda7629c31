//! neuroforge daemon - headless render service
//!
//! Owns one orchestrator, drives its frame loop on a tokio timer, records
//! every frame into a display list and serves line-delimited JSON requests
//! (see `neuroforge::protocol`) to any client.
//!
//! Config location:
//! - Linux: ~/.local/share/neuroforge/config.json
//! - Windows: %APPDATA%\neuroforge\config.json
//! - MacOS: ~/Library/Application Support/neuroforge/config.json

use std::sync::Arc;
use std::time::Duration;

use neuroforge::config::Config;
use neuroforge::deps::Dependencies;
use neuroforge::observer::{EngineAdapter, SceneAdapter};
use neuroforge::protocol::{Request, Response, DEFAULT_ADDR};
use neuroforge::scene::{FrameStats, Orchestrator};
use neuroforge::surface::{DisplayList, DrawSurface};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::time;
use tracing::{debug, error, info};

mod error;
mod paths;

use error::DaemonError;
use paths::AppPaths;

const DEFAULT_FPS: u32 = 30;

struct DaemonState {
    scene: Orchestrator,
    surface: DisplayList,
    target_fps: u32,
    last_frame: Option<FrameStats>,
}

impl DaemonState {
    fn new(config: Config) -> Result<Self, DaemonError> {
        Ok(Self {
            scene: Orchestrator::with_system_clock(config, Dependencies::new())?,
            surface: DisplayList::new(960.0, 640.0),
            target_fps: DEFAULT_FPS,
            last_frame: None,
        })
    }

    /// One timer tick of the render loop. A stopped loop draws nothing.
    fn tick(&mut self) {
        let (width, height) = self.surface.size();
        let mut surface = DisplayList::new(width, height);
        if let Some(stats) = self.scene.frame(&mut surface) {
            if stats.sim_steps > 0 {
                debug!("frame {}: generation {} best {:.2}", stats.frame, stats.generation, stats.best_fitness);
            }
            self.surface = surface;
            self.last_frame = Some(stats);
        }
    }

    fn frame_response(&mut self) -> Response {
        // A stopped loop still answers with the current scene.
        if !self.scene.is_running() || self.last_frame.is_none() {
            self.surface.clear();
            self.last_frame = Some(self.scene.render(&mut self.surface));
        }
        let (width, height) = self.surface.size();
        Response::Frame {
            width,
            height,
            stats: self.last_frame.unwrap_or_default(),
            commands: self.surface.commands().to_vec(),
        }
    }

    fn handle_read(&self, request: &Request) -> Option<Response> {
        Some(match request {
            Request::GetState => Response::State(SceneAdapter::new(&self.scene).snapshot()),
            Request::ListModifiers => Response::Modifiers {
                modifiers: EngineAdapter::new(self.scene.engine()).modifiers(),
            },
            Request::HitTest { x, y } => Response::Hit {
                hit: self.scene.hit_test(*x, *y),
            },
            _ => return None,
        })
    }

    fn handle_write(&mut self, request: Request) -> Response {
        match request {
            Request::Start => {
                if self.scene.start() {
                    Response::success("Started")
                } else {
                    Response::success("Already running")
                }
            }
            Request::Stop => {
                if self.scene.stop() {
                    Response::success("Stopped")
                } else {
                    Response::success("Already stopped")
                }
            }
            Request::Step => Response::Genome(self.scene.step()),
            Request::SetModifier { id, active } => {
                if self.scene.set_modifier(id, active) {
                    Response::success(format!(
                        "Modifier {} {} at next tick",
                        id,
                        if active { "enabled" } else { "disabled" }
                    ))
                } else {
                    Response::error(format!("Unknown modifier id {}", id))
                }
            }
            Request::ResetCamera => {
                self.scene.reset_camera();
                Response::success("Camera reset")
            }
            Request::Rotate { dx, dy } => {
                self.scene.rotate(dx, dy);
                Response::success("Queued")
            }
            Request::Pan { dx, dy } => {
                self.scene.pan(dx, dy);
                Response::success("Queued")
            }
            Request::Zoom { delta } => {
                self.scene.zoom(delta);
                Response::success("Queued")
            }
            Request::GetFrame => self.frame_response(),
            Request::SetFramerate { fps } => {
                let clamped = fps.clamp(1, 240);
                self.target_fps = clamped;
                info!("Framerate set to {} FPS", clamped);
                Response::success(format!("Framerate set to {} FPS", clamped))
            }
            read @ (Request::GetState | Request::ListModifiers | Request::HitTest { .. }) => {
                self.handle_read(&read).unwrap_or_else(|| Response::error("unsupported"))
            }
            Request::Shutdown => Response::error("Shutdown is handled by the connection"),
        }
    }
}

async fn write_response(writer: &mut tokio::net::tcp::OwnedWriteHalf, resp: &Response) -> Result<(), DaemonError> {
    writer.write_all(serde_json::to_string(resp)?.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

async fn handle_client(stream: TcpStream, state: Arc<RwLock<DaemonState>>) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let request: Request = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                write_response(&mut writer, &Response::error(format!("Invalid request: {}", e))).await?;
                continue;
            }
        };

        let response = match request {
            Request::Shutdown => {
                info!("Shutdown requested");
                tokio::spawn(async {
                    // Give the response a moment to flush before exiting.
                    time::sleep(Duration::from_millis(50)).await;
                    std::process::exit(0);
                });
                Response::success("Shutting down")
            }
            Request::GetState | Request::ListModifiers | Request::HitTest { .. } => {
                let s = state.read().await;
                s.handle_read(&request).unwrap_or_else(|| Response::error("unsupported"))
            }
            other => {
                let mut s = state.write().await;
                s.handle_write(other)
            }
        };

        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let paths = AppPaths::new()?;
    info!("Data directory: {:?}", paths.data_dir());
    let config = paths::load_config(&paths);

    let addr = std::env::args()
        .skip_while(|a| a != "--addr")
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let state = Arc::new(RwLock::new(DaemonState::new(config)?));

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C: exiting");
            std::process::exit(0);
        }
    });

    let listener = TcpListener::bind(&addr).await?;
    info!("neuroforge daemon listening on {}", addr);

    // Render loop task
    let state_clone = Arc::clone(&state);
    tokio::spawn(async move {
        loop {
            let target_fps = {
                let s = state_clone.read().await;
                s.target_fps
            };
            let frame_millis = (1000 / target_fps.max(1)).max(1) as u64;
            time::sleep(Duration::from_millis(frame_millis)).await;

            let mut s = state_clone.write().await;
            s.tick();
        }
    });

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("Client connected: {}", addr);
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, state_clone).await {
                error!("Client handler error: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neuroforge::config::EngineConfig;
    use neuroforge::interaction::HitTarget;

    fn state() -> DaemonState {
        let config = Config {
            engine: EngineConfig::default().with_population(6, 8).with_seed(2),
            ..Config::default()
        };
        DaemonState::new(config).unwrap()
    }

    #[test]
    fn start_stop_report_transitions() {
        let mut s = state();
        assert_eq!(s.handle_write(Request::Start), Response::success("Started"));
        assert_eq!(s.handle_write(Request::Start), Response::success("Already running"));
        assert_eq!(s.handle_write(Request::Stop), Response::success("Stopped"));
        assert_eq!(s.handle_write(Request::Stop), Response::success("Already stopped"));
    }

    #[test]
    fn step_returns_next_generation() {
        let mut s = state();
        match s.handle_write(Request::Step) {
            Response::Genome(g) => assert_eq!(g.generation, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_modifier_is_an_error() {
        let mut s = state();
        assert!(matches!(
            s.handle_write(Request::SetModifier { id: 999, active: true }),
            Response::Error { .. }
        ));
    }

    #[test]
    fn stopped_daemon_still_renders() {
        let mut s = state();
        match s.handle_write(Request::GetFrame) {
            Response::Frame { commands, stats, .. } => {
                assert!(!commands.is_empty());
                assert!(stats.drawn > 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn hit_test_after_render() {
        let mut s = state();
        s.handle_write(Request::GetFrame);
        let best = s.scene.engine().best().clone();
        let p = neuroforge::projection::project(best.neurons[0].position, s.scene.camera(), &s.scene.viewport());
        match s.handle_read(&Request::HitTest { x: p.x, y: p.y }) {
            Some(Response::Hit { hit: Some(h) }) => assert!(matches!(h.target, HitTarget::Neuron(_))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn framerate_is_clamped() {
        let mut s = state();
        s.handle_write(Request::SetFramerate { fps: 10_000 });
        assert_eq!(s.target_fps, 240);
    }
}
