//! CLI client for the `neuroforged` daemon.
//!
//! Examples:
//!   neuroforge-cli status
//!   neuroforge-cli start
//!   neuroforge-cli modifier 7 on
//!   neuroforge-cli rotate 40 0
//!   neuroforge-cli hit 480 320
//!
//! By default it talks to 127.0.0.1:9877; override with `--addr host:port`.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;
use std::time::Duration;

use neuroforge::observer::SceneSnapshot;
use neuroforge::protocol::{Request, Response, DEFAULT_ADDR};

fn usage() -> ! {
    eprintln!("neuroforge-cli (talks to neuroforged @ {DEFAULT_ADDR} by default)");
    eprintln!("Usage: neuroforge-cli [--addr host:port] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  status                      Show daemon state");
    eprintln!("  start | stop                Control render loop");
    eprintln!("  step                        Run one generation and print the best genome");
    eprintln!("  modifier <id> <on|off>      Toggle a modifier (applies next tick)");
    eprintln!("  modifiers                   List modifiers");
    eprintln!("  rotate <dx> <dy>            Orbit the camera");
    eprintln!("  pan <dx> <dy>               Pan the camera");
    eprintln!("  zoom <delta>                Zoom the camera");
    eprintln!("  reset                       Reset the camera");
    eprintln!("  hit <x> <y>                 Hit-test a screen point");
    eprintln!("  frame                       Dump the last frame as JSON");
    eprintln!("  fps <1-240>                 Set daemon frame rate");
    eprintln!("  shutdown                    Stop the daemon");
    process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut addr = DEFAULT_ADDR.to_string();
    if args.len() >= 2 && args[0] == "--addr" {
        addr = args[1].clone();
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (addr, args)
}

fn send_request(addr: &str, req: &Request) -> Result<Response, String> {
    let mut stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .map_err(|e| format!("set_read_timeout: {e}"))?;
    let mut reader = BufReader::new(stream.try_clone().map_err(|e| format!("clone: {e}"))?);

    let line = serde_json::to_string(req).map_err(|e| format!("serialize: {e}"))?;
    stream
        .write_all(line.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
        .map_err(|e| format!("send: {e}"))?;

    let mut resp_line = String::new();
    reader
        .read_line(&mut resp_line)
        .map_err(|e| format!("recv: {e}"))?;
    serde_json::from_str(&resp_line).map_err(|e| format!("parse response: {e}"))
}

fn print_state(s: SceneSnapshot) {
    let e = &s.engine;
    println!(
        "running={} frames={} tick={} gen={} best={:.2} (uid {}) attention={:.3}",
        s.running, s.frames, e.tick, e.generation, e.best_fitness, e.best_uid, e.sustained_attention,
    );
    println!(
        "genome: neurons={} connections={} population={} modifiers={:?}",
        e.best_neurons, e.best_connections, e.population, e.active_modifiers,
    );
    println!(
        "camera: pos=({:.1}, {:.1}, {:.1}) rot=({:.3}, {:.3}, {:.3}) meshes={} last_frame drawn={} culled={}",
        s.camera.position.x,
        s.camera.position.y,
        s.camera.position.z,
        s.camera.rotation.x,
        s.camera.rotation.y,
        s.camera.rotation.z,
        s.cached_meshes,
        s.last_frame.drawn,
        s.last_frame.culled,
    );
}

fn num<T: std::str::FromStr>(args: &[String], i: usize, what: &str) -> T {
    if args.len() <= i {
        usage();
    }
    args[i].parse().unwrap_or_else(|_| {
        eprintln!("{what} must be a number");
        process::exit(1);
    })
}

fn main() {
    let (addr, args) = parse_args();
    let cmd = &args[0];

    let req = match cmd.as_str() {
        "status" => Request::GetState,
        "start" => Request::Start,
        "stop" => Request::Stop,
        "step" => Request::Step,
        "modifier" => {
            let id = num(&args, 1, "id");
            let active = match args.get(2).map(String::as_str) {
                Some("on") => true,
                Some("off") => false,
                _ => usage(),
            };
            Request::SetModifier { id, active }
        }
        "modifiers" => Request::ListModifiers,
        "rotate" => Request::Rotate {
            dx: num(&args, 1, "dx"),
            dy: num(&args, 2, "dy"),
        },
        "pan" => Request::Pan {
            dx: num(&args, 1, "dx"),
            dy: num(&args, 2, "dy"),
        },
        "zoom" => Request::Zoom {
            delta: num(&args, 1, "delta"),
        },
        "reset" => Request::ResetCamera,
        "hit" => Request::HitTest {
            x: num(&args, 1, "x"),
            y: num(&args, 2, "y"),
        },
        "frame" => Request::GetFrame,
        "fps" => Request::SetFramerate {
            fps: num(&args, 1, "fps"),
        },
        "shutdown" => Request::Shutdown,
        _ => usage(),
    };

    match send_request(&addr, &req) {
        Ok(Response::State(s)) => print_state(s),
        Ok(Response::Genome(g)) => println!(
            "genome uid={} gen={} fitness={:.2} neurons={} connections={}",
            g.uid,
            g.generation,
            g.fitness,
            g.neurons.len(),
            g.connections.len()
        ),
        Ok(Response::Hit { hit: Some(h) }) => println!("{:?} at {:.1}px", h.target, h.distance),
        Ok(Response::Hit { hit: None }) => println!("nothing"),
        Ok(Response::Modifiers { modifiers }) => {
            for m in modifiers {
                println!("{:>3} [{}] {}", m.id, if m.active { "x" } else { " " }, m.name);
            }
        }
        Ok(frame @ Response::Frame { .. }) => match serde_json::to_string(&frame) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed: {e}");
                process::exit(1);
            }
        },
        Ok(Response::Success { message }) => println!("{message}"),
        Ok(Response::Error { message }) => {
            eprintln!("Error: {message}");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed: {e}");
            process::exit(1);
        }
    }
}
