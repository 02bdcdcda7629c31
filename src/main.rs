use std::process;

use neuroforge::config::{Config, EngineConfig};
use neuroforge::deps::Dependencies;
use neuroforge::evolution::Engine;
use neuroforge::modifiers::{registry, ModifierId};
use neuroforge::observer::{EngineAdapter, SceneAdapter};
use neuroforge::scene::Orchestrator;
use neuroforge::surface::DisplayList;

#[derive(Debug, Default)]
struct Options {
    generations: u64,
    seed: Option<u64>,
    modifiers: Vec<ModifierId>,
    width: f32,
    height: f32,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }
    let (cmd, rest) = match args.split_first() {
        Some((c, rest)) if !c.starts_with("--") => (c.as_str(), rest),
        _ => ("evolve", &args[..]),
    };
    if cmd == "help" {
        print_help();
        return;
    }
    let opts = match parse_options(rest) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("{msg}");
            print_help();
            process::exit(2);
        }
    };

    let result = match cmd {
        "evolve" => run_evolve(&opts),
        "render" => run_render(&opts),
        "modifiers" => {
            for r in registry() {
                println!("{:>3}  {}", r.id, r.name);
            }
            Ok(())
        }
        other => Err(format!("Unknown command: {other}")),
    };
    if let Err(msg) = result {
        eprintln!("{msg}");
        process::exit(1);
    }
}

fn print_help() {
    println!("neuroforge (headless runner)");
    println!("usage:");
    println!("  neuroforge [evolve] [--generations N] [--seed S] [--modifier ID]...");
    println!("  neuroforge render [--generations N] [--seed S] [--size WxH] [--modifier ID]...");
    println!("  neuroforge modifiers");
    println!("  neuroforge --help");
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut opts = Options {
        generations: 50,
        width: 960.0,
        height: 640.0,
        ..Options::default()
    };
    let mut it = args.iter();
    while let Some(flag) = it.next() {
        let mut value = |name: &str| it.next().cloned().ok_or_else(|| format!("{name} needs a value"));
        match flag.as_str() {
            "--generations" => {
                opts.generations = value("--generations")?
                    .parse()
                    .map_err(|_| "--generations must be a number".to_string())?
            }
            "--seed" => {
                opts.seed = Some(value("--seed")?.parse().map_err(|_| "--seed must be a number".to_string())?)
            }
            "--modifier" => opts.modifiers.push(
                value("--modifier")?
                    .parse()
                    .map_err(|_| "--modifier must be a numeric id".to_string())?,
            ),
            "--size" => {
                let raw = value("--size")?;
                let (w, h) = raw
                    .split_once('x')
                    .ok_or_else(|| "--size must look like 960x640".to_string())?;
                opts.width = w.parse().map_err(|_| "bad width".to_string())?;
                opts.height = h.parse().map_err(|_| "bad height".to_string())?;
            }
            other => return Err(format!("Unknown option: {other}")),
        }
    }
    Ok(opts)
}

fn engine_config(opts: &Options) -> EngineConfig {
    let cfg = EngineConfig::default();
    match opts.seed {
        Some(seed) => cfg.with_seed(seed),
        None => cfg,
    }
}

fn run_evolve(opts: &Options) -> Result<(), String> {
    let mut engine = Engine::new(engine_config(opts), Dependencies::new()).map_err(|e| e.to_string())?;
    for id in &opts.modifiers {
        if !engine.set_modifier(*id, true) {
            return Err(format!("unknown modifier id {id}"));
        }
    }

    for g in 0..opts.generations {
        engine.step();
        if let Some(r) = engine.last_report() {
            if g % 10 == 0 || g + 1 == opts.generations {
                println!(
                    "tick={:>5} gen={:>5} paused={:<5} best={:>9.2} mean={:>9.2}{}",
                    r.tick,
                    r.generation,
                    r.paused,
                    r.best_fitness,
                    r.mean_fitness,
                    if r.targets_regenerated { " (targets moved)" } else { "" }
                );
            }
        }
    }

    let snap = EngineAdapter::new(&engine).snapshot();
    println!(
        "best uid={} fitness={:.2} neurons={} connections={} attention={:.3} modifiers={:?}",
        snap.best_uid,
        snap.best_fitness,
        snap.best_neurons,
        snap.best_connections,
        snap.sustained_attention,
        snap.active_modifiers
    );
    Ok(())
}

/// Evolve, then print one frame's draw commands as JSON.
fn run_render(opts: &Options) -> Result<(), String> {
    let config = Config {
        engine: engine_config(opts),
        ..Config::default()
    };
    let mut scene = Orchestrator::with_system_clock(config, Dependencies::new()).map_err(|e| e.to_string())?;
    for id in &opts.modifiers {
        scene.set_modifier(*id, true);
    }
    for _ in 0..opts.generations {
        scene.step();
    }

    let mut surface = DisplayList::new(opts.width, opts.height);
    let stats = scene.render(&mut surface);
    let snap = SceneAdapter::new(&scene).snapshot();

    let out = serde_json::json!({
        "stats": stats,
        "state": snap,
        "commands": surface.commands(),
    });
    println!("{}", serde_json::to_string(&out).map_err(|e| format!("serialize: {e}"))?);
    Ok(())
}
