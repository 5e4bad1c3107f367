use colored::Colorize;
use std::path::Path;
use std::sync::{Arc, Mutex};

use shake_detection::backends::{SensorBackend, Simulator, SimulatorBackend};
use shake_detection::config::{self, Config};
use shake_detection::processing::detector::ShakeDetector;
use shake_detection::utils::log::log_with_header;

const CONFIG_PATH: &str = "config.yaml";

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "replay" if args.len() > 2 => run_script(Simulator::from_csv(&args[2])),
            "demo" => {
                let config = load_or_default();
                run_script(Ok(Simulator::synthetic(&config.simulator, 3, 50)))
            }
            _ => println!("Invalid argument, please use 'replay <csv>' or 'demo'"),
        }
    } else {
        println!("Please specify 'replay <csv>' or 'demo' as argument");
    }
}

fn load_or_default() -> Config {
    if Path::new(CONFIG_PATH).exists() {
        match config::load_config(CONFIG_PATH) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    }
}

fn run_script(simulator: Result<Simulator, Box<dyn std::error::Error>>) {
    let simulator = match simulator {
        Ok(simulator) => simulator,
        Err(e) => {
            eprintln!("Failed to load script: {}", e);
            std::process::exit(1);
        }
    };

    let config = load_or_default();
    let mut detector = ShakeDetector::new(config.detector.clone());
    detector.set_debug_logging(config.logging.enable_debug_logging);
    detector.set_on_shake(|event| {
        println!("{} at {}ms", "SHAKE".red().bold(), event.timestamp_ms);
    });
    let detector = Arc::new(Mutex::new(detector));

    let samples = simulator.script().len();
    let mut backend = SimulatorBackend::new(Arc::new(Mutex::new(simulator)), detector);

    if let Err(e) = backend.start() {
        eprintln!("Failed to start backend: {}", e);
        std::process::exit(1);
    }
    let events = match backend.replay() {
        Ok(events) => events,
        Err(e) => {
            eprintln!("Replay failed: {}", e);
            std::process::exit(1);
        }
    };
    backend.stop();

    if config.logging.verbose {
        let summary = format!(
            "{} samples, {} shakes: {:?}",
            samples,
            events.len(),
            events.iter().map(|e| e.timestamp_ms).collect::<Vec<_>>()
        );
        if let Err(e) = log_with_header("replay.log", "replay summary", &summary) {
            eprintln!("Failed to write replay log: {}", e);
        }
    }

    if events.is_empty() {
        println!("{}: {} samples processed, no shakes", "done".green(), samples);
    } else {
        println!(
            "{}: {} samples processed, {} shakes",
            "done".green(),
            samples,
            events.len()
        );
    }
}
