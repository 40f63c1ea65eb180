// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! CLI for the LogicSim pixel-circuit simulator.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use logicsim::config;
use logicsim::console::{Console, HostIo};
use logicsim::engine::Engine;
use logicsim::render::{render_frame, GifRecorder};

#[derive(Parser)]
#[command(name = "logicsim", about = "logicsim — bit-parallel pixel-circuit simulator")]
struct Cli {
    /// Number of ticks to simulate. Negative values run indefinitely.
    #[clap(short = 'l', long = "simulation-length", default_value_t = -1, allow_negative_numbers = true)]
    simulation_length: i64,

    /// Emit a state frame every this many ticks.
    ///
    /// If 0 or negative, the output animation holds only the final
    /// state.
    #[clap(short = 's', long = "print-stride", default_value_t = -1, allow_negative_numbers = true)]
    print_stride: i64,

    /// Delay between animation frames, in milliseconds.
    #[clap(short = 't', long = "frametime", default_value_t = 100)]
    frametime: u64,

    /// Integer pixel-scaling factor for the output animation.
    ///
    /// Very useful for small circuits.
    #[clap(short = 'c', long = "output-scale", default_value_t = 2)]
    output_scale: usize,

    /// Path to the circuit JSON file.
    circuit: PathBuf,
}

fn fatal(message: &str) -> ! {
    clilog::error!("{}", message);
    std::process::exit(1);
}

/// Tick loop: frames every `print_stride` ticks plus the final state.
/// Returns the number of ticks simulated.
fn run(
    cli: &Cli,
    engine: &mut Engine,
    console: &mut Console,
    recorder: &mut GifRecorder,
) -> Result<u64, String> {
    let (width, height) = (engine.width(), engine.height());
    let mut ticks = 0u64;
    let mut since_frame = 0i64;
    let mut i = 0i64;
    while i != cli.simulation_length {
        engine.tick(console);
        ticks += 1;
        since_frame += 1;
        if since_frame == cli.print_stride {
            since_frame = 0;
            recorder.write_frame(&render_frame(&engine.cells(), width, height, cli.output_scale))?;
        }
        i += 1;
    }
    recorder.write_frame(&render_frame(&engine.cells(), width, height, cli.output_scale))?;
    Ok(ticks)
}

fn main() {
    clilog::init_stderr_color_debug();
    let cli = Cli::parse();

    clilog::info!("Loading circuit {}", cli.circuit.display());
    let circuit = config::load_circuit(&cli.circuit).unwrap_or_else(|e| fatal(&e));
    clilog::info!(
        "Loaded {}x{} circuit with {} peripherals",
        circuit.width,
        circuit.height,
        circuit.peripherals.len()
    );

    let out_path = PathBuf::from(format!("{}.out.gif", cli.circuit.display()));
    let mut recorder = GifRecorder::create(
        &out_path,
        circuit.width * cli.output_scale,
        circuit.height * cli.output_scale,
        cli.frametime,
    )
    .unwrap_or_else(|e| fatal(&e));

    let mut console = Console::init().unwrap_or_else(|e| fatal(&format!("terminal setup failed: {e}")));
    let peripherals = circuit
        .peripherals
        .into_iter()
        .map(|spec| spec.build(&mut console))
        .collect();
    let mut engine = Engine::new(circuit.width, circuit.height, &circuit.rules, peripherals);

    console.print("Press any key to start simulation.\n");
    console.wait_for_key();
    console.clear_stream();

    let started = Instant::now();
    let result = run(&cli, &mut engine, &mut console, &mut recorder);
    console.finish();

    match result {
        Ok(ticks) => {
            clilog::info!(
                "Simulated {} ticks in {:.3} s; animation written to {}",
                ticks,
                started.elapsed().as_secs_f64(),
                out_path.display()
            );
        }
        Err(e) => fatal(&e),
    }
}
